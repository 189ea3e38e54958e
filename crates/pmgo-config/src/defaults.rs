use camino::Utf8PathBuf;

#[cfg(unix)]
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::socket::SocketEndpoint;

/// Default TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 9876;

/// Default log filter expression used by the client.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default time allowed for establishing the daemon connection.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default pause between polls while following a log file that has no new data.
pub const DEFAULT_FOLLOW_POLL_INTERVAL_MS: u64 = 250;

/// Shortest pause allowed between follow polls.
pub const MIN_FOLLOW_POLL_INTERVAL_MS: u64 = 10;

/// Directory under the home directory where the daemon writes process logs.
pub const LOGS_DIRECTORY_NAME: &str = ".pmgo";

/// Default log filter expression used by the client.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the client.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Default connection timeout in milliseconds.
#[must_use]
pub const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default follow poll interval in milliseconds.
#[must_use]
pub const fn default_follow_poll_interval_ms() -> u64 {
    DEFAULT_FOLLOW_POLL_INTERVAL_MS
}

/// Computes the default socket endpoint for the daemon.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    default_socket_endpoint_inner()
}

#[cfg(unix)]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("pmgo");
    if apply_namespace {
        base.push(user_namespace());
    }

    SocketEndpoint::unix(base.join("pmgo.sock"))
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

/// Resolves `<home>/.pmgo`, or `None` when the home directory is unknown.
#[must_use]
pub fn default_logs_root() -> Option<Utf8PathBuf> {
    let home = dirs::home_dir()?;
    let home = Utf8PathBuf::from_path_buf(home).ok()?;
    Some(home.join(LOGS_DIRECTORY_NAME))
}
