//! Shared configuration for the pmgo control client.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path`), then `PMGO_*` environment variables,
//! then command-line flags. The resolved [`Config`] tells the client where the
//! daemon listens, how long to wait for it, how to log, and where the daemon
//! keeps per-process log files.

mod defaults;
mod logging;
mod paths;
mod socket;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_FOLLOW_POLL_INTERVAL_MS, DEFAULT_LOG_FILTER,
    DEFAULT_TCP_PORT, LOGS_DIRECTORY_NAME, MIN_FOLLOW_POLL_INTERVAL_MS, default_connect_timeout_ms,
    default_follow_poll_interval_ms, default_log_filter, default_log_filter_string,
    default_log_format, default_logs_root, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{InvalidProcessName, LogPaths, StreamKind};
pub use socket::{SocketEndpoint, SocketParseError};

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PMGO")]
pub struct Config {
    /// Control socket of the supervisor daemon.
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// Milliseconds allowed for the initial daemon connection.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// `tracing` filter expression for client diagnostics.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for client diagnostics.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Overrides the directory holding per-process logs (`~/.pmgo`).
    pub logs_root: Option<Utf8PathBuf>,
    /// Milliseconds between polls while following a log file.
    #[ortho_config(default = DEFAULT_FOLLOW_POLL_INTERVAL_MS)]
    pub follow_poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            connect_timeout_ms: default_connect_timeout_ms(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            logs_root: None,
            follow_poll_interval_ms: default_follow_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Control socket of the supervisor daemon.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Time allowed for establishing the daemon connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Diagnostic output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Pause between polls while a followed log file has no new data.
    ///
    /// Never shorter than [`MIN_FOLLOW_POLL_INTERVAL_MS`], so followers
    /// cannot spin.
    #[must_use]
    pub fn follow_poll_interval(&self) -> Duration {
        Duration::from_millis(self.follow_poll_interval_ms.max(MIN_FOLLOW_POLL_INTERVAL_MS))
    }

    /// Directory holding per-process log directories.
    ///
    /// Returns the configured override when present, otherwise `~/.pmgo`.
    /// `None` means the home directory could not be resolved.
    #[must_use]
    pub fn logs_root(&self) -> Option<Utf8PathBuf> {
        self.logs_root.clone().or_else(default_logs_root)
    }
}
