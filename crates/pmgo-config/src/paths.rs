//! Locations of the per-process log files written by the daemon.
//!
//! The daemon keeps one directory per supervised process under the logs root
//! (`~/.pmgo` unless overridden) holding `<name>.err` and `<name>.out`. The
//! client recomputes these paths on every invocation; nothing here is cached.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// One of the two output streams captured for a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Standard error, stored with the `.err` extension.
    Stderr,
    /// Standard output, stored with the `.out` extension.
    Stdout,
}

impl StreamKind {
    /// Streams in the order they are printed by one-shot reads.
    pub const ALL: [Self; 2] = [Self::Stderr, Self::Stdout];

    /// File extension used by the daemon for this stream.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Stderr => "err",
            Self::Stdout => "out",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stderr => formatter.write_str("stderr"),
            Self::Stdout => formatter.write_str("stdout"),
        }
    }
}

/// A process name that cannot be used as a log directory name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid process name {name:?}: must be a single path component")]
pub struct InvalidProcessName {
    /// The rejected name.
    pub name: String,
}

/// Resolved log locations for a single named process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    directory: Utf8PathBuf,
    name: String,
}

impl LogPaths {
    /// Derives the log locations of `name` under `root`.
    ///
    /// # Errors
    ///
    /// Rejects names that are empty, `.` or `..`, or that contain a path
    /// separator, so the result always stays directly under `root`.
    pub fn new(root: &Utf8Path, name: &str) -> Result<Self, InvalidProcessName> {
        let escapes = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if escapes {
            return Err(InvalidProcessName {
                name: name.to_owned(),
            });
        }
        Ok(Self {
            directory: root.join(name),
            name: name.to_owned(),
        })
    }

    /// Per-process directory; its absence means the process has no logs.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Path of the file capturing `stream`.
    #[must_use]
    pub fn stream(&self, stream: StreamKind) -> Utf8PathBuf {
        self.directory
            .join(format!("{}.{}", self.name, stream.extension()))
    }
}
