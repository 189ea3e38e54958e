//! Non-fatal command results and their severities.

use std::fmt;

use crate::client::ClientError;

/// How loudly an [`Outcome`] is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The command did what was asked.
    Info,
    /// Nothing to do; reported and the command returns normally.
    Warn,
    /// The command was aborted locally; the session continues.
    Error,
}

/// Result of a command that did not fail fatally.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = ()> {
    /// The command ran; `T` carries data for presentation.
    Completed(T),
    /// The command had nothing to act on.
    Warned(String),
    /// The command was refused or failed without ending the session.
    Rejected(String),
}

impl<T> Outcome<T> {
    /// Severity used when reporting the outcome.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Completed(_) => Severity::Info,
            Self::Warned(_) => Severity::Warn,
            Self::Rejected(_) => Severity::Error,
        }
    }

    pub(crate) fn not_found(name: &str) -> Self {
        Self::Rejected(format!("process {name} not found"))
    }
}

/// Result of one delete issued by `delete-all`.
#[derive(Debug)]
pub struct DeleteAttempt {
    pub name: String,
    pub result: Result<(), ClientError>,
}

impl DeleteAttempt {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for DeleteAttempt {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(()) => write!(formatter, "deleted {}", self.name),
            Err(error) => write!(formatter, "failed to delete {}: {error}", self.name),
        }
    }
}
