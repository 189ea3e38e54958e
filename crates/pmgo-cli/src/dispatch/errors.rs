//! Fatal failures of operator commands.
//!
//! A [`DispatchError`] means a remote call whose result the operator depends
//! on failed, leaving the daemon in an unknown state relative to what was
//! asked. The runner reports it and ends the session with a failure status.

use thiserror::Error;

use crate::client::ClientError;

/// Remote failures that abort the whole invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to save list of processes: {0}")]
    Save(#[source] ClientError),
    #[error("failed to start process '{name}' from {source_path}: {source}")]
    StartFromSource {
        name: String,
        source_path: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to look up process '{name}': {source}")]
    Lookup {
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to restart process '{name}': {source}")]
    Restart {
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to stop process '{name}': {source}")]
    Stop {
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to delete process '{name}': {source}")]
    Delete {
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to get status: {0}")]
    Status(#[source] ClientError),
}
