//! Control-socket envelopes.
//!
//! Each exchange is one JSON object per line in each direction. Requests name
//! a `method` and carry optional `params`; responses report `status` as either
//! `ok` with a `payload` or `error` with a `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for registering and starting a process from a source path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceLaunch {
    /// Package path or prebuilt binary to run.
    pub source_path: String,
    /// Name under which the daemon supervises the process.
    pub name: String,
    /// Restart the process when it exits.
    #[serde(default)]
    pub keep_alive: bool,
    /// Arguments passed to the process.
    #[serde(default)]
    pub args: Vec<String>,
    /// `source_path` is already a compiled binary.
    #[serde(default)]
    pub binary: bool,
}

/// A call issued by the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum DaemonRequest {
    /// Persists the current process list.
    SaveAll,
    /// Registers and starts a new process.
    StartFromSource(SourceLaunch),
    /// Starts a registered process.
    StartByName {
        /// Target process.
        name: String,
    },
    /// Restarts a process.
    RestartByName {
        /// Target process.
        name: String,
    },
    /// Stops a process.
    StopByName {
        /// Target process.
        name: String,
    },
    /// Stops a process and drops it from supervision.
    DeleteByName {
        /// Target process.
        name: String,
    },
    /// Describes one process; an empty payload means it does not exist.
    QueryByName {
        /// Target process.
        name: String,
    },
    /// Snapshots every supervised process.
    QueryAllStatus,
}

impl DaemonRequest {
    /// Wire name of the method, used in diagnostics.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::SaveAll => "save_all",
            Self::StartFromSource(_) => "start_from_source",
            Self::StartByName { .. } => "start_by_name",
            Self::RestartByName { .. } => "restart_by_name",
            Self::StopByName { .. } => "stop_by_name",
            Self::DeleteByName { .. } => "delete_by_name",
            Self::QueryByName { .. } => "query_by_name",
            Self::QueryAllStatus => "query_all_status",
        }
    }
}

/// The daemon's answer to a single [`DaemonRequest`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DaemonResponse {
    /// The call succeeded.
    Ok {
        /// Method-specific result; `null` when there is none.
        #[serde(default)]
        payload: Value,
    },
    /// The daemon refused or failed the call.
    Error {
        /// Explanation reported by the daemon.
        message: String,
    },
}

impl DaemonResponse {
    /// Successful response without a payload.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Ok {
            payload: Value::Null,
        }
    }

    /// Successful response carrying `payload`.
    #[must_use]
    pub const fn ok(payload: Value) -> Self {
        Self::Ok { payload }
    }

    /// Failed response with a daemon-side explanation.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
