//! Operator command dispatch.
//!
//! [`CommandDispatcher`] turns each operator command into an optional
//! existence check, one call on the [`ProcessControl`] adapter, and a
//! classification of what happened:
//!
//! - `Err(DispatchError)`: fatal. The remote call failed and the session ends.
//! - [`Outcome::Warned`]: nothing to do (stopping an absent process).
//! - [`Outcome::Rejected`]: aborted locally without ending the session
//!   (restart, delete or info of an absent process; a failed start).
//! - [`Outcome::Completed`]: the command ran.
//!
//! Mutating commands against a name the daemon does not report are never
//! forwarded, so "not found" is never confused with a generic remote failure.

mod errors;
mod outcome;

use pmgo_daemon_types::{ProcessDetail, ProcessSet, SourceLaunch};
use tracing::debug;

use crate::client::ProcessControl;

pub use errors::DispatchError;
pub use outcome::{DeleteAttempt, Outcome, Severity};

/// Result type shared by every dispatcher command.
pub type DispatchResult<T = ()> = Result<Outcome<T>, DispatchError>;

/// Runs operator commands against a [`ProcessControl`] implementation.
pub struct CommandDispatcher<C> {
    client: C,
}

impl<C: ProcessControl> CommandDispatcher<C> {
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Asks the daemon to persist its current process list.
    pub fn save(&mut self) -> DispatchResult {
        self.client.save_all().map_err(DispatchError::Save)?;
        Ok(Outcome::Completed(()))
    }

    /// Registers and starts a new process from a source path or binary.
    pub fn start_from_source(&mut self, launch: &SourceLaunch) -> DispatchResult {
        self.client
            .start_from_source(launch)
            .map_err(|source| DispatchError::StartFromSource {
                name: launch.name.clone(),
                source_path: launch.source_path.clone(),
                source,
            })?;
        Ok(Outcome::Completed(()))
    }

    /// Starts a registered process. The daemon decides whether `name` exists;
    /// a failure is reported without ending the session.
    pub fn start(&mut self, name: &str) -> DispatchResult {
        match self.client.start_by_name(name) {
            Ok(()) => Ok(Outcome::Completed(())),
            Err(error) => Ok(Outcome::Rejected(format!(
                "failed to start process {name}: {error}"
            ))),
        }
    }

    /// Restarts `name` if the daemon knows it.
    pub fn restart(&mut self, name: &str) -> DispatchResult {
        if self.lookup(name)?.is_none() {
            return Ok(Outcome::not_found(name));
        }
        self.client
            .restart_by_name(name)
            .map_err(|source| DispatchError::Restart {
                name: name.to_owned(),
                source,
            })?;
        Ok(Outcome::Completed(()))
    }

    /// Stops `name`; an absent process only produces a warning.
    pub fn stop(&mut self, name: &str) -> DispatchResult {
        if self.lookup(name)?.is_none() {
            return Ok(Outcome::Warned(format!("process {name} not found")));
        }
        self.client
            .stop_by_name(name)
            .map_err(|source| DispatchError::Stop {
                name: name.to_owned(),
                source,
            })?;
        Ok(Outcome::Completed(()))
    }

    /// Stops `name` and removes it from supervision for good.
    pub fn delete(&mut self, name: &str) -> DispatchResult {
        if self.lookup(name)?.is_none() {
            return Ok(Outcome::not_found(name));
        }
        self.client
            .delete_by_name(name)
            .map_err(|source| DispatchError::Delete {
                name: name.to_owned(),
                source,
            })?;
        Ok(Outcome::Completed(()))
    }

    /// Fetches a fresh snapshot of every supervised process.
    pub fn status(&mut self) -> DispatchResult<ProcessSet> {
        let snapshot = self
            .client
            .query_all_status()
            .map_err(DispatchError::Status)?;
        Ok(Outcome::Completed(snapshot))
    }

    /// Describes `name` in full.
    pub fn info(&mut self, name: &str) -> DispatchResult<ProcessDetail> {
        Ok(match self.lookup(name)? {
            Some(detail) => Outcome::Completed(detail),
            None => Outcome::not_found(name),
        })
    }

    /// Deletes every process in a fresh snapshot, one at a time.
    ///
    /// A failed delete is recorded and the next process is still attempted;
    /// only failing to fetch the snapshot is fatal.
    pub fn delete_all(&mut self) -> DispatchResult<Vec<DeleteAttempt>> {
        let snapshot = self
            .client
            .query_all_status()
            .map_err(DispatchError::Status)?;
        if snapshot.is_empty() {
            return Ok(Outcome::Warned(String::from(
                "nothing to delete: all processes have been stopped and deleted",
            )));
        }

        let attempts = snapshot
            .names()
            .map(|name| {
                let result = self.client.delete_by_name(name);
                debug!(name, deleted = result.is_ok(), "delete-all attempt");
                DeleteAttempt {
                    name: name.to_owned(),
                    result,
                }
            })
            .collect();
        Ok(Outcome::Completed(attempts))
    }

    fn lookup(&mut self, name: &str) -> Result<Option<ProcessDetail>, DispatchError> {
        let detail = self
            .client
            .query_by_name(name)
            .map_err(|source| DispatchError::Lookup {
                name: name.to_owned(),
                source,
            })?;
        debug!(name, found = detail.is_some(), "checked process existence");
        Ok(detail)
    }
}
