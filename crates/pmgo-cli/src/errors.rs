//! Error types for the CLI runtime.

use std::error::Error as _;
use std::fmt::Write as _;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::client::ClientError;
use crate::dispatch::DispatchError;
use crate::logs::LogError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("cannot reach the daemon: {0}")]
    Connect(#[source] ClientError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Logs(#[from] LogError),
    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
    #[error("failed to write report: {0}")]
    Report(#[source] io::Error),
}

impl AppError {
    /// Message followed by every underlying cause not already quoted in it.
    pub(crate) fn report(&self) -> String {
        let mut rendered = self.to_string();
        let mut cause = self.source();
        while let Some(error) = cause {
            let message = error.to_string();
            if !rendered.contains(&message) {
                let _ = write!(rendered, "\n  caused by: {message}");
            }
            cause = error.source();
        }
        rendered
    }
}
