//! CLI argument definitions for the pmgo control client.

use clap::{Args, Parser, Subcommand};
use pmgo_daemon_types::SourceLaunch;

use crate::output::OutputFormat;

/// Control client for the pmgo process supervisor.
#[derive(Parser, Debug)]
#[command(name = "pmgo", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how status and info reports are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    #[command(flatten)]
    Daemon(DaemonCommand),
    /// Prints or follows the stderr and stdout logs of a process.
    ///
    /// Reads the files the daemon writes under the logs root; the daemon
    /// itself is never contacted.
    Logs {
        name: String,
        /// Keeps printing lines as they are appended.
        #[arg(long, short = 'f')]
        follow: bool,
    },
}

/// Commands answered by the daemon.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum DaemonCommand {
    /// Saves the daemon's current process list.
    Save,
    /// Starts a registered process, or registers and starts one from source.
    Start(StartArgs),
    /// Restarts a process.
    Restart {
        name: String,
    },
    /// Stops a process.
    Stop {
        name: String,
    },
    /// Stops a process and removes it from supervision.
    Delete {
        name: String,
    },
    /// Deletes every supervised process.
    DeleteAll,
    /// Lists every supervised process.
    Status,
    /// Describes one process.
    Info {
        name: String,
    },
}

/// `start <name>` or `start <source> <name> [--keep-alive] [--bin] [-- args...]`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartArgs {
    /// Process name, or the source path when a name follows.
    #[arg(value_name = "SOURCE|NAME")]
    pub(crate) target: String,
    /// Name for a process started from source.
    #[arg(value_name = "NAME")]
    pub(crate) name: Option<String>,
    /// Restarts the process whenever it exits.
    #[arg(long)]
    pub(crate) keep_alive: bool,
    /// Treats the source as a prebuilt binary.
    #[arg(long = "bin")]
    pub(crate) binary: bool,
    /// Arguments passed to the process.
    #[arg(last = true, value_name = "ARG")]
    pub(crate) args: Vec<String>,
}

/// What `start` resolves to once its positionals are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StartTarget {
    Registered(String),
    Source(SourceLaunch),
}

impl From<StartArgs> for StartTarget {
    fn from(args: StartArgs) -> Self {
        match args.name {
            None => Self::Registered(args.target),
            Some(name) => Self::Source(SourceLaunch {
                source_path: args.target,
                name,
                keep_alive: args.keep_alive,
                args: args.args,
                binary: args.binary,
            }),
        }
    }
}
