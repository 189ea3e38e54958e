//! Command-line runtime for the pmgo control client.
//!
//! The runner splits configuration flags from the operator command, loads the
//! configuration, installs diagnostics, and then either reads process logs
//! locally or connects to the daemon once and dispatches a single command.
//! Configuration loading and the output streams can be substituted so tests
//! drive the whole path without a terminal.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use clap::Parser;
use pmgo_config::Config;
use tracing::debug;

mod cli;
pub mod client;
mod config;
pub mod dispatch;
mod errors;
pub mod logs;
pub mod output;
pub mod telemetry;
pub mod transport;

use cli::{Cli, CliCommand, DaemonCommand, StartTarget};
use client::{ProcessControl, RemoteClient};
use config::split_config_arguments;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use dispatch::{CommandDispatcher, DeleteAttempt, Outcome};
use errors::AppError;
use logs::{LogFollower, LogSession};
use output::{ResolvedOutputFormat, render_detail, render_status};

/// Bundles the output streams handed to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal: io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn with_terminal_status(
        stdout: &'a mut W,
        stderr: &'a mut E,
        stdout_is_terminal: bool,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }

    fn warn(&mut self, message: &str) -> Result<(), AppError> {
        writeln!(self.stderr, "warning: {message}").map_err(AppError::Report)
    }

    fn reject(&mut self, message: &str) -> Result<(), AppError> {
        writeln!(self.stderr, "error: {message}").map_err(AppError::Report)
    }
}

struct CliRunner<'a, 'io, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'io, W, E>,
    loader: &'a L,
}

impl<'a, 'io, W, E, L> CliRunner<'a, 'io, W, E, L>
where
    W: Write + Send,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: &'a mut IoStreams<'io, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let result = Cli::try_parse_from(split.command_arguments(&args))
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                self.loader
                    .load(&split.config_arguments)
                    .map(|config| (cli, config))
            })
            .and_then(|(cli, config)| {
                telemetry::initialise(&config)?;
                self.execute(cli, &config)
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(error)) => self.report_usage(&error),
            Err(error) => {
                let _ = writeln!(self.io.stderr, "error: {}", error.report());
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, cli: Cli, config: &Config) -> Result<ExitCode, AppError> {
        let format = cli.output.resolve(self.io.stdout_is_terminal());
        match cli.command {
            CliCommand::Logs { name, follow } => self.show_logs(config, &name, follow),
            CliCommand::Daemon(command) => {
                let client =
                    RemoteClient::connect(config.daemon_socket(), config.connect_timeout())
                        .map_err(AppError::Connect)?;
                let mut dispatcher = CommandDispatcher::new(client);
                run_command(&mut dispatcher, command, format, &mut *self.io)
            }
        }
    }

    fn show_logs(&mut self, config: &Config, name: &str, follow: bool) -> Result<ExitCode, AppError> {
        let follower = LogFollower::from_config(config)?;
        debug!(name, follow, root = %follower.root(), "reading process logs");
        let session = if follow {
            follower.follow(name, &mut *self.io.stdout)?
        } else {
            follower.show(name, &mut *self.io.stdout)?
        };
        if session == LogSession::NotFound {
            self.io.reject(&format!("logs not found for process {name}"))?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn report_usage(&mut self, error: &clap::Error) -> ExitCode {
        let rendered = error.render().to_string();
        if error.use_stderr() {
            let _ = write!(self.io.stderr, "{rendered}");
            ExitCode::FAILURE
        } else {
            let _ = write!(self.io.stdout, "{rendered}");
            ExitCode::SUCCESS
        }
    }
}

/// Runs one daemon command and reports its outcome.
///
/// Warnings and local rejections are reported and still exit successfully;
/// only fatal dispatch errors propagate.
fn run_command<C, W, E>(
    dispatcher: &mut CommandDispatcher<C>,
    command: DaemonCommand,
    format: ResolvedOutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError>
where
    C: ProcessControl,
    W: Write,
    E: Write,
{
    match command {
        DaemonCommand::Save => report(io, dispatcher.save()?, |_, ()| Ok(())),
        DaemonCommand::Start(args) => {
            let outcome = match StartTarget::from(args) {
                StartTarget::Registered(name) => dispatcher.start(&name)?,
                StartTarget::Source(launch) => dispatcher.start_from_source(&launch)?,
            };
            report(io, outcome, |_, ()| Ok(()))
        }
        DaemonCommand::Restart { name } => report(io, dispatcher.restart(&name)?, |_, ()| Ok(())),
        DaemonCommand::Stop { name } => report(io, dispatcher.stop(&name)?, |_, ()| Ok(())),
        DaemonCommand::Delete { name } => report(io, dispatcher.delete(&name)?, |_, ()| Ok(())),
        DaemonCommand::DeleteAll => report(io, dispatcher.delete_all()?, report_deletions),
        DaemonCommand::Status => report(io, dispatcher.status()?, |io, snapshot| {
            write_report(io, &render_status(&snapshot, format)?)
        }),
        DaemonCommand::Info { name } => report(io, dispatcher.info(&name)?, |io, detail| {
            write_report(io, &render_detail(&detail, format)?)
        }),
    }
}

fn report<T, W, E, F>(
    io: &mut IoStreams<'_, W, E>,
    outcome: Outcome<T>,
    on_completed: F,
) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
    F: FnOnce(&mut IoStreams<'_, W, E>, T) -> Result<(), AppError>,
{
    match outcome {
        Outcome::Completed(data) => on_completed(io, data)?,
        Outcome::Warned(message) => io.warn(&message)?,
        Outcome::Rejected(message) => io.reject(&message)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn write_report<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    rendered: &str,
) -> Result<(), AppError> {
    io.stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| io.stdout.flush())
        .map_err(AppError::Report)
}

fn report_deletions<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    attempts: Vec<DeleteAttempt>,
) -> Result<(), AppError> {
    for attempt in attempts {
        if attempt.succeeded() {
            writeln!(io.stdout, "{attempt}").map_err(AppError::Report)?;
        } else {
            io.reject(&attempt.to_string())?;
        }
    }
    Ok(())
}

/// Runs the CLI using the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write + Send,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write + Send,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}
