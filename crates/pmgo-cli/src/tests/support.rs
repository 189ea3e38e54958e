//! Test support for runner coverage.
//!
//! Supplies a static configuration loader, a fake daemon, and a test world
//! that captures the runner's exit code and output streams.

mod fake_daemon;

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::net::TcpListener;
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use camino::Utf8PathBuf;
use pmgo_config::{Config, LogPaths, SocketEndpoint, StreamKind};
use rstest::fixture;
use tempfile::TempDir;

use crate::errors::AppError;
use crate::{ConfigLoader, IoStreams, run_with_loader};

pub(super) use fake_daemon::{DaemonScript, FakeDaemon};

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Endpoint on which nothing listens.
pub(super) fn unreachable_endpoint() -> Result<SocketEndpoint> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind ephemeral listener")?;
    let port = listener.local_addr().context("ephemeral addr")?.port();
    drop(listener);
    Ok(SocketEndpoint::tcp("127.0.0.1", port))
}

pub(super) fn build_args(command: &str) -> Vec<OsString> {
    let mut args = vec![OsString::from("pmgo")];
    args.extend(
        command
            .split_whitespace()
            .map(|token| OsString::from(token.trim_matches('"'))),
    );
    args
}

pub(super) struct TestWorld {
    pub config: Config,
    pub script: DaemonScript,
    pub daemon_running: bool,
    pub logs: Option<TempDir>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            config: Config {
                log_filter: String::from("off"),
                connect_timeout_ms: 1_000,
                ..Config::default()
            },
            script: DaemonScript::default(),
            daemon_running: false,
            logs: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            requests: Vec::new(),
        }
    }
}

impl TestWorld {
    pub fn supervise(&mut self, names: &str) {
        self.script = DaemonScript::supervising(
            names
                .split(',')
                .map(|name| name.trim().trim_matches('"'))
                .filter(|name| !name.is_empty()),
        );
        self.daemon_running = true;
    }

    pub fn write_logs(&mut self, name: &str, stderr: &str, stdout: &str) -> Result<()> {
        let root = match &self.logs {
            Some(dir) => dir.path().to_path_buf(),
            None => {
                let dir = tempfile::tempdir().context("logs tempdir")?;
                let path = dir.path().to_path_buf();
                self.logs = Some(dir);
                path
            }
        };
        let root = Utf8PathBuf::from_path_buf(root).map_err(|path| {
            anyhow::anyhow!("non UTF-8 logs root {}", path.display())
        })?;
        let paths = LogPaths::new(&root, name)?;
        fs::create_dir_all(paths.directory()).context("create log directory")?;
        fs::write(paths.stream(StreamKind::Stderr), stderr).context("write stderr log")?;
        fs::write(paths.stream(StreamKind::Stdout), stdout).context("write stdout log")?;
        self.config.logs_root = Some(root);
        Ok(())
    }

    pub fn use_empty_logs_root(&mut self) -> Result<()> {
        let dir = tempfile::tempdir().context("logs tempdir")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non UTF-8 logs root {}", path.display()))?;
        self.config.logs_root = Some(root);
        self.logs = Some(dir);
        Ok(())
    }

    /// Runs `command`, starting the fake daemon first when one is scripted.
    /// Without one the socket points at a closed port, so any connection
    /// attempt fails.
    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();

        let mut daemon = if self.daemon_running {
            let daemon = FakeDaemon::spawn(self.script.clone())?;
            self.config.daemon_socket = SocketEndpoint::tcp("127.0.0.1", daemon.port());
            Some(daemon)
        } else {
            self.config.daemon_socket = unreachable_endpoint()?;
            None
        };

        let loader = StaticConfigLoader::new(self.config.clone());
        let mut io = IoStreams::with_terminal_status(&mut self.stdout, &mut self.stderr, false);
        let exit = run_with_loader(build_args(command), &mut io, &loader);
        self.exit_code = Some(exit);
        if let Some(daemon) = daemon.as_mut() {
            self.requests = daemon.take_requests()?;
        }
        Ok(())
    }

    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout utf8")
    }

    pub fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr utf8")
    }

    pub fn assert_exit(&self, expected: ExitCode) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(exit == expected, "expected exit {expected:?}, got {exit:?}");
        Ok(())
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
