//! Local access to the per-process log files written by the daemon.
//!
//! [`LogFollower`] never talks to the daemon. It derives the two stream files
//! of a process from the logs root and either prints them once (stderr first,
//! then stdout) or follows both concurrently, one worker thread per stream,
//! until the workers fail.
//!
//! While following, both workers share one sink behind a [`Mutex`]. Each line
//! is written and flushed under a single lock, so lines never interleave
//! mid-line, but lines from different streams may appear in any order.

mod tail;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Mutex;
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use pmgo_config::{Config, InvalidProcessName, LogPaths, StreamKind};
use thiserror::Error;
use tracing::{debug, error};

use tail::StreamTail;

/// Failures raised while reading or following log files.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot locate process logs: the home directory could not be resolved")]
    HomeDirectory,
    #[error(transparent)]
    InvalidName(#[from] InvalidProcessName),
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read log file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to inspect log file {path}: {source}")]
    Metadata {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write log output: {0}")]
    Write(#[source] io::Error),
    #[error("{stream} follower panicked")]
    WorkerPanicked { stream: StreamKind },
}

/// How a log session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSession {
    /// The process has no log directory; nothing was read.
    NotFound,
    /// Both stream files were printed in full.
    Completed,
}

/// Reads or follows the stream files of supervised processes.
#[derive(Debug, Clone)]
pub struct LogFollower {
    root: Utf8PathBuf,
    poll_interval: Duration,
}

impl LogFollower {
    pub fn new(root: impl Into<Utf8PathBuf>, poll_interval: Duration) -> Self {
        Self {
            root: root.into(),
            poll_interval,
        }
    }

    /// Builds a follower from the configured logs root and poll interval.
    pub fn from_config(config: &Config) -> Result<Self, LogError> {
        let root = config.logs_root().ok_or(LogError::HomeDirectory)?;
        Ok(Self::new(root, config.follow_poll_interval()))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Prints the stderr file of `name` in full, then its stdout file.
    ///
    /// Both files must exist before anything is read; a missing directory or
    /// stream file yields [`LogSession::NotFound`] without partial output.
    pub fn show<W: Write>(&self, name: &str, sink: &mut W) -> Result<LogSession, LogError> {
        let paths = LogPaths::new(&self.root, name)?;
        if !paths.directory().is_dir() {
            debug!(directory = %paths.directory(), "no log directory");
            return Ok(LogSession::NotFound);
        }
        let files = StreamKind::ALL.map(|stream| paths.stream(stream));
        if let Some(missing) = files.iter().find(|path| !path.is_file()) {
            debug!(path = %missing, "log stream file missing");
            return Ok(LogSession::NotFound);
        }

        for path in &files {
            let file = File::open(path).map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;
            copy_lines(path, BufReader::new(file), sink)?;
        }
        Ok(LogSession::Completed)
    }

    /// Follows both stream files of `name` until the workers stop.
    ///
    /// Returns [`LogSession::NotFound`] immediately when the process has no
    /// log directory. Otherwise the call only returns once both workers have
    /// failed, yielding the stderr worker's error; each failure is also
    /// logged as it happens.
    pub fn follow<W: Write + Send>(&self, name: &str, sink: W) -> Result<LogSession, LogError> {
        let paths = LogPaths::new(&self.root, name)?;
        if !paths.directory().is_dir() {
            debug!(directory = %paths.directory(), "no log directory");
            return Ok(LogSession::NotFound);
        }

        let sink = Mutex::new(sink);
        let interval = self.poll_interval;
        let failure = thread::scope(|scope| {
            let [stderr, stdout] = StreamKind::ALL.map(|stream| {
                let tail = StreamTail::new(stream, paths.stream(stream));
                let sink = &sink;
                scope.spawn(move || run_worker(tail, sink, interval))
            });
            let first = join_worker(StreamKind::Stderr, stderr);
            join_worker(StreamKind::Stdout, stdout);
            first
        });
        Err(failure)
    }
}

fn run_worker<W: Write>(mut tail: StreamTail, sink: &Mutex<W>, interval: Duration) -> LogError {
    let failure = loop {
        match tail.poll(sink) {
            Ok(0) => thread::sleep(interval),
            Ok(_) => {}
            Err(failure) => break failure,
        }
    };
    error!(stream = %tail.stream(), error = %failure, "log follower stopped");
    failure
}

fn join_worker(stream: StreamKind, worker: ScopedJoinHandle<'_, LogError>) -> LogError {
    worker.join().unwrap_or_else(|_| {
        error!(%stream, "log follower panicked");
        LogError::WorkerPanicked { stream }
    })
}

fn copy_lines<R: BufRead, W: Write>(
    path: &Utf8Path,
    mut reader: R,
    sink: &mut W,
) -> Result<(), LogError> {
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| LogError::Read {
                path: path.to_owned(),
                source,
            })?;
        if read == 0 {
            return Ok(());
        }
        write_line(sink, &line).map_err(LogError::Write)?;
    }
}

/// Writes one line, terminating it when the file ended without a newline.
fn write_line<W: Write + ?Sized>(sink: &mut W, line: &[u8]) -> io::Result<()> {
    sink.write_all(line)?;
    if !line.ends_with(b"\n") {
        sink.write_all(b"\n")?;
    }
    sink.flush()
}
