//! Fake daemon for behavioural tests.
//!
//! Listens on an ephemeral TCP port, accepts a single connection and answers
//! every JSONL request from an in-memory process table, recording what it was
//! asked.

use std::collections::BTreeSet;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use pmgo_daemon_types::{
    DaemonRequest, DaemonResponse, ProcessDescriptor, ProcessDetail, ProcessSet, ProcessStatus,
};
use serde_json::Value;

/// What the fake daemon supervises and which calls it refuses.
#[derive(Debug, Clone, Default)]
pub(in crate::tests) struct DaemonScript {
    processes: ProcessSet,
    failures: BTreeSet<(String, Option<String>)>,
}

impl DaemonScript {
    pub fn supervising<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            processes: names.into_iter().map(running_process).collect(),
            failures: BTreeSet::new(),
        }
    }

    /// Refuses `method`, for every name or only for `name`.
    pub fn fail(&mut self, method: &str, name: Option<&str>) {
        self.failures
            .insert((method.to_owned(), name.map(str::to_owned)));
    }

    fn fails(&self, method: &str, name: Option<&str>) -> bool {
        self.failures.contains(&(method.to_owned(), None))
            || name.is_some_and(|name| {
                self.failures
                    .contains(&(method.to_owned(), Some(name.to_owned())))
            })
    }

    fn respond(&self, request: &DaemonRequest) -> DaemonResponse {
        let name = request_name(request);
        if self.fails(request.method(), name) {
            return DaemonResponse::error(format!("{} refused", request.method()));
        }
        match request {
            DaemonRequest::QueryAllStatus => to_payload(&self.processes),
            DaemonRequest::QueryByName { name } => match self.processes.get(name) {
                Some(process) => to_payload(&detail_of(process)),
                None => DaemonResponse::empty(),
            },
            _ => DaemonResponse::empty(),
        }
    }
}

fn running_process(name: &str) -> ProcessDescriptor {
    ProcessDescriptor {
        name: name.to_owned(),
        pid: Some(4242),
        status: ProcessStatus::Running,
        uptime: String::from("5m"),
        restarts: 0,
        cpu_percent: 1.5,
        memory_bytes: 2 * 1024 * 1024,
    }
}

fn detail_of(process: &ProcessDescriptor) -> ProcessDetail {
    [
        ("name", process.name.clone()),
        ("status", process.status.to_string()),
        ("uptime", process.uptime.clone()),
    ]
    .into_iter()
    .collect()
}

fn to_payload<T: serde::Serialize>(value: &T) -> DaemonResponse {
    DaemonResponse::ok(serde_json::to_value(value).unwrap_or(Value::Null))
}

fn request_name(request: &DaemonRequest) -> Option<&str> {
    match request {
        DaemonRequest::StartFromSource(launch) => Some(launch.name.as_str()),
        DaemonRequest::StartByName { name }
        | DaemonRequest::RestartByName { name }
        | DaemonRequest::StopByName { name }
        | DaemonRequest::DeleteByName { name }
        | DaemonRequest::QueryByName { name } => Some(name.as_str()),
        DaemonRequest::SaveAll | DaemonRequest::QueryAllStatus => None,
    }
}

/// Short form of a request used in assertions, e.g. `stop_by_name web`.
fn summarise(request: &DaemonRequest) -> String {
    match request_name(request) {
        Some(name) => format!("{} {name}", request.method()),
        None => request.method().to_owned(),
    }
}

pub(in crate::tests) struct FakeDaemon {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeDaemon {
    pub fn spawn(script: DaemonScript) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake daemon")?;
        listener
            .set_nonblocking(true)
            .context("fake daemon nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || Self::serve(&listener, &script, &recorded));
        Ok(Self {
            port,
            requests,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the client to hang up and returns the requests it sent.
    pub fn take_requests(&mut self) -> Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))?
                .context("fake daemon failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve(
        listener: &TcpListener,
        script: &DaemonScript,
        requests: &Mutex<Vec<String>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match listener.accept() {
                Ok((stream, _)) => return Self::answer(stream, script, requests),
                Err(error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                // Nobody connected; the CLI never needed the daemon.
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }

    fn answer(stream: TcpStream, script: &DaemonScript, requests: &Mutex<Vec<String>>) -> Result<()> {
        stream
            .set_nonblocking(false)
            .context("blocking client stream")?;
        let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
        let mut writer = stream;
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).context("read request")? == 0 {
                return Ok(());
            }
            let request: DaemonRequest =
                serde_json::from_str(&line).context("decode request")?;
            requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(summarise(&request));
            let response = script.respond(&request);
            let mut encoded = serde_json::to_vec(&response).context("encode response")?;
            encoded.push(b'\n');
            writer.write_all(&encoded).context("write response")?;
            writer.flush().context("flush response")?;
        }
    }
}
