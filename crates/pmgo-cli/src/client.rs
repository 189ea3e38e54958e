//! Synchronous facade over the daemon's control socket.
//!
//! [`ProcessControl`] exposes one call per daemon capability. [`RemoteClient`]
//! implements it by exchanging one JSON line per call over a connection that
//! is opened once, with a timeout, when the client is constructed. Calls are
//! never retried and results are never cached.

use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use pmgo_config::SocketEndpoint;
use pmgo_daemon_types::{
    DaemonRequest, DaemonResponse, ProcessDetail, ProcessSet, SourceLaunch,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::transport::{Connection, TransportError, connect};

/// Errors surfaced by a single remote call or by client construction.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to serialise {method} request: {source}")]
    SerialiseRequest {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to send {method} request to daemon: {source}")]
    SendRequest {
        method: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {method} response from daemon: {source}")]
    ReadResponse {
        method: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("daemon closed the connection before answering {method}")]
    ConnectionClosed { method: &'static str },
    #[error("failed to parse {method} response: {source}")]
    ParseResponse {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected {method} payload: {source}")]
    UnexpectedPayload {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("daemon reported {method} failure: {message}")]
    Remote {
        method: &'static str,
        message: String,
    },
}

/// One operation per daemon capability.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessControl {
    /// Persists the daemon's current process list.
    fn save_all(&mut self) -> Result<(), ClientError>;
    /// Registers and starts a new supervised process.
    fn start_from_source(&mut self, launch: &SourceLaunch) -> Result<(), ClientError>;
    /// Starts a registered process.
    fn start_by_name(&mut self, name: &str) -> Result<(), ClientError>;
    /// Restarts a registered process.
    fn restart_by_name(&mut self, name: &str) -> Result<(), ClientError>;
    /// Stops a registered process.
    fn stop_by_name(&mut self, name: &str) -> Result<(), ClientError>;
    /// Stops a process and removes it from supervision.
    fn delete_by_name(&mut self, name: &str) -> Result<(), ClientError>;
    /// Looks up one process; `None` when the daemon does not know it.
    fn query_by_name(&mut self, name: &str) -> Result<Option<ProcessDetail>, ClientError>;
    /// Fetches a fresh snapshot of every supervised process.
    fn query_all_status(&mut self) -> Result<ProcessSet, ClientError>;
}

/// [`ProcessControl`] over a JSONL control socket.
pub struct RemoteClient {
    endpoint: String,
    stream: BufReader<Connection>,
}

impl RemoteClient {
    /// Connects to the daemon at `endpoint`.
    ///
    /// Failure to connect within `timeout` is returned to the caller, which
    /// decides whether the session can continue.
    pub fn connect(endpoint: &SocketEndpoint, timeout: Duration) -> Result<Self, ClientError> {
        let connection = connect(endpoint, timeout)?;
        debug!(%endpoint, "connected to daemon");
        Ok(Self {
            endpoint: endpoint.to_string(),
            stream: BufReader::new(connection),
        })
    }

    fn call(&mut self, request: &DaemonRequest) -> Result<Value, ClientError> {
        let method = request.method();
        debug!(endpoint = %self.endpoint, method, "sending daemon request");

        let mut line = serde_json::to_vec(request)
            .map_err(|source| ClientError::SerialiseRequest { method, source })?;
        line.push(b'\n');
        let writer = self.stream.get_mut();
        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .map_err(|source| ClientError::SendRequest { method, source })?;

        let mut response = String::new();
        let read = self
            .stream
            .read_line(&mut response)
            .map_err(|source| ClientError::ReadResponse { method, source })?;
        if read == 0 {
            return Err(ClientError::ConnectionClosed { method });
        }

        match serde_json::from_str::<DaemonResponse>(&response)
            .map_err(|source| ClientError::ParseResponse { method, source })?
        {
            DaemonResponse::Ok { payload } => Ok(payload),
            DaemonResponse::Error { message } => {
                debug!(method, %message, "daemon rejected request");
                Err(ClientError::Remote { method, message })
            }
        }
    }

    fn call_for<T: DeserializeOwned>(&mut self, request: &DaemonRequest) -> Result<T, ClientError> {
        let method = request.method();
        let payload = self.call(request)?;
        serde_json::from_value(payload)
            .map_err(|source| ClientError::UnexpectedPayload { method, source })
    }
}

impl ProcessControl for RemoteClient {
    fn save_all(&mut self) -> Result<(), ClientError> {
        self.call(&DaemonRequest::SaveAll).map(drop)
    }

    fn start_from_source(&mut self, launch: &SourceLaunch) -> Result<(), ClientError> {
        self.call(&DaemonRequest::StartFromSource(launch.clone()))
            .map(drop)
    }

    fn start_by_name(&mut self, name: &str) -> Result<(), ClientError> {
        self.call(&DaemonRequest::StartByName {
            name: name.to_owned(),
        })
        .map(drop)
    }

    fn restart_by_name(&mut self, name: &str) -> Result<(), ClientError> {
        self.call(&DaemonRequest::RestartByName {
            name: name.to_owned(),
        })
        .map(drop)
    }

    fn stop_by_name(&mut self, name: &str) -> Result<(), ClientError> {
        self.call(&DaemonRequest::StopByName {
            name: name.to_owned(),
        })
        .map(drop)
    }

    fn delete_by_name(&mut self, name: &str) -> Result<(), ClientError> {
        self.call(&DaemonRequest::DeleteByName {
            name: name.to_owned(),
        })
        .map(drop)
    }

    fn query_by_name(&mut self, name: &str) -> Result<Option<ProcessDetail>, ClientError> {
        let detail: Option<ProcessDetail> = self.call_for(&DaemonRequest::QueryByName {
            name: name.to_owned(),
        })?;
        Ok(detail.and_then(ProcessDetail::non_empty))
    }

    fn query_all_status(&mut self) -> Result<ProcessSet, ClientError> {
        let snapshot: Option<ProcessSet> = self.call_for(&DaemonRequest::QueryAllStatus)?;
        Ok(snapshot.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    use serde_json::json;

    /// Serves `responses` in order, one per request line, and returns the
    /// request lines it received.
    fn serve(responses: Vec<String>) -> (SocketEndpoint, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept client");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut writer = stream;
            let mut requests = Vec::new();
            for response in responses {
                let mut line = String::new();
                if reader.read_line(&mut line).expect("read request") == 0 {
                    break;
                }
                requests.push(line.trim_end().to_owned());
                writer.write_all(response.as_bytes()).expect("write response");
                writer.write_all(b"\n").expect("write newline");
            }
            requests
        });
        (SocketEndpoint::tcp("127.0.0.1", port), handle)
    }

    fn client(endpoint: &SocketEndpoint) -> RemoteClient {
        RemoteClient::connect(endpoint, Duration::from_secs(1)).expect("connect client")
    }

    #[test]
    fn successive_calls_share_one_connection() {
        let (endpoint, daemon) = serve(vec![
            String::from(r#"{"status":"ok"}"#),
            String::from(r#"{"status":"ok"}"#),
        ]);
        let mut client = client(&endpoint);
        client.save_all().expect("save");
        client.stop_by_name("web").expect("stop");
        drop(client);
        let requests = daemon.join().expect("daemon thread");
        assert_eq!(
            requests,
            [
                r#"{"method":"save_all"}"#,
                r#"{"method":"stop_by_name","params":{"name":"web"}}"#,
            ]
        );
    }

    #[test]
    fn daemon_errors_surface_as_remote_failures() {
        let (endpoint, daemon) = serve(vec![String::from(
            r#"{"status":"error","message":"process busy"}"#,
        )]);
        let mut client = client(&endpoint);
        let error = client.restart_by_name("web").expect_err("restart fails");
        assert!(matches!(
            error,
            ClientError::Remote { method: "restart_by_name", ref message } if message == "process busy"
        ));
        drop(client);
        let _ = daemon.join();
    }

    #[test]
    fn empty_detail_is_reported_as_absent() {
        let (endpoint, daemon) = serve(vec![
            json!({"status": "ok", "payload": {}}).to_string(),
            json!({"status": "ok", "payload": null}).to_string(),
            json!({"status": "ok", "payload": {"name": "web", "status": "running"}}).to_string(),
        ]);
        let mut client = client(&endpoint);
        assert_eq!(client.query_by_name("ghost").expect("query"), None);
        assert_eq!(client.query_by_name("ghost").expect("query"), None);
        let detail = client
            .query_by_name("web")
            .expect("query")
            .expect("web exists");
        assert_eq!(detail.get("status"), Some("running"));
        drop(client);
        let _ = daemon.join();
    }

    #[test]
    fn status_snapshot_is_decoded() {
        let (endpoint, daemon) = serve(vec![json!({
            "status": "ok",
            "payload": {"web": {"name": "web", "pid": 7, "status": "running"}}
        })
        .to_string()]);
        let mut client = client(&endpoint);
        let snapshot = client.query_all_status().expect("status");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("web").and_then(|proc| proc.pid), Some(7));
        drop(client);
        let _ = daemon.join();
    }

    #[test]
    fn closed_connection_is_reported() {
        let (endpoint, daemon) = serve(Vec::new());
        let mut client = client(&endpoint);
        let _ = daemon.join();
        let error = client.save_all().expect_err("daemon went away");
        assert!(matches!(
            error,
            ClientError::ConnectionClosed { .. }
                | ClientError::SendRequest { .. }
                | ClientError::ReadResponse { .. }
        ));
    }

    #[test]
    fn malformed_response_is_a_parse_failure() {
        let (endpoint, daemon) = serve(vec![String::from("not json")]);
        let mut client = client(&endpoint);
        let error = client.save_all().expect_err("garbage response");
        assert!(matches!(error, ClientError::ParseResponse { .. }));
        drop(client);
        let _ = daemon.join();
    }
}
