//! Fake engine daemon.
//!
//! [`FakeDaemon`] listens on a Unix socket in a temporary directory, answers
//! each connection with a canned raw HTTP response chosen by method and path,
//! and records every request it receives. One request per connection,
//! matching the client.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dockhand_core::{ApiClient, CommandRunner, Endpoint, Engine};
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

/// A request as seen by the fake daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string, still percent-encoded.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split_once('?').map_or(&self.target, |(p, _)| p)
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct Route {
    method: String,
    pattern: String,
    response: String,
}

impl Route {
    /// Patterns containing `?` match the full target, others the path.
    fn matches(&self, request: &RecordedRequest) -> bool {
        if self.method != request.method {
            return false;
        }
        if self.pattern.contains('?') {
            self.pattern == request.target
        } else {
            self.pattern == request.path()
        }
    }
}

type Shared<T> = Arc<Mutex<Vec<T>>>;

/// A test-scoped engine daemon on a temporary Unix socket.
///
/// The socket directory is deleted and the accept loop aborted when this
/// value is dropped.
pub struct FakeDaemon {
    socket_path: PathBuf,
    routes: Shared<Route>,
    requests: Shared<RecordedRequest>,
    task: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl FakeDaemon {
    /// Bind a fresh socket and start answering requests.
    pub fn start() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("docker.sock");
        let listener = UnixListener::bind(&socket_path).expect("failed to bind fake daemon");

        let routes: Shared<Route> = Arc::default();
        let requests: Shared<RecordedRequest> = Arc::default();

        let task = tokio::spawn({
            let routes = Arc::clone(&routes);
            let requests = Arc::clone(&requests);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = Arc::clone(&routes);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        if let Err(e) = handle(stream, &routes, &requests).await {
                            tracing::debug!(error = %e, "fake daemon connection failed");
                        }
                    });
                }
            }
        });

        Self {
            socket_path,
            routes,
            requests,
            task,
            _temp_dir: temp_dir,
        }
    }

    /// Answer `method pattern` with `response`. Later routes win over
    /// earlier ones with the same pattern.
    pub fn route(&self, method: &str, pattern: &str, response: impl Into<String>) -> &Self {
        self.routes.lock().expect("routes poisoned").push(Route {
            method: method.to_string(),
            pattern: pattern.to_string(),
            response: response.into(),
        });
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(Endpoint::unix(&self.socket_path)).with_user_agent("dockhand-test")
    }

    /// An engine talking to this daemon and running processes through
    /// `runner`.
    pub fn engine(&self, runner: Arc<dyn CommandRunner>) -> Engine {
        Engine::new(self.client()).with_runner(runner)
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests poisoned").clone()
    }

    /// Requests whose path equals `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    stream: UnixStream,
    routes: &Shared<Route>,
    requests: &Shared<RecordedRequest>,
) -> std::io::Result<()> {
    let mut stream = BufReader::new(stream);

    let mut line = String::new();
    stream.read_line(&mut line).await?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        line.clear();
        if stream.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((k, v)) = trimmed.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await?;

    let request = RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let response = routes
        .lock()
        .expect("routes poisoned")
        .iter()
        .rev()
        .find(|route| route.matches(&request))
        .map(|route| route.response.clone())
        .unwrap_or_else(|| {
            json_response(
                404,
                &serde_json::json!({"message": format!("no route for {} {}", request.method, request.target)}),
            )
        });
    requests.lock().expect("requests poisoned").push(request);

    let stream = stream.get_mut();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        299 => "Custom Success",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        304 => "Not Modified",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A response with a JSON body and `Content-Length` framing.
pub fn json_response(status: u16, body: &Value) -> String {
    let body = body.to_string();
    format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        reason(status),
        body.len()
    )
}

/// A response with a JSON body split into the given chunks.
pub fn chunked_response(status: u16, chunks: &[&str]) -> String {
    let mut out = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n",
        reason(status)
    );
    for chunk in chunks {
        out.push_str(&format!("{:x}\r\n{chunk}\r\n", chunk.len()));
    }
    out.push_str("0\r\n\r\n");
    out
}

/// A response without a body. 204 and 304 carry no framing headers; other
/// statuses get `Content-Length: 0`.
pub fn empty_response(status: u16) -> String {
    match status {
        204 | 304 => format!("HTTP/1.1 {status} {}\r\n\r\n", reason(status)),
        _ => format!(
            "HTTP/1.1 {status} {}\r\nContent-Length: 0\r\n\r\n",
            reason(status)
        ),
    }
}
