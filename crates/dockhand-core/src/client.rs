//! Engine API client, one socket connection per request.
//!
//! Combines the [`transport`](crate::transport) and the
//! [`http`](crate::http) codec into `get`/`post`/`delete` helpers that
//! return a typed [`Response`] or a structured [`ClientError`]. The client
//! holds only its endpoint configuration, so it is cheap to clone and safe
//! to use from concurrent tasks.

use std::io;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::debug;

use dockhand_config::EngineConfig;

use crate::build_info;
use crate::http::{Body, CodecError, Headers, Method, RawResponse, Request, read_response};
use crate::transport::{Endpoint, TransportError};

/// Errors from the API client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("failed to write request: {0}")]
    Io(#[from] io::Error),

    #[error("engine returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[error("request to {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },
}

impl ClientError {
    /// HTTP status carried by an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The engine's JSON error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Optional headers, query parameters and body for a request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    body: Option<Body>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn raw(mut self, text: impl Into<String>) -> Self {
        self.body = Some(Body::Raw(text.into()));
        self
    }

    pub(crate) fn into_request(self, method: Method, path: &str) -> Request {
        Request {
            method,
            path: path.to_string(),
            headers: self.headers,
            params: self.params,
            body: self.body,
        }
    }
}

/// A decoded engine response.
///
/// `body` is `None` for 204/304 and for empty 2xx bodies.
#[derive(Debug, Clone)]
pub struct Response<T = Value> {
    pub status: u16,
    pub headers: Headers,
    pub body: Option<T>,
}

impl<T> Response<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }
}

/// Client for the engine's HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    endpoint: Endpoint,
    user_agent: String,
    timeout: Option<Duration>,
}

impl ApiClient {
    /// Create a client for the given endpoint with the default user agent
    /// and no timeout.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            user_agent: build_info::USER_AGENT.to_string(),
            timeout: None,
        }
    }

    /// Create a client from the `[engine]` configuration section.
    pub fn from_config(config: &EngineConfig) -> Self {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self {
            endpoint: Endpoint::from_config(config),
            user_agent: config.user_agent.clone(),
            timeout,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Bound every round trip (connect, write, read) by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `GET path`, decoding a success body as `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOptions,
    ) -> Result<Response<T>, ClientError> {
        self.request(opts.into_request(Method::Get, path)).await
    }

    /// `POST path`.
    pub async fn post(&self, path: &str, opts: RequestOptions) -> Result<Response, ClientError> {
        self.request(opts.into_request(Method::Post, path)).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str, opts: RequestOptions) -> Result<Response, ClientError> {
        self.request(opts.into_request(Method::Delete, path)).await
    }

    /// Send one request over a fresh connection and decode the response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<Response<T>, ClientError> {
        let path = request.path.clone();
        debug!(method = %request.method, target = %request.target(), "engine request");

        let raw = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.round_trip(request))
                .await
                .map_err(|_| ClientError::Timeout {
                    path: path.clone(),
                    timeout,
                })??,
            None => self.round_trip(request).await?,
        };

        debug!(status = raw.status, path = %path, bytes = raw.body.len(), "engine response");
        decode(&path, raw)
    }

    async fn round_trip(&self, request: Request) -> Result<RawResponse, ClientError> {
        let wire = request.with_content_headers().serialize(&self.user_agent);

        let conn = self.endpoint.connect().await?;
        let mut stream = BufReader::new(conn);
        stream.write_all(wire.as_bytes()).await?;
        stream.flush().await?;

        // On error the connection is dropped, which closes it.
        let raw = read_response(&mut stream).await?;
        stream.into_inner().close().await;
        Ok(raw)
    }
}

/// Turn a framed response into a typed one.
///
/// 2xx bodies are JSON-decoded, 204 and 304 have no body, and every other
/// status becomes [`ClientError::Api`] carrying the engine's `message`.
fn decode<T: DeserializeOwned>(path: &str, raw: RawResponse) -> Result<Response<T>, ClientError> {
    let RawResponse {
        status,
        reason,
        headers,
        body,
        ..
    } = raw;

    match status {
        204 | 304 => Ok(Response {
            status,
            headers,
            body: None,
        }),
        200..=299 => {
            let decoded = if body.iter().all(u8::is_ascii_whitespace) {
                None
            } else {
                let value = serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
                    path: path.to_string(),
                    source,
                })?;
                Some(value)
            };
            Ok(Response {
                status,
                headers,
                body: decoded,
            })
        }
        _ => Err(ClientError::Api {
            status,
            message: error_message(&body, &reason),
        }),
    }
}

fn error_message(body: &[u8], reason: &str) -> String {
    if let Ok(err) = serde_json::from_slice::<ErrorBody>(body) {
        return err.message;
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        reason.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::UnixListener;
    use tokio::task::JoinHandle;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            proto: "HTTP/1.1".to_string(),
            status,
            reason: "Reason".to_string(),
            headers: Headers::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    /// Accept one connection, capture the request head, reply with `reply`.
    fn serve_once(reply: &'static str) -> (TempDir, PathBuf, JoinHandle<String>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut stream = BufReader::new(stream);
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if stream.read_line(&mut line).await.unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            stream.get_mut().write_all(reply.as_bytes()).await.unwrap();
            stream.get_mut().shutdown().await.ok();
            head
        });
        (dir, path, handle)
    }

    #[test]
    fn test_decode_success_body() {
        let resp: Response<Vec<u32>> = decode("/x", raw(200, "[1,2]")).unwrap();
        assert_eq!(resp.body, Some(vec![1, 2]));
        assert!(resp.is_success());
    }

    #[test]
    fn test_decode_no_content() {
        let resp: Response = decode("/x", raw(204, "")).unwrap();
        assert!(resp.body.is_none());
        let resp: Response = decode("/x", raw(304, "")).unwrap();
        assert_eq!(resp.status, 304);
        assert!(!resp.is_success());
    }

    #[test]
    fn test_decode_empty_success_body() {
        let resp: Response = decode("/x", raw(201, "  \r\n")).unwrap();
        assert!(resp.body.is_none());
    }

    #[test]
    fn test_decode_api_error_message() {
        let err = decode::<Value>("/x", raw(404, r#"{"message":"No such container: web"}"#))
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "engine returned 404: No such container: web");
    }

    #[test]
    fn test_decode_non_json_error_body() {
        let err = decode::<Value>("/x", raw(500, "page not found\n")).unwrap_err();
        assert!(matches!(err, ClientError::Api { message, .. } if message == "page not found"));
        let err = decode::<Value>("/x", raw(503, "")).unwrap_err();
        assert!(matches!(err, ClientError::Api { message, .. } if message == "Reason"));
    }

    #[test]
    fn test_decode_bad_json() {
        let err = decode::<Vec<u32>>("/images/json", raw(200, "{not json")).unwrap_err();
        assert!(matches!(err, ClientError::Decode { path, .. } if path == "/images/json"));
    }

    #[test]
    fn test_default_user_agent_matches_config() {
        let configured = ApiClient::from_config(&EngineConfig::default());
        let direct = ApiClient::new(Endpoint::default());
        assert_eq!(configured.user_agent(), direct.user_agent());
    }

    #[test]
    fn test_from_config() {
        let mut config = EngineConfig::default();
        config.timeout_secs = 5;
        config.user_agent = "Docker-Client/25.0.3".to_string();
        let client = ApiClient::from_config(&config);
        assert_eq!(client.user_agent(), "Docker-Client/25.0.3");
        assert_eq!(client.timeout, Some(Duration::from_secs(5)));
        assert_eq!(client.endpoint(), &Endpoint::default());

        config.timeout_secs = 0;
        assert_eq!(ApiClient::from_config(&config).timeout, None);
    }

    #[tokio::test]
    async fn test_get_over_unix_socket() {
        let (_dir, path, server) =
            serve_once("HTTP/1.1 200OK\r\nContent-Length: 2\r\n\r\n55\r\n");
        let client = ApiClient::new(Endpoint::unix(&path)).with_user_agent("test-agent");

        let resp: Response<u32> = client
            .get("/test", RequestOptions::new().header("k", "v").param("p", "v"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, Some(55));

        let head = server.await.unwrap();
        assert_eq!(
            head,
            "GET /test?p=v HTTP/1.1\r\nHost: localhost\r\nk: v\r\nUser-Agent: test-agent\r\n"
        );
    }

    #[tokio::test]
    async fn test_post_with_json_body_sets_content_headers() {
        let (_dir, path, server) = serve_once("HTTP/1.1 204 No Content\r\n\r\n");
        let client = ApiClient::new(Endpoint::unix(&path)).with_user_agent("ua");

        let resp = client
            .post("/containers/create", RequestOptions::new().json(json!({"Image": "alpine"})))
            .await
            .unwrap();
        assert_eq!(resp.status, 204);

        let head = server.await.unwrap();
        assert!(head.starts_with("POST /containers/create HTTP/1.1\r\n"));
        assert!(head.contains("Content-Type: application/json\r\n"));
        assert!(head.contains("Content-Length: 18\r\n"));
    }

    #[tokio::test]
    async fn test_delete_api_error() {
        let (_dir, path, _server) = serve_once(
            "HTTP/1.1 409 Conflict\r\nContent-Type: application/json\r\nContent-Length: 37\r\n\r\n{\"message\":\"image is being used...\"}\n",
        );
        let client = ApiClient::new(Endpoint::unix(&path));
        let err = client
            .delete("/images/alpine", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api { status: 409, ref message } if message == "image is being used..."
        ));
    }

    #[tokio::test]
    async fn test_framing_error_propagates() {
        let (_dir, path, _server) = serve_once("HTTP/1.1 500 Internal Server Error\r\n\r\n");
        let client = ApiClient::new(Endpoint::unix(&path));
        let err = client.post("/x", RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::Codec(CodecError::UnknownFraming)));
    }

    #[tokio::test]
    async fn test_missing_socket_propagates() {
        let client = ApiClient::new(Endpoint::unix("/tmp/nonexistent-dockhand.sock"));
        let err = client.post("/x", RequestOptions::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::SocketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slow.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client =
            ApiClient::new(Endpoint::unix(&path)).with_timeout(Duration::from_millis(50));
        let err = client.post("/x", RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
    }
}
