//! Socket transport with one fresh connection per request.
//!
//! The engine API is normally reached over a Unix domain socket. A TCP
//! endpoint is supported for tests and for engines exposed on a local
//! port. There is no pooling: a [`Connection`] lives for exactly one
//! request/response cycle and is closed when dropped.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpStream, UnixStream};
use tracing::trace;

use dockhand_config::{DEFAULT_SOCKET_PATH, EngineConfig};

/// Errors from establishing a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("engine socket not found at {0} (is the daemon running?)")]
    SocketNotFound(PathBuf),

    #[error("failed to connect to engine at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: io::Error,
    },
}

/// Where the engine's HTTP API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain socket path.
    Unix(PathBuf),
    /// TCP host and port.
    Tcp { host: String, port: u16 },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Unix(PathBuf::from(DEFAULT_SOCKET_PATH))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
        }
    }
}

impl Endpoint {
    /// Unix socket endpoint at the given path.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Endpoint::Unix(path.into())
    }

    /// TCP endpoint at the given host and port.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Resolve the endpoint selected by the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        if config.is_tcp() {
            Endpoint::tcp(config.tcp_host.clone(), config.tcp_port)
        } else {
            Endpoint::unix(&config.socket_path)
        }
    }

    /// Open a brand-new connection to the endpoint. No retries.
    pub async fn connect(&self) -> Result<Connection, TransportError> {
        trace!(endpoint = %self, "connecting");
        match self {
            Endpoint::Unix(path) => {
                if !path.exists() {
                    return Err(TransportError::SocketNotFound(path.clone()));
                }
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(|source| self.connect_error(source))?;
                Ok(Connection::Unix(stream))
            }
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|source| self.connect_error(source))?;
                Ok(Connection::Tcp(stream))
            }
        }
    }

    fn connect_error(&self, source: io::Error) -> TransportError {
        TransportError::Connect {
            endpoint: self.to_string(),
            source,
        }
    }
}

/// A single-use connection to the engine.
///
/// The descriptor is released when the value is dropped, so every exit
/// path (including parse errors) closes it.
#[derive(Debug)]
pub enum Connection {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Connection {
    /// Shut down the write half and release the connection.
    pub async fn close(mut self) {
        if let Err(e) = self.shutdown().await {
            trace!(error = %e, "connection shutdown failed");
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Unix(s) => Pin::new(s).poll_read(cx, buf),
            Connection::Tcp(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Unix(s) => Pin::new(s).poll_write(cx, buf),
            Connection::Tcp(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Unix(s) => Pin::new(s).poll_flush(cx),
            Connection::Tcp(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Unix(s) => Pin::new(s).poll_shutdown(cx),
            Connection::Tcp(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, UnixListener};

    #[test]
    fn test_default_endpoint_is_docker_socket() {
        assert_eq!(
            Endpoint::default(),
            Endpoint::Unix(PathBuf::from("/var/run/docker.sock"))
        );
    }

    #[test]
    fn test_endpoint_from_config() {
        let mut config = EngineConfig::default();
        config.socket_path = "/tmp/engine.sock".to_string();
        assert_eq!(Endpoint::from_config(&config), Endpoint::unix("/tmp/engine.sock"));

        config.transport = "tcp".to_string();
        config.tcp_host = "localhost".to_string();
        config.tcp_port = 2375;
        assert_eq!(Endpoint::from_config(&config), Endpoint::tcp("localhost", 2375));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::unix("/a.sock").to_string(), "unix:///a.sock");
        assert_eq!(Endpoint::tcp("h", 1).to_string(), "tcp://h:1");
    }

    #[tokio::test]
    async fn test_missing_socket_is_reported() {
        let endpoint = Endpoint::unix("/tmp/nonexistent-dockhand-engine.sock");
        let result = endpoint.connect().await;
        assert!(matches!(result, Err(TransportError::SocketNotFound(_))));
    }

    #[tokio::test]
    async fn test_unix_connection_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(&buf).await.unwrap();
        });

        let mut conn = Endpoint::unix(&path).connect().await.unwrap();
        conn.write_all(b"ping").await.unwrap();
        let mut echoed = [0u8; 4];
        conn.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"ping");
        conn.close().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"ok").await.unwrap();
        });

        let mut conn = Endpoint::tcp("127.0.0.1", port).connect().await.unwrap();
        let mut buf = Vec::new();
        conn.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"ok");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_connection_refused() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = Endpoint::tcp("127.0.0.1", port).connect().await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
