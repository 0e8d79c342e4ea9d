//! HTTP/1.1 message codec for the engine API.
//!
//! No general-purpose HTTP client sits between us and the engine socket,
//! so requests are written and responses framed here:
//!
//! ```text
//!  Request ──serialize()──▶ "GET /images/json HTTP/1.1\r\n..." ──▶ socket
//!                                                                   │
//!  RawResponse ◀──read_response()── status line, headers, body ◀────┘
//!                                   (chunked | content-length | none)
//! ```

pub mod request;
pub mod response;

pub use request::{Body, Method, Request};
pub use response::{Headers, RawResponse, read_response};

/// Framing and parse errors while reading a response.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of stream while reading response")]
    UnexpectedEof,

    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("response line longer than {0} bytes")]
    LineTooLong(usize),

    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    #[error("invalid chunk size line: {0:?}")]
    InvalidChunkSize(String),

    #[error("chunk data not terminated by CRLF")]
    MissingChunkTerminator,

    #[error("unknown content-length or chunked")]
    UnknownFraming,

    #[error("I/O error while reading response: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Map a short read to [`CodecError::UnexpectedEof`].
    fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::UnexpectedEof
        } else {
            CodecError::Io(err)
        }
    }
}
