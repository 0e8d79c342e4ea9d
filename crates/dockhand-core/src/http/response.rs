//! Response parsing: status line, headers, then a body framed by
//! `Transfer-Encoding: chunked` or `Content-Length`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::CodecError;

/// Longest status or header line accepted.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Response headers in arrival order, looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn append_to_last(&mut self, continuation: &str) -> bool {
        match self.0.last_mut() {
            Some((_, value)) => {
                value.push(' ');
                value.push_str(continuation);
                true
            }
            None => false,
        }
    }
}

/// A framed but undecoded HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub proto: String,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Read one complete response from `reader`.
pub async fn read_response<R>(reader: &mut R) -> Result<RawResponse, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?.ok_or(CodecError::UnexpectedEof)?;
    let (proto, status, reason) = parse_status_line(&line)?;

    let headers = read_headers(reader).await?;

    let chunked = headers
        .get("transfer-encoding")
        .is_some_and(|te| te.trim_start().to_ascii_lowercase().starts_with("chunked"));

    let body = if chunked {
        read_chunked_body(reader).await?
    } else if let Some(length) = headers.get("content-length") {
        let length: u64 = length
            .trim()
            .parse()
            .map_err(|_| CodecError::InvalidContentLength(length.to_string()))?;
        read_exact_body(reader, length).await?
    } else if status == 204 || status == 304 {
        Vec::new()
    } else {
        return Err(CodecError::UnknownFraming);
    };

    Ok(RawResponse {
        proto,
        status,
        reason,
        headers,
        body,
    })
}

/// Split `HTTP/1.1 200 OK` into protocol, code and reason. The separator
/// after the code is optional (`HTTP/1.1 200OK` is accepted).
fn parse_status_line(line: &str) -> Result<(String, u16, String), CodecError> {
    let malformed = || CodecError::MalformedStatusLine(line.to_string());

    let mut parts = line.splitn(3, ' ');
    let proto = parts.next().unwrap_or_default();
    if !proto.starts_with("HTTP/") {
        return Err(malformed());
    }
    let code_part = parts.next().unwrap_or_default();
    let digits = code_part.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(malformed());
    }
    let status = code_part[..digits].parse::<u16>().map_err(|_| malformed())?;
    let reason = parts.next().unwrap_or(&code_part[digits..]).trim();

    Ok((proto.to_string(), status, reason.to_string()))
}

async fn read_headers<R>(reader: &mut R) -> Result<Headers, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = Headers::new();
    loop {
        let line = read_line(reader).await?.ok_or(CodecError::UnexpectedEof)?;
        if line.is_empty() {
            return Ok(headers);
        }
        if line.starts_with([' ', '\t']) {
            if !headers.append_to_last(line.trim()) {
                return Err(CodecError::MalformedHeader(line));
            }
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                headers.insert(name.trim(), value.trim());
            }
            _ => return Err(CodecError::MalformedHeader(line)),
        }
    }
}

async fn read_chunked_body<R>(reader: &mut R) -> Result<Vec<u8>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    loop {
        let line = read_line(reader).await?.ok_or(CodecError::UnexpectedEof)?;
        let size_field = line.split(';').next().unwrap_or_default().trim();
        let size = u64::from_str_radix(size_field, 16)
            .map_err(|_| CodecError::InvalidChunkSize(line.clone()))?;

        if size == 0 {
            // Trailer section ends with a blank line.
            loop {
                let trailer = read_line(reader).await?.ok_or(CodecError::UnexpectedEof)?;
                if trailer.is_empty() {
                    return Ok(body);
                }
            }
        }

        let read = (&mut *reader).take(size).read_to_end(&mut body).await?;
        if (read as u64) < size {
            return Err(CodecError::UnexpectedEof);
        }

        let mut terminator = [0u8; 2];
        reader
            .read_exact(&mut terminator)
            .await
            .map_err(CodecError::from_read)?;
        if &terminator != b"\r\n" {
            return Err(CodecError::MissingChunkTerminator);
        }
    }
}

async fn read_exact_body<R>(reader: &mut R, length: u64) -> Result<Vec<u8>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    let read = (&mut *reader).take(length).read_to_end(&mut body).await?;
    if (read as u64) < length {
        return Err(CodecError::UnexpectedEof);
    }
    Ok(body)
}

/// Read one CRLF- or LF-terminated line without its terminator.
///
/// Returns `None` if the stream ends before a full line arrives.
async fn read_line<R>(reader: &mut R) -> Result<Option<String>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = MAX_LINE_BYTES as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if buf.last() != Some(&b'\n') {
        if read as u64 >= limit {
            return Err(CodecError::LineTooLong(MAX_LINE_BYTES));
        }
        return Ok(None);
    }
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn parse(wire: &str) -> Result<RawResponse, CodecError> {
        let mut reader = wire.as_bytes();
        read_response(&mut reader).await
    }

    #[tokio::test]
    async fn test_content_length_body() {
        let resp = parse("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n55\r\n")
            .await
            .unwrap();
        assert_eq!(resp.proto, "HTTP/1.1");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.body, b"55");
    }

    #[tokio::test]
    async fn test_status_without_reason_separator() {
        let resp = parse("HTTP/1.1 200OK\r\nContent-Length: 2\r\n\r\n55\r\n")
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
    }

    #[tokio::test]
    async fn test_chunked_body() {
        let wire = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r\n0\r\n\r\n";
        let resp = parse(wire).await.unwrap();
        assert_eq!(
            String::from_utf8(resp.body).unwrap(),
            "Wikipedia in\r\n\r\nchunks."
        );
    }

    #[tokio::test]
    async fn test_chunked_takes_precedence_over_content_length() {
        let wire = "HTTP/1.1 200 OK\r\nContent-Length: 99\r\nTransfer-Encoding: chunked\r\n\r\n2\r\n[]\r\n0\r\n\r\n";
        let resp = parse(wire).await.unwrap();
        assert_eq!(resp.body, b"[]");
    }

    #[tokio::test]
    async fn test_chunk_extensions_and_trailers() {
        let wire = "HTTP/1.1 200 OK\r\ntransfer-encoding: Chunked\r\n\r\n3;name=value\r\nabc\r\n0\r\nX-Trailer: 1\r\n\r\n";
        let resp = parse(wire).await.unwrap();
        assert_eq!(resp.body, b"abc");
    }

    #[tokio::test]
    async fn test_invalid_chunk_size() {
        let wire = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nabc\r\n0\r\n\r\n";
        assert!(matches!(
            parse(wire).await,
            Err(CodecError::InvalidChunkSize(line)) if line == "zz"
        ));
    }

    #[tokio::test]
    async fn test_missing_chunk_terminator() {
        let wire = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabcXY0\r\n\r\n";
        assert!(matches!(
            parse(wire).await,
            Err(CodecError::MissingChunkTerminator)
        ));
    }

    #[tokio::test]
    async fn test_truncated_chunk() {
        let wire = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\na\r\nabc";
        assert!(matches!(parse(wire).await, Err(CodecError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_eof_before_status_line() {
        assert!(matches!(parse("").await, Err(CodecError::UnexpectedEof)));
        assert!(matches!(
            parse("HTTP/1.1 200 OK").await,
            Err(CodecError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_eof_inside_headers() {
        assert!(matches!(
            parse("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n").await,
            Err(CodecError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_short_content_length_body() {
        assert!(matches!(
            parse("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n55").await,
            Err(CodecError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_invalid_content_length() {
        assert!(matches!(
            parse("HTTP/1.1 200 OK\r\nContent-Length: two\r\n\r\n55").await,
            Err(CodecError::InvalidContentLength(_))
        ));
    }

    #[tokio::test]
    async fn test_no_content_statuses_need_no_framing() {
        let resp = parse("HTTP/1.1 204 No Content\r\n\r\n").await.unwrap();
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_empty());

        let resp = parse("HTTP/1.1 304 Not Modified\r\nServer: Docker\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(resp.status, 304);
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_framing() {
        let err = parse("HTTP/1.1 404 Not Found\r\n\r\n{}").await.unwrap_err();
        assert!(matches!(err, CodecError::UnknownFraming));
        assert_eq!(err.to_string(), "unknown content-length or chunked");
    }

    #[tokio::test]
    async fn test_malformed_status_line() {
        assert!(matches!(
            parse("SSH-2.0-OpenSSH\r\n\r\n").await,
            Err(CodecError::MalformedStatusLine(_))
        ));
        assert!(matches!(
            parse("HTTP/1.1 OK\r\n\r\n").await,
            Err(CodecError::MalformedStatusLine(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_header() {
        assert!(matches!(
            parse("HTTP/1.1 204 No Content\r\nnot a header\r\n\r\n").await,
            Err(CodecError::MalformedHeader(_))
        ));
    }

    #[tokio::test]
    async fn test_headers_case_insensitive_and_folded() {
        let wire = "HTTP/1.1 204 No Content\r\nApi-Version: 1.45\r\nX-Long: first\r\n  second\r\n\r\n";
        let resp = parse(wire).await.unwrap();
        assert_eq!(resp.headers.get("api-version"), Some("1.45"));
        assert_eq!(resp.headers.get("X-LONG"), Some("first second"));
        assert_eq!(resp.headers.len(), 2);
    }

    #[tokio::test]
    async fn test_bare_lf_line_endings() {
        let resp = parse("HTTP/1.1 200 OK\nContent-Length: 4\n\ntrue").await.unwrap();
        assert_eq!(resp.body, b"true");
    }

    #[tokio::test]
    async fn test_overlong_line_rejected() {
        let wire = format!("HTTP/1.1 200 OK\r\nX: {}\r\n\r\n", "a".repeat(MAX_LINE_BYTES + 10));
        assert!(matches!(
            parse(&wire).await,
            Err(CodecError::LineTooLong(_))
        ));
    }
}
