//! Request serialization.

use std::fmt;

use serde_json::Value;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// JSON value, written compactly. Empty objects, empty arrays and
    /// `null` are written as an empty body.
    Json(Value),
    /// Text written verbatim.
    Raw(String),
}

impl Body {
    /// Render the payload as it appears on the wire.
    pub fn render(&self) -> String {
        match self {
            Body::Json(Value::Null) => String::new(),
            Body::Json(Value::Object(map)) if map.is_empty() => String::new(),
            Body::Json(Value::Array(items)) if items.is_empty() => String::new(),
            Body::Json(value) => value.to_string(),
            Body::Raw(text) => text.clone(),
        }
    }

    fn is_json(&self) -> bool {
        matches!(self, Body::Json(_))
    }
}

/// An HTTP/1.1 request to the engine.
///
/// Headers and query parameters keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl Request {
    /// A `GET` request for the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Path plus the URL-encoded query string, if any.
    pub fn target(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Add `Content-Type`/`Content-Length` for a non-empty body so a real
    /// server reads it. [`Request::serialize`] never adds them itself.
    pub fn with_content_headers(mut self) -> Self {
        let Some(body) = &self.body else {
            return self;
        };
        let rendered = body.render();
        if rendered.is_empty() {
            return self;
        }
        let is_json = body.is_json();
        if is_json && !self.has_header("content-type") {
            self.headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if !self.has_header("content-length") {
            self.headers
                .push(("Content-Length".to_string(), rendered.len().to_string()));
        }
        self
    }

    /// Serialize to the HTTP/1.1 wire format.
    ///
    /// `Host: localhost` comes first, then caller headers in insertion
    /// order, then `User-Agent` unless the caller set one. When a body is
    /// present it follows the blank line and is terminated by CRLF.
    pub fn serialize(&self, user_agent: &str) -> String {
        let mut out = format!("{} {} HTTP/1.1\r\nHost: localhost\r\n", self.method, self.target());
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        if !self.has_header("user-agent") {
            out.push_str("User-Agent: ");
            out.push_str(user_agent);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        if let Some(body) = &self.body {
            out.push_str(&body.render());
            out.push_str("\r\n");
        }
        out
    }
}
