//! HTTP message types
//!
//! This module defines the request line and the fully parsed request.

use super::Headers;
use bytes::Bytes;
use std::fmt;

/// Parsed request line
///
/// Format: METHOD SP TARGET SP HTTP/VERSION
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: String,
    target: String,
    http_version: String,
}

impl RequestLine {
    pub(crate) fn new(
        method: impl Into<String>,
        target: impl Into<String>,
        http_version: impl Into<String>,
    ) -> Self {
        RequestLine {
            method: method.into(),
            target: target.into(),
            http_version: http_version.into(),
        }
    }

    /// Get the request method, e.g. `GET`
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get the request target, e.g. `/coffee`
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Get the version number without the `HTTP/` prefix, e.g. `1.1`
    pub fn http_version(&self) -> &str {
        &self.http_version
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} HTTP/{}", self.method, self.target, self.http_version)
    }
}

/// HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    request_line: RequestLine,
    headers: Headers,
    body: Bytes,
}

impl Request {
    pub(crate) fn new(request_line: RequestLine, headers: Headers, body: Bytes) -> Self {
        Request {
            request_line,
            headers,
            body,
        }
    }

    /// Get the request line
    pub fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    /// Get the request method
    pub fn method(&self) -> &str {
        self.request_line.method()
    }

    /// Get the request target
    pub fn target(&self) -> &str {
        self.request_line.target()
    }

    /// Get the HTTP version number
    pub fn http_version(&self) -> &str {
        self.request_line.http_version()
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the request and return its parts
    pub fn into_parts(self) -> (RequestLine, Headers, Bytes) {
        (self.request_line, self.headers, self.body)
    }
}
