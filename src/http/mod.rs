//! HTTP/1.1 request parsing
//!
//! This module turns a stream of byte chunks into a single parsed request.
//! Nothing here assumes that a read lines up with a request line, a header,
//! or the body: every sub-parser works on whatever has been buffered so far
//! and reports how much of it could be used.
//!
//! # Architecture
//!
//! - [`Headers`] stores header fields and parses one header line at a time
//! - [`parse_request_line`] validates `METHOD SP TARGET SP HTTP/1.1`
//! - [`BodyAccumulator`] tracks body bytes against `content-length`
//! - [`RequestParser`] owns the buffer and the current phase, and drives the
//!   sub-parsers until no more progress can be made
//! - [`request_from_reader`] reads chunks from any `std::io::Read` and feeds
//!   the parser until the request is complete or the stream ends
//!
//! # Examples
//!
//! ```
//! use httpfromtcp::http::request_from_reader;
//!
//! let raw: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost:42069\r\n\r\n";
//! let request = request_from_reader(raw).unwrap();
//!
//! assert_eq!(request.method(), "GET");
//! assert_eq!(request.target(), "/");
//! assert_eq!(request.headers().get("Host"), Some("localhost:42069"));
//! ```

pub mod body;
pub mod headers;
pub mod message;
pub mod parser;
pub mod server;
pub mod session;

pub use body::BodyAccumulator;
pub use headers::Headers;
pub use message::{Request, RequestLine};
pub use parser::{
    parse_request_line, request_from_reader, request_from_reader_with_config, ParserConfig,
    Phase, RequestParser,
};
pub use server::HttpServer;
pub use session::{HttpSession, SessionOps};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP parsing errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] crate::net::Error),

    #[error("Invalid request line: expected 3 parts, got {0}")]
    InvalidRequestLine(usize),

    #[error("Invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    #[error("Invalid request target: {0:?} must start with '/'")]
    InvalidTarget(String),

    #[error("Invalid HTTP version: {0:?}")]
    InvalidVersion(String),

    #[error("Unsupported HTTP version: {0:?}, only 1.1 is accepted")]
    UnsupportedVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid character in header name: {0:?}")]
    InvalidHeaderChar(char),

    #[error("Stream ended while parsing {0}")]
    IncompleteHead(Phase),

    #[error("Request not finished: parser is still in {0}")]
    Unfinished(Phase),

    #[error("Invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("Too much data sent: body is {received} bytes, content-length is {declared}")]
    BodyTooLong { declared: usize, received: usize },

    #[error("Body shorter than content-length: got {received} bytes, expected {declared}")]
    BodyTooShort { declared: usize, received: usize },

    #[error("Timeout")]
    Timeout,

    #[error("Parser already failed")]
    Poisoned,
}

impl Error {
    /// Returns true for malformed request lines and headers
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequestLine(_)
                | Error::InvalidMethod(_)
                | Error::InvalidTarget(_)
                | Error::InvalidVersion(_)
                | Error::UnsupportedVersion(_)
                | Error::InvalidHeader(_)
                | Error::InvalidHeaderChar(_)
                | Error::IncompleteHead(_)
        )
    }

    /// Returns true for body length violations
    pub fn is_length(&self) -> bool {
        matches!(
            self,
            Error::InvalidContentLength(_) | Error::BodyTooLong { .. } | Error::BodyTooShort { .. }
        )
    }
}

/// Default port the listener binds to
pub const DEFAULT_PORT: u16 = 42069;

/// CRLF line ending
pub const CRLF: &[u8] = b"\r\n";

/// Find the next CRLF in a buffer
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
