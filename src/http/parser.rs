//! HTTP request parsing
//!
//! This module provides the request-line parser, the incremental request
//! state machine, and a driver that feeds it from any `std::io::Read`.

use super::{find_crlf, BodyAccumulator, Error, Headers, Request, RequestLine, Result, CRLF};
use bytes::{Buf, BytesMut};
use std::fmt;
use std::io::{self, Read};
use tracing::{debug, trace, warn};

/// Default number of bytes requested per read
pub const DEFAULT_CHUNK_SIZE: usize = 8;

/// Default cap on sub-parser calls per pass that consume no input
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// The only protocol accepted in the request line
const PROTOCOL: &str = "HTTP";

/// The only version accepted in the request line
const SUPPORTED_VERSION: &str = "1.1";

/// Parse an HTTP request line from the front of `buf`
///
/// Format: METHOD TARGET HTTP/1.1\r\n
/// Example: GET /index.html HTTP/1.1\r\n
///
/// Returns `(0, None)` if `buf` does not hold a full line yet, otherwise the
/// number of bytes consumed (line plus CRLF) and the validated line.
pub fn parse_request_line(buf: &[u8]) -> Result<(usize, Option<RequestLine>)> {
    let Some(end) = find_crlf(buf) else {
        return Ok((0, None));
    };

    let line = String::from_utf8_lossy(&buf[..end]);
    let parts: Vec<&str> = line.split(' ').collect();
    let &[method, target, version] = parts.as_slice() else {
        return Err(Error::InvalidRequestLine(parts.len()));
    };

    if !target.starts_with('/') {
        return Err(Error::InvalidTarget(target.to_string()));
    }
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(Error::InvalidMethod(method.to_string()));
    }

    let http_version = match version.split_once('/') {
        Some((PROTOCOL, number)) if !number.contains('/') => number,
        _ => return Err(Error::InvalidVersion(version.to_string())),
    };
    if http_version != SUPPORTED_VERSION {
        return Err(Error::UnsupportedVersion(http_version.to_string()));
    }

    Ok((
        end + CRLF.len(),
        Some(RequestLine::new(method, target, http_version)),
    ))
}

/// Parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    chunk_size: usize,
    max_iterations: usize,
}

impl ParserConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        ParserConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the number of bytes requested per read (at least 1)
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the cap on sub-parser calls per pass that consume no input (at least 1)
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Get the read chunk size
    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Get the per-pass iteration cap
    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parser phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    RequestLine,
    Headers,
    Body,
    Done,
    Error,
}

impl Phase {
    /// Returns true for `Done` and `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::RequestLine => "request line",
            Phase::Headers => "headers",
            Phase::Body => "body",
            Phase::Done => "done",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Incremental HTTP request parser
///
/// Bytes are appended with [`feed`](Self::feed) in whatever pieces the
/// transport delivers. Each call runs the sub-parser for the current phase
/// against everything buffered so far and drops the prefix it used, until
/// nothing more can be consumed. [`finish`](Self::finish) signals
/// end-of-input.
#[derive(Debug)]
pub struct RequestParser {
    phase: Phase,
    buffer: BytesMut,
    request_line: Option<RequestLine>,
    headers: Headers,
    body: BodyAccumulator,
    max_iterations: usize,
}

impl RequestParser {
    /// Create a new request parser
    pub fn new() -> Self {
        Self::with_config(&ParserConfig::default())
    }

    /// Create a request parser with the given configuration
    pub fn with_config(config: &ParserConfig) -> Self {
        RequestParser {
            phase: Phase::RequestLine,
            buffer: BytesMut::new(),
            request_line: None,
            headers: Headers::new(),
            body: BodyAccumulator::default(),
            max_iterations: config.max_iterations,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns true once the request is complete
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Bytes received but not yet attributed to any part of the request
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Request line, once parsed
    pub fn request_line(&self) -> Option<&RequestLine> {
        self.request_line.as_ref()
    }

    /// Headers parsed so far
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Feed data to the parser
    ///
    /// Returns the number of bytes consumed from the buffer in this pass.
    /// Bytes that do not complete a line yet stay buffered for the next call.
    /// After the request is done further data is ignored; after a failure
    /// every call returns [`Error::Poisoned`].
    pub fn feed(&mut self, data: &[u8]) -> Result<usize> {
        match self.phase {
            Phase::Done => return Ok(0),
            Phase::Error => return Err(Error::Poisoned),
            Phase::RequestLine | Phase::Headers | Phase::Body => {}
        }

        self.buffer.extend_from_slice(data);
        self.drain()
    }

    /// Signal end-of-input
    ///
    /// Uses whatever is still buffered, then marks the request done and
    /// checks the body against `content-length`. Ending before the blank
    /// line that closes the header block is an error.
    pub fn finish(&mut self) -> Result<()> {
        if self.phase == Phase::Error {
            return Err(Error::Poisoned);
        }
        while self.drain()? > 0 {}

        let result = match self.phase {
            Phase::RequestLine | Phase::Headers => Err(Error::IncompleteHead(self.phase)),
            Phase::Body | Phase::Done => self.body.check_complete(),
            Phase::Error => Err(Error::Poisoned),
        };

        match result {
            Ok(()) => {
                self.phase = Phase::Done;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Consume the parser and return the request
    pub fn into_request(self) -> Result<Request> {
        match self.phase {
            Phase::Done => {}
            Phase::Error => return Err(Error::Poisoned),
            phase @ (Phase::RequestLine | Phase::Headers | Phase::Body) => {
                return Err(Error::Unfinished(phase))
            }
        }

        let Some(request_line) = self.request_line else {
            return Err(Error::Unfinished(Phase::RequestLine));
        };
        Ok(Request::new(request_line, self.headers, self.body.into_bytes()))
    }

    /// Run sub-parsers until one can use nothing more of the buffer
    ///
    /// Steps that consume bytes always shrink the buffer, so they are not
    /// counted. Only steps that consume nothing but still move the phase
    /// count against `max_iterations`.
    fn drain(&mut self) -> Result<usize> {
        let mut total = 0;
        let mut idle = 0;

        loop {
            let phase = self.phase;
            let consumed = match self.step() {
                Ok(n) => n,
                Err(e) => return Err(self.fail(e)),
            };
            total += consumed;

            if self.phase.is_terminal() {
                return Ok(total);
            }
            if consumed > 0 {
                idle = 0;
                continue;
            }
            if self.phase == phase {
                return Ok(total);
            }

            idle += 1;
            if idle >= self.max_iterations {
                warn!(
                    max_iterations = self.max_iterations,
                    buffered = self.buffer.len(),
                    phase = %self.phase,
                    "iteration cap reached without consuming input, deferring"
                );
                return Ok(total);
            }
        }
    }

    fn step(&mut self) -> Result<usize> {
        match self.phase {
            Phase::RequestLine => {
                let (n, line) = parse_request_line(&self.buffer)?;
                if let Some(line) = line {
                    debug!(request_line = %line, "parsed request line");
                    self.request_line = Some(line);
                    self.phase = Phase::Headers;
                }
                self.buffer.advance(n);
                Ok(n)
            }
            Phase::Headers => {
                let (n, done) = self.headers.parse(&self.buffer)?;
                if done {
                    self.body = BodyAccumulator::from_headers(&self.headers)?;
                    debug!(
                        headers = self.headers.len(),
                        content_length = self.body.declared(),
                        "header block complete"
                    );
                    self.phase = Phase::Body;
                }
                self.buffer.advance(n);
                Ok(n)
            }
            Phase::Body => {
                let n = self.buffer.len();
                if n == 0 {
                    return Ok(0);
                }
                let complete = self.body.push(&self.buffer)?;
                self.buffer.advance(n);
                trace!(received = self.body.received(), declared = self.body.declared(), "body bytes");
                if complete {
                    debug!(length = self.body.received(), "body complete");
                    self.phase = Phase::Done;
                }
                Ok(n)
            }
            Phase::Done | Phase::Error => Ok(0),
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        debug!(phase = %self.phase, %error, "request parsing failed");
        self.phase = Phase::Error;
        error
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a complete request from `reader` using the default configuration
pub fn request_from_reader<R: Read>(reader: R) -> Result<Request> {
    request_from_reader_with_config(reader, &ParserConfig::default())
}

/// Read a complete request from `reader`
///
/// Reads at most `config.chunk_size` bytes at a time until the request is
/// done or the reader reports end-of-input (`Ok(0)`).
pub fn request_from_reader_with_config<R: Read>(
    mut reader: R,
    config: &ParserConfig,
) -> Result<Request> {
    let mut parser = RequestParser::with_config(config);
    let mut chunk = vec![0u8; config.chunk_size];

    while !parser.is_done() {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(Error::Timeout),
            Err(e) => return Err(e.into()),
        };

        if n == 0 {
            trace!(phase = %parser.phase(), "end of input");
            parser.finish()?;
            break;
        }

        parser.feed(&chunk[..n])?;
    }

    parser.into_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most `per_read` bytes per call
    struct ChunkReader<'a> {
        data: &'a [u8],
        per_read: usize,
        pos: usize,
    }

    impl<'a> ChunkReader<'a> {
        fn new(data: &'a [u8], per_read: usize) -> Self {
            ChunkReader { data, per_read, pos: 0 }
        }
    }

    impl Read for ChunkReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let end = (self.pos + self.per_read).min(self.data.len());
            let n = (end - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn parse_in_pieces(data: &[u8], per_read: usize) -> Result<Request> {
        request_from_reader(ChunkReader::new(data, per_read))
    }

    #[test]
    fn test_parse_request_line() {
        let (n, line) = parse_request_line(b"GET /index.html HTTP/1.1\r\nHost: x").unwrap();
        let line = line.unwrap();

        assert_eq!(n, 26);
        assert_eq!(line.method(), "GET");
        assert_eq!(line.target(), "/index.html");
        assert_eq!(line.http_version(), "1.1");
    }

    #[test]
    fn test_parse_request_line_incomplete() {
        assert_eq!(parse_request_line(b"GET / HTTP/1.1").unwrap(), (0, None));
        assert_eq!(parse_request_line(b"GET / HTTP/1.1\r").unwrap(), (0, None));
        assert_eq!(parse_request_line(b"").unwrap(), (0, None));
    }

    #[test]
    fn test_parse_request_line_errors() {
        assert!(matches!(
            parse_request_line(b"/coffee HTTP/1.1\r\n"),
            Err(Error::InvalidRequestLine(2))
        ));
        assert!(matches!(
            parse_request_line(b"GET  / HTTP/1.1\r\n"),
            Err(Error::InvalidRequestLine(4))
        ));
        assert!(matches!(
            parse_request_line(b"GET coffee HTTP/1.1\r\n"),
            Err(Error::InvalidTarget(_))
        ));
        assert!(matches!(
            parse_request_line(b"get / HTTP/1.1\r\n"),
            Err(Error::InvalidMethod(_))
        ));
        assert!(matches!(
            parse_request_line(b"GeT / HTTP/1.1\r\n"),
            Err(Error::InvalidMethod(_))
        ));
        assert!(matches!(
            parse_request_line(b"G3T / HTTP/1.1\r\n"),
            Err(Error::InvalidMethod(_))
        ));
        assert!(matches!(
            parse_request_line(b"GET /coffee TCP/1.1\r\n"),
            Err(Error::InvalidVersion(_))
        ));
        assert!(matches!(
            parse_request_line(b"GET / HTTP/1.1/2\r\n"),
            Err(Error::InvalidVersion(_))
        ));
        assert!(matches!(
            parse_request_line(b"GET /coffee HTTP/2.1\r\n"),
            Err(Error::UnsupportedVersion(ref v)) if v == "2.1"
        ));
        assert!(matches!(
            parse_request_line(b"GET / HTTP/1.0\r\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_feed_keeps_partial_header() {
        let mut parser = RequestParser::new();

        let consumed = parser.feed(b"GET / HTTP/1.1\r\nHost: localhost").unwrap();
        assert_eq!(consumed, 16);
        assert_eq!(parser.buffered(), b"Host: localhost");
        assert_eq!(parser.phase(), Phase::Headers);
    }

    #[test]
    fn test_feed_one_header_at_a_time() {
        let mut parser = RequestParser::new();
        parser.feed(b"GET / HTTP/1.1\r\n").unwrap();

        let consumed = parser.feed(b"Host: localhost\r\n Test: al").unwrap();
        assert_eq!(consumed, 17);
        assert_eq!(parser.buffered(), b" Test: al");
        assert_eq!(parser.headers().get("host"), Some("localhost"));
    }

    #[test]
    fn test_feed_split_crlf() {
        let mut parser = RequestParser::new();

        let consumed = parser.feed(b"GET / HTTP/1.1\r\nHost: localhost\r").unwrap();
        assert_eq!(consumed, 16);
        assert_eq!(parser.buffered(), b"Host: localhost\r");

        let consumed = parser.feed(b"\nHost: dylan\r\n\r\n").unwrap();
        assert_eq!(consumed, 32);
        assert!(parser.buffered().is_empty());
        assert_eq!(parser.phase(), Phase::Body);
        assert_eq!(parser.headers().get("host"), Some("localhost, dylan"));
    }

    #[test]
    fn test_feed_after_error_is_poisoned() {
        let mut parser = RequestParser::new();

        assert!(parser.feed(b"get / HTTP/1.1\r\n").is_err());
        assert_eq!(parser.phase(), Phase::Error);
        assert!(matches!(parser.feed(b"more"), Err(Error::Poisoned)));
        assert!(matches!(parser.finish(), Err(Error::Poisoned)));
        assert!(matches!(parser.into_request(), Err(Error::Poisoned)));
    }

    #[test]
    fn test_feed_after_done_is_ignored() {
        let mut parser = RequestParser::new();
        parser
            .feed(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nok")
            .unwrap();

        assert!(parser.is_done());
        assert_eq!(parser.feed(b"ignored").unwrap(), 0);

        let request = parser.into_request().unwrap();
        assert_eq!(request.body(), b"ok");
    }

    #[test]
    fn test_iteration_cap_ignores_progress() {
        let config = ParserConfig::new().max_iterations(1);
        let mut parser = RequestParser::with_config(&config);

        let data = b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n";
        let consumed = parser.feed(data).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(parser.phase(), Phase::Body);
        assert!(parser.buffered().is_empty());

        parser.finish().unwrap();
        let request = parser.into_request().unwrap();
        assert_eq!(request.headers().len(), 3);
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_many_headers_complete_in_one_feed() {
        let mut data = b"POST / HTTP/1.1\r\n".to_vec();
        for i in 0..150 {
            data.extend_from_slice(format!("X-Header-{}: {}\r\n", i, i).as_bytes());
        }
        data.extend_from_slice(b"Content-Length: 2\r\n\r\nok");

        let mut parser = RequestParser::new();
        assert_eq!(parser.feed(&data).unwrap(), data.len());
        assert!(parser.is_done());

        let request = parser.into_request().unwrap();
        assert_eq!(request.headers().len(), 151);
        assert_eq!(request.body(), b"ok");
    }

    #[test]
    fn test_complete_request_needs_no_second_read() {
        /// Hands out its data once, then times out like an idle peer
        struct OneShot(Option<Vec<u8>>);

        impl Read for OneShot {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match self.0.take() {
                    Some(data) => {
                        buf[..data.len()].copy_from_slice(&data);
                        Ok(data.len())
                    }
                    None => Err(io::Error::new(io::ErrorKind::TimedOut, "idle")),
                }
            }
        }

        let mut data = b"POST / HTTP/1.1\r\n".to_vec();
        for i in 0..150 {
            data.extend_from_slice(format!("X-Header-{}: {}\r\n", i, i).as_bytes());
        }
        data.extend_from_slice(b"Content-Length: 2\r\n\r\nok");

        let config = ParserConfig::new().chunk_size(8192);
        let request = request_from_reader_with_config(OneShot(Some(data)), &config).unwrap();
        assert_eq!(request.body(), b"ok");
    }

    #[test]
    fn test_into_request_before_finish() {
        let mut parser = RequestParser::new();
        parser
            .feed(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nab")
            .unwrap();

        let err = parser.into_request().unwrap_err();
        assert!(matches!(err, Error::Unfinished(Phase::Body)));
        assert!(!err.is_format());
        assert!(!err.is_length());
    }

    #[test]
    fn test_huge_content_length_is_short_at_end() {
        let data = b"POST / HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\nabc";
        let err = parse_in_pieces(data, 64).unwrap_err();

        assert!(matches!(err, Error::BodyTooShort { declared: usize::MAX, received: 3 }));
    }

    #[test]
    fn test_finish_during_headers() {
        let mut parser = RequestParser::new();
        parser.feed(b"GET / HTTP/1.1\r\nHost: x\r\n").unwrap();

        let err = parser.finish().unwrap_err();
        assert!(matches!(err, Error::IncompleteHead(Phase::Headers)));
        assert!(err.is_format());
        assert_eq!(parser.phase(), Phase::Error);
    }

    #[test]
    fn test_invalid_content_length_fails_at_end_of_headers() {
        let mut parser = RequestParser::new();
        let err = parser
            .feed(b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n")
            .unwrap_err();

        assert!(matches!(err, Error::InvalidContentLength(_)));
        assert!(err.is_length());
    }

    #[test]
    fn test_request_from_reader_two_byte_chunks() {
        let request = parse_in_pieces(b"GET / HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", 2).unwrap();

        assert_eq!(request.method(), "GET");
        assert_eq!(request.target(), "/");
        assert_eq!(request.http_version(), "1.1");
        assert_eq!(request.headers().get("host"), Some("localhost:42069"));
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_request_from_reader_body() {
        let data = b"POST /submit HTTP/1.1\r\nHost: x\r\nContent-Length: 13\r\n\r\nhello world!\n";
        let request = parse_in_pieces(data, 3).unwrap();

        assert_eq!(request.body(), b"hello world!\n");
    }

    #[test]
    fn test_request_from_reader_short_body() {
        let data = b"POST /submit HTTP/1.1\r\nHost: x\r\nContent-Length: 20\r\n\r\npartial content!";
        let err = parse_in_pieces(data, 3).unwrap_err();

        assert!(matches!(err, Error::BodyTooShort { declared: 20, received: 16 }));
    }

    #[test]
    fn test_request_from_reader_lowercase_method() {
        let err = parse_in_pieces(b"get / HTTP/1.1\r\nHost: x\r\n\r\n", 5).unwrap_err();
        assert!(matches!(err, Error::InvalidMethod(_)));
    }

    #[test]
    fn test_request_from_reader_empty_stream() {
        let err = parse_in_pieces(b"", 8).unwrap_err();
        assert!(matches!(err, Error::IncompleteHead(Phase::RequestLine)));
    }

    #[test]
    fn test_request_from_reader_io_error() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        assert!(matches!(request_from_reader(Broken), Err(Error::Io(_))));
    }

    #[test]
    fn test_config_clamps_to_one() {
        let config = ParserConfig::new().chunk_size(0).max_iterations(0);
        assert_eq!(config.get_chunk_size(), 1);
        assert_eq!(config.get_max_iterations(), 1);
        assert_eq!(ParserConfig::default().get_chunk_size(), DEFAULT_CHUNK_SIZE);
    }
}
