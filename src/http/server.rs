//! HTTP server side of a connection
//!
//! This module reads one request per connection from a session.

use super::parser::request_from_reader_with_config;
use super::{HttpSession, ParserConfig, Request, Result, SessionOps};
use std::time::Duration;
use tracing::debug;

/// HTTP server
///
/// Owns one session and parses requests from it, one fresh parser per call.
pub struct HttpServer<S: SessionOps> {
    session: HttpSession<S>,
    config: ParserConfig,
}

impl<S: SessionOps> HttpServer<S> {
    /// Create a new HTTP server with a session
    pub fn new(session: S) -> Self {
        Self::with_config(session, ParserConfig::default())
    }

    /// Create a new HTTP server with a session and parser configuration
    pub fn with_config(session: S, config: ParserConfig) -> Self {
        HttpServer {
            session: HttpSession::new(session),
            config,
        }
    }

    /// Set the timeout for reads
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.session.set_timeout(timeout);
    }

    /// Receive an HTTP request
    pub fn receive_request(&mut self) -> Result<Request> {
        let request = request_from_reader_with_config(&mut self.session, &self.config)?;
        debug!(
            method = request.method(),
            target = request.target(),
            body = request.body().len(),
            "received request"
        );
        Ok(request)
    }

    /// Close the connection
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }
}
