//! Session operations abstraction
//!
//! The parser only needs "read some bytes, or report end-of-input". This
//! module wraps a transport behind [`SessionOps`] and exposes it as a
//! `std::io::Read` with an optional per-read timeout.

use super::{Error, Result};
use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::Duration;

/// Default per-read timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Session operations trait
pub trait SessionOps {
    /// Wait until the session is readable
    ///
    /// Returns false if the timeout expired first.
    fn poll_read(&self, timeout: Option<Duration>) -> Result<bool>;

    /// Read data from the session, `Ok(0)` meaning end-of-input
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the session
    fn close(&mut self) -> Result<()>;
}

/// HTTP session wrapping a transport with session operations
pub struct HttpSession<S: SessionOps> {
    session: S,
    timeout: Option<Duration>,
}

impl<S: SessionOps> HttpSession<S> {
    /// Create a new HTTP session
    pub fn new(session: S) -> Self {
        HttpSession {
            session,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the timeout for reads, `None` to wait forever
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Read data with timeout
    pub fn read_timeout(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.session.poll_read(self.timeout)? {
            return Err(Error::Timeout);
        }

        self.session.read(buf)
    }

    /// Close the session
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }
}

impl<S: SessionOps> Read for HttpSession<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_timeout(buf).map_err(|e| match e {
            Error::Io(e) => e,
            Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
            other => io::Error::new(io::ErrorKind::Other, other),
        })
    }
}

/// Plain file descriptor session operations
pub struct FdSessionOps {
    stream: TcpStream,
}

impl FdSessionOps {
    /// Create a new FD session operations from a TCP stream
    pub fn new(stream: TcpStream) -> Self {
        FdSessionOps { stream }
    }
}

impl SessionOps for FdSessionOps {
    fn poll_read(&self, timeout: Option<Duration>) -> Result<bool> {
        use libc::{poll, pollfd, POLLIN};

        let mut pfd = pollfd {
            fd: self.stream.as_raw_fd(),
            events: POLLIN,
            revents: 0,
        };

        let timeout_ms = timeout
            .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(-1); // -1 = infinite

        let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

        if result < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        Ok(result > 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).map_err(Error::from)
    }

    fn close(&mut self) -> Result<()> {
        self.stream.shutdown(Shutdown::Both).map_err(Error::from)
    }
}
