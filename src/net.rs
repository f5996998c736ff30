//! TCP listener setup
//!
//! Binds listening sockets through `socket2` so address reuse and the
//! backlog can be set before `listen`.

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use tracing::info;

/// Default listen backlog
pub const DEFAULT_BACKLOG: i32 = 128;

/// Result type for network operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not resolve address: {0}")]
    Resolve(String),

    #[error("Bind to {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve `addr` to its first socket address
pub fn resolve(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| Error::Resolve(format!("{:?}: {}", addr, e)))?
        .next()
        .ok_or_else(|| Error::Resolve(format!("{:?}: no addresses", addr)))
}

/// A TCP listener accepting one connection at a time
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind a listener with `SO_REUSEADDR` and the default backlog
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_backlog(addr, DEFAULT_BACKLOG)
    }

    /// Bind a listener with `SO_REUSEADDR` and the given backlog
    pub fn bind_with_backlog(addr: SocketAddr, backlog: i32) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket
            .bind(&addr.into())
            .map_err(|source| Error::Bind { addr, source })?;
        socket.listen(backlog)?;

        let inner: TcpListener = socket.into();
        info!(addr = %inner.local_addr()?, "listening");
        Ok(Listener { inner })
    }

    /// Local address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Accept the next connection
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        Ok(self.inner.accept()?)
    }
}
