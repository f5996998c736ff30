//! Body accumulation against a declared `content-length`

use super::{Error, Headers, Result};
use bytes::{Bytes, BytesMut};

/// Upper bound on the capacity reserved for a declared body
const MAX_PREALLOC: usize = 64 * 1024;

/// Collects body bytes and decides when the body is complete
///
/// A declared length of zero never completes on its own: the body stays open
/// until the stream ends, so any byte that shows up after the header block is
/// reported as too much data. A live peer sending a request without
/// `content-length` must half-close its write side before the request is
/// returned.
///
/// The declared length comes from the peer and is never used to reserve
/// memory up front; the buffer grows only as bytes arrive.
#[derive(Debug, Default)]
pub struct BodyAccumulator {
    declared: usize,
    body: BytesMut,
}

impl BodyAccumulator {
    /// Create an accumulator expecting exactly `declared` bytes
    pub fn new(declared: usize) -> Self {
        BodyAccumulator {
            declared,
            body: BytesMut::with_capacity(declared.min(MAX_PREALLOC)),
        }
    }

    /// Create an accumulator from the `content-length` header
    ///
    /// An absent or empty header means zero.
    pub fn from_headers(headers: &Headers) -> Result<Self> {
        let declared = match headers.get("content-length") {
            None | Some("") => 0,
            Some(value) => value
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.to_string()))?,
        };
        Ok(Self::new(declared))
    }

    /// Append newly received bytes
    ///
    /// Returns true once the body holds exactly the declared, nonzero length.
    pub fn push(&mut self, data: &[u8]) -> Result<bool> {
        self.body.extend_from_slice(data);

        if self.body.len() > self.declared {
            return Err(Error::BodyTooLong {
                declared: self.declared,
                received: self.body.len(),
            });
        }

        Ok(self.is_complete())
    }

    /// Check the body against the declared length once the stream has ended
    pub fn check_complete(&self) -> Result<()> {
        if self.body.len() < self.declared {
            return Err(Error::BodyTooShort {
                declared: self.declared,
                received: self.body.len(),
            });
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.declared != 0 && self.body.len() == self.declared
    }

    /// Declared body length
    pub fn declared(&self) -> usize {
        self.declared
    }

    /// Number of bytes received so far
    pub fn received(&self) -> usize {
        self.body.len()
    }

    /// Freeze the accumulated bytes
    pub fn into_bytes(self) -> Bytes {
        self.body.freeze()
    }
}
