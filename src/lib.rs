//! httpfromtcp - incremental HTTP/1.1 request parsing over raw byte streams
//!
//! This crate parses a single HTTP/1.1 request from any source that hands out
//! bytes in arbitrarily sized chunks, plus the TCP plumbing needed to feed it
//! from real connections.

pub mod http;
pub mod net;
