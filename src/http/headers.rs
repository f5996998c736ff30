//! HTTP headers handling
//!
//! This module provides the header store: case-insensitive lookups, repeated
//! fields folded into one comma-joined value, and an incremental parser that
//! consumes one header line at a time.

use super::{find_crlf, Error, Result, CRLF};
use std::fmt;
use tracing::trace;

/// Separator used when a field name shows up more than once
const VALUE_SEPARATOR: &str = ", ";

/// Bytes allowed in a header field name (RFC 9110 `tchar`)
static TOKEN_CHARS: [bool; 256] = token_table();

const fn token_table() -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        table[i] = b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'!' | b'#'
                    | b'$'
                    | b'%'
                    | b'&'
                    | b'\''
                    | b'*'
                    | b'+'
                    | b'-'
                    | b'.'
                    | b'^'
                    | b'_'
                    | b'`'
                    | b'|'
                    | b'~'
            );
        i += 1;
    }
    table
}

fn is_token_char(b: u8) -> bool {
    TOKEN_CHARS[b as usize]
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// HTTP headers collection
///
/// Field names are stored lowercased, in the order they first appeared.
/// Inserting a name that already exists appends to the existing value
/// instead of adding a second entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Create a new empty headers collection
    pub fn new() -> Self {
        Headers {
            headers: Vec::new(),
        }
    }

    /// Insert a header
    ///
    /// If a header with the same name (case-insensitive) already exists,
    /// the value is appended to it, separated by `", "`.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        let key = name.as_ref().to_ascii_lowercase();
        let value = value.as_ref();

        match self.headers.iter_mut().find(|(n, _)| *n == key) {
            Some((_, existing)) => {
                existing.push_str(VALUE_SEPARATOR);
                existing.push_str(value);
            }
            None => self.headers.push((key, value.to_string())),
        }
    }

    /// Get the value for a header (case-insensitive)
    ///
    /// Returns `None` when the header is absent, and `Some("")` when it was
    /// sent with an empty value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if a header exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get the number of distinct header names
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Check if there are no headers
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over all headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parse a single header line from the front of `buf`
    ///
    /// Returns `(bytes_consumed, is_terminator)`. A buffer starting with a
    /// bare CRLF is the blank line that ends the header block. A buffer with
    /// no CRLF yet returns `(0, false)`: more data is needed.
    pub fn parse(&mut self, buf: &[u8]) -> Result<(usize, bool)> {
        if buf.starts_with(CRLF) {
            return Ok((CRLF.len(), true));
        }

        let Some(end) = find_crlf(buf) else {
            return Ok((0, false));
        };

        let line = String::from_utf8_lossy(&buf[..end]);
        let (name, value) = parse_header_line(&line)?;
        trace!(name = %name, value = %value, "parsed header");
        self.insert(name, value);

        Ok((end + CRLF.len(), false))
    }
}

/// Split a header line into a validated field name and a trimmed value
fn parse_header_line(line: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = line.split_once(':') else {
        return Err(Error::InvalidHeader(format!("No colon in header: {}", line)));
    };

    let name = check_field_name(name)?;
    Ok((name, value.trim_matches(is_blank)))
}

fn check_field_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(Error::InvalidHeader("Empty header name".to_string()));
    }
    if name.ends_with(is_blank) {
        return Err(Error::InvalidHeader(format!(
            "Whitespace between field name and colon: {:?}",
            name
        )));
    }

    let name = name.trim_matches(is_blank);
    if let Some(bad) = name.chars().find(|&c| !c.is_ascii() || !is_token_char(c as u8)) {
        return Err(Error::InvalidHeaderChar(bad));
    }

    Ok(name)
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
