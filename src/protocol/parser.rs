//! RESP Request Parser
//!
//! Parses client requests out of a byte buffer. Two request shapes are
//! accepted:
//!
//! - **Multi-bulk**: `*<count>\r\n` followed by `count` bulk strings, which
//!   is what every Redis client library sends.
//! - **Inline**: a single whitespace-separated line, which is what a human
//!   typing into `telnet` or `nc` sends.
//!
//! The parser is restartable. It returns:
//! - `Ok(Some((command, consumed)))` - a full request was read from the first
//!   `consumed` bytes
//! - `Ok(None)` - the request is incomplete; append more data and retry
//! - `Err(ParseError)` - the bytes are not a valid request

use crate::protocol::types::{prefix, Command, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid length: {0:?}")]
    InvalidLength(String),

    #[error("expected '$', got {0:#04x}")]
    ExpectedBulk(u8),

    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    #[error("{kind} too large: {size} (max: {max})")]
    TooLarge {
        kind: &'static str,
        size: usize,
        max: usize,
    },

    #[error("empty command")]
    EmptyCommand,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Largest request a connection will buffer (1 MB)
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Maximum size for a single bulk argument. A longer one could never fit in
/// a connection buffer, so it is rejected as soon as its header is read.
pub const MAX_BULK_SIZE: usize = MAX_REQUEST_SIZE;

/// Maximum number of arguments in a single request (`$0\r\n\r\n` is 6 bytes)
pub const MAX_ARGS: usize = MAX_REQUEST_SIZE / 6;

/// Stateless request parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to parse one request from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
        match buf.first() {
            None => Ok(None),
            Some(&prefix::ARRAY) => parse_multibulk(buf),
            Some(_) => parse_inline(buf),
        }
    }
}

fn parse_multibulk(buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
    let Some((count, mut pos)) = read_length(buf, 1)? else {
        return Ok(None);
    };

    if count > MAX_ARGS {
        return Err(ParseError::TooLarge {
            kind: "argument count",
            size: count,
            max: MAX_ARGS,
        });
    }
    if count == 0 {
        return Err(ParseError::EmptyCommand);
    }

    let mut parts = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let Some(&tag) = buf.get(pos) else {
            return Ok(None);
        };
        if tag != prefix::BULK_STRING {
            return Err(ParseError::ExpectedBulk(tag));
        }

        let Some((len, data_start)) = read_length(buf, pos + 1)? else {
            return Ok(None);
        };
        if len > MAX_BULK_SIZE {
            return Err(ParseError::TooLarge {
                kind: "bulk string",
                size: len,
                max: MAX_BULK_SIZE,
            });
        }

        let data_end = data_start + len;
        if buf.len() < data_end + CRLF.len() {
            return Ok(None);
        }
        if &buf[data_end..data_end + CRLF.len()] != CRLF {
            return Err(ParseError::MissingCrlf);
        }

        parts.push(Bytes::copy_from_slice(&buf[data_start..data_end]));
        pos = data_end + CRLF.len();
    }

    Ok(Some((Command::new(parts), pos)))
}

fn parse_inline(buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
    let Some(end) = find_crlf(buf, 0) else {
        return Ok(None);
    };

    let parts: Vec<Bytes> = buf[..end]
        .split(|b| b.is_ascii_whitespace())
        .filter(|word| !word.is_empty())
        .map(Bytes::copy_from_slice)
        .collect();

    if parts.is_empty() {
        return Err(ParseError::EmptyCommand);
    }

    Ok(Some((Command::new(parts), end + CRLF.len())))
}

/// Reads a non-negative decimal length starting at `start` and terminated by
/// CRLF. Returns the length and the offset just past the CRLF.
fn read_length(buf: &[u8], start: usize) -> ParseResult<Option<(usize, usize)>> {
    let Some(end) = find_crlf(buf, start) else {
        return Ok(None);
    };

    let digits = &buf[start..end];
    let text = std::str::from_utf8(digits)
        .map_err(|_| ParseError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))?;
    let len = text
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidLength(text.to_string()))?;

    Ok(Some((len, end + CRLF.len())))
}

/// Position of the first CRLF at or after `from`.
#[inline]
fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == CRLF)
        .map(|i| from + i)
}
