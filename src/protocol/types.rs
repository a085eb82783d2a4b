//! RESP Request and Reply Types
//!
//! Requests arrive as arrays of bulk strings and are held as a [`Command`].
//! Replies go out as a [`Reply`], which covers the subset of RESP types the
//! server ever sends.
//!
//! ## Reply Wire Format
//!
//! Status: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk: `$5\r\nhello\r\n`
//! Null: `$-1\r\n`
//! Array: `*2\r\n$1\r\na\r\n$-1\r\n`

use bytes::{BufMut, Bytes, BytesMut};

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A parsed client request: the command name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    parts: Vec<Bytes>,
}

impl Command {
    /// Builds a command from its raw parts. `parts` must not be empty.
    pub fn new(parts: Vec<Bytes>) -> Self {
        debug_assert!(!parts.is_empty());
        Self { parts }
    }

    /// Convenience constructor from string slices.
    pub fn from_strs(parts: &[&str]) -> Self {
        Self::new(
            parts
                .iter()
                .map(|p| Bytes::copy_from_slice(p.as_bytes()))
                .collect(),
        )
    }

    /// The command name, upper-cased.
    pub fn name(&self) -> String {
        self.parts
            .first()
            .map(|n| String::from_utf8_lossy(n).to_ascii_uppercase())
            .unwrap_or_default()
    }

    /// Arguments after the command name.
    pub fn args(&self) -> &[Bytes] {
        self.parts.get(1..).unwrap_or(&[])
    }
}

/// A reply to send back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `+<status>\r\n`
    Status(String),
    /// `-<message>\r\n`
    Error(String),
    /// `:<n>\r\n`
    Integer(i64),
    /// `$<len>\r\n<data>\r\n`
    Bulk(Bytes),
    /// `$-1\r\n`
    Null,
    /// `*<count>\r\n<elements...>`
    Array(Vec<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    pub fn pong() -> Self {
        Reply::Status("PONG".to_string())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// A float as a bulk string in shortest round-trip decimal form.
    pub fn float(value: f64) -> Self {
        Reply::Bulk(Bytes::from(value.to_string()))
    }

    /// Serializes the reply to a fresh buffer.
    pub fn serialize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Appends the wire form of this reply to `buf`.
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        match self {
            Reply::Status(s) => {
                buf.put_u8(prefix::SIMPLE_STRING);
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Error(s) => {
                buf.put_u8(prefix::ERROR);
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.put_u8(prefix::INTEGER);
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Bulk(data) => {
                buf.put_u8(prefix::BULK_STRING);
                buf.put_slice(data.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            Reply::Null => {
                buf.put_u8(prefix::BULK_STRING);
                buf.put_slice(b"-1");
                buf.put_slice(CRLF);
            }
            Reply::Array(items) => {
                buf.put_u8(prefix::ARRAY);
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                for item in items {
                    item.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_error() {
        assert_eq!(&Reply::ok().serialize()[..], b"+OK\r\n");
        assert_eq!(&Reply::pong().serialize()[..], b"+PONG\r\n");
        assert_eq!(
            &Reply::error("ERR unknown command").serialize()[..],
            b"-ERR unknown command\r\n"
        );
    }

    #[test]
    fn test_bulk_and_null() {
        assert_eq!(&Reply::bulk("hello").serialize()[..], b"$5\r\nhello\r\n");
        assert_eq!(&Reply::bulk("").serialize()[..], b"$0\r\n\r\n");
        assert_eq!(&Reply::Null.serialize()[..], b"$-1\r\n");
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(&Reply::float(-1.0).serialize()[..], b"$2\r\n-1\r\n");
        assert_eq!(&Reply::float(0.0).serialize()[..], b"$1\r\n0\r\n");
        assert_eq!(Reply::float(111194.5), Reply::bulk("111194.5"));
    }

    #[test]
    fn test_nested_array() {
        let reply = Reply::Array(vec![
            Reply::Array(vec![Reply::bulk("1"), Reply::bulk("2")]),
            Reply::Null,
            Reply::Integer(-3),
        ]);
        assert_eq!(
            &reply.serialize()[..],
            b"*3\r\n*2\r\n$1\r\n1\r\n$1\r\n2\r\n$-1\r\n:-3\r\n"
        );
    }

    #[test]
    fn test_command_name_and_args() {
        let cmd = Command::from_strs(&["geoAdd", "ns", "1", "2", "m"]);
        assert_eq!(cmd.name(), "GEOADD");
        assert_eq!(cmd.args().len(), 4);
        assert_eq!(cmd.args()[0], Bytes::from("ns"));

        let bare = Command::from_strs(&["ping"]);
        assert!(bare.args().is_empty());
    }
}
