//! RESP Protocol Implementation
//!
//! The server speaks the Redis Serialization Protocol (RESP), so `redis-cli`
//! and any Redis client library can talk to it.
//!
//! ## Modules
//!
//! - `types`: [`Command`] for parsed requests and [`Reply`] for responses
//! - `parser`: restartable request parser over a byte buffer
//!
//! ## Example
//!
//! ```
//! use geokv::protocol::{CommandParser, Reply};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (command, consumed) = CommandParser::new().parse(data).unwrap().unwrap();
//! assert_eq!(command.name(), "GET");
//! assert_eq!(consumed, data.len());
//!
//! assert_eq!(&Reply::ok().serialize()[..], b"+OK\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{CommandParser, ParseError, ParseResult};
pub use types::{Command, Reply};
