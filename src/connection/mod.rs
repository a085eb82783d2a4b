//! Client Connection Module
//!
//! Each client connection is served by its own tokio task, so one slow
//! client never blocks another. The task owns a read buffer, parses as many
//! requests as are buffered, and writes the replies back in order.
//!
//! ## Example
//!
//! ```ignore
//! use geokv::connection::{handle_connection, ConnectionStats};
//! use geokv::commands::CommandHandler;
//! use geokv::geo::GeoEngine;
//! use geokv::storage::KeyValueStore;
//! use std::sync::Arc;
//!
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(Arc::new(KeyValueStore::new()), Arc::new(GeoEngine::new()));
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone(), stats.clone()));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
