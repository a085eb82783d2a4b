//! Command Dispatch Module
//!
//! Turns parsed requests into calls on the storage engines.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ CommandParser   │  (protocol module)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  validate arguments, pick engine
//! └───┬─────────┬───┘
//!     ▼         ▼
//! KeyValueStore  GeoEngine
//! ```

pub mod handler;

pub use handler::{CommandHandler, SUPPORTED_COMMANDS};
