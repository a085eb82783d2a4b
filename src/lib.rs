//! # geokv - An In-Memory Key-Value and Geospatial Store
//!
//! geokv serves two kinds of data over the Redis protocol (RESP):
//!
//! - **Expiring strings**: `GET`/`SET` with a per-key lifetime in seconds,
//!   expired lazily when read.
//! - **Named points**: `GEOADD`/`GEODIST` over per-namespace indexes ordered
//!   by geohash, with great-circle distances in meters.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               geokv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──┬───────┬──┘                  │
//! │                            │              │       │                     │
//! │                     ┌──────▼──────┐       ▼       ▼                     │
//! │                     │ RESP parser │  KeyValueStore  GeoEngine           │
//! │                     └─────────────┘  (64 shards)    (one RwLock)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use geokv::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(&Config::default()).await?;
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: sharded key-value store with lazy expiry
//! - [`geo`]: geohash encoding, spatial index, distance, geo engine
//! - [`protocol`]: RESP request parser and reply encoder
//! - [`commands`]: command dispatch and argument validation
//! - [`connection`]: per-client read/execute/reply loop
//! - [`server`]: TCP listener owning the shared engines
//! - [`config`]: host/port from environment and flags

pub mod commands;
pub mod config;
pub mod connection;
pub mod geo;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::CommandHandler;
pub use config::{Config, ConfigError, Invocation};
pub use connection::{handle_connection, ConnectionStats};
pub use geo::{GeoEngine, GeoError};
pub use protocol::{Command, CommandParser, ParseError, Reply};
pub use server::Server;
pub use storage::{Expiry, KeyValueStore, Miss};

/// The default port geokv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host geokv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of geokv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
