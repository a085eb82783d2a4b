//! Key-Value Storage Module
//!
//! This module provides the expiring key-value half of geokv: a sharded,
//! thread-safe map with optional per-key deadlines enforced lazily on read.
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Lazy Expiry**: Expired keys are removed when they are next read
//!
//! ## Example
//!
//! ```
//! use geokv::storage::{Expiry, KeyValueStore};
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(KeyValueStore::new());
//!
//! store.set(Bytes::from("name"), Bytes::from("Ariz"), Expiry::Never);
//! assert_eq!(store.get(b"name"), Ok(Bytes::from("Ariz")));
//!
//! store.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Expiry::After(Duration::from_secs(3600)),
//! );
//! ```

pub mod kv;

pub use kv::{Entry, Expiry, KeyValueStore, Miss, StoreStats};
