//! Expiring Key-Value Store
//!
//! A sharded, thread-safe map from keys to values with an optional
//! per-entry deadline.
//!
//! ## Expiry Model
//!
//! Expiry is enforced lazily: an entry whose deadline has passed stays in
//! memory until the next read of that key, which deletes it and reports a
//! miss. There is no background sweep, so an expired key that is never read
//! again is never reclaimed.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     KeyValueStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key always lands in the same shard, so callers touching different keys
//! rarely contend on the same lock.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

/// Number of shards for the store.
const NUM_SHARDS: usize = 64;

/// How long a value should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The value never expires.
    Never,
    /// The value expires this long after it was written.
    After(Duration),
}

impl Expiry {
    /// Builds an expiry from a signed number of seconds.
    ///
    /// Negative values mean "never expires". Zero produces a deadline equal
    /// to the write instant, so the value is gone on the next read.
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds < 0 {
            Expiry::Never
        } else {
            Expiry::After(Duration::from_secs(seconds as u64))
        }
    }

    /// Resolves this expiry into an absolute deadline relative to `now`.
    ///
    /// A deadline too far in the future to represent collapses to `None`.
    fn deadline_from(self, now: Instant) -> Option<Instant> {
        match self {
            Expiry::Never => None,
            Expiry::After(ttl) => now.checked_add(ttl),
        }
    }
}

/// Why a read produced no value.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// The key was never set.
    #[error("key not found")]
    Absent,

    /// The key existed but its deadline had passed; it has been removed.
    #[error("key expired")]
    Expired,
}

/// A stored value with its optional deadline.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry written at `now`.
    pub fn new(value: Bytes, expiry: Expiry, now: Instant) -> Self {
        Self {
            value,
            expires_at: expiry.deadline_from(now),
        }
    }

    /// Checks whether this entry is expired as of `now`.
    ///
    /// The deadline itself counts as expired.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Point-in-time counters for the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub keys: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

type Shard = RwLock<HashMap<Bytes, Entry>>;

/// The expiring key-value store.
///
/// Construct one per process and share it behind an `Arc`; every method
/// takes `&self`.
///
/// # Example
///
/// ```
/// use geokv::storage::{Expiry, KeyValueStore, Miss};
/// use bytes::Bytes;
///
/// let store = KeyValueStore::new();
/// store.set(Bytes::from("name"), Bytes::from("Ariz"), Expiry::Never);
/// assert_eq!(store.get(b"name"), Ok(Bytes::from("Ariz")));
/// assert_eq!(store.get(b"other"), Err(Miss::Absent));
/// ```
pub struct KeyValueStore {
    shards: Vec<Shard>,
    key_count: AtomicU64,
    get_count: AtomicU64,
    set_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Stores `value` under `key`, replacing any previous value and deadline.
    ///
    /// Returns `true` if the key was not present before.
    pub fn set(&self, key: Bytes, value: Bytes, expiry: Expiry) -> bool {
        self.set_at(key, value, expiry, Instant::now())
    }

    /// Like [`set`](Self::set), with the write instant supplied by the caller.
    pub fn set_at(&self, key: Bytes, value: Bytes, expiry: Expiry, now: Instant) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = Entry::new(value, expiry, now);
        trace!(key = ?key, expires_at = ?entry.expires_at, "set");

        // Count under the guard so a racing lazy delete of the same key
        // cannot decrement before this increment lands
        let mut data = self.shard(&key).write();
        let is_new = data.insert(key, entry).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
        is_new
    }

    /// Reads the value for `key`.
    ///
    /// An entry found past its deadline is deleted before `Miss::Expired`
    /// is returned.
    pub fn get(&self, key: &[u8]) -> Result<Bytes, Miss> {
        self.get_at(key, Instant::now())
    }

    /// Like [`get`](Self::get), evaluating expiry as of `now`.
    pub fn get_at(&self, key: &[u8], now: Instant) -> Result<Bytes, Miss> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        let result = self.lookup(key, now);
        match result {
            Ok(_) => self.hit_count.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.miss_count.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    fn lookup(&self, key: &[u8], now: Instant) -> Result<Bytes, Miss> {
        let shard = self.shard(key);

        // Fast path: shared lock for live entries and plain misses
        {
            let data = shard.read();
            match data.get(key) {
                None => return Err(Miss::Absent),
                Some(entry) if !entry.is_expired_at(now) => return Ok(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired under the read lock; re-check under the write lock since a
        // concurrent set may have replaced it
        let mut data = shard.write();
        match data.get(key) {
            None => Err(Miss::Absent),
            Some(entry) if !entry.is_expired_at(now) => Ok(entry.value.clone()),
            Some(_) => {
                data.remove(key);
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                trace!(key = ?Bytes::copy_from_slice(key), "lazily expired");
                Err(Miss::Expired)
            }
        }
    }

    /// Returns the number of stored keys, including expired keys that have
    /// not been read since their deadline.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the store's counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}
