//! Geo Engine
//!
//! Owns every namespace's [`SpatialIndex`] behind one read-write lock.
//! Adds take the lock exclusively; distance and position lookups share it.
//! A namespace is created on its first add and is never removed.

use crate::geo::distance::haversine;
use crate::geo::index::{GeoPoint, SpatialIndex};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

/// Why a geo lookup produced no result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("member not found: {0}")]
    MemberNotFound(String),
}

impl GeoError {
    fn namespace(ns: &[u8]) -> Self {
        GeoError::NamespaceNotFound(String::from_utf8_lossy(ns).into_owned())
    }

    fn member(member: &[u8]) -> Self {
        GeoError::MemberNotFound(String::from_utf8_lossy(member).into_owned())
    }
}

/// Point-in-time counters for the geo engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoStats {
    pub namespaces: u64,
    pub members: u64,
    pub add_ops: u64,
    pub dist_ops: u64,
}

/// Namespace-to-index map shared by every connection.
///
/// # Example
///
/// ```
/// use geokv::geo::GeoEngine;
/// use bytes::Bytes;
///
/// let geo = GeoEngine::new();
/// geo.add(Bytes::from("cities"), 0.0, 0.0, Bytes::from("a"));
/// geo.add(Bytes::from("cities"), 0.0, 1.0, Bytes::from("b"));
///
/// let meters = geo.dist(b"cities", b"a", b"b").unwrap();
/// assert!((meters - 111_194.93).abs() < 1.0);
/// ```
#[derive(Debug, Default)]
pub struct GeoEngine {
    namespaces: RwLock<HashMap<Bytes, SpatialIndex>>,
    add_count: AtomicU64,
    dist_count: AtomicU64,
}

impl GeoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member` at `(lat, lon)` to `namespace`, creating the namespace
    /// if needed. Re-adding an existing member moves it.
    ///
    /// Returns `true` if the member is new to the namespace.
    pub fn add(&self, namespace: Bytes, lat: f64, lon: f64, member: Bytes) -> bool {
        self.add_count.fetch_add(1, Ordering::Relaxed);

        let mut namespaces = self.namespaces.write();
        let index = namespaces.entry(namespace).or_insert_with_key(|ns| {
            debug!(namespace = ?ns, "creating geo namespace");
            SpatialIndex::new()
        });

        trace!(member = ?member, lat, lon, "geoadd");
        index.insert(member, GeoPoint::new(lat, lon))
    }

    /// Great-circle distance in meters between two members of `namespace`.
    pub fn dist(&self, namespace: &[u8], member1: &[u8], member2: &[u8]) -> Result<f64, GeoError> {
        self.dist_count.fetch_add(1, Ordering::Relaxed);

        let namespaces = self.namespaces.read();
        let index = namespaces
            .get(namespace)
            .ok_or_else(|| GeoError::namespace(namespace))?;

        let a = index.get(member1).ok_or_else(|| GeoError::member(member1))?;
        let b = index.get(member2).ok_or_else(|| GeoError::member(member2))?;

        Ok(haversine(
            a.point.latitude,
            a.point.longitude,
            b.point.latitude,
            b.point.longitude,
        ))
    }

    /// Stored coordinate of `member`.
    pub fn position(&self, namespace: &[u8], member: &[u8]) -> Result<GeoPoint, GeoError> {
        self.with_index(namespace, |index| {
            index
                .get(member)
                .map(|entry| entry.point)
                .ok_or_else(|| GeoError::member(member))
        })
    }

    /// Geohash of `member`'s current slot.
    pub fn hash(&self, namespace: &[u8], member: &[u8]) -> Result<String, GeoError> {
        self.with_index(namespace, |index| {
            index
                .get(member)
                .map(|entry| entry.hash.to_string())
                .ok_or_else(|| GeoError::member(member))
        })
    }

    /// Members of `namespace` in ascending geohash order.
    pub fn members(&self, namespace: &[u8]) -> Result<Vec<Bytes>, GeoError> {
        self.with_index(namespace, |index| {
            Ok(index.iter().map(|entry| entry.member.clone()).collect())
        })
    }

    /// Names of every namespace created so far, in no particular order.
    pub fn namespaces(&self) -> Vec<Bytes> {
        self.namespaces.read().keys().cloned().collect()
    }

    /// Number of members in `namespace`, or `None` if it does not exist.
    pub fn namespace_len(&self, namespace: &[u8]) -> Option<usize> {
        self.namespaces.read().get(namespace).map(SpatialIndex::len)
    }

    pub fn stats(&self) -> GeoStats {
        let namespaces = self.namespaces.read();
        GeoStats {
            namespaces: namespaces.len() as u64,
            members: namespaces.values().map(|i| i.len() as u64).sum(),
            add_ops: self.add_count.load(Ordering::Relaxed),
            dist_ops: self.dist_count.load(Ordering::Relaxed),
        }
    }

    fn with_index<T>(
        &self,
        namespace: &[u8],
        f: impl FnOnce(&SpatialIndex) -> Result<T, GeoError>,
    ) -> Result<T, GeoError> {
        let namespaces = self.namespaces.read();
        let index = namespaces
            .get(namespace)
            .ok_or_else(|| GeoError::namespace(namespace))?;
        f(index)
    }
}
