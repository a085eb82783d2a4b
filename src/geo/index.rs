//! Per-namespace spatial index.
//!
//! Entries are ordered by `(geohash, member)` in a `BTreeMap`, so an
//! ascending walk visits points in geohash order and two members that fall
//! into the same cell sit side by side instead of overwriting each other.
//! A member-keyed map beside it gives direct lookups by name and lets a
//! re-added member be moved out of its old slot.

use crate::geo::geohash;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};

/// A stored coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One point as seen during a traversal of the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry<'a> {
    pub hash: &'a str,
    pub member: &'a Bytes,
    pub point: GeoPoint,
}

type OrderKey = (String, Bytes);

/// Ordered set of named points for a single namespace.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    ordered: BTreeMap<OrderKey, GeoPoint>,
    /// member -> geohash of its current slot in `ordered`
    members: HashMap<Bytes, String>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or moves `member` to the given coordinate.
    ///
    /// Returns `true` if the member was not in the index before.
    pub fn insert(&mut self, member: Bytes, point: GeoPoint) -> bool {
        let hash = geohash::encode(point.latitude, point.longitude);

        let is_new = match self.members.insert(member.clone(), hash.clone()) {
            Some(old_hash) => {
                self.ordered.remove(&(old_hash, member.clone()));
                false
            }
            None => true,
        };

        self.ordered.insert((hash, member), point);
        is_new
    }

    /// Looks up a member by name.
    pub fn get(&self, member: &[u8]) -> Option<SpatialEntry<'_>> {
        let (member, hash) = self.members.get_key_value(member)?;
        let (key, point) = self.ordered.get_key_value(&(hash.clone(), member.clone()))?;
        Some(SpatialEntry {
            hash: &key.0,
            member: &key.1,
            point: *point,
        })
    }

    /// Walks every entry in ascending geohash order; ties break on member.
    pub fn iter(&self) -> impl Iterator<Item = SpatialEntry<'_>> {
        self.ordered.iter().map(|((hash, member), point)| SpatialEntry {
            hash,
            member,
            point: *point,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
