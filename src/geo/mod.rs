//! Geospatial Module
//!
//! Per-namespace point storage with pairwise distance queries.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        GeoEngine                             │
//! │              RwLock<HashMap<namespace, index>>               │
//! │                                                              │
//! │   ┌──────────────────────┐   ┌──────────────────────┐        │
//! │   │ SpatialIndex "fleet" │   │ SpatialIndex "shops" │  ...   │
//! │   │ BTreeMap (hash, mbr) │   │ BTreeMap (hash, mbr) │        │
//! │   │ HashMap  mbr -> hash │   │ HashMap  mbr -> hash │        │
//! │   └──────────────────────┘   └──────────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//!            │ encode                       │ distance
//!            ▼                              ▼
//!       geohash (12 chars)             haversine (meters)
//! ```

pub mod distance;
pub mod engine;
pub mod geohash;
pub mod index;

pub use distance::haversine;
pub use engine::{GeoEngine, GeoError, GeoStats};
pub use geohash::{GeoCell, GeohashError, GEOHASH_PRECISION};
pub use index::{GeoPoint, SpatialEntry, SpatialIndex};
