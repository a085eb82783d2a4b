//! Geohash Encoding
//!
//! Maps a latitude/longitude pair to a base-32 string by bisecting the
//! longitude and latitude ranges alternately (longitude first) and packing
//! the resulting bits five at a time.
//!
//! ```text
//! lon bit, lat bit, lon bit, lat bit, lon bit | lat bit, lon bit, ...
//! └──────────── char 0 (5 bits) ────────────┘ └──── char 1 ...
//! ```
//!
//! Points that share a prefix lie in the same cell at that prefix's
//! resolution, so lexicographic order over hashes roughly follows spatial
//! proximity. Neighbours on opposite sides of a cell boundary can still have
//! completely different hashes.

use thiserror::Error;

/// Number of characters in every hash produced by [`encode`].
///
/// Twelve characters carry 60 bits (30 per axis), giving cells of roughly
/// 3.7 cm x 1.9 cm at the equator. Two points only share a hash when they
/// fall into the same such cell.
pub const GEOHASH_PRECISION: usize = 12;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

const LAT_RANGE: (f64, f64) = (-90.0, 90.0);
const LON_RANGE: (f64, f64) = (-180.0, 180.0);

/// Errors from decoding a geohash string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeohashError {
    #[error("empty geohash")]
    Empty,

    #[error("invalid geohash character {0:?}")]
    InvalidChar(char),
}

/// The rectangular cell a geohash denotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCell {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoCell {
    /// Center of the cell as `(latitude, longitude)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Returns true if the point lies inside the cell (edges included).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Encodes a coordinate into a [`GEOHASH_PRECISION`]-character geohash.
///
/// Coordinates outside the valid ranges are clamped to the nearest edge.
pub fn encode(lat: f64, lon: f64) -> String {
    let lat = lat.clamp(LAT_RANGE.0, LAT_RANGE.1);
    let lon = lon.clamp(LON_RANGE.0, LON_RANGE.1);

    let (mut lat_lo, mut lat_hi) = LAT_RANGE;
    let (mut lon_lo, mut lon_hi) = LON_RANGE;

    let mut hash = String::with_capacity(GEOHASH_PRECISION);
    let mut even = true;

    for _ in 0..GEOHASH_PRECISION {
        let mut idx = 0usize;
        for _ in 0..5 {
            idx <<= 1;
            if even {
                let mid = (lon_lo + lon_hi) / 2.0;
                if lon >= mid {
                    idx |= 1;
                    lon_lo = mid;
                } else {
                    lon_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if lat >= mid {
                    idx |= 1;
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            even = !even;
        }
        hash.push(BASE32[idx] as char);
    }

    hash
}

/// Decodes a geohash of any length into the cell it denotes.
pub fn decode(hash: &str) -> Result<GeoCell, GeohashError> {
    if hash.is_empty() {
        return Err(GeohashError::Empty);
    }

    let (mut min_lat, mut max_lat) = LAT_RANGE;
    let (mut min_lon, mut max_lon) = LON_RANGE;
    let mut even = true;

    for c in hash.chars() {
        let idx = BASE32
            .iter()
            .position(|&b| b as char == c)
            .ok_or(GeohashError::InvalidChar(c))?;

        for shift in (0..5).rev() {
            let bit = (idx >> shift) & 1 == 1;
            if even {
                let mid = (min_lon + max_lon) / 2.0;
                if bit {
                    min_lon = mid;
                } else {
                    max_lon = mid;
                }
            } else {
                let mid = (min_lat + max_lat) / 2.0;
                if bit {
                    min_lat = mid;
                } else {
                    max_lat = mid;
                }
            }
            even = !even;
        }
    }

    Ok(GeoCell {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_length() {
        assert_eq!(encode(0.0, 0.0).len(), GEOHASH_PRECISION);
        assert_eq!(encode(-90.0, -180.0).len(), GEOHASH_PRECISION);
        assert_eq!(encode(90.0, 180.0).len(), GEOHASH_PRECISION);
    }

    #[test]
    fn test_known_value() {
        // Jutland, the usual reference point for geohash
        let hash = encode(57.64911, 10.40744);
        assert!(hash.starts_with("u4pruydqqvj"), "got {}", hash);
    }

    #[test]
    fn test_origin() {
        assert_eq!(encode(0.0, 0.0), "s00000000000");
    }

    #[test]
    fn test_corners() {
        assert_eq!(encode(-90.0, -180.0), "000000000000");
        assert_eq!(encode(90.0, 180.0), "zzzzzzzzzzzz");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(encode(37.7749, -122.4194), encode(37.7749, -122.4194));
    }

    #[test]
    fn test_nearby_points_share_prefix() {
        let a = encode(48.85837, 2.29448);
        let b = encode(48.85840, 2.29450);
        assert_eq!(&a[..6], &b[..6]);

        let far = encode(-33.8568, 151.2153);
        assert_ne!(&a[..1], &far[..1]);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(encode(100.0, 200.0), encode(90.0, 180.0));
    }

    #[test]
    fn test_decode_contains_original_point() {
        let (lat, lon) = (35.6762, 139.6503);
        let cell = decode(&encode(lat, lon)).unwrap();

        assert!(cell.contains(lat, lon));
        let (clat, clon) = cell.center();
        assert!((clat - lat).abs() < 1e-6);
        assert!((clon - lon).abs() < 1e-6);
    }

    #[test]
    fn test_decode_short_hash() {
        let cell = decode("s").unwrap();
        assert_eq!(cell.min_lat, 0.0);
        assert_eq!(cell.max_lat, 45.0);
        assert_eq!(cell.min_lon, 0.0);
        assert_eq!(cell.max_lon, 45.0);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode(""), Err(GeohashError::Empty));
        // 'a', 'i', 'l' and 'o' are not in the alphabet
        assert_eq!(decode("u4pa"), Err(GeohashError::InvalidChar('a')));
    }
}
