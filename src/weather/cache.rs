//! Session-scoped weather cache
//!
//! Readings are keyed by coordinates rounded to two decimals and the UTC hour
//! they fall in, so repeated lookups for the same place around the same time
//! are served without another fetch. The cache lives as long as the
//! [`WeatherService`](super::WeatherService) that owns it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use twox_hash::XxHash64;

use crate::models::{Coordinate, WeatherDataPoint};

const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Longitude in hundredths of a degree
    pub lon_centi: i32,
    /// Latitude in hundredths of a degree
    pub lat_centi: i32,
    /// Hours since the unix epoch
    pub hour: i64,
}

impl CacheKey {
    #[must_use]
    pub fn new(coordinates: &Coordinate, time: DateTime<Utc>) -> Self {
        // Valid coordinates stay well inside i32 after scaling
        Self {
            lon_centi: (coordinates.longitude * 100.0).round() as i32,
            lat_centi: (coordinates.latitude * 100.0).round() as i32,
            hour: time.timestamp().div_euclid(SECONDS_PER_HOUR),
        }
    }

    /// Rounded coordinates this key stands for
    #[must_use]
    pub fn coordinates(&self) -> Coordinate {
        Coordinate::new(
            f64::from(self.lon_centi) / 100.0,
            f64::from(self.lat_centi) / 100.0,
        )
    }

    /// Start of the hour this key stands for
    #[must_use]
    pub fn bucket_start(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.hour * SECONDS_PER_HOUR, 0).unwrap_or_default()
    }

    /// Stable 64-bit seed for deterministic generation
    #[must_use]
    pub fn seed(&self) -> u64 {
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&self.lon_centi.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.lat_centi.to_le_bytes());
        bytes[8..].copy_from_slice(&self.hour.to_le_bytes());
        XxHash64::oneshot(0, &bytes)
    }
}

/// Unbounded in-memory cache. Concurrent writers for the same key are last-write-wins.
#[derive(Debug, Default)]
pub struct WeatherCache {
    entries: DashMap<CacheKey, WeatherDataPoint>,
}

impl WeatherCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<WeatherDataPoint> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: CacheKey, value: WeatherDataPoint) {
        self.entries.insert(key, value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
