//! Coordinate and waypoint models

use serde::{Deserialize, Serialize};

/// A point on the earth in decimal degrees, ordered (longitude, latitude)
/// the way directions providers return polyline vertices.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Latitude in decimal degrees
    pub latitude: f64,
}

impl Coordinate {
    /// Create a new coordinate from longitude and latitude
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether both components are finite and inside their degree ranges
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// Format as "lat, lon" for display
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

/// A named stop supplied by the caller (origin, via point or destination)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub coordinates: Coordinate,
}

impl Waypoint {
    #[must_use]
    pub fn new(name: impl Into<String>, coordinates: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }
}
