//! Checkpoints sampled along a route and the forecast summary built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::{Coordinate, Waypoint};
use super::weather::WeatherDataPoint;

/// A labeled (location, time, weather) sample along a route
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Nearest waypoint name, or "Start" / "End" / "En route"
    pub location: String,
    pub arrival_time: DateTime<Utc>,
    pub coordinates: Coordinate,
    pub weather: WeatherDataPoint,
}

/// Full result of planning a trip with weather along the way
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouteForecast {
    pub waypoints: Vec<Waypoint>,
    /// Total route distance in kilometers
    pub distance_km: f64,
    pub duration_seconds: u64,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub checkpoints: Vec<Checkpoint>,
    /// Number of checkpoints flagged as risky
    pub risky_checkpoints: usize,
}

impl RouteForecast {
    #[must_use]
    pub fn new(
        waypoints: Vec<Waypoint>,
        distance_km: f64,
        duration_seconds: u64,
        departure: DateTime<Utc>,
        checkpoints: Vec<Checkpoint>,
    ) -> Self {
        let arrival = checkpoints
            .last()
            .map_or(departure, |checkpoint| checkpoint.arrival_time);
        let risky_checkpoints = checkpoints
            .iter()
            .filter(|checkpoint| checkpoint.weather.is_risky())
            .count();

        Self {
            waypoints,
            distance_km,
            duration_seconds,
            departure,
            arrival,
            checkpoints,
            risky_checkpoints,
        }
    }

    /// Checkpoints whose weather was flagged as risky
    pub fn risky(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints
            .iter()
            .filter(|checkpoint| checkpoint.weather.is_risky())
    }
}
