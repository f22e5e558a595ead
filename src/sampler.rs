//! Checkpoint sampling along a route
//!
//! Walks the route geometry, interpolates arrival times by the fraction of
//! distance covered, and emits a checkpoint whenever enough time or distance
//! has passed since the previous one. Weather for all checkpoints is resolved
//! concurrently and reassembled in route order.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::SamplingConfig;
use crate::geo;
use crate::models::{Checkpoint, Coordinate, Waypoint};
use crate::weather::WeatherLookup;

const START_LABEL: &str = "Start";
const END_LABEL: &str = "End";
const EN_ROUTE_LABEL: &str = "En route";

/// Thresholds controlling how densely checkpoints are placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
    /// Emit once this much time has elapsed since the last checkpoint
    pub interval: Duration,
    /// Emit once this many kilometers have been covered since the last checkpoint
    pub distance_km: f64,
    /// Destination is redundant if the last checkpoint is this close in time...
    pub end_merge_interval: Duration,
    /// ...and this close in kilometers
    pub end_merge_km: f64,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::minutes(15),
            distance_km: 10.0,
            end_merge_interval: Duration::minutes(5),
            end_merge_km: 2.0,
        }
    }
}

impl From<&SamplingConfig> for SamplingPolicy {
    fn from(config: &SamplingConfig) -> Self {
        Self {
            interval: Duration::minutes(i64::from(config.interval_minutes)),
            distance_km: config.distance_km,
            end_merge_interval: Duration::minutes(i64::from(config.end_merge_minutes)),
            end_merge_km: config.end_merge_km,
        }
    }
}

/// A place and time at which weather will be sampled
#[derive(Debug, Clone, PartialEq)]
struct SamplePoint {
    location: String,
    arrival_time: DateTime<Utc>,
    coordinates: Coordinate,
}

#[derive(Debug, Clone, Default)]
pub struct CheckpointSampler {
    policy: SamplingPolicy,
}

impl CheckpointSampler {
    #[must_use]
    pub fn new(policy: SamplingPolicy) -> Self {
        Self { policy }
    }

    /// Sample weather checkpoints along `geometry`.
    ///
    /// An empty or malformed geometry yields no checkpoints. The first
    /// checkpoint is always at the route start at `departure`; unless the
    /// route is a single point, the last one is at the route end at
    /// `departure + total_duration_seconds`, except when an intermediate
    /// checkpoint already sits close enough to the end in time and distance.
    pub async fn sample_route<L: WeatherLookup>(
        &self,
        weather: &L,
        geometry: &[Coordinate],
        departure: DateTime<Utc>,
        total_duration_seconds: u64,
        waypoints: &[Waypoint],
    ) -> Vec<Checkpoint> {
        let points = self.plan_samples(geometry, departure, total_duration_seconds, waypoints);
        debug!(checkpoints = points.len(), "Resolving weather along route");

        let lookups = points
            .iter()
            .map(|point| weather.get_weather(&point.coordinates, point.arrival_time));
        let readings = join_all(lookups).await;

        points
            .into_iter()
            .zip(readings)
            .map(|(point, weather)| Checkpoint {
                location: point.location,
                arrival_time: point.arrival_time,
                coordinates: point.coordinates,
                weather,
            })
            .collect()
    }

    fn plan_samples(
        &self,
        geometry: &[Coordinate],
        departure: DateTime<Utc>,
        total_duration_seconds: u64,
        waypoints: &[Waypoint],
    ) -> Vec<SamplePoint> {
        let (Some(first), Some(last)) = (geometry.first(), geometry.last()) else {
            return Vec::new();
        };
        if let Some(invalid) = geometry.iter().find(|coordinate| !coordinate.is_valid()) {
            warn!(?invalid, "Route geometry contains an invalid coordinate");
            return Vec::new();
        }
        let Ok(duration_ms) = i64::try_from(total_duration_seconds.saturating_mul(1000)) else {
            warn!(total_duration_seconds, "Trip duration out of range");
            return Vec::new();
        };
        let Some(arrival) = departure.checked_add_signed(Duration::milliseconds(duration_ms)) else {
            warn!(total_duration_seconds, "Trip arrival time out of range");
            return Vec::new();
        };

        let mut samples = vec![SamplePoint {
            location: waypoints
                .first()
                .map_or_else(|| START_LABEL.to_string(), |waypoint| waypoint.name.clone()),
            arrival_time: departure,
            coordinates: *first,
        }];

        if geometry.len() == 1 {
            return samples;
        }

        let total_km = geo::route_length(geometry);
        let mut covered_km = 0.0;
        let mut last_sample_km = 0.0;
        let mut last_sample_time = departure;

        // The final vertex is left to the destination checkpoint below
        for (index, segment) in geometry.windows(2).enumerate() {
            covered_km += geo::distance(&segment[0], &segment[1]);
            let point = segment[1];
            if index + 2 == geometry.len() {
                break;
            }

            let fraction = if total_km > 0.0 { covered_km / total_km } else { 0.0 };
            let elapsed = Duration::milliseconds((fraction * duration_ms as f64).round() as i64);
            let time = departure + elapsed;

            if time - last_sample_time >= self.policy.interval
                || covered_km - last_sample_km >= self.policy.distance_km
            {
                samples.push(SamplePoint {
                    location: geo::nearest_waypoint(&point, waypoints)
                        .map_or_else(|| EN_ROUTE_LABEL.to_string(), |waypoint| waypoint.name.clone()),
                    arrival_time: time,
                    coordinates: point,
                });
                last_sample_km = covered_km;
                last_sample_time = time;
            }
        }

        let destination = SamplePoint {
            location: waypoints
                .last()
                .map_or_else(|| END_LABEL.to_string(), |waypoint| waypoint.name.clone()),
            arrival_time: arrival,
            coordinates: *last,
        };

        // Only an intermediate checkpoint can stand in for the destination
        let redundant = samples.len() > 1
            && samples.last().is_some_and(|previous| {
                destination.arrival_time - previous.arrival_time <= self.policy.end_merge_interval
                    && geo::distance(&previous.coordinates, &destination.coordinates)
                        <= self.policy.end_merge_km
            });
        if !redundant {
            samples.push(destination);
        }

        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IconCategory, WeatherDataPoint, WeatherReading};
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Records lookups and returns a fixed clear-sky reading
    #[derive(Default)]
    struct RecordingLookup {
        calls: Mutex<Vec<(Coordinate, DateTime<Utc>)>>,
    }

    impl WeatherLookup for RecordingLookup {
        async fn get_weather(&self, coordinates: &Coordinate, time: DateTime<Utc>) -> WeatherDataPoint {
            self.calls.lock().unwrap().push((*coordinates, time));
            WeatherDataPoint::assess(WeatherReading {
                coordinates: *coordinates,
                time,
                temperature: 14,
                condition: "Clear".to_string(),
                icon: IconCategory::Sun,
                humidity: 50,
                wind_speed: 8,
            })
        }
    }

    fn departure() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 9, 0, 0).unwrap()
    }

    /// Points along the equator spaced ~5 km apart
    fn straight_route(points: usize) -> Vec<Coordinate> {
        (0..points)
            .map(|i| Coordinate::new(i as f64 * 0.045, 0.0))
            .collect()
    }

    fn start_end(geometry: &[Coordinate]) -> Vec<Waypoint> {
        vec![
            Waypoint::new("Origin", geometry[0]),
            Waypoint::new("Destination", geometry[geometry.len() - 1]),
        ]
    }

    #[tokio::test]
    async fn test_twenty_km_half_hour_route() {
        let geometry = straight_route(5);
        let waypoints = start_end(&geometry);
        let lookup = RecordingLookup::default();

        let checkpoints = CheckpointSampler::default()
            .sample_route(&lookup, &geometry, departure(), 1800, &waypoints)
            .await;

        assert!(checkpoints.len() >= 2);
        assert_eq!(checkpoints[0].location, "Origin");
        assert_eq!(checkpoints[0].arrival_time, departure());
        let last = checkpoints.last().unwrap();
        assert_eq!(last.location, "Destination");
        assert_eq!(last.arrival_time, departure() + Duration::seconds(1800));
        assert_eq!(last.coordinates, geometry[4]);
        // One intermediate checkpoint after ~10 km
        assert_eq!(checkpoints.len(), 3);
        assert_eq!(checkpoints[1].coordinates, geometry[2]);
    }

    #[tokio::test]
    async fn test_time_threshold_triggers_on_slow_trips() {
        // ~20 km over two hours: time, not distance, drives sampling
        let geometry = straight_route(5);
        let checkpoints = CheckpointSampler::default()
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 7200, &[])
            .await;

        let labels: Vec<&str> = checkpoints.iter().map(|c| c.location.as_str()).collect();
        assert_eq!(labels, vec!["Start", "En route", "En route", "En route", "End"]);
        for pair in checkpoints.windows(2) {
            assert!(pair[1].arrival_time > pair[0].arrival_time);
        }
    }

    #[tokio::test]
    async fn test_arrival_time_follows_distance_not_index() {
        // Dense vertices near the start, one long final stretch
        let geometry = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.001, 0.0),
            Coordinate::new(0.002, 0.0),
            Coordinate::new(0.003, 0.0),
            Coordinate::new(0.9, 0.0),
            Coordinate::new(1.0, 0.0),
        ];
        let checkpoints = CheckpointSampler::default()
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 3600, &[])
            .await;

        let intermediate = checkpoints
            .iter()
            .find(|c| c.coordinates == geometry[4])
            .unwrap();
        let elapsed = intermediate.arrival_time - departure();
        assert!((elapsed.num_seconds() - 3240).abs() <= 1, "elapsed {elapsed}");
    }

    #[tokio::test]
    async fn test_single_coordinate_route() {
        let geometry = vec![Coordinate::new(13.4, 52.5)];
        let lookup = RecordingLookup::default();
        let checkpoints = CheckpointSampler::default()
            .sample_route(&lookup, &geometry, departure(), 900, &[])
            .await;

        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].coordinates, geometry[0]);
        assert_eq!(checkpoints[0].arrival_time, departure());
        assert_eq!(checkpoints[0].location, "Start");
        assert_eq!(lookup.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_route() {
        let lookup = RecordingLookup::default();
        let checkpoints = CheckpointSampler::default()
            .sample_route(&lookup, &[], departure(), 1800, &[])
            .await;
        assert!(checkpoints.is_empty());
        assert!(lookup.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_route() {
        let geometry = vec![Coordinate::new(0.0, 0.0), Coordinate::new(200.0, 95.0)];
        let checkpoints = CheckpointSampler::default()
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 1800, &[])
            .await;
        assert!(checkpoints.is_empty());
    }

    #[tokio::test]
    async fn test_zero_duration_trip() {
        let geometry = vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.005, 0.0)];
        let checkpoints = CheckpointSampler::default()
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 0, &[])
            .await;

        assert_eq!(checkpoints.len(), 2);
        assert_eq!(checkpoints[0].arrival_time, departure());
        assert_eq!(checkpoints[1].arrival_time, departure());
        assert_eq!(checkpoints[1].location, "End");
    }

    #[tokio::test]
    async fn test_redundant_destination_is_skipped() {
        // Intermediate sample lands 10.5 km in; the end is 0.5 km and ~1 minute later
        let geometry = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0944, 0.0),
            Coordinate::new(0.0989, 0.0),
        ];
        let policy = SamplingPolicy::default();
        let checkpoints = CheckpointSampler::new(policy)
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 1200, &[])
            .await;

        assert_eq!(checkpoints.len(), 2);
        assert_eq!(checkpoints[1].location, "En route");
        assert_eq!(checkpoints[1].coordinates, geometry[1]);
    }

    #[tokio::test]
    async fn test_destination_kept_when_close_in_time_but_far_away() {
        // Intermediate at 10.5 km, end 3 km further but only ~2 minutes later
        let geometry = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0944, 0.0),
            Coordinate::new(0.1214, 0.0),
        ];
        let checkpoints = CheckpointSampler::default()
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 600, &[])
            .await;

        assert_eq!(checkpoints.len(), 3);
        let gap = checkpoints[2].arrival_time - checkpoints[1].arrival_time;
        assert!(gap <= Duration::minutes(5), "gap {gap}");
        assert_eq!(checkpoints[2].location, "End");
        assert_eq!(checkpoints[2].coordinates, geometry[2]);
    }

    #[tokio::test]
    async fn test_destination_kept_when_nearby_but_much_later() {
        // Intermediate at 10.5 km, end 0.5 km further but ~8 minutes later
        let geometry = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0944, 0.0),
            Coordinate::new(0.0989, 0.0),
        ];
        let checkpoints = CheckpointSampler::default()
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 10_800, &[])
            .await;

        assert_eq!(checkpoints.len(), 3);
        let gap = checkpoints[2].arrival_time - checkpoints[1].arrival_time;
        assert!(gap > Duration::minutes(5), "gap {gap}");
        assert!(geo::distance(&checkpoints[1].coordinates, &checkpoints[2].coordinates) <= 2.0);
        assert_eq!(checkpoints[2].location, "End");
    }

    #[tokio::test]
    async fn test_labels_use_nearest_waypoint() {
        let geometry = straight_route(9);
        let waypoints = vec![
            Waypoint::new("West", Coordinate::new(0.0, 0.0)),
            Waypoint::new("Middle", Coordinate::new(0.18, 0.01)),
            Waypoint::new("East", Coordinate::new(0.36, 0.0)),
        ];
        let checkpoints = CheckpointSampler::default()
            .sample_route(&RecordingLookup::default(), &geometry, departure(), 2400, &waypoints)
            .await;

        assert_eq!(checkpoints.first().unwrap().location, "West");
        assert_eq!(checkpoints.last().unwrap().location, "East");
        assert!(checkpoints.iter().any(|c| c.location == "Middle"));
    }

    #[tokio::test]
    async fn test_weather_resolved_at_checkpoint_time() {
        let geometry = straight_route(5);
        let lookup = RecordingLookup::default();
        let checkpoints = CheckpointSampler::default()
            .sample_route(&lookup, &geometry, departure(), 1800, &[])
            .await;

        let calls = lookup.calls.lock().unwrap();
        assert_eq!(calls.len(), checkpoints.len());
        for checkpoint in &checkpoints {
            assert_eq!(checkpoint.weather.reading.time, checkpoint.arrival_time);
            assert!(calls.contains(&(checkpoint.coordinates, checkpoint.arrival_time)));
        }
    }
}
