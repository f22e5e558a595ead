//! Distance helpers for route geometry

use haversine::{Location as HaversineLocation, Units, distance as haversine_distance};

use crate::models::{Coordinate, Waypoint};

/// Great-circle distance between two coordinates in kilometers
#[must_use]
pub fn distance(from: &Coordinate, to: &Coordinate) -> f64 {
    let from_haversine = HaversineLocation {
        latitude: from.latitude,
        longitude: from.longitude,
    };
    let to_haversine = HaversineLocation {
        latitude: to.latitude,
        longitude: to.longitude,
    };
    haversine_distance(from_haversine, to_haversine, Units::Kilometers)
}

/// Straight-line distance in raw degree space. Only good enough for picking a label.
#[must_use]
pub fn planar_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    (from.longitude - to.longitude).hypot(from.latitude - to.latitude)
}

/// Sum of the segment lengths of a polyline in kilometers
#[must_use]
pub fn route_length(geometry: &[Coordinate]) -> f64 {
    geometry
        .windows(2)
        .map(|segment| distance(&segment[0], &segment[1]))
        .sum()
}

/// Waypoint closest to `point` by planar distance, `None` if there are no waypoints
#[must_use]
pub fn nearest_waypoint<'a>(point: &Coordinate, waypoints: &'a [Waypoint]) -> Option<&'a Waypoint> {
    waypoints.iter().min_by(|a, b| {
        planar_distance(point, &a.coordinates).total_cmp(&planar_distance(point, &b.coordinates))
    })
}
