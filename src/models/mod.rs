//! Data models for route weather planning
//!
//! - Location: coordinates and named waypoints
//! - Weather: readings, icon categories and assessed data points
//! - Checkpoint: samples along a route and the trip summary

pub mod checkpoint;
pub mod location;
pub mod weather;

pub use checkpoint::{Checkpoint, RouteForecast};
pub use location::{Coordinate, Waypoint};
pub use weather::{IconCategory, WeatherDataPoint, WeatherReading};
