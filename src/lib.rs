//! `routecast` - route planning with weather along the way
//!
//! Given a route geometry, a departure time and a trip duration, this crate
//! samples checkpoints along the route and attaches a weather forecast and a
//! driving risk assessment to each of them.

pub mod cache;
pub mod config;
pub mod directions;
pub mod error;
pub mod geo;
pub mod http;
pub mod logging;
pub mod models;
pub mod planner;
pub mod risk;
pub mod sampler;
pub mod weather;

// Re-export core types for public API
pub use config::RoutecastConfig;
pub use directions::{DirectionsProvider, MapboxDirections, Route};
pub use error::RoutecastError;
pub use models::{Checkpoint, Coordinate, IconCategory, RouteForecast, Waypoint, WeatherDataPoint, WeatherReading};
pub use planner::{PlanRequest, RoutePlanner};
pub use risk::{RiskAssessment, RiskReason, assess_risk};
pub use sampler::{CheckpointSampler, SamplingPolicy};
pub use weather::{WeatherLookup, WeatherProvider, WeatherService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
