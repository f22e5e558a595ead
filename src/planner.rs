//! Route planning with weather along the way
//!
//! Ties the directions provider, the checkpoint sampler and the weather
//! service together into a single [`RouteForecast`].

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::RoutecastError;
use crate::directions::{DirectionsProvider, Route};
use crate::geo;
use crate::models::RouteForecast;
use crate::sampler::CheckpointSampler;
use crate::weather::WeatherLookup;

/// What the user asked for
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub start: String,
    pub end: String,
    /// Intermediate stops in travel order
    pub via: Vec<String>,
    pub departure: DateTime<Utc>,
}

pub struct RoutePlanner<D, W> {
    directions: D,
    weather: W,
    sampler: CheckpointSampler,
}

impl<D: DirectionsProvider, W: WeatherLookup> RoutePlanner<D, W> {
    pub fn new(directions: D, weather: W, sampler: CheckpointSampler) -> Self {
        Self {
            directions,
            weather,
            sampler,
        }
    }

    #[must_use]
    pub fn weather(&self) -> &W {
        &self.weather
    }

    /// Plan a route and forecast weather along it.
    ///
    /// Returns `Ok(None)` when no route could be found, including provider
    /// failures. Only invalid input is reported as an error.
    #[instrument(skip(self), fields(start = %request.start, end = %request.end))]
    pub async fn plan(&self, request: &PlanRequest) -> Result<Option<RouteForecast>> {
        if request.start.trim().is_empty() || request.end.trim().is_empty() {
            return Err(RoutecastError::validation("Start and end locations cannot be empty").into());
        }

        let route = match self
            .directions
            .plan(&request.start, &request.end, &request.via)
            .await
        {
            Ok(Some(route)) => route,
            Ok(None) => {
                warn!("No route found");
                return Ok(None);
            }
            Err(err) => {
                warn!(error = %err, "Directions provider failed");
                return Ok(None);
            }
        };

        Ok(Some(self.forecast_route(&route, request.departure).await))
    }

    /// Sample weather along an already computed route
    pub async fn forecast_route(&self, route: &Route, departure: DateTime<Utc>) -> RouteForecast {
        let duration_seconds = route.duration_seconds();
        let checkpoints = self
            .sampler
            .sample_route(
                &self.weather,
                &route.geometry,
                departure,
                duration_seconds,
                &route.waypoints,
            )
            .await;

        // Providers report distance; fall back to the geometry when they don't
        let distance_km = if route.distance_m > 0.0 {
            route.distance_km()
        } else {
            geo::route_length(&route.geometry)
        };

        let forecast = RouteForecast::new(
            route.waypoints.clone(),
            distance_km,
            duration_seconds,
            departure,
            checkpoints,
        );
        info!(
            checkpoints = forecast.checkpoints.len(),
            risky = forecast.risky_checkpoints,
            "Route forecast ready"
        );
        forecast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, Waypoint};
    use crate::weather::WeatherService;
    use anyhow::anyhow;
    use chrono::{Duration, TimeZone};

    enum FakeDirections {
        Found(Route),
        NotFound,
        Broken,
    }

    impl DirectionsProvider for FakeDirections {
        async fn plan(&self, _: &str, _: &str, _: &[String]) -> Result<Option<Route>> {
            match self {
                FakeDirections::Found(route) => Ok(Some(route.clone())),
                FakeDirections::NotFound => Ok(None),
                FakeDirections::Broken => Err(anyhow!("503 Service Unavailable")),
            }
        }
    }

    fn route() -> Route {
        let geometry: Vec<Coordinate> = (0..=20)
            .map(|i| Coordinate::new(10.0 + f64::from(i) * 0.05, 53.5 - f64::from(i) * 0.05))
            .collect();
        Route {
            waypoints: vec![
                Waypoint::new("Hamburg", geometry[0]),
                Waypoint::new("Lüneburg", geometry[20]),
            ],
            distance_m: 0.0,
            duration_s: 4500.4,
            geometry,
        }
    }

    fn request() -> PlanRequest {
        PlanRequest {
            start: "Hamburg".to_string(),
            end: "Lüneburg".to_string(),
            via: vec![],
            departure: Utc.with_ymd_and_hms(2024, 1, 20, 6, 30, 0).unwrap(),
        }
    }

    fn planner(directions: FakeDirections) -> RoutePlanner<FakeDirections, WeatherService> {
        RoutePlanner::new(directions, WeatherService::synthetic(), CheckpointSampler::default())
    }

    #[tokio::test]
    async fn test_plan_produces_forecast() {
        let planner = planner(FakeDirections::Found(route()));
        let forecast = planner.plan(&request()).await.unwrap().unwrap();

        assert_eq!(forecast.duration_seconds, 4500);
        assert_eq!(forecast.arrival, request().departure + Duration::seconds(4500));
        assert_eq!(forecast.checkpoints.first().unwrap().location, "Hamburg");
        assert_eq!(forecast.checkpoints.last().unwrap().location, "Lüneburg");
        assert!(forecast.distance_km > 100.0);
        assert_eq!(
            forecast.risky_checkpoints,
            forecast.checkpoints.iter().filter(|c| c.weather.is_risky()).count()
        );
        assert!(!planner.weather().cache().is_empty());
    }

    #[tokio::test]
    async fn test_no_route_is_none() {
        let planner = planner(FakeDirections::NotFound);
        assert!(planner.plan(&request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_none() {
        let planner = planner(FakeDirections::Broken);
        assert!(planner.plan(&request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_start_is_rejected() {
        let planner = planner(FakeDirections::NotFound);
        let mut request = request();
        request.start = "  ".to_string();
        let err = planner.plan(&request).await.unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }
}
