//! Directions provider integration (Mapbox)
//!
//! Geocodes place names and requests a driving route through them. A failed
//! lookup is reported as "no route" rather than an error so planning can
//! degrade gracefully.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::RngExt;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::cache::PersistentCache;
use crate::config::DirectionsConfig;
use crate::models::{Coordinate, Waypoint};
use crate::{RoutecastError, http};

/// A route as returned by the directions provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Route {
    /// Polyline from origin to destination
    pub geometry: Vec<Coordinate>,
    /// Total distance in meters
    pub distance_m: f64,
    /// Total duration in seconds
    pub duration_s: f64,
    /// Named stops the route passes through, origin first
    pub waypoints: Vec<Waypoint>,
}

impl Route {
    #[must_use]
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    /// Duration rounded to whole seconds, never negative
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        if self.duration_s.is_finite() && self.duration_s > 0.0 {
            self.duration_s.round() as u64
        } else {
            0
        }
    }
}

/// Something that can turn place names into a route
pub trait DirectionsProvider {
    /// Route from `start` to `end` via `via`, or `None` when no route can be found
    async fn plan(&self, start: &str, end: &str, via: &[String]) -> Result<Option<Route>>;
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<GeocodingFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodingFeature {
    center: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<RouteResponse>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    geometry: LineString,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<[f64; 2]>,
}

impl DirectionsResponse {
    fn into_route(self, waypoints: Vec<Waypoint>) -> Option<Route> {
        let route = self.routes.into_iter().next()?;
        Some(Route {
            geometry: route
                .geometry
                .coordinates
                .into_iter()
                .map(Coordinate::from)
                .collect(),
            distance_m: route.distance,
            duration_s: route.duration,
            waypoints,
        })
    }
}

pub struct MapboxDirections {
    client: ClientWithMiddleware,
    access_token: String,
    base_url: String,
    profile: String,
    cache: Option<PersistentCache>,
    cache_ttl_hours: u32,
}

impl MapboxDirections {
    pub fn new(config: &DirectionsConfig, cache: Option<PersistentCache>) -> Result<Self> {
        let access_token = config.access_token.clone().ok_or_else(|| {
            RoutecastError::config(
                "Missing Mapbox access token (set ROUTECAST_DIRECTIONS__ACCESS_TOKEN)",
            )
        })?;

        Ok(Self {
            client: http::build_client(config.timeout_seconds, config.max_retries)?,
            access_token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile.clone(),
            cache,
            cache_ttl_hours: config.cache_ttl_hours,
        })
    }

    /// Coordinates for a place name, `None` if the provider knows no such place
    #[instrument(skip(self))]
    pub async fn geocode(&self, query: &str) -> Result<Option<Coordinate>> {
        let url = format!(
            "{}/geocoding/v5/mapbox.places/{}.json?limit=1&access_token={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.access_token)
        );
        let response: GeocodingResponse = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| RoutecastError::api(format!("Geocoding request failed: {err}")))?
            .error_for_status()
            .context("Geocoding returned an error status")?
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        Ok(response
            .features
            .into_iter()
            .next()
            .map(|feature| Coordinate::from(feature.center)))
    }

    /// Geocode start, via points and end. Via points that cannot be found are skipped.
    pub async fn resolve_waypoints(
        &self,
        start: &str,
        end: &str,
        via: &[String],
    ) -> Result<Option<Vec<Waypoint>>> {
        let Some(start_coordinates) = self.geocode(start).await? else {
            warn!(start, "Could not geocode start location");
            return Ok(None);
        };
        let Some(end_coordinates) = self.geocode(end).await? else {
            warn!(end, "Could not geocode end location");
            return Ok(None);
        };

        let mut waypoints = vec![Waypoint::new(start, start_coordinates)];
        for name in via {
            match self.geocode(name).await? {
                Some(coordinates) => waypoints.push(Waypoint::new(name.as_str(), coordinates)),
                None => warn!(waypoint = %name, "Could not geocode waypoint, skipping it"),
            }
        }
        waypoints.push(Waypoint::new(end, end_coordinates));
        Ok(Some(waypoints))
    }

    fn cache_key(&self, waypoints: &[Waypoint]) -> String {
        let points: Vec<String> = waypoints
            .iter()
            .map(|waypoint| {
                format!(
                    "{:.5},{:.5}",
                    waypoint.coordinates.longitude, waypoint.coordinates.latitude
                )
            })
            .collect();
        format!("route:{}:{}", self.profile, points.join(";"))
    }

    /// Route through `waypoints` in order
    #[instrument(skip_all, fields(waypoints = waypoints.len()))]
    pub async fn route(&self, waypoints: &[Waypoint]) -> Result<Option<Route>> {
        let key = self.cache_key(waypoints);

        if let Some(cache) = &self.cache {
            match cache.get::<Route>(&key).await {
                // The key covers coordinates only, names come from this request
                Ok(Some(cached)) => {
                    return Ok(Some(Route {
                        waypoints: waypoints.to_vec(),
                        ..cached
                    }));
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "Route cache lookup failed"),
            }
        }

        let Some(route) = self.route_call(waypoints).await? else {
            return Ok(None);
        };

        if let Some(cache) = &self.cache {
            let jitter: f32 = rand::rng().random_range(0.9..1.1);
            let ttl = Duration::from_secs((self.cache_ttl_hours as f32 * 3600f32 * jitter) as u64);
            if let Err(err) = cache.put(&key, route.clone(), ttl).await {
                warn!(error = %err, "Failed to cache route");
            }
        }
        Ok(Some(route))
    }

    async fn route_call(&self, waypoints: &[Waypoint]) -> Result<Option<Route>> {
        debug!("Calling the directions API");
        let coordinates: Vec<String> = waypoints
            .iter()
            .map(|waypoint| {
                format!(
                    "{},{}",
                    waypoint.coordinates.longitude, waypoint.coordinates.latitude
                )
            })
            .collect();
        let url = format!(
            "{}/directions/v5/mapbox/{}/{}?alternatives=false&geometries=geojson&steps=false&access_token={}",
            self.base_url,
            self.profile,
            coordinates.join(";"),
            urlencoding::encode(&self.access_token)
        );

        let response: DirectionsResponse = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| RoutecastError::api(format!("Directions request failed: {err}")))?
            .error_for_status()
            .context("Directions returned an error status")?
            .json()
            .await
            .context("Failed to parse directions response")?;

        let route = response.into_route(waypoints.to_vec());
        if route.is_none() {
            warn!("No routes found");
        }
        Ok(route)
    }
}

impl DirectionsProvider for MapboxDirections {
    async fn plan(&self, start: &str, end: &str, via: &[String]) -> Result<Option<Route>> {
        let Some(waypoints) = self.resolve_waypoints(start, end, via).await? else {
            return Ok(None);
        };
        self.route(&waypoints).await
    }
}
