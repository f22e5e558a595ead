//! Weather lookups for points along a route
//!
//! [`WeatherService`] resolves a reading for a (coordinate, time) pair from a
//! live provider when a credential is configured and falls back to
//! deterministic synthetic data otherwise. It never fails: provider errors
//! are logged and replaced by the synthetic reading.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use crate::models::{Coordinate, WeatherDataPoint, WeatherReading};

pub mod cache;
pub mod openweathermap;
pub mod synthetic;

pub use cache::{CacheKey, WeatherCache};
pub use openweathermap::OpenWeatherMapClient;

/// A source of live weather readings
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, coordinates: &Coordinate, time: DateTime<Utc>) -> Result<WeatherReading>;
}

/// Anything that can produce an assessed weather data point for a place and time
pub trait WeatherLookup {
    async fn get_weather(&self, coordinates: &Coordinate, time: DateTime<Utc>) -> WeatherDataPoint;
}

/// Weather source with a session-scoped cache
pub struct WeatherService {
    provider: Option<Box<dyn WeatherProvider>>,
    cache: WeatherCache,
}

impl WeatherService {
    /// Service that only ever produces synthetic readings
    #[must_use]
    pub fn synthetic() -> Self {
        Self {
            provider: None,
            cache: WeatherCache::new(),
        }
    }

    #[must_use]
    pub fn with_provider(provider: Box<dyn WeatherProvider>) -> Self {
        Self {
            provider: Some(provider),
            cache: WeatherCache::new(),
        }
    }

    /// Use OpenWeatherMap when an API key is configured, synthetic data otherwise
    pub fn from_config(config: &WeatherConfig) -> Result<Self> {
        match &config.api_key {
            Some(api_key) => {
                let client = OpenWeatherMapClient::new(config, api_key.clone())?;
                Ok(Self::with_provider(Box::new(client)))
            }
            None => {
                debug!("No weather API key configured, using synthetic weather");
                Ok(Self::synthetic())
            }
        }
    }

    #[must_use]
    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    async fn resolve(&self, coordinates: &Coordinate, time: DateTime<Utc>) -> WeatherReading {
        let Some(provider) = &self.provider else {
            debug!("No weather provider, using synthetic weather");
            return synthetic::generate(coordinates, time);
        };

        match provider.fetch(coordinates, time).await {
            Ok(reading) => reading,
            Err(err) => {
                warn!(
                    error = %err,
                    lat = coordinates.latitude,
                    lon = coordinates.longitude,
                    "Weather provider failed, falling back to synthetic weather"
                );
                synthetic::generate(coordinates, time)
            }
        }
    }
}

impl WeatherLookup for WeatherService {
    #[tracing::instrument(name = "get_weather", level = "debug", skip(self))]
    async fn get_weather(&self, coordinates: &Coordinate, time: DateTime<Utc>) -> WeatherDataPoint {
        let key = CacheKey::new(coordinates, time);

        if let Some(cached) = self.cache.get(&key) {
            debug!("Weather found in cache");
            return cached;
        }

        let data_point = WeatherDataPoint::assess(self.resolve(coordinates, time).await);
        self.cache.put(key, data_point.clone());
        data_point
    }
}
