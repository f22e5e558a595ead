//! Configuration management for routecast
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::RoutecastError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutecastConfig {
    /// Weather provider configuration
    pub weather: WeatherConfig,
    /// Directions provider configuration
    pub directions: DirectionsConfig,
    /// Checkpoint spacing
    pub sampling: SamplingConfig,
    /// Persistent cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Weather provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Without one, synthetic weather is used.
    pub api_key: Option<String>,
    /// Base URL for the weather API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Requests within this many hours of now use current conditions
    #[serde(default = "default_current_window")]
    pub current_window_hours: u32,
}

/// Directions provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsConfig {
    /// Mapbox access token
    pub access_token: Option<String>,
    /// Base URL for the Mapbox API
    #[serde(default = "default_directions_base_url")]
    pub base_url: String,
    /// Routing profile (driving, driving-traffic, walking, cycling)
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// How long computed routes stay cached, in hours
    #[serde(default = "default_route_cache_ttl")]
    pub cache_ttl_hours: u32,
}

/// Checkpoint spacing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "default_distance_km")]
    pub distance_km: f64,
    #[serde(default = "default_end_merge_minutes")]
    pub end_merge_minutes: u32,
    #[serde(default = "default_end_merge_km")]
    pub end_merge_km: f64,
}

/// Persistent cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Disable the persistent cache entirely
    #[serde(default)]
    pub disabled: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_directions_base_url() -> String {
    "https://api.mapbox.com".to_string()
}

fn default_profile() -> String {
    "driving".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_current_window() -> u32 {
    2
}

fn default_route_cache_ttl() -> u32 {
    24 * 7
}

fn default_interval_minutes() -> u32 {
    15
}

fn default_distance_km() -> f64 {
    10.0
}

fn default_end_merge_minutes() -> u32 {
    5
}

fn default_end_merge_km() -> f64 {
    2.0
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("routecast"))
        .unwrap_or_else(|| PathBuf::from(".routecast-cache"))
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            current_window_hours: default_current_window(),
        }
    }
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: default_directions_base_url(),
            profile: default_profile(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            cache_ttl_hours: default_route_cache_ttl(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            distance_km: default_distance_km(),
            end_merge_minutes: default_end_merge_minutes(),
            end_merge_km: default_end_merge_km(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            location: default_cache_location(),
            disabled: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl RoutecastConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. ROUTECAST_WEATHER__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("ROUTECAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: RoutecastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("routecast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        // Blank credentials mean "not configured"
        if self.weather.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            self.weather.api_key = None;
        }
        if self
            .directions
            .access_token
            .as_deref()
            .is_some_and(|token| token.trim().is_empty())
        {
            self.directions.access_token = None;
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_timeout();
        }
        if self.directions.base_url.is_empty() {
            self.directions.base_url = default_directions_base_url();
        }
        if self.directions.profile.is_empty() {
            self.directions.profile = default_profile();
        }
        if self.directions.timeout_seconds == 0 {
            self.directions.timeout_seconds = default_timeout();
        }
        if self.directions.cache_ttl_hours == 0 {
            self.directions.cache_ttl_hours = default_route_cache_ttl();
        }
        if self.sampling.interval_minutes == 0 {
            self.sampling.interval_minutes = default_interval_minutes();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 || self.directions.timeout_seconds > 300 {
            return Err(RoutecastError::config("API timeout cannot exceed 300 seconds").into());
        }

        if self.weather.max_retries > 10 || self.directions.max_retries > 10 {
            return Err(RoutecastError::config("API max retries cannot exceed 10").into());
        }

        if self.weather.current_window_hours > 24 {
            return Err(RoutecastError::config(
                "Current conditions window cannot exceed 24 hours",
            )
            .into());
        }

        if !(self.sampling.distance_km.is_finite() && self.sampling.distance_km > 0.0) {
            return Err(RoutecastError::config("Sampling distance must be a positive number").into());
        }

        if !(self.sampling.end_merge_km.is_finite() && self.sampling.end_merge_km >= 0.0) {
            return Err(RoutecastError::config("End merge distance cannot be negative").into());
        }

        if self.sampling.interval_minutes > 24 * 60 {
            return Err(RoutecastError::config("Sampling interval cannot exceed 24 hours").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RoutecastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RoutecastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_profiles = ["driving", "driving-traffic", "walking", "cycling"];
        if !valid_profiles.contains(&self.directions.profile.as_str()) {
            return Err(RoutecastError::config(format!(
                "Invalid routing profile '{}'. Must be one of: {}",
                self.directions.profile,
                valid_profiles.join(", ")
            ))
            .into());
        }

        for url in [&self.weather.base_url, &self.directions.base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RoutecastError::config(format!(
                    "API base URL '{url}' must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RoutecastConfig::default();
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(config.weather.timeout_seconds, 30);
        assert_eq!(config.weather.current_window_hours, 2);
        assert_eq!(config.directions.profile, "driving");
        assert_eq!(config.sampling.interval_minutes, 15);
        assert_eq!(config.sampling.distance_km, 10.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.weather.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_api_key_means_unconfigured() {
        let mut config = RoutecastConfig::default();
        config.weather.api_key = Some("   ".to_string());
        config.apply_defaults();
        assert!(config.weather.api_key.is_none());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = RoutecastConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = RoutecastConfig::default();
        config.weather.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = RoutecastConfig::default();
        config.sampling.distance_km = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_profile() {
        let mut config = RoutecastConfig::default();
        config.directions.profile = "teleport".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid routing profile"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[weather]
api_key = "0123456789abcdef"

[sampling]
interval_minutes = 30
distance_km = 25.0
"#
        )
        .unwrap();

        let config = RoutecastConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.weather.api_key.as_deref(), Some("0123456789abcdef"));
        assert_eq!(config.sampling.interval_minutes, 30);
        assert_eq!(config.sampling.distance_km, 25.0);
        // Untouched sections keep their defaults
        assert_eq!(config.sampling.end_merge_minutes, 5);
        assert_eq!(config.directions.profile, "driving");
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = RoutecastConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("routecast"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
