//! OpenWeatherMap provider
//!
//! Requests close to "now" go to the current-conditions endpoint, everything
//! else to the 5 day / 3 hour forecast endpoint, from which the entry closest
//! to the requested time is picked.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::WeatherProvider;
use crate::config::WeatherConfig;
use crate::http;
use crate::models::{Coordinate, IconCategory, WeatherReading};

/// Which endpoint serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    /// Current conditions when `time` is within `window` of `now`, forecast otherwise
    #[must_use]
    pub fn for_time(time: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> Self {
        if (time - now).abs() <= window {
            Endpoint::Current
        } else {
            Endpoint::Forecast
        }
    }

    fn path(self) -> &'static str {
        match self {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MainBlock {
    /// Temperature in Celsius (metric units)
    pub temp: f64,
    #[serde(default)]
    pub humidity: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConditionBlock {
    pub id: u16,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WindBlock {
    /// Wind speed in m/s (metric units)
    #[serde(default)]
    pub speed: f64,
}

/// One set of conditions; shared by the current endpoint and each forecast entry
#[derive(Debug, Deserialize, Clone)]
pub struct Conditions {
    /// Unix timestamp in seconds
    pub dt: i64,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
    #[serde(default)]
    pub wind: WindBlock,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastSeries {
    pub list: Vec<Conditions>,
}

/// Provider payload, resolved by which endpoint was queried
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    Current(Conditions),
    Forecast(ForecastSeries),
}

impl ProviderResponse {
    /// Turn the payload into a reading for `time`
    pub fn into_reading(self, coordinates: &Coordinate, time: DateTime<Utc>) -> Result<WeatherReading> {
        let conditions = match self {
            ProviderResponse::Current(conditions) => conditions,
            ProviderResponse::Forecast(series) => series
                .list
                .into_iter()
                .min_by_key(|entry| (entry.dt - time.timestamp()).abs())
                .ok_or_else(|| anyhow!("Forecast series is empty"))?,
        };
        Ok(conditions.to_reading(coordinates, time))
    }
}

impl Conditions {
    fn to_reading(&self, coordinates: &Coordinate, time: DateTime<Utc>) -> WeatherReading {
        let primary = self.weather.first();
        let condition = primary
            .map(|block| capitalize(&block.description))
            .filter(|description| !description.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let icon = match primary {
            Some(block) if !block.icon.is_empty() => IconCategory::from_icon_code(&block.icon),
            Some(block) => IconCategory::from_condition_id(block.id),
            None => IconCategory::Cloud,
        };

        WeatherReading {
            coordinates: *coordinates,
            time,
            temperature: WeatherReading::round_temperature(self.main.temp),
            condition,
            icon,
            humidity: self.main.humidity.round().clamp(0.0, 100.0) as u8,
            wind_speed: WeatherReading::wind_ms_to_kmh(self.wind.speed),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Live weather client for the OpenWeatherMap API
pub struct OpenWeatherMapClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    current_window: Duration,
}

impl OpenWeatherMapClient {
    pub fn new(config: &WeatherConfig, api_key: String) -> Result<Self> {
        let client = http::build_client(config.timeout_seconds, config.max_retries)?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            current_window: Duration::hours(i64::from(config.current_window_hours)),
        })
    }

    fn url(&self, endpoint: Endpoint, coordinates: &Coordinate) -> String {
        format!(
            "{}/{}?lat={}&lon={}&units=metric&appid={}",
            self.base_url,
            endpoint.path(),
            coordinates.latitude,
            coordinates.longitude,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn request(&self, endpoint: Endpoint, coordinates: &Coordinate) -> Result<ProviderResponse> {
        let response = self
            .client
            .get(self.url(endpoint, coordinates))
            .send()
            .await
            .context("Weather request failed")?
            .error_for_status()
            .context("Weather provider returned an error status")?;

        let payload = match endpoint {
            Endpoint::Current => ProviderResponse::Current(
                response
                    .json()
                    .await
                    .context("Failed to parse current conditions response")?,
            ),
            Endpoint::Forecast => ProviderResponse::Forecast(
                response
                    .json()
                    .await
                    .context("Failed to parse forecast response")?,
            ),
        };
        Ok(payload)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    #[instrument(name = "openweathermap", skip(self), fields(lat = coordinates.latitude, lon = coordinates.longitude))]
    async fn fetch(&self, coordinates: &Coordinate, time: DateTime<Utc>) -> Result<WeatherReading> {
        let endpoint = Endpoint::for_time(time, Utc::now(), self.current_window);
        debug!(?endpoint, "Calling the weather API");
        self.request(endpoint, coordinates)
            .await?
            .into_reading(coordinates, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CURRENT: &str = r#"{
        "coord": {"lon": 10.0, "lat": 53.55},
        "weather": [{"id": 501, "main": "Rain", "description": "moderate rain", "icon": "10n"}],
        "main": {"temp": 7.6, "feels_like": 4.1, "pressure": 1004, "humidity": 87},
        "wind": {"speed": 5.3, "deg": 240},
        "dt": 1710000000,
        "name": "Hamburg"
    }"#;

    const FORECAST: &str = r#"{
        "cod": "200",
        "list": [
            {"dt": 1710010800, "main": {"temp": -1.4, "humidity": 93},
             "weather": [{"id": 600, "description": "light snow", "icon": "13d"}],
             "wind": {"speed": 2.0}},
            {"dt": 1710021600, "main": {"temp": 0.6, "humidity": 95},
             "weather": [{"id": 741, "description": "fog", "icon": ""}],
             "wind": {"speed": 1.1}},
            {"dt": 1710032400, "main": {"temp": 3.2, "humidity": 70},
             "weather": [], "wind": {"speed": 9.0}}
        ]
    }"#;

    fn point() -> Coordinate {
        Coordinate::new(10.0, 53.55)
    }

    #[test]
    fn test_endpoint_selection() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let window = Duration::hours(2);
        assert_eq!(Endpoint::for_time(now, now, window), Endpoint::Current);
        assert_eq!(Endpoint::for_time(now + Duration::minutes(119), now, window), Endpoint::Current);
        assert_eq!(Endpoint::for_time(now - Duration::minutes(90), now, window), Endpoint::Current);
        assert_eq!(Endpoint::for_time(now + Duration::hours(3), now, window), Endpoint::Forecast);
    }

    #[test]
    fn test_current_conditions_mapping() {
        let conditions: Conditions = serde_json::from_str(CURRENT).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 16, 0, 0).unwrap();
        let reading = ProviderResponse::Current(conditions)
            .into_reading(&point(), time)
            .unwrap();

        assert_eq!(reading.temperature, 8);
        assert_eq!(reading.condition, "Moderate rain");
        assert_eq!(reading.icon, IconCategory::CloudRain);
        assert_eq!(reading.humidity, 87);
        assert_eq!(reading.wind_speed, 19);
        assert_eq!(reading.time, time);
    }

    #[test]
    fn test_forecast_picks_closest_entry() {
        let series: ForecastSeries = serde_json::from_str(FORECAST).unwrap();
        let time = DateTime::from_timestamp(1_710_020_000, 0).unwrap();
        let reading = ProviderResponse::Forecast(series)
            .into_reading(&point(), time)
            .unwrap();

        assert_eq!(reading.condition, "Fog");
        // Empty icon code falls back to the condition id
        assert_eq!(reading.icon, IconCategory::CloudFog);
        assert_eq!(reading.temperature, 1);
        assert_eq!(reading.wind_speed, 4);
    }

    #[test]
    fn test_forecast_entry_without_conditions() {
        let series: ForecastSeries = serde_json::from_str(FORECAST).unwrap();
        let time = DateTime::from_timestamp(1_710_040_000, 0).unwrap();
        let reading = ProviderResponse::Forecast(series)
            .into_reading(&point(), time)
            .unwrap();

        assert_eq!(reading.condition, "Unknown");
        assert_eq!(reading.icon, IconCategory::Cloud);
        assert_eq!(reading.wind_speed, 32);
    }

    #[test]
    fn test_empty_forecast_is_an_error() {
        let series = ForecastSeries { list: vec![] };
        let result = ProviderResponse::Forecast(series).into_reading(&point(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_url_building() {
        let config = crate::config::RoutecastConfig::default().weather;
        let client = OpenWeatherMapClient::new(&config, "secret key".to_string()).unwrap();
        let url = client.url(Endpoint::Forecast, &point());
        assert!(url.starts_with("https://api.openweathermap.org/data/2.5/forecast?"));
        assert!(url.contains("lat=53.55&lon=10"));
        assert!(url.contains("appid=secret%20key"));
    }
}
