//! Weather reading model and icon categories

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::Coordinate;
use crate::risk::{RiskAssessment, RiskReason};

/// Coarse visual bucket for a weather condition
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum IconCategory {
    Sun,
    Moon,
    Cloud,
    CloudSun,
    CloudMoon,
    CloudRain,
    CloudLightning,
    CloudSnow,
    CloudFog,
    CloudDrizzle,
}

impl IconCategory {
    /// Map a provider icon code (e.g. `"10d"`) to a category.
    /// Unknown codes land in [`IconCategory::Cloud`].
    #[must_use]
    pub fn from_icon_code(code: &str) -> Self {
        match code {
            "01d" => IconCategory::Sun,
            "01n" => IconCategory::Moon,
            "02d" => IconCategory::CloudSun,
            "02n" => IconCategory::CloudMoon,
            "03d" | "03n" | "04d" | "04n" => IconCategory::Cloud,
            "09d" | "09n" => IconCategory::CloudDrizzle,
            "10d" | "10n" => IconCategory::CloudRain,
            "11d" | "11n" => IconCategory::CloudLightning,
            "13d" | "13n" => IconCategory::CloudSnow,
            "50d" | "50n" => IconCategory::CloudFog,
            _ => IconCategory::Cloud,
        }
    }

    /// Map a provider numeric condition id to a category
    #[must_use]
    pub fn from_condition_id(id: u16) -> Self {
        match id {
            200..=299 => IconCategory::CloudLightning,
            300..=399 | 500..=501 => IconCategory::CloudDrizzle,
            502..=599 => IconCategory::CloudRain,
            600..=699 => IconCategory::CloudSnow,
            700..=799 => IconCategory::CloudFog,
            800 => IconCategory::Sun,
            801 => IconCategory::CloudSun,
            _ => IconCategory::Cloud,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IconCategory::Sun => "sun",
            IconCategory::Moon => "moon",
            IconCategory::Cloud => "cloud",
            IconCategory::CloudSun => "cloud-sun",
            IconCategory::CloudMoon => "cloud-moon",
            IconCategory::CloudRain => "cloud-rain",
            IconCategory::CloudLightning => "cloud-lightning",
            IconCategory::CloudSnow => "cloud-snow",
            IconCategory::CloudFog => "cloud-fog",
            IconCategory::CloudDrizzle => "cloud-drizzle",
        }
    }
}

impl fmt::Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A weather observation or forecast for one place and time
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub coordinates: Coordinate,
    /// Time this reading applies to
    pub time: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: i32,
    /// Human-readable description of weather conditions
    pub condition: String,
    pub icon: IconCategory,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in km/h
    pub wind_speed: u32,
}

impl WeatherReading {
    /// Convert provider wind speed in m/s to whole km/h
    #[must_use]
    pub fn wind_ms_to_kmh(speed_ms: f64) -> u32 {
        let kmh = (speed_ms * 3.6).round();
        if kmh.is_finite() && kmh > 0.0 {
            kmh.min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    }

    /// Round a provider temperature to whole degrees
    #[must_use]
    pub fn round_temperature(celsius: f64) -> i32 {
        if celsius.is_finite() {
            celsius.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
        } else {
            0
        }
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{}°C", self.temperature)
    }

    /// Format wind information
    #[must_use]
    pub fn format_wind(&self) -> String {
        format!("{} km/h", self.wind_speed)
    }
}

/// A weather reading together with its risk assessment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherDataPoint {
    #[serde(flatten)]
    pub reading: WeatherReading,
    #[serde(flatten)]
    pub risk: RiskAssessment,
}

impl WeatherDataPoint {
    /// Attach a freshly computed risk assessment to a reading
    #[must_use]
    pub fn assess(reading: WeatherReading) -> Self {
        let risk = crate::risk::assess_risk(
            reading.temperature,
            &reading.condition,
            reading.wind_speed,
            reading.humidity,
        );
        Self { reading, risk }
    }

    #[must_use]
    pub fn is_risky(&self) -> bool {
        self.risk.is_risky
    }

    #[must_use]
    pub fn risk_reason(&self) -> Option<RiskReason> {
        self.risk.risk_reason
    }
}
