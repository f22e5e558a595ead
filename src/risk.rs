//! Driving risk classification for a weather reading

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a reading was flagged as risky
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskReason {
    #[serde(rename = "Snow")]
    Snow,
    #[serde(rename = "Ice risk")]
    IceRisk,
    #[serde(rename = "Fog risk")]
    FogRisk,
    #[serde(rename = "High winds")]
    HighWinds,
    #[serde(rename = "Heavy rain")]
    HeavyRain,
    #[serde(rename = "Thunderstorm")]
    Thunderstorm,
}

impl RiskReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskReason::Snow => "Snow",
            RiskReason::IceRisk => "Ice risk",
            RiskReason::FogRisk => "Fog risk",
            RiskReason::HighWinds => "High winds",
            RiskReason::HeavyRain => "Heavy rain",
            RiskReason::Thunderstorm => "Thunderstorm",
        }
    }
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub is_risky: bool,
    pub risk_reason: Option<RiskReason>,
}

impl RiskAssessment {
    #[must_use]
    pub fn safe() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn risky(reason: RiskReason) -> Self {
        Self {
            is_risky: true,
            risk_reason: Some(reason),
        }
    }
}

/// Wind speed in km/h above which conditions count as high winds
const HIGH_WIND_KMH: u32 = 30;
const FOG_HUMIDITY: u8 = 90;
const RAIN_HUMIDITY: u8 = 80;

/// Classify a reading. Rules are checked in order and the first match wins.
#[must_use]
pub fn assess_risk(temperature: i32, condition: &str, wind_speed: u32, humidity: u8) -> RiskAssessment {
    let condition = condition.to_lowercase();

    if temperature < 0 && condition.contains("snow") {
        return RiskAssessment::risky(RiskReason::Snow);
    }
    if temperature < 0 {
        return RiskAssessment::risky(RiskReason::IceRisk);
    }
    if condition.contains("fog") && humidity > FOG_HUMIDITY {
        return RiskAssessment::risky(RiskReason::FogRisk);
    }
    if wind_speed > HIGH_WIND_KMH {
        return RiskAssessment::risky(RiskReason::HighWinds);
    }
    if condition.contains("rain") && humidity > RAIN_HUMIDITY {
        return RiskAssessment::risky(RiskReason::HeavyRain);
    }
    if condition.contains("thunderstorm") {
        return RiskAssessment::risky(RiskReason::Thunderstorm);
    }

    RiskAssessment::safe()
}
