//! Deterministic synthetic weather
//!
//! Used when no provider credential is configured or a live fetch fails.
//! Every value is derived from the cache key (rounded coordinates and UTC
//! hour), so the same place and hour always produce the same reading.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::{RngExt, SeedableRng, rngs::StdRng};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::cache::CacheKey;
use crate::models::{Coordinate, IconCategory, WeatherReading};

/// Conditions ordered from fair to foul; selection is biased toward the front.
const CONDITIONS: [(&str, &str); 9] = [
    ("Clear", "01"),
    ("Partly Cloudy", "02"),
    ("Cloudy", "03"),
    ("Overcast", "04"),
    ("Light Rain", "10"),
    ("Rain", "09"),
    ("Thunderstorm", "11"),
    ("Snow", "13"),
    ("Fog", "50"),
];

const FOG_CHANCE_EARLY_MORNING: f64 = 0.35;

/// Generate the synthetic reading for `coordinates` at `time`
#[must_use]
pub fn generate(coordinates: &Coordinate, time: DateTime<Utc>) -> WeatherReading {
    let key = CacheKey::new(coordinates, time);
    let mut rng = StdRng::seed_from_u64(key.seed());

    let anchor = key.coordinates();
    let bucket = key.bucket_start();
    let local_hour = local_solar_hour(&anchor, bucket);

    // Draw everything up front so the sequence never depends on branching
    let noise: f64 = rng.random_range(-3.0..3.0);
    let condition_roll: f64 = rng.random_range(0.0..1.0);
    let fog_roll: f64 = rng.random_range(0.0..1.0);
    let humidity_roll: f64 = rng.random_range(0.0..1.0);
    let wind_roll: f64 = rng.random_range(0.0..1.0);

    let temperature = WeatherReading::round_temperature(
        base_temperature(anchor.latitude)
            + seasonal_offset(anchor.latitude, bucket)
            + diurnal_offset(local_hour)
            + noise,
    );

    let index = ((condition_roll.powf(1.5) * CONDITIONS.len() as f64) as usize).min(CONDITIONS.len() - 1);
    let (mut condition, mut code) = CONDITIONS[index];

    if (4.0..9.0).contains(&local_hour) && fog_roll < FOG_CHANCE_EARLY_MORNING {
        (condition, code) = ("Fog", "50");
    }

    match (condition, temperature) {
        ("Light Rain", t) if t < 0 => (condition, code) = ("Light Snow", "13"),
        ("Rain", t) if t < 0 => (condition, code) = ("Snow", "13"),
        ("Snow", t) if t > 2 => (condition, code) = ("Rain", "09"),
        _ => {}
    }

    let suffix = if is_daylight(&anchor, bucket) { 'd' } else { 'n' };
    let icon = IconCategory::from_icon_code(&format!("{code}{suffix}"));

    let (humidity_min, humidity_max) = match code {
        "50" => (91.0, 100.0),
        "09" | "10" | "11" => (75.0, 95.0),
        "13" => (70.0, 90.0),
        _ => (40.0, 80.0),
    };
    let humidity = (humidity_min + humidity_roll * (humidity_max - humidity_min))
        .round()
        .clamp(0.0, 100.0) as u8;

    let (wind_min, wind_max) = if code == "11" { (20.0, 45.0) } else { (0.0, 30.0) };
    let wind_speed = (wind_min + wind_roll * (wind_max - wind_min)).round().max(0.0) as u32;

    WeatherReading {
        coordinates: *coordinates,
        time,
        temperature,
        condition: condition.to_string(),
        icon,
        humidity,
        wind_speed,
    }
}

/// Colder toward the poles
fn base_temperature(latitude: f64) -> f64 {
    25.0 - latitude.abs() / 2.0
}

/// Warmer in local summer, with a larger swing at higher latitudes
fn seasonal_offset(latitude: f64, time: DateTime<Utc>) -> f64 {
    let amplitude = 12.0 * latitude.abs() / 90.0;
    // Northern hemisphere peaks around mid July
    let phase = 2.0 * PI * (f64::from(time.ordinal()) - 200.0) / 365.25;
    let hemisphere = if latitude < 0.0 { -1.0 } else { 1.0 };
    hemisphere * amplitude * phase.cos()
}

/// Coldest around 03:00, warmest around 15:00 local solar time
fn diurnal_offset(local_hour: f64) -> f64 {
    -5.0 * (2.0 * PI * (local_hour - 3.0) / 24.0).cos()
}

fn local_solar_hour(coordinates: &Coordinate, time: DateTime<Utc>) -> f64 {
    let utc_hour = f64::from(time.hour()) + f64::from(time.minute()) / 60.0;
    (utc_hour + coordinates.longitude / 15.0).rem_euclid(24.0)
}

fn is_daylight(coordinates: &Coordinate, time: DateTime<Utc>) -> bool {
    let Some(position) = Coordinates::new(coordinates.latitude, coordinates.longitude) else {
        return (6.0..19.0).contains(&local_solar_hour(coordinates, time));
    };

    // Local days straddle UTC midnight far from Greenwich, check the neighbours too
    [-1, 0, 1].into_iter().any(|offset| {
        let date = time.date_naive() + Duration::days(offset);
        let solar_day = SolarDay::new(position, date);
        match (
            solar_day.event_time(SolarEvent::Sunrise),
            solar_day.event_time(SolarEvent::Sunset),
        ) {
            (Some(sunrise), Some(sunset)) => sunrise <= time && time <= sunset,
            // No sunrise or sunset: midnight sun or polar night all day
            _ => is_polar_summer(coordinates.latitude, time),
        }
    })
}

/// Approximate solar declination in degrees
fn solar_declination(time: DateTime<Utc>) -> f64 {
    23.44 * (2.0 * PI * (f64::from(time.ordinal()) - 81.0) / 365.0).sin()
}

/// Whether the sun is in the same hemisphere as `latitude`
fn is_polar_summer(latitude: f64, time: DateTime<Utc>) -> bool {
    solar_declination(time) * latitude > 0.0
}
