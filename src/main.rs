use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::warn;

use routecast::cache::PersistentCache;
use routecast::{
    CheckpointSampler, Coordinate, MapboxDirections, PlanRequest, RouteForecast, RoutePlanner,
    RoutecastConfig, RoutecastError, SamplingPolicy, WeatherDataPoint, WeatherLookup,
    WeatherService, logging,
};

#[derive(Parser)]
#[command(
    name = "routecast",
    version,
    about = "Route planning with a time-indexed weather forecast along the way"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan a route and show the weather at checkpoints along it
    Plan {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Intermediate stop, may be repeated
        #[arg(long)]
        via: Vec<String>,
        /// Departure time (RFC 3339), defaults to now
        #[arg(long)]
        depart: Option<DateTime<Utc>>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the weather for a single point and time
    Weather {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = err
                .downcast_ref::<RoutecastError>()
                .map_or_else(|| format!("{err:#}"), RoutecastError::user_message);
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = RoutecastConfig::load_from_path(cli.config)?;
    logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Command::Plan {
            from,
            to,
            via,
            depart,
            json,
        } => {
            let cache = open_cache(&config);
            let directions = MapboxDirections::new(&config.directions, cache)?;
            let weather = WeatherService::from_config(&config.weather)?;
            let sampler = CheckpointSampler::new(SamplingPolicy::from(&config.sampling));
            let planner = RoutePlanner::new(directions, weather, sampler);

            let request = PlanRequest {
                start: from,
                end: to,
                via,
                departure: depart.unwrap_or_else(Utc::now),
            };

            match planner.plan(&request).await? {
                Some(forecast) if json => println!("{}", serde_json::to_string_pretty(&forecast)?),
                Some(forecast) => print_forecast(&forecast),
                None => println!("No route found from {} to {}.", request.start, request.end),
            }
        }
        Command::Weather { lat, lon, at, json } => {
            let coordinates = Coordinate::new(lon, lat);
            if !coordinates.is_valid() {
                return Err(RoutecastError::validation(format!(
                    "coordinates out of range: lat={lat}, lon={lon}"
                ))
                .into());
            }

            let weather = WeatherService::from_config(&config.weather)?;
            let data_point = weather
                .get_weather(&coordinates, at.unwrap_or_else(Utc::now))
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&data_point)?);
            } else {
                println!("Weather at {}", coordinates.format_coordinates());
                println!("{}", format_weather(&data_point));
            }
        }
    }

    Ok(())
}

fn open_cache(config: &RoutecastConfig) -> Option<PersistentCache> {
    if config.cache.disabled {
        return None;
    }
    match PersistentCache::open(&config.cache.location) {
        Ok(cache) => Some(cache),
        Err(err) => {
            warn!(error = %err, location = %config.cache.location, "Route cache unavailable");
            None
        }
    }
}

fn format_weather(data_point: &WeatherDataPoint) -> String {
    let reading = &data_point.reading;
    let mut line = format!(
        "{:<15} {:<16} {:>5}  wind {:<9} humidity {}%",
        reading.icon,
        reading.condition,
        reading.format_temperature(),
        reading.format_wind(),
        reading.humidity
    );
    if let Some(reason) = data_point.risk_reason() {
        line.push_str(&format!("  ⚠ {reason}"));
    }
    line
}

fn print_forecast(forecast: &RouteForecast) {
    let names: Vec<&str> = forecast
        .waypoints
        .iter()
        .map(|waypoint| waypoint.name.as_str())
        .collect();
    println!("{}", names.join(" → "));
    println!(
        "{:.1} km, {}h {:02}m, departing {}, arriving {}",
        forecast.distance_km,
        forecast.duration_seconds / 3600,
        (forecast.duration_seconds % 3600) / 60,
        forecast.departure.format("%Y-%m-%d %H:%M UTC"),
        forecast.arrival.format("%Y-%m-%d %H:%M UTC"),
    );
    println!();

    for checkpoint in &forecast.checkpoints {
        println!(
            "{}  {:<24} {}",
            checkpoint.arrival_time.format("%H:%M"),
            checkpoint.location,
            format_weather(&checkpoint.weather)
        );
    }

    if forecast.risky_checkpoints > 0 {
        println!();
        println!(
            "{} of {} checkpoints have risky conditions.",
            forecast.risky_checkpoints,
            forecast.checkpoints.len()
        );
    }
}
