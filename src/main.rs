//! City Weather CLI - Fetch current weather for one or more cities
//!
//! A command-line application that queries the OpenWeather API through a
//! bounded in-memory cache, so repeated and concurrent lookups for the same
//! city share one upstream call.

mod cache;
mod cli;
mod config;
mod data;
mod service;

use clap::Parser;
use futures::future::join_all;
use tracing::{debug, error};

use cache::CacheConfig;
use cli::Cli;
use config::Settings;
use data::weather::WeatherClient;
use data::{TemperatureUnit, WeatherReport};
use service::WeatherService;

/// Formats a one-line human-readable summary of a report
fn render_summary(report: &WeatherReport) -> String {
    let symbol = report.unit.symbol();

    let place = match &report.country {
        Some(country) => format!("{}, {}", report.city, country),
        None => report.city.clone(),
    };

    let conditions = report
        .conditions
        .as_ref()
        .map(|c| format!(", {}", c.description))
        .unwrap_or_default();

    let wind = report
        .wind
        .as_ref()
        .and_then(|w| w.speed)
        .map(|speed| format!(", wind {speed}"))
        .unwrap_or_default();

    format!(
        "{place}: {:.1}{symbol} (feels like {:.1}{symbol}){conditions}, humidity {}%{wind}",
        report.main.temp, report.main.feels_like, report.main.humidity
    )
}

/// Prints one report in the requested output format
fn print_report(report: &WeatherReport, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", render_summary(report));
    }
    Ok(())
}

/// Fetches every requested city concurrently and prints the results
///
/// Returns how many lookups failed; duplicate city arguments are served
/// from the cache or coalesced into a single provider call.
async fn run(service: &WeatherService, cities: &[String], unit: TemperatureUnit, json: bool) -> usize {
    let lookups = cities.iter().map(|city| service.current_weather(city, unit));
    let outcomes = join_all(lookups).await;

    let mut failures = 0;
    for (city, outcome) in cities.iter().zip(outcomes) {
        match outcome {
            Ok(report) => {
                if let Err(err) = print_report(&report, json) {
                    error!("failed to render report for {city}: {err}");
                    failures += 1;
                }
            }
            Err(err) => {
                eprintln!("{city}: {err}");
                failures += 1;
            }
        }
    }
    failures
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cityweather=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let unit = cli::parse_unit_arg(&cli.unit)?;

    let settings = Settings::from_env()?;
    let cache_config = CacheConfig::new(settings.cache_capacity, settings.cache_ttl)?;

    let client = WeatherClient::new(settings.api_key).with_base_url(settings.api_url);
    let service = WeatherService::new(client, cache_config);

    let failures = run(&service, &cli.cities, unit, cli.json).await;
    debug!(stats = ?service.cache_stats(), "cache state after run");

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::data::{Temperatures, WeatherSummary, Wind};

    fn sample_report() -> WeatherReport {
        WeatherReport {
            city: "Vancouver".to_string(),
            country: Some("CA".to_string()),
            unit: TemperatureUnit::Centigrade,
            conditions: Some(WeatherSummary {
                main: "Clouds".to_string(),
                description: "scattered clouds".to_string(),
                icon: "03d".to_string(),
            }),
            main: Temperatures {
                temp: 18.23,
                feels_like: 17.58,
                temp_min: 16.0,
                temp_max: 20.1,
                pressure: 1014,
                humidity: 72,
            },
            wind: Some(Wind {
                speed: Some(4.1),
                deg: Some(270),
            }),
            sun: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_summary_full_report() {
        let summary = render_summary(&sample_report());
        assert_eq!(
            summary,
            "Vancouver, CA: 18.2°C (feels like 17.6°C), scattered clouds, humidity 72%, wind 4.1"
        );
    }

    #[test]
    fn test_render_summary_sparse_report() {
        let mut report = sample_report();
        report.country = None;
        report.conditions = None;
        report.wind = None;
        let summary = render_summary(&report);
        assert_eq!(summary, "Vancouver: 18.2°C (feels like 17.6°C), humidity 72%");
    }
}
