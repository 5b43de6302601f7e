//! Application settings read from the environment
//!
//! Mirrors the deployment contract of the service: the OpenWeather API key
//! is required, everything else has a sensible default. Out-of-range values
//! are startup failures, not call-time surprises.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default provider endpoint for current weather
const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Bounds for `CACHE_MAX_SIZE`
const CACHE_SIZE_RANGE: (u64, u64) = (1, 1000);
/// Bounds for `CACHE_TTL_SECONDS`
const CACHE_TTL_RANGE: (u64, u64) = (1, 86_400);

/// Errors produced while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or blank
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A numeric variable is not an integer in its allowed range
    #[error("{name} must be an integer between {min} and {max}, got '{value}'")]
    OutOfRange {
        /// Variable name
        name: &'static str,
        /// Raw value found in the environment
        value: String,
        /// Smallest accepted value
        min: u64,
        /// Largest accepted value
        max: u64,
    },
}

/// Immutable application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenWeather API key
    pub api_key: String,
    /// Provider endpoint for current weather
    pub api_url: String,
    /// Maximum number of cached responses
    pub cache_capacity: usize,
    /// Lifetime of a cached response
    pub cache_ttl: Duration,
}

impl Settings {
    /// Reads settings from process environment variables
    ///
    /// Recognized variables: `OPENWEATHER_API_KEY` (required),
    /// `OPENWEATHER_API_URL`, `CACHE_MAX_SIZE` (1..=1000),
    /// `CACHE_TTL_SECONDS` (1..=86400).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_from(|name| env::var(name).ok())
    }

    /// Reads settings through an injected lookup, so tests can avoid
    /// mutating the process environment.
    fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let api_key = lookup("OPENWEATHER_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("OPENWEATHER_API_KEY"))?;

        let api_url = lookup("OPENWEATHER_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let cache_capacity = parse_bounded(
            lookup("CACHE_MAX_SIZE"),
            "CACHE_MAX_SIZE",
            CACHE_SIZE_RANGE,
            100,
        )? as usize;

        let ttl_seconds = parse_bounded(
            lookup("CACHE_TTL_SECONDS"),
            "CACHE_TTL_SECONDS",
            CACHE_TTL_RANGE,
            300,
        )?;

        Ok(Self {
            api_key,
            api_url,
            cache_capacity,
            cache_ttl: Duration::from_secs(ttl_seconds),
        })
    }
}

/// Parses an optional numeric variable, enforcing its allowed range
fn parse_bounded(
    raw: Option<String>,
    name: &'static str,
    (min, max): (u64, u64),
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let out_of_range = |value: &str| ConfigError::OutOfRange {
        name,
        value: value.to_string(),
        min,
        max,
    };
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| out_of_range(&raw))?;
    if parsed < min || parsed > max {
        return Err(out_of_range(&raw));
    }
    Ok(parsed)
}
