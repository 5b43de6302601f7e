//! Core data models for City Weather CLI
//!
//! This module contains the data types used throughout the application for
//! representing temperature units and normalized weather reports.

pub mod weather;

#[allow(unused_imports)]
pub use weather::{WeatherClient, WeatherError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temperature unit requested by the caller
///
/// Maps onto the OpenWeather `units` query parameter: centigrade requests
/// `metric`, fahrenheit requests `imperial`, and kelvin requests `standard`
/// (the provider default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Centigrade,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    /// Parses a unit from user input, accepting common aliases
    ///
    /// # Arguments
    /// * `s` - The unit string, case-insensitive
    ///
    /// # Returns
    /// * `Some(TemperatureUnit)` if the string matches a known unit
    /// * `None` otherwise
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "centigrade" | "celsius" | "c" => Some(Self::Centigrade),
            "fahrenheit" | "f" => Some(Self::Fahrenheit),
            "kelvin" | "k" => Some(Self::Kelvin),
            _ => None,
        }
    }

    /// Canonical lowercase name, used in request keys and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Centigrade => "centigrade",
            Self::Fahrenheit => "fahrenheit",
            Self::Kelvin => "kelvin",
        }
    }

    /// Value for the provider's `units` query parameter
    pub fn provider_units(&self) -> &'static str {
        match self {
            Self::Centigrade => "metric",
            Self::Fahrenheit => "imperial",
            Self::Kelvin => "standard",
        }
    }

    /// Display symbol for temperatures in this unit
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Centigrade => "°C",
            Self::Fahrenheit => "°F",
            Self::Kelvin => "K",
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short description of the current conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSummary {
    /// Condition group, e.g. "Clouds" or "Rain"
    pub main: String,
    /// Human-readable detail, e.g. "scattered clouds"
    pub description: String,
    /// Provider icon code
    pub icon: String,
}

/// Temperature and atmosphere readings in the requested unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Temperatures {
    /// Current temperature
    pub temp: f64,
    /// Feels-like temperature
    pub feels_like: f64,
    /// Observed minimum temperature
    pub temp_min: f64,
    /// Observed maximum temperature
    pub temp_max: f64,
    /// Atmospheric pressure in hPa
    pub pressure: i64,
    /// Relative humidity percentage (0-100)
    pub humidity: i64,
}

/// Wind readings, when reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wind {
    /// Wind speed in the unit system's native speed unit
    pub speed: Option<f64>,
    /// Wind direction in meteorological degrees
    pub deg: Option<i64>,
}

/// Sunrise and sunset times for the reporting station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunSchedule {
    /// Sunrise time in UTC
    pub sunrise: Option<DateTime<Utc>>,
    /// Sunset time in UTC
    pub sunset: Option<DateTime<Utc>>,
}

/// Normalized weather report for one city
///
/// This is the shape stored in the cache and printed by the CLI; the
/// provider's full payload is reduced to these fields at fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    /// City name as reported by the provider
    pub city: String,
    /// ISO country code, if reported
    pub country: Option<String>,
    /// Unit system the readings are expressed in
    pub unit: TemperatureUnit,
    /// Short conditions summary, if the provider supplied one
    pub conditions: Option<WeatherSummary>,
    /// Temperature and atmosphere readings
    pub main: Temperatures,
    /// Wind readings, if reported
    pub wind: Option<Wind>,
    /// Sunrise/sunset schedule, if reported
    pub sun: Option<SunSchedule>,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}
