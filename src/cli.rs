//! Command-line interface parsing for City Weather CLI
//!
//! This module handles parsing of CLI arguments using clap, including the
//! --unit flag for selecting the temperature unit of the readings.

use clap::Parser;
use thiserror::Error;

use crate::data::TemperatureUnit;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified unit name is not recognized
    #[error("Invalid unit: '{0}'. Valid units: centigrade, fahrenheit, kelvin")]
    InvalidUnit(String),
}

/// City Weather CLI - Fetch current weather for one or more cities
#[derive(Parser, Debug)]
#[command(name = "cityweather")]
#[command(about = "Current weather for a city, cached in memory")]
#[command(version)]
pub struct Cli {
    /// City names to look up
    ///
    /// Examples:
    ///   cityweather Vancouver               # One city, centigrade
    ///   cityweather Vancouver Oslo -u f     # Two cities, fahrenheit
    ///   cityweather "New York" --json       # JSON output
    #[arg(required = true, value_name = "CITY")]
    pub cities: Vec<String>,

    /// Temperature unit: centigrade, fahrenheit, or kelvin
    #[arg(long, short = 'u', value_name = "UNIT", default_value = "centigrade")]
    pub unit: String,

    /// Print each report as a JSON object instead of a summary line
    #[arg(long)]
    pub json: bool,
}

/// Parses a unit string argument into a TemperatureUnit enum.
///
/// # Arguments
/// * `s` - The unit string from CLI
///
/// # Returns
/// * `Ok(TemperatureUnit)` if the string matches a valid unit
/// * `Err(CliError::InvalidUnit)` if the string doesn't match
pub fn parse_unit_arg(s: &str) -> Result<TemperatureUnit, CliError> {
    TemperatureUnit::from_str(s).ok_or_else(|| CliError::InvalidUnit(s.to_string()))
}
