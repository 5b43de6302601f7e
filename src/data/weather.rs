//! OpenWeather API client
//!
//! This module provides functionality to fetch current weather from the
//! OpenWeather API and normalize it into our WeatherReport data structure.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{SunSchedule, TemperatureUnit, Temperatures, WeatherReport, WeatherSummary, Wind};

/// Base URL for the OpenWeather current-weather API
const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed before a response arrived
    #[error("error contacting weather service: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The provider does not know the requested city
    #[error("city not found: '{0}'")]
    CityNotFound(String),

    /// The provider answered with a non-success status
    #[error("external weather service error ({status}): {body}")]
    Provider {
        /// HTTP status code returned by the provider
        status: u16,
        /// Response body, useful for diagnostics
        body: String,
    },

    /// Failed to parse the provider's JSON payload
    #[error("invalid data from provider: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Client for fetching current weather from the OpenWeather API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    /// Create a new WeatherClient with default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create a new WeatherClient with a custom HTTP client
    #[allow(dead_code)]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: OPENWEATHER_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the provider base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch current weather for the given city
    ///
    /// # Arguments
    /// * `city` - City name as typed by the user
    /// * `unit` - Temperature unit for the readings
    ///
    /// # Returns
    /// * `Ok(WeatherReport)` - Normalized weather data for the city
    /// * `Err(WeatherError)` - If the request, status, or parsing fails
    pub async fn fetch_current(
        &self,
        city: &str,
        unit: TemperatureUnit,
    ) -> Result<WeatherReport, WeatherError> {
        debug!(city, unit = unit.as_str(), "fetching weather from provider");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", unit.provider_units()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::CityNotFound(city.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        parse_provider_payload(&text, unit)
    }
}

/// Parse an OpenWeather payload into a normalized WeatherReport
///
/// Only the relevant pieces of the provider payload are kept; anything the
/// provider omits (wind, country, sun times) becomes `None` rather than an
/// error, matching how sparse the API is for small stations.
fn parse_provider_payload(
    text: &str,
    unit: TemperatureUnit,
) -> Result<WeatherReport, WeatherError> {
    let payload: ProviderResponse = serde_json::from_str(text)?;

    let conditions = payload.weather.into_iter().next().map(|c| WeatherSummary {
        main: c.main,
        description: c.description,
        icon: c.icon,
    });

    let wind = payload.wind.map(|w| Wind {
        speed: w.speed,
        deg: w.deg,
    });

    let (country, sun) = match payload.sys {
        Some(sys) => {
            let sun = SunSchedule {
                sunrise: sys.sunrise.and_then(parse_unix_timestamp),
                sunset: sys.sunset.and_then(parse_unix_timestamp),
            };
            (sys.country, Some(sun))
        }
        None => (None, None),
    };

    Ok(WeatherReport {
        city: payload.name,
        country,
        unit,
        conditions,
        main: Temperatures {
            temp: payload.main.temp,
            feels_like: payload.main.feels_like,
            temp_min: payload.main.temp_min,
            temp_max: payload.main.temp_max,
            pressure: payload.main.pressure,
            humidity: payload.main.humidity,
        },
        wind,
        sun,
        fetched_at: Utc::now(),
    })
}

/// Convert a unix timestamp from the provider into a UTC datetime
fn parse_unix_timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

/// OpenWeather API response structure
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    name: String,
    #[serde(default)]
    weather: Vec<ProviderConditions>,
    main: ProviderMain,
    wind: Option<ProviderWind>,
    sys: Option<ProviderSys>,
}

/// Conditions summary from OpenWeather
#[derive(Debug, Deserialize)]
struct ProviderConditions {
    main: String,
    description: String,
    icon: String,
}

/// Temperature block from OpenWeather
#[derive(Debug, Deserialize)]
struct ProviderMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: i64,
    humidity: i64,
}

/// Wind block from OpenWeather
#[derive(Debug, Deserialize)]
struct ProviderWind {
    speed: Option<f64>,
    deg: Option<i64>,
}

/// Station block from OpenWeather
#[derive(Debug, Deserialize)]
struct ProviderSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}
