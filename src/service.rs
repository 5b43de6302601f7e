//! Cache-fronted weather lookups
//!
//! Ties the provider client to the in-memory cache: callers ask for a city
//! and unit, the service derives a stable request key and either answers
//! from the cache or loads through the client. Eviction, expiry, and
//! request coalescing all happen inside the cache.

use tracing::debug;

use crate::cache::{Cache, CacheConfig, CacheError, CacheStats};
use crate::data::weather::{WeatherClient, WeatherError};
use crate::data::{TemperatureUnit, WeatherReport};

/// Derives the cache key for a city/unit request
///
/// The key must be deterministic for equivalent requests, so the city is
/// trimmed and lowercased before being joined with the unit name.
pub fn request_key(city: &str, unit: TemperatureUnit) -> String {
    format!("{}|{}", city.trim().to_lowercase(), unit.as_str())
}

/// Weather lookups with bounded caching of provider responses
pub struct WeatherService {
    client: WeatherClient,
    cache: Cache<String, WeatherReport, WeatherError>,
}

impl WeatherService {
    /// Creates a service around a provider client and a cache configuration
    pub fn new(client: WeatherClient, cache_config: CacheConfig) -> Self {
        Self {
            client,
            cache: Cache::new(cache_config),
        }
    }

    /// Returns current weather for the city, served from cache when fresh
    ///
    /// Concurrent calls for the same city and unit share a single provider
    /// request; a provider failure is reported to every caller and is not
    /// cached, so the next call retries.
    ///
    /// # Arguments
    /// * `city` - City name as typed by the user
    /// * `unit` - Temperature unit for the readings
    ///
    /// # Returns
    /// * `Ok(WeatherReport)` on a cache hit or successful fetch
    /// * `Err(CacheError<WeatherError>)` when the fetch failed
    pub async fn current_weather(
        &self,
        city: &str,
        unit: TemperatureUnit,
    ) -> Result<WeatherReport, CacheError<WeatherError>> {
        let key = request_key(city, unit);
        debug!(%key, "looking up weather");
        self.cache
            .get_or_load(key, || self.client.fetch_current(city, unit))
            .await
    }

    /// Returns statistics about the underlying cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
