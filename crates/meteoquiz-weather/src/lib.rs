//! Weather service for MeteoQuiz
//!
//! City search and 3-day forecasts from a WeatherAPI.com-compatible provider,
//! behind a durable city cache and an in-memory forecast cache.

pub mod cache;
pub mod durable;
pub mod forecast;
pub mod provider;
pub mod resolver;
pub mod types;

pub use cache::{CacheEntry, TtlCache};
pub use durable::DurableCache;
pub use forecast::{validate_city_name, ForecastFetcher};
pub use provider::WeatherApiClient;
pub use resolver::CityResolver;
pub use types::*;

use meteoquiz_core::{ApiKey, Clock, Config};
use std::sync::Arc;

/// Resolver and fetcher wired to shared caches, built once at startup.
#[derive(Debug, Clone)]
pub struct WeatherService {
    fetcher: ForecastFetcher,
}

impl WeatherService {
    /// Build the service from configuration.
    ///
    /// Opens the durable city cache (an unreadable file starts it empty) and
    /// creates an empty forecast cache.
    pub fn from_config(
        config: &Config,
        api_key: Option<ApiKey>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WeatherError> {
        let client = WeatherApiClient::new(&config.weather, api_key)?;
        let city_cache = Arc::new(DurableCache::open(
            config.city_cache_path(),
            config.weather.city_cache_ttl(),
            Arc::clone(&clock),
        ));
        let forecast_cache = Arc::new(TtlCache::new(config.weather.forecast_ttl(), clock));

        let resolver = CityResolver::new(client.clone(), city_cache);
        Ok(Self {
            fetcher: ForecastFetcher::new(client, resolver, forecast_cache),
        })
    }

    /// Resolve `query` to a canonical city and return its 3-day forecast.
    pub async fn resolve_city_and_forecast(
        &self,
        query: &str,
        force_refresh: bool,
    ) -> Result<Forecast, WeatherError> {
        self.fetcher.fetch(query, force_refresh).await
    }

    /// Autocomplete suggestions for `query`.
    pub async fn search_cities(&self, query: &str) -> Vec<CitySuggestion> {
        self.fetcher.resolver().suggest(query).await
    }
}
