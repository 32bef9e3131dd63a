//! City lookup: free-text query to provider-confirmed city records.
//!
//! Results are kept in the durable cache keyed by the lowercased query, so
//! "Rome" and "rome" share one entry. Transport failures never propagate:
//! they are logged and surface as an empty result set.

use std::sync::Arc;

use crate::durable::DurableCache;
use crate::provider::WeatherApiClient;
use crate::types::{CityRecord, CitySuggestion, WeatherError, MAX_SUGGESTIONS};

/// Queries shorter than this (in characters, after trimming) return no results.
pub const MIN_QUERY_LEN: usize = 2;

const CACHE_KEY_PREFIX: &str = "search_";

/// Durable cache key for a query.
pub fn search_cache_key(query: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, query.trim().to_lowercase())
}

#[derive(Debug, Clone)]
pub struct CityResolver {
    client: WeatherApiClient,
    cache: Arc<DurableCache<Vec<CityRecord>>>,
}

impl CityResolver {
    pub fn new(client: WeatherApiClient, cache: Arc<DurableCache<Vec<CityRecord>>>) -> Self {
        Self { client, cache }
    }

    /// All cities matching `query`, in provider order.
    ///
    /// Short queries and provider failures both yield an empty list.
    pub async fn search(&self, query: &str) -> Vec<CityRecord> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        let key = search_cache_key(query);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("City search cache hit: {}", key);
            return cached;
        }

        let results = match self.client.search(query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("City search failed for {:?}: {}", query, e);
                return Vec::new();
            }
        };

        tracing::debug!("City search for {:?} returned {} results", query, results.len());
        if let Err(e) = self.cache.set(key, results.clone()) {
            tracing::warn!("Failed to persist city search cache: {}", e);
        }

        results
    }

    /// The canonical city for `query`: the first search result.
    pub async fn resolve(&self, query: &str) -> Result<CityRecord, WeatherError> {
        self.search(query)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::CityNotFound(query.trim().to_string()))
    }

    /// Autocomplete view of `query`, at most [`MAX_SUGGESTIONS`] entries.
    pub async fn suggest(&self, query: &str) -> Vec<CitySuggestion> {
        self.search(query)
            .await
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(CitySuggestion::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_case_insensitive() {
        assert_eq!(search_cache_key("Rome"), search_cache_key("rome"));
        assert_eq!(search_cache_key("  ROME "), "search_rome");
    }

    #[test]
    fn test_cache_key_keeps_inner_spaces() {
        assert_eq!(search_cache_key("New York"), "search_new york");
    }
}
