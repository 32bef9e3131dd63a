//! HTTP client for the WeatherAPI.com-compatible provider.
//!
//! Two endpoints are used: `search.json` for city lookup and `forecast.json`
//! for the daily forecast. Every call carries its own timeout; a timeout is a
//! provider failure like any other transport error.

use chrono::NaiveDate;
use meteoquiz_core::{ApiKey, ReqwestErrorExt, WeatherConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{CityRecord, WeatherError, FORECAST_DAYS};

const USER_AGENT: &str = "MeteoQuiz/0.1.0";

/// Raw forecast payload, only the fields the projection needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub forecast: ForecastBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastBlock {
    pub forecastday: Vec<RawForecastDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastDay {
    pub date: NaiveDate,
    pub day: RawDaySummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDaySummary {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
}

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Arc<Client>,
    base_url: String,
    api_key: Option<ApiKey>,
    language: String,
    search_timeout: Duration,
    forecast_timeout: Duration,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig, api_key: Option<ApiKey>) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WeatherError::Provider(e.into_provider_error()))?;

        if api_key.is_none() {
            tracing::warn!("No weather API key configured; provider calls will likely be rejected");
        }

        Ok(Self {
            client: Arc::new(client),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            language: config.language.clone(),
            search_timeout: config.search_timeout(),
            forecast_timeout: config.forecast_timeout(),
        })
    }

    /// Search cities matching `query`, in provider order.
    pub async fn search(&self, query: &str) -> Result<Vec<CityRecord>, WeatherError> {
        let params = vec![("q", query.to_string())];
        self.get_json("search.json", params, self.search_timeout).await
    }

    /// Fetch the raw daily forecast for `city`.
    pub async fn forecast(&self, city: &str) -> Result<ForecastResponse, WeatherError> {
        let params = vec![
            ("q", city.to_string()),
            ("days", FORECAST_DAYS.to_string()),
            ("lang", self.language.clone()),
        ];
        self.get_json("forecast.json", params, self.forecast_timeout).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        mut params: Vec<(&'static str, String)>,
        timeout: Duration,
    ) -> Result<T, WeatherError> {
        if let Some(key) = &self.api_key {
            params.push(("key", key.expose().to_string()));
        }

        let url = format!("{}/{}", self.base_url, endpoint);

        // Errors are stripped of their URL so the API key never reaches a log line
        let response = self
            .client
            .get(&url)
            .query(&params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| WeatherError::Provider(e.without_url().into_provider_error()))?
            .error_for_status()
            .map_err(|e| WeatherError::Provider(e.without_url().into_provider_error()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WeatherError::Provider(e.without_url().into_provider_error()))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| WeatherError::Parse(format!("{} payload: {}", endpoint, e)))
    }
}
