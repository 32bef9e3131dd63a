//! Three-day forecast lookup with an in-memory TTL cache in front of the provider.

use std::sync::Arc;

use crate::cache::TtlCache;
use crate::provider::{ForecastResponse, WeatherApiClient};
use crate::resolver::CityResolver;
use crate::types::{Forecast, ForecastDay, WeatherError};

/// Longest accepted city name, in characters.
pub const MAX_CITY_NAME_LEN: usize = 100;

const CACHE_KEY_PREFIX: &str = "weather_";

/// Characters allowed in a city name besides letters, digits and whitespace.
const EXTRA_CITY_CHARS: [char; 3] = ['-', ',', '.'];

/// Trim and check a user-supplied city name.
///
/// Rejects empty names, names longer than [`MAX_CITY_NAME_LEN`] and any
/// character other than alphanumerics, whitespace and `-,.`.
pub fn validate_city_name(name: &str) -> Result<&str, WeatherError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(WeatherError::InvalidInput("city name is empty".to_string()));
    }

    if name.chars().count() > MAX_CITY_NAME_LEN {
        return Err(WeatherError::InvalidInput(format!(
            "city name longer than {} characters",
            MAX_CITY_NAME_LEN
        )));
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || c.is_whitespace() || EXTRA_CITY_CHARS.contains(c)))
    {
        return Err(WeatherError::InvalidInput(format!(
            "city name contains invalid character {:?}",
            bad
        )));
    }

    Ok(name)
}

/// TTL cache key for a canonical city name.
pub fn forecast_cache_key(canonical_name: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, canonical_name.to_lowercase())
}

/// Map the provider payload onto exactly three [`ForecastDay`]s.
///
/// Weekday names come from the dates, temperatures are rounded half to even.
pub fn project_forecast(response: ForecastResponse) -> Result<Forecast, WeatherError> {
    let days: Vec<ForecastDay> = response
        .forecast
        .forecastday
        .into_iter()
        .map(|day| ForecastDay::from_raw(day.date, day.day.maxtemp_c, day.day.mintemp_c))
        .collect();

    let mut forecast = Forecast::try_from(days)?;
    forecast.sort_oldest_first();
    Ok(forecast)
}

#[derive(Debug, Clone)]
pub struct ForecastFetcher {
    client: WeatherApiClient,
    resolver: CityResolver,
    cache: Arc<TtlCache<Forecast>>,
}

impl ForecastFetcher {
    pub fn new(
        client: WeatherApiClient,
        resolver: CityResolver,
        cache: Arc<TtlCache<Forecast>>,
    ) -> Self {
        Self {
            client,
            resolver,
            cache,
        }
    }

    pub fn resolver(&self) -> &CityResolver {
        &self.resolver
    }

    /// Forecast for `city_name`, from cache unless `force_refresh` is set.
    ///
    /// Validation happens before any cache or provider access. The canonical
    /// name (first search result) keys the cache, so different spellings of
    /// the same city share an entry.
    pub async fn fetch(
        &self,
        city_name: &str,
        force_refresh: bool,
    ) -> Result<Forecast, WeatherError> {
        let city_name = validate_city_name(city_name)?;

        let city = self.resolver.resolve(city_name).await?;
        let key = forecast_cache_key(&city.name);

        if force_refresh {
            self.cache.remove(&key);
        } else if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Forecast cache hit: {}", key);
            return Ok(cached);
        }

        tracing::info!("Fetching forecast for {}", city.name);
        let response = self.client.forecast(&city.name).await.map_err(|e| {
            tracing::warn!("Forecast request for {} failed: {}", city.name, e);
            e
        })?;

        let forecast = project_forecast(response).map_err(|e| {
            tracing::warn!("Forecast payload for {} unusable: {}", city.name, e);
            e
        })?;

        self.cache.set(key, forecast.clone());
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::provider::{ForecastBlock, RawDaySummary, RawForecastDay};
    use chrono::NaiveDate;

    fn raw_day(date: &str, max: f64, min: f64) -> RawForecastDay {
        RawForecastDay {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            day: RawDaySummary {
                maxtemp_c: max,
                mintemp_c: min,
            },
        }
    }

    fn response(days: Vec<RawForecastDay>) -> ForecastResponse {
        ForecastResponse {
            forecast: ForecastBlock { forecastday: days },
        }
    }

    #[test]
    fn test_validate_accepts_common_names() {
        assert_eq!(validate_city_name("  Rome ").unwrap(), "Rome");
        assert!(validate_city_name("Saint-Étienne").is_ok());
        assert!(validate_city_name("Washington, D.C.").is_ok());
        assert!(validate_city_name("Reggio nell'Emilia").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(matches!(
            validate_city_name("Rome!"),
            Err(WeatherError::InvalidInput(_))
        ));
        assert!(matches!(validate_city_name("   "), Err(WeatherError::InvalidInput(_))));
        assert!(matches!(
            validate_city_name("<script>"),
            Err(WeatherError::InvalidInput(_))
        ));
        let long = "a".repeat(MAX_CITY_NAME_LEN + 1);
        assert!(matches!(
            validate_city_name(&long),
            Err(WeatherError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_forecast_cache_key_is_case_insensitive() {
        assert_eq!(forecast_cache_key("Rome"), forecast_cache_key("ROME"));
        assert_eq!(forecast_cache_key("Rome"), "weather_rome");
    }

    #[test]
    fn test_project_forecast() {
        let forecast = project_forecast(response(vec![
            raw_day("2024-05-06", 22.5, 11.5),
            raw_day("2024-05-07", 23.4, 12.6),
            raw_day("2024-05-08", 19.5, 10.49),
        ]))
        .unwrap();

        let days = forecast.days();
        assert_eq!(days[0].day_name, "Monday");
        assert_eq!(days[0].day_temp, 22);
        assert_eq!(days[0].night_temp, 12);
        assert_eq!(days[1].day_name, "Tuesday");
        assert_eq!(days[1].day_temp, 23);
        assert_eq!(days[1].night_temp, 13);
        assert_eq!(days[2].day_name, "Wednesday");
        assert_eq!(days[2].day_temp, 20);
        assert_eq!(days[2].night_temp, 10);
    }

    #[test]
    fn test_project_forecast_orders_oldest_first() {
        let forecast = project_forecast(response(vec![
            raw_day("2024-05-08", 1.0, 0.0),
            raw_day("2024-05-06", 1.0, 0.0),
            raw_day("2024-05-07", 1.0, 0.0),
        ]))
        .unwrap();

        let dates: Vec<String> = forecast.days().iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-05-06", "2024-05-07", "2024-05-08"]);
    }

    #[test]
    fn test_project_forecast_rejects_wrong_day_count() {
        let err = project_forecast(response(vec![raw_day("2024-05-06", 1.0, 0.0)])).unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }
}
