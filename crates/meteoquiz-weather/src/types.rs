use chrono::{Datelike, NaiveDate};
use meteoquiz_core::{AppError, ProviderError};
use serde::{Deserialize, Serialize};

/// Number of days in every forecast.
pub const FORECAST_DAYS: usize = 3;

/// Maximum number of suggestions returned to autocomplete consumers.
pub const MAX_SUGGESTIONS: usize = 5;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// English weekday name for a calendar date (Monday first).
pub fn weekday_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

/// Round a temperature to the nearest whole degree, ties to even.
///
/// `2.5` becomes `2` and `3.5` becomes `4`.
pub fn round_temperature(celsius: f64) -> i32 {
    celsius.round_ties_even() as i32
}

/// A city as returned by the provider search endpoint.
///
/// The optional fields are kept so the durable cache holds the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CityRecord {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            region: region.into(),
            id: None,
            lat: None,
            lon: None,
            url: None,
        }
    }
}

/// Autocomplete entry derived from a [`CityRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
    pub display: String,
}

impl From<&CityRecord> for CitySuggestion {
    fn from(city: &CityRecord) -> Self {
        Self {
            name: city.name.clone(),
            country: city.country.clone(),
            display: format!("{}, {}", city.name, city.country),
        }
    }
}

/// One day of the projected forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub day_name: String,
    /// Daytime high, whole degrees Celsius
    pub day_temp: i32,
    /// Nighttime low, whole degrees Celsius
    pub night_temp: i32,
}

impl ForecastDay {
    /// Build a day from the provider's raw max/min temperatures.
    pub fn from_raw(date: NaiveDate, max_c: f64, min_c: f64) -> Self {
        Self {
            date,
            day_name: weekday_name(date).to_string(),
            day_temp: round_temperature(max_c),
            night_temp: round_temperature(min_c),
        }
    }
}

/// Exactly three forecast days, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forecast([ForecastDay; FORECAST_DAYS]);

impl Forecast {
    pub fn new(days: [ForecastDay; FORECAST_DAYS]) -> Self {
        Self(days)
    }

    pub fn days(&self) -> &[ForecastDay] {
        &self.0
    }

    pub fn sort_oldest_first(&mut self) {
        self.0.sort_by_key(|day| day.date);
    }
}

impl TryFrom<Vec<ForecastDay>> for Forecast {
    type Error = WeatherError;

    fn try_from(days: Vec<ForecastDay>) -> Result<Self, Self::Error> {
        let len = days.len();
        let days: [ForecastDay; FORECAST_DAYS] = days.try_into().map_err(|_| {
            WeatherError::Parse(format!("expected {} forecast days, got {}", FORECAST_DAYS, len))
        })?;
        Ok(Self(days))
    }
}

/// Weather lookup errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Invalid city name: {0}")]
    InvalidInput(String),
    #[error("City not found: {0}")]
    CityNotFound(String),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    /// True for the "no forecast" failures: transport trouble or an unusable payload.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Parse(_))
    }
}

impl From<WeatherError> for AppError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::InvalidInput(msg) => AppError::Validation(msg),
            WeatherError::CityNotFound(city) => AppError::NotFound(format!("city {}", city)),
            WeatherError::Provider(e) => AppError::Provider(e),
            WeatherError::Parse(msg) => AppError::Provider(ProviderError::InvalidResponse(msg)),
            WeatherError::Cache(msg) => AppError::Persistence(msg),
        }
    }
}
