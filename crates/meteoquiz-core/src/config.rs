use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable holding the weather provider API key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Weather provider API key.
///
/// Never printed: `Debug` and `Display` both render a placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read the key from `WEATHER_API_KEY`. Empty values count as missing.
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(Self)
    }

    /// The raw secret, for building provider requests only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the durable city cache and the quiz database
    pub data_dir: PathBuf,

    /// Weather provider and cache settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Quiz store settings
    #[serde(default)]
    pub quiz: QuizConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the WeatherAPI-compatible provider
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Language passed to the forecast endpoint
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    #[serde(default = "default_forecast_timeout_secs")]
    pub forecast_timeout_secs: u64,

    /// Lifetime of in-memory forecast entries
    #[serde(default = "default_forecast_ttl_hours")]
    pub forecast_ttl_hours: u32,

    /// Lifetime of durable city search entries
    #[serde(default = "default_city_cache_ttl_days")]
    pub city_cache_ttl_days: u32,

    /// File name of the durable city cache, relative to `data_dir`
    #[serde(default = "default_city_cache_file")]
    pub city_cache_file: String,
}

fn default_api_base_url() -> String {
    "http://api.weatherapi.com/v1".to_string()
}

fn default_language() -> String {
    "it".to_string()
}

fn default_search_timeout_secs() -> u64 {
    5
}

fn default_forecast_timeout_secs() -> u64 {
    10
}

fn default_forecast_ttl_hours() -> u32 {
    6
}

fn default_city_cache_ttl_days() -> u32 {
    30
}

fn default_city_cache_file() -> String {
    "cache_cities.json".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            language: default_language(),
            search_timeout_secs: default_search_timeout_secs(),
            forecast_timeout_secs: default_forecast_timeout_secs(),
            forecast_ttl_hours: default_forecast_ttl_hours(),
            city_cache_ttl_days: default_city_cache_ttl_days(),
            city_cache_file: default_city_cache_file(),
        }
    }
}

impl WeatherConfig {
    pub fn search_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.search_timeout_secs)
    }

    pub fn forecast_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.forecast_timeout_secs)
    }

    pub fn forecast_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.forecast_ttl_hours))
    }

    pub fn city_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.city_cache_ttl_days))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// SQLite database file name, relative to `data_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_database_file() -> String {
    "meteoquiz.db".to_string()
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meteoquiz")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            weather: WeatherConfig::default(),
            quiz: QuizConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config dir, creating a default file
    /// if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating a default file
    /// there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors. Warnings
    /// are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);

        if self.weather.search_timeout_secs == 0 {
            result.add_error("weather.search_timeout_secs", "Timeout must be greater than 0");
        }
        if self.weather.forecast_timeout_secs == 0 {
            result.add_error("weather.forecast_timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.forecast_ttl_hours == 0 {
            result.add_warning(
                "weather.forecast_ttl_hours",
                "Forecast caching disabled (0 hours)",
            );
        }
        if self.weather.city_cache_ttl_days == 0 {
            result.add_warning(
                "weather.city_cache_ttl_days",
                "City search caching disabled (0 days)",
            );
        }

        if self.weather.city_cache_file.trim().is_empty() {
            result.add_error("weather.city_cache_file", "File name must not be empty");
        }
        if self.quiz.database_file.trim().is_empty() {
            result.add_error("quiz.database_file", "File name must not be empty");
        }

        if self.data_dir.exists() && !self.data_dir.is_dir() {
            result.add_error(
                "data_dir",
                format!("Path is not a directory: {}", self.data_dir.display()),
            );
        }

        if ApiKey::from_env().is_none() {
            result.add_warning(
                "weather",
                format!("{} not set - weather lookups will fail", API_KEY_ENV),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Provider API key from the environment. Never part of the config file.
    pub fn api_key(&self) -> Option<ApiKey> {
        ApiKey::from_env()
    }

    /// Path of the durable city cache file
    pub fn city_cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.weather.city_cache_file)
    }

    /// Path of the quiz database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.quiz.database_file)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("meteoquiz");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_default_timeouts_and_ttls() {
        let weather = WeatherConfig::default();
        assert_eq!(weather.search_timeout(), std::time::Duration::from_secs(5));
        assert_eq!(weather.forecast_timeout(), std::time::Duration::from_secs(10));
        assert_eq!(weather.forecast_ttl(), chrono::Duration::hours(6));
        assert_eq!(weather.city_cache_ttl(), chrono::Duration::days(30));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.api_base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.api_base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = Config::default();
        config.weather.forecast_timeout_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_zero_ttl_is_warning() {
        let mut config = Config::default();
        config.weather.forecast_ttl_hours = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "weather.forecast_ttl_hours"));
    }

    #[test]
    fn test_load_from_creates_default_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.weather.api_base_url, created.weather.api_base_url);
        assert_eq!(loaded.quiz.database_file, "meteoquiz.db");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/tmp/mq\"\n[weather]\nlanguage = \"en\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.language, "en");
        assert_eq!(config.weather.search_timeout_secs, 5);
        assert_eq!(config.city_cache_path(), PathBuf::from("/tmp/mq/cache_cities.json"));
    }

    #[test]
    fn test_api_key_is_redacted() {
        let key = ApiKey::new("super-secret");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        assert_eq!(key.to_string(), "***");
        assert_eq!(key.expose(), "super-secret");
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
