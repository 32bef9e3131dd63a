//! Centralized error taxonomy for MeteoQuiz.
//!
//! Crate-local errors (`WeatherError`, `QuizError`) convert into [`AppError`],
//! which callers inspect through [`AppError::kind`] and present through
//! [`AppError::user_message`].

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad shape, length or charset. Raised before any cache, provider or
    /// store is touched.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// City, question or user absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout or transport failure talking to the external provider, or an
    /// unusable provider payload.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Store write failed; any in-memory mutation was rolled back.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Durable store unreadable at startup. Never fatal: the cache starts empty.
    #[error("Cache load error: {0}")]
    CacheLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of an [`AppError`], used by outer layers to pick a
/// response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    ProviderFailure,
    SaveFailed,
    Internal,
}

impl ErrorKind {
    /// Stable snake_case identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadInput => "bad_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ProviderFailure => "provider_failure",
            ErrorKind::SaveFailed => "save_failed",
            ErrorKind::Internal => "internal",
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::BadInput,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Provider(_) => ErrorKind::ProviderFailure,
            AppError::Persistence(_) => ErrorKind::SaveFailed,
            AppError::CacheLoad(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "The request was not valid. Check the input and try again.",
            AppError::NotFound(_) => "Nothing was found for this request.",
            AppError::Provider(e) => e.user_message(),
            AppError::Persistence(_) => "Failed to save. Please try again.",
            AppError::CacheLoad(_) => "Cached data was unavailable and has been reset.",
            AppError::Config(_) => "Invalid configuration. Check your settings.",
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Failures talking to the external weather/city provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::ConnectionFailed(_) => {
                "Weather service unreachable. No data available right now."
            }
            ProviderError::Timeout => "The weather service timed out. No data available right now.",
            ProviderError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            ProviderError::ServerError { .. } => "The weather request failed. No data available.",
            ProviderError::InvalidResponse(_) => {
                "Received unexpected weather data. No data available right now."
            }
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_provider_error(self) -> ProviderError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_provider_error(self) -> ProviderError {
        if self.is_timeout() {
            ProviderError::Timeout
        } else if self.is_connect() {
            ProviderError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            ProviderError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            ProviderError::InvalidResponse(self.to_string())
        } else {
            ProviderError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_app_error(self) -> AppError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_app_error(self) -> AppError {
        match &self {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(self.to_string()),
            _ => AppError::Persistence(self.to_string()),
        }
    }
}
