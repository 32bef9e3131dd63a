pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiKey, Config, QuizConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ErrorKind, ProviderError, ReqwestErrorExt, RusqliteErrorExt};

use anyhow::Result;

/// Initialize logging for the MeteoQuiz binary
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("MeteoQuiz core initialized");
    Ok(())
}
