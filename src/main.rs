use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use meteoquiz_core::{AppError, Clock, Config, SystemClock};
use meteoquiz_quiz::{
    load_question_files, Leaderboard, ProfileService, QuizError, ScoringEngine, SqliteQuizStore,
    DEFAULT_PER_PAGE,
};
use meteoquiz_weather::{WeatherError, WeatherService};

#[derive(Parser, Debug)]
#[command(name = "meteoquiz", version, about = "City forecasts and a scored quiz")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 3-day forecast for a city
    Forecast {
        city: String,
        /// Skip the forecast cache
        #[arg(long)]
        force_refresh: bool,
    },
    /// City name suggestions
    Search { query: String },
    #[command(flatten)]
    Quiz(QuizCommand),
}

#[derive(Subcommand, Debug)]
enum QuizCommand {
    /// Submit an answer
    Answer {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        question: i64,
        #[arg(long)]
        answer: String,
    },
    /// Pick a question, preferring ones the user has not seen
    Question {
        #[arg(long)]
        user: Option<i64>,
    },
    Leaderboard {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Tie-aware rank of one user
    Rank {
        #[arg(long)]
        user: i64,
    },
    Profile {
        #[arg(long)]
        user: i64,
    },
    /// Load questions from every JSON file in a directory
    Seed {
        dir: PathBuf,
        /// Remove existing questions first
        #[arg(long)]
        replace: bool,
    },
    AddUser { nickname: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    meteoquiz_core::init()?;

    let cli = Cli::parse();
    let (config, _) = Config::load_validated()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let output = match cli.command {
        Command::Forecast { city, force_refresh } => {
            let weather = WeatherService::from_config(&config, config.api_key(), clock)?;
            forecast(&weather, &city, force_refresh).await
        }
        Command::Search { query } => {
            let weather = WeatherService::from_config(&config, config.api_key(), clock)?;
            json!({ "cities": weather.search_cities(&query).await })
        }
        Command::Quiz(command) => {
            let store = Arc::new(SqliteQuizStore::open(config.database_path())?);
            run_quiz(command, store, clock).unwrap_or_else(|e| error_json(&AppError::from(e)))
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn forecast(weather: &WeatherService, city: &str, force_refresh: bool) -> Value {
    match weather.resolve_city_and_forecast(city, force_refresh).await {
        Ok(forecast) => json!({ "forecast": forecast }),
        Err(e) => {
            tracing::warn!("Forecast for {:?} failed: {}", city, e);
            json!({ "error": e.to_string(), "kind": forecast_error_kind(&e) })
        }
    }
}

fn forecast_error_kind(err: &WeatherError) -> &'static str {
    match err {
        WeatherError::InvalidInput(_) => "bad_input",
        WeatherError::CityNotFound(_) => "city_not_found",
        WeatherError::Provider(_) | WeatherError::Parse(_) => "provider_failure",
        WeatherError::Cache(_) => "save_failed",
    }
}

fn run_quiz(
    command: QuizCommand,
    store: Arc<SqliteQuizStore>,
    clock: Arc<dyn Clock>,
) -> Result<Value, QuizError> {
    let value = match command {
        QuizCommand::Answer {
            user,
            question,
            answer,
        } => {
            let engine = ScoringEngine::new(store.clone(), store, clock);
            json!(engine.submit(user, question, &answer)?)
        }
        QuizCommand::Question { user } => {
            let engine = ScoringEngine::new(store.clone(), store, clock);
            match engine.pick_random(user)? {
                Some(q) => json!({
                    "id": q.id,
                    "prompt": q.prompt,
                    "options": {
                        "a": q.option_a,
                        "b": q.option_b,
                        "c": q.option_c,
                        "d": q.option_d,
                    }
                }),
                None => json!({ "error": "No questions available", "kind": "not_found" }),
            }
        }
        QuizCommand::Leaderboard { page, per_page } => {
            json!(Leaderboard::new(store).page(page, per_page)?)
        }
        QuizCommand::Rank { user } => {
            let rank = Leaderboard::new(store).user_rank(user)?;
            json!({ "user_id": user, "rank": rank })
        }
        QuizCommand::Profile { user } => json!(ProfileService::new(store).stats(user)?),
        QuizCommand::Seed { dir, replace } => {
            let questions = load_question_files(&dir)?;
            let removed = if replace { store.clear_questions()? } else { 0 };
            let added = store.insert_questions(&questions)?;
            json!({ "added": added, "removed": removed, "total": store.question_count()? })
        }
        QuizCommand::AddUser { nickname } => json!(store.create_user(&nickname)?),
    };
    Ok(value)
}

fn error_json(err: &AppError) -> Value {
    tracing::warn!("Command failed: {}", err);
    let message = match err {
        AppError::Validation(msg) => msg.clone(),
        other => other.user_message().to_string(),
    };
    json!({ "error": message, "kind": err.kind().as_str() })
}
