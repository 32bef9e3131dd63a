//! Quiz engine for MeteoQuiz
//!
//! Users answer multiple-choice questions. The first correct answer to a
//! question earns points; repeats are recorded but never credited twice.

pub mod error;
pub mod leaderboard;
pub mod profile;
pub mod repository;
pub mod scoring;
pub mod seed;
pub mod store;
pub mod types;

pub use error::{QuizError, QuizResult};
pub use leaderboard::{
    Leaderboard, LeaderboardEntry, LeaderboardPage, DEFAULT_PER_PAGE, MAX_PER_PAGE,
};
pub use profile::{ProfileService, UserStats};
pub use repository::{AttemptTotals, QuestionRepository, RecordedAttempt, UserRepository};
pub use scoring::{ScoringEngine, POINTS_PER_CORRECT};
pub use seed::load_question_files;
pub use store::SqliteQuizStore;
pub use types::*;
