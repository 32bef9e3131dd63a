//! Storage contracts consumed by the scoring engine, leaderboard and profile.
//!
//! `SqliteQuizStore` implements both traits; tests wrap it to inject faults.

use std::collections::HashSet;

use crate::error::QuizResult;
use crate::types::{AnswerAttempt, Question, QuestionId, User, UserId};

/// Aggregate of a user's recorded attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptTotals {
    pub attempts: u64,
    /// Sum of nominal points over all attempts
    pub points: u64,
}

/// What `record_attempt` stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttempt {
    /// The user as stored after the write
    pub user: User,
    /// An earlier attempt on the same question was already correct
    pub already_answered: bool,
    /// Points added to the user's total by this attempt
    pub credited: u32,
}

pub trait UserRepository: Send + Sync {
    fn get_user(&self, id: UserId) -> QuizResult<Option<User>>;

    fn count_users(&self) -> QuizResult<u64>;

    /// Users ordered by total score descending, then id ascending.
    fn users_by_score(&self, offset: u64, limit: u32) -> QuizResult<Vec<User>>;

    /// Number of users whose total is strictly greater than `score`.
    fn count_users_above(&self, score: u32) -> QuizResult<u64>;

    /// Ids of every question the user has attempted, right or wrong.
    fn answered_question_ids(&self, user_id: UserId) -> QuizResult<HashSet<QuestionId>>;

    /// True if any earlier attempt on this question was correct.
    fn has_correct_attempt(&self, user_id: UserId, question_id: QuestionId) -> QuizResult<bool>;

    /// Persist `attempt` and, if it is the user's first correct answer to
    /// the question, credit its points. The prior-correct check, the insert
    /// and the credit run in one write transaction, so concurrent writers
    /// (including other processes on the same database) credit at most once.
    ///
    /// On failure neither the attempt nor the credit is visible.
    fn record_attempt(&self, attempt: &AnswerAttempt) -> QuizResult<RecordedAttempt>;

    /// Most recent attempts first.
    fn recent_attempts(&self, user_id: UserId, limit: u32) -> QuizResult<Vec<AnswerAttempt>>;

    fn attempt_totals(&self, user_id: UserId) -> QuizResult<AttemptTotals>;
}

pub trait QuestionRepository: Send + Sync {
    fn get_question(&self, id: QuestionId) -> QuizResult<Option<Question>>;

    fn question_ids(&self) -> QuizResult<Vec<QuestionId>>;
}
