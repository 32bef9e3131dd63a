use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{QuizError, QuizResult};
use crate::repository::UserRepository;
use crate::types::{AnswerAttempt, UserId};

/// How many attempts a profile lists.
pub const RECENT_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: UserId,
    pub nickname: String,
    pub total_score: u32,
    pub total_quizzes: u64,
    pub average_score: f64,
    pub recent: Vec<AnswerAttempt>,
}

pub struct ProfileService {
    users: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub fn stats(&self, user_id: UserId) -> QuizResult<UserStats> {
        let user = self
            .users
            .get_user(user_id)?
            .ok_or(QuizError::UserNotFound(user_id))?;

        let totals = self.users.attempt_totals(user_id)?;
        let average_score = if totals.attempts == 0 {
            0.0
        } else {
            let avg = totals.points as f64 / totals.attempts as f64;
            (avg * 10.0).round_ties_even() / 10.0
        };

        Ok(UserStats {
            user_id: user.id,
            nickname: user.nickname,
            total_score: user.total_score,
            total_quizzes: totals.attempts,
            average_score,
            recent: self.users.recent_attempts(user_id, RECENT_ATTEMPTS)?,
        })
    }
}
