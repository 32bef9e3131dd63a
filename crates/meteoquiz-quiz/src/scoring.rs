//! Answer submission and scoring.
//!
//! Each submission is recorded. Points are credited only the first time a
//! user answers a question correctly. The repository decides the credit
//! inside its write transaction; within one engine, submissions for the same
//! user are also serialized.

use parking_lot::Mutex;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

use meteoquiz_core::Clock;

use crate::error::{QuizError, QuizResult};
use crate::repository::{QuestionRepository, UserRepository};
use crate::types::{AnswerAttempt, AnswerOption, Question, QuestionId, SubmitOutcome, UserId};

/// Points for a correct answer.
pub const POINTS_PER_CORRECT: u32 = 10;

pub struct ScoringEngine {
    users: Arc<dyn UserRepository>,
    questions: Arc<dyn QuestionRepository>,
    gates: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    clock: Arc<dyn Clock>,
}

impl ScoringEngine {
    pub fn new(
        users: Arc<dyn UserRepository>,
        questions: Arc<dyn QuestionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            questions,
            gates: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn gate_for(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.gates
            .lock()
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Submit `answer` for `question_id` on behalf of `user_id`.
    pub fn submit(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        answer: &str,
    ) -> QuizResult<SubmitOutcome> {
        let answer: AnswerOption = answer.parse()?;

        let gate = self.gate_for(user_id);
        let _guard = gate.lock();

        let question = self
            .questions
            .get_question(question_id)?
            .ok_or(QuizError::QuestionNotFound(question_id))?;
        let user = self
            .users
            .get_user(user_id)?
            .ok_or(QuizError::UserNotFound(user_id))?;

        let correct = question.is_correct(answer);
        let points = if correct { POINTS_PER_CORRECT } else { 0 };

        let attempt = AnswerAttempt {
            user_id,
            question_id,
            correct,
            points,
            timestamp: self.clock.now(),
        };

        let recorded = self.users.record_attempt(&attempt).map_err(|e| {
            tracing::error!(
                "Failed to record answer for user {} question {}: {}",
                user_id,
                question_id,
                e
            );
            match e {
                QuizError::SaveFailed(_) => e,
                other => QuizError::SaveFailed(other.to_string()),
            }
        })?;

        tracing::info!(
            "User {} ({}) answered question {}: correct={} credited={}",
            user.id,
            user.nickname,
            question_id,
            correct,
            recorded.credited
        );

        Ok(SubmitOutcome {
            correct,
            points,
            total_score: recorded.user.total_score,
            already_answered: recorded.already_answered,
        })
    }

    /// Pick a random question, preferring ones the user has never attempted.
    pub fn pick_random(&self, user_id: Option<UserId>) -> QuizResult<Option<Question>> {
        self.pick_random_with(user_id, &mut rand::rng())
    }

    pub fn pick_random_with<R: Rng + ?Sized>(
        &self,
        user_id: Option<UserId>,
        rng: &mut R,
    ) -> QuizResult<Option<Question>> {
        let all = self.questions.question_ids()?;
        if all.is_empty() {
            return Ok(None);
        }

        let known_user = match user_id {
            Some(id) => self.users.get_user(id)?.map(|u| u.id),
            None => None,
        };

        let mut pool = all.clone();
        if let Some(id) = known_user {
            let answered = self.users.answered_question_ids(id)?;
            let unanswered: Vec<QuestionId> = all
                .iter()
                .copied()
                .filter(|qid| !answered.contains(qid))
                .collect();
            if !unanswered.is_empty() {
                pool = unanswered;
            }
        }

        match pool.choose(rng) {
            Some(&qid) => self.questions.get_question(qid),
            None => Ok(None),
        }
    }
}
