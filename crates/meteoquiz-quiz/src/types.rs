use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QuizError;

pub type UserId = i64;
pub type QuestionId = i64;

/// One of the four labeled answer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub const ALL: [AnswerOption; 4] = [
        AnswerOption::A,
        AnswerOption::B,
        AnswerOption::C,
        AnswerOption::D,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "a",
            AnswerOption::B => "b",
            AnswerOption::C => "c",
            AnswerOption::D => "d",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `a`..`d`, ignoring case and surrounding whitespace.
impl FromStr for AnswerOption {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" => Ok(AnswerOption::A),
            "b" => Ok(AnswerOption::B),
            "c" => Ok(AnswerOption::C),
            "d" => Ok(AnswerOption::D),
            _ => Err(QuizError::Validation(
                "Answer must be a, b, c, or d".to_string(),
            )),
        }
    }
}

impl TryFrom<String> for AnswerOption {
    type Error = QuizError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnswerOption> for String {
    fn from(option: AnswerOption) -> Self {
        option.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub nickname: String,
    pub total_score: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: AnswerOption,
}

impl Question {
    pub fn is_correct(&self, answer: AnswerOption) -> bool {
        self.correct_option == answer
    }

    pub fn option_text(&self, option: AnswerOption) -> &str {
        match option {
            AnswerOption::A => &self.option_a,
            AnswerOption::B => &self.option_b,
            AnswerOption::C => &self.option_c,
            AnswerOption::D => &self.option_d,
        }
    }
}

/// A question as found in seed files, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: AnswerOption,
}

/// A recorded answer submission. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerAttempt {
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub correct: bool,
    /// Nominal points for this attempt, whether or not they were credited
    pub points: u32,
    pub timestamp: DateTime<Utc>,
}

/// Result of a submission as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub correct: bool,
    pub points: u32,
    pub total_score: u32,
    pub already_answered: bool,
}
