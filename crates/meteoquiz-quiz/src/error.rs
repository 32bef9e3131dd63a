//! Quiz-specific error types.

use meteoquiz_core::{AppError, RusqliteErrorExt};
use thiserror::Error;

use crate::types::{QuestionId, UserId};

pub type QuizResult<T> = Result<T, QuizError>;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Question not found: {0}")]
    QuestionNotFound(QuestionId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The attempt and any score credit were rolled back together.
    #[error("Failed to save answer: {0}")]
    SaveFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Seed data error: {0}")]
    Seed(String),
}

impl QuizError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::QuestionNotFound(_) => "Question not found".to_string(),
            Self::UserNotFound(_) => "User not found".to_string(),
            Self::SaveFailed(_) => "Failed to save answer".to_string(),
            Self::Storage(_) => "Local data error. Please try again.".to_string(),
            Self::Seed(msg) => format!("Could not load questions: {}", msg),
        }
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::Validation(msg) => AppError::Validation(msg),
            QuizError::QuestionNotFound(id) => AppError::NotFound(format!("question {}", id)),
            QuizError::UserNotFound(id) => AppError::NotFound(format!("user {}", id)),
            QuizError::SaveFailed(msg) => AppError::Persistence(msg),
            QuizError::Storage(e) => e.into_app_error(),
            QuizError::Seed(msg) => AppError::Validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meteoquiz_core::ErrorKind;

    #[test]
    fn test_error_user_messages() {
        assert_eq!(QuizError::SaveFailed("disk".into()).user_message(), "Failed to save answer");
        assert!(QuizError::Validation("Answer must be a, b, c, or d".into())
            .user_message()
            .contains("a, b, c, or d"));
    }

    #[test]
    fn test_app_error_kinds() {
        let app: AppError = QuizError::UserNotFound(3).into();
        assert_eq!(app.kind(), ErrorKind::NotFound);
        let app: AppError = QuizError::SaveFailed("x".into()).into();
        assert_eq!(app.kind(), ErrorKind::SaveFailed);
        let app: AppError = QuizError::Validation("x".into()).into();
        assert_eq!(app.kind(), ErrorKind::BadInput);
    }
}
