//! Domain errors for the practice service.
//!
//! Everything here except `Storage` and `Hashing` is a non-fatal, user-visible
//! condition. The HTTP layer maps each variant to a status code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("Please fill out all fields.")]
    EmptyCredentials,

    #[error("Username already exists. Please choose a different one.")]
    UsernameTaken,

    #[error("Invalid username or password. Please try again.")]
    InvalidCredentials,

    #[error("Access denied. Please log in.")]
    NotLoggedIn,

    #[error("This question was already answered. Ask for the next question.")]
    AlreadyAnswered,

    #[error("Answer the current question before moving on.")]
    AnswerPending,

    #[error("All {0} questions have been asked in this round")]
    QuestionsExhausted(usize),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl PracticeError {
    /// True for conditions the user caused and can correct.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, PracticeError::Hashing(_) | PracticeError::Storage(_))
    }
}

pub type PracticeResult<T> = std::result::Result<T, PracticeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_not_user_facing() {
        let err = PracticeError::from(anyhow::anyhow!("disk full"));
        assert!(!err.is_user_facing());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_messages_match_user_warnings() {
        assert_eq!(
            PracticeError::EmptyCredentials.to_string(),
            "Please fill out all fields."
        );
        assert!(PracticeError::UsernameTaken.is_user_facing());
        assert!(PracticeError::NotLoggedIn.is_user_facing());
    }
}
