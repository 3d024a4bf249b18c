//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Malformed time input: {0}")]
    MalformedTimeInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Post already sent: {0}")]
    AlreadySent(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScheduleError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScheduleError::Persistence(_) | ScheduleError::Publish(_) | ScheduleError::Conflict(_)
        )
    }

    /// The message without the variant's prefix.
    pub fn detail(&self) -> &str {
        match self {
            ScheduleError::MalformedTimeInput(m)
            | ScheduleError::Validation(m)
            | ScheduleError::Persistence(m)
            | ScheduleError::Publish(m)
            | ScheduleError::Authorization(m)
            | ScheduleError::NotFound(m)
            | ScheduleError::AlreadySent(m)
            | ScheduleError::Conflict(m)
            | ScheduleError::Config(m) => m,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
