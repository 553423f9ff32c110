use thiserror::Error;

use crate::models::LetterType;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resident {resident_id} has {count} dependent letters")]
    ResidentHasLetters { resident_id: i64, count: i64 },

    #[error("Cannot delete the last template of type '{letter_type}'")]
    LastTemplate { letter_type: LetterType },

    #[error("Letter number {letter_number} is already in use")]
    DuplicateLetterNumber { letter_number: String },

    #[error("Database connection lock is poisoned")]
    LockPoisoned,

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True for errors where the store refused a mutation that would
    /// break a referential or uniqueness rule.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ResidentHasLetters { .. }
                | Self::LastTemplate { .. }
                | Self::DuplicateLetterNumber { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
