//! Error types for the STOCKROOM system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StockroomError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{message}")]
    Conflict { message: String },

    /// A lifecycle guard rejected the operation (state-machine
    /// precondition, referential guard, last-admin guard).
    #[error("{message}")]
    PreconditionFailed { message: String },

    #[error("authentication required: {reason}")]
    Unauthorized { reason: String },

    #[error("permission denied: {reason}")]
    Forbidden { reason: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StockroomError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
        }
    }
}

pub type StockroomResult<T> = Result<T, StockroomError>;
