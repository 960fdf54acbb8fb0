//! Database-specific error types and conversions.

use stockroom_core::error::StockroomError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Row decode failed: {0}")]
    Decode(String),
}

impl From<DbError> for StockroomError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StockroomError::NotFound { entity, id },
            DbError::Conflict(message) => StockroomError::Conflict { message },
            other => StockroomError::Database(other.to_string()),
        }
    }
}

/// Remap unique-index violations to `Conflict` instead of surfacing
/// them as opaque database failures.
pub(crate) fn map_unique_violation(err: surrealdb::Error, conflict_message: &str) -> DbError {
    let text = err.to_string();
    if text.contains("already contains") {
        DbError::Conflict(conflict_message.to_string())
    } else {
        DbError::Surreal(err)
    }
}
