//! Error taxonomy shared by every service.

use crate::db::DatabaseError;

/// Errors returned by the admin services.
///
/// Everything except `Persistence` carries a message safe to show an admin.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The order, domain, affiliate or withdrawal does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The entity is in a status that does not allow the action.
    #[error("{0}")]
    InvalidState(String),

    /// Malformed amount, missing field, bad code or mismatched ids.
    #[error("{0}")]
    InvalidInput(String),

    /// The domain was claimed by someone else first.
    #[error("{0}")]
    ConflictingAssignment(String),

    /// Storage or transaction failure.
    #[error("Database error: {0}")]
    Persistence(#[from] DatabaseError),
}

impl From<tokio_postgres::Error> for ServiceError {
    fn from(e: tokio_postgres::Error) -> Self {
        ServiceError::Persistence(DatabaseError::QueryError(e))
    }
}

impl ServiceError {
    /// Stable code for the API error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::InvalidState(_) => "INVALID_STATE",
            ServiceError::InvalidInput(_) => "INVALID_INPUT",
            ServiceError::ConflictingAssignment(_) => "CONFLICTING_ASSIGNMENT",
            ServiceError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// Message for the admin. Storage details stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Persistence(_) => {
                "The change could not be saved and nothing was applied. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
