//! Error types for Plant-Vita

use thiserror::Error;

/// Failures reported by an account store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique email constraint rejected an insert
    #[error("Email already registered")]
    DuplicateEmail,

    /// Transient infrastructure fault; the only retryable condition
    #[error("Account store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // PostgreSQL unique violation
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}
