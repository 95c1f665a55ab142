//! Error types for the database layer

use pawtrips_common::PawtripsError;
use pawtrips_common::models::BookingStatus;
use thiserror::Error;

/// Errors that can occur when working with the database
#[derive(Debug, Error)]
pub enum DbError {
    /// Error from SQLx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Error with the database configuration
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Error with database URL parsing
    #[error("Database URL error: {0}")]
    UrlError(String),

    /// Error with database pool creation
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// Error with database query
    #[error("Database query error: {0}")]
    QueryError(String),

    /// Error with database transaction
    #[error("Database transaction error: {0}")]
    TransactionError(String),

    /// A stored value could not be turned back into a domain type
    #[error("Database decode error: {0}")]
    DecodeError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A concurrent writer or a uniqueness rule got there first
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot {slot_id} cannot hold {adults} more adults and {dogs} more dogs")]
    CapacityExceeded {
        slot_id: String,
        adults: i64,
        dogs: i64,
    },

    #[error("Booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl DbError {
    /// Maps unique-constraint violations to `Conflict`, everything else to `QueryError`.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        let unique = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);
        if unique {
            DbError::Conflict(format!("{} already exists", what))
        } else {
            DbError::QueryError(err.to_string())
        }
    }
}

impl From<DbError> for PawtripsError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => PawtripsError::NotFoundError(msg),
            DbError::Conflict(msg) => PawtripsError::ConflictError(msg),
            e @ DbError::CapacityExceeded { .. } => PawtripsError::ConflictError(e.to_string()),
            e @ DbError::InvalidTransition { .. } => PawtripsError::ConflictError(e.to_string()),
            DbError::ConfigError(msg) => PawtripsError::ConfigError(msg),
            other => PawtripsError::DatabaseError(other.to_string()),
        }
    }
}
