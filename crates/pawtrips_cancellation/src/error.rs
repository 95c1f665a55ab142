use pawtrips_common::PawtripsError;
use pawtrips_db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CancellationError {
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(String),

    #[error("A cancellation request is already pending: {request_id}")]
    DuplicatePending { request_id: String },

    #[error("too_late: cancellations close {min_hours} hours before the start")]
    TooLate { min_hours: i64 },

    #[error("Cancellation link has expired")]
    Expired,

    #[error("Cancellation request is already {0}")]
    AlreadyDecided(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<CancellationError> for PawtripsError {
    fn from(err: CancellationError) -> Self {
        match err {
            CancellationError::Validation(msg) => PawtripsError::ValidationError(msg),
            CancellationError::NotFound(msg) => PawtripsError::NotFoundError(msg),
            e @ (CancellationError::AlreadyCancelled(_)
            | CancellationError::DuplicatePending { .. }
            | CancellationError::AlreadyDecided(_)) => PawtripsError::ConflictError(e.to_string()),
            e @ CancellationError::TooLate { .. } => PawtripsError::UnprocessableError(e.to_string()),
            e @ CancellationError::Expired => PawtripsError::GoneError(e.to_string()),
            CancellationError::Db(db) => db.into(),
        }
    }
}
