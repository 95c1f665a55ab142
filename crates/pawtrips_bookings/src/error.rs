use pawtrips_common::PawtripsError;
use pawtrips_db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Slot has room for {remaining_adults} adults and {remaining_dogs} dogs")]
    InsufficientCapacity {
        remaining_adults: i64,
        remaining_dogs: i64,
    },

    #[error("Booking {booking_id} is {status}")]
    WrongState { booking_id: String, status: String },

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<BookingError> for PawtripsError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => PawtripsError::ValidationError(msg),
            BookingError::NotFound(msg) => PawtripsError::NotFoundError(msg),
            e @ BookingError::InsufficientCapacity { .. } => PawtripsError::ConflictError(e.to_string()),
            e @ BookingError::WrongState { .. } => PawtripsError::ConflictError(e.to_string()),
            BookingError::Payment(msg) => PawtripsError::ExternalServiceError {
                service_name: "payments".to_string(),
                message: msg,
            },
            BookingError::Db(db) => db.into(),
        }
    }
}

pub(crate) fn invalid(msg: impl Into<String>) -> BookingError {
    BookingError::Validation(msg.into())
}
