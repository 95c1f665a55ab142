use pawtrips_bookings::BookingError;
use pawtrips_common::PawtripsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("Paid {paid} but booking {booking_id} costs {due}")]
    Underpaid { booking_id: String, paid: i64, due: i64 },

    #[error("Paid in {paid} but booking {booking_id} is priced in {expected}")]
    CurrencyMismatch {
        booking_id: String,
        paid: String,
        expected: String,
    },

    #[error("Refund for booking {booking_id} failed: {message}")]
    RefundFailed { booking_id: String, message: String },

    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl From<FulfillmentError> for PawtripsError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            e @ FulfillmentError::Underpaid { .. } => PawtripsError::UnprocessableError(e.to_string()),
            e @ FulfillmentError::CurrencyMismatch { .. } => PawtripsError::UnprocessableError(e.to_string()),
            FulfillmentError::RefundFailed { booking_id, message } => PawtripsError::ExternalServiceError {
                service_name: "Payment".to_string(),
                message: format!("refund for booking {}: {}", booking_id, message),
            },
            FulfillmentError::Booking(b) => b.into(),
        }
    }
}
