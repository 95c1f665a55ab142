// --- File: crates/pawtrips_stripe/src/lib.rs ---

pub mod doc;
pub mod error;
pub mod handlers;
pub mod logic;
#[cfg(test)]
mod logic_test;
pub mod routes;
pub mod service;

pub use error::StripeError;
pub use handlers::StripeState;
pub use logic::{BookingConfirmationPayload, BookingExpiredPayload, INTERNAL_AUTH_HEADER};
pub use routes::routes;
pub use service::StripePaymentService;
