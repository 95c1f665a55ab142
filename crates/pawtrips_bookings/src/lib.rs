// --- File: crates/pawtrips_bookings/src/lib.rs ---
//! Catalog, availability and booking API.
//!
//! Bookings start `pending`; seats are only taken on confirmation, which
//! happens through payment fulfillment or an admin.
pub mod doc;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod routes;

pub use error::BookingError;
pub use handlers::BookingState;
pub use logic::{confirm_booking, expire_pending_booking};
pub use routes::routes;
