// --- File: crates/pawtrips_fulfillment/src/lib.rs ---

pub mod auth; // Shared-secret check for internal calls
pub mod doc;
pub mod error;
pub mod handlers;
pub mod logic;
#[cfg(test)]
mod logic_test;
pub mod routes;

pub use error::FulfillmentError;
pub use handlers::FulfillmentState;
pub use routes::routes;
