// --- File: crates/pawtrips_cancellation/src/lib.rs ---
//! Cancellation workflow: customers file a request, an admin approves or
//! rejects it from a magic link or the admin API.
pub mod doc;
pub mod error;
pub mod handlers;
pub mod logic;
#[cfg(test)]
mod logic_proptest;
#[cfg(test)]
mod logic_test;
pub mod routes;

pub use error::CancellationError;
pub use handlers::CancellationState;
pub use routes::routes;
