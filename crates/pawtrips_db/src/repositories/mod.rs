//! Repositories for the booking domain
//!
//! Each entity has a trait (`catalog`, `availability`, `booking`,
//! `cancellation`) and an SQL implementation (`*_sql`).

pub mod availability;
pub mod availability_sql;
pub mod booking;
pub mod booking_sql;
pub mod cancellation;
pub mod cancellation_sql;
pub mod catalog;
pub mod catalog_sql;
pub mod factories;
mod rows;

#[cfg(test)]
mod capacity_proptest;

pub use availability::{AvailabilityRepository, NewSlot};
pub use availability_sql::SqlAvailabilityRepository;
pub use booking::{BookingFilter, BookingRepository, NewBooking, Transition};
pub use booking_sql::SqlBookingRepository;
pub use cancellation::{CancellationRepository, Decision, NewCancellation};
pub use cancellation_sql::SqlCancellationRepository;
pub use catalog::{CatalogRepository, NewProduct, NewProvider};
pub use catalog_sql::SqlCatalogRepository;
pub use factories::{
    AvailabilityRepositoryFactory, BookingRepositoryFactory, CancellationRepositoryFactory,
    CatalogRepositoryFactory, Repositories,
};
