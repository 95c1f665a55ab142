//! Database integration for PawTrips
//!
//! A database-agnostic client built on SQLx's `Any` driver plus the
//! repositories for providers, products, availability, bookings and
//! cancellation requests. SQLite is the default backend; PostgreSQL and
//! MySQL are available through feature flags.
//!
//! # Example
//!
//! ```rust,no_run
//! use pawtrips_config::AppConfig;
//! use pawtrips_db::{init_schema, DbClient, Repositories};
//! use std::sync::Arc;
//!
//! async fn setup_db() -> Result<Repositories, Box<dyn std::error::Error>> {
//!     let config = Arc::new(AppConfig::default());
//!     let db_client = DbClient::new(&config).await?;
//!     init_schema(&db_client).await?;
//!     Ok(Repositories::new(&db_client))
//! }
//! ```

pub mod client;
pub mod error;
pub mod factory;
pub mod repositories;
pub mod repository;
pub mod schema;

pub use client::{DbClient, DbTransaction};
pub use error::DbError;
pub use factory::DbClientFactory;
pub use repository::RepositoryFactory;
pub use schema::init_schema;

pub use repositories::{
    AvailabilityRepository, BookingFilter, BookingRepository, CancellationRepository,
    CatalogRepository, Decision, NewBooking, NewCancellation, NewProduct, NewProvider, NewSlot,
    Repositories, SqlAvailabilityRepository, SqlBookingRepository, SqlCancellationRepository,
    SqlCatalogRepository, Transition,
};

/// A fresh in-memory database with the schema applied.
#[cfg(feature = "sqlite")]
pub async fn in_memory() -> Result<DbClient, DbError> {
    let client = DbClient::from_url("sqlite::memory:").await?;
    init_schema(&client).await?;
    Ok(client)
}
