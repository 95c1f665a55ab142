//! Factories handing out the SQL repositories for a [`DbClient`].

use crate::repositories::availability::AvailabilityRepository;
use crate::repositories::availability_sql::SqlAvailabilityRepository;
use crate::repositories::booking::BookingRepository;
use crate::repositories::cancellation::CancellationRepository;
use crate::repositories::catalog::CatalogRepository;
use crate::repositories::booking_sql::SqlBookingRepository;
use crate::repositories::cancellation_sql::SqlCancellationRepository;
use crate::repositories::catalog_sql::SqlCatalogRepository;
use crate::{DbClient, RepositoryFactory};

#[derive(Debug, Clone, Default)]
pub struct CatalogRepositoryFactory;

impl RepositoryFactory<SqlCatalogRepository, DbClient> for CatalogRepositoryFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlCatalogRepository {
        SqlCatalogRepository::new(db_client)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AvailabilityRepositoryFactory;

impl RepositoryFactory<SqlAvailabilityRepository, DbClient> for AvailabilityRepositoryFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlAvailabilityRepository {
        SqlAvailabilityRepository::new(db_client)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingRepositoryFactory;

impl RepositoryFactory<SqlBookingRepository, DbClient> for BookingRepositoryFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlBookingRepository {
        SqlBookingRepository::new(db_client)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancellationRepositoryFactory;

impl RepositoryFactory<SqlCancellationRepository, DbClient> for CancellationRepositoryFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlCancellationRepository {
        SqlCancellationRepository::new(db_client)
    }
}

/// The four repositories a feature crate works with.
///
/// Generic over the repository traits; the parameters default to the SQL
/// implementations, which is what `Repositories` names everywhere else.
#[derive(Debug, Clone)]
pub struct Repositories<
    C = SqlCatalogRepository,
    A = SqlAvailabilityRepository,
    B = SqlBookingRepository,
    X = SqlCancellationRepository,
> {
    pub catalog: C,
    pub availability: A,
    pub bookings: B,
    pub cancellations: X,
}

impl<C, A, B, X> Repositories<C, A, B, X>
where
    C: CatalogRepository,
    A: AvailabilityRepository,
    B: BookingRepository,
    X: CancellationRepository,
{
    pub fn from_parts(catalog: C, availability: A, bookings: B, cancellations: X) -> Self {
        Self {
            catalog,
            availability,
            bookings,
            cancellations,
        }
    }
}

impl Repositories {
    /// SQL repositories sharing one client.
    pub fn new(db_client: &DbClient) -> Self {
        Self::from_parts(
            CatalogRepositoryFactory.create_repository(db_client.clone()),
            AvailabilityRepositoryFactory.create_repository(db_client.clone()),
            BookingRepositoryFactory.create_repository(db_client.clone()),
            CancellationRepositoryFactory.create_repository(db_client.clone()),
        )
    }
}
