//! Providers and the products they offer.

use crate::error::DbError;
use pawtrips_common::models::{Product, ProductKind, Provider};
use std::future::Future;

#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub provider_id: String,
    pub kind: ProductKind,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_adult_cents: i64,
    pub price_per_dog_cents: i64,
    pub currency: String,
}

/// Storage for providers and products.
pub trait CatalogRepository {
    fn create_provider(
        &self,
        provider: NewProvider,
    ) -> impl Future<Output = Result<Provider, DbError>> + Send;

    fn find_provider(&self, id: &str) -> impl Future<Output = Result<Option<Provider>, DbError>> + Send;

    /// Fails with `NotFound` when the provider does not exist.
    fn create_product(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, DbError>> + Send;

    fn find_product(&self, id: &str) -> impl Future<Output = Result<Option<Product>, DbError>> + Send;

    /// Products ordered by title, optionally limited to one provider.
    fn list_products(
        &self,
        provider_id: Option<&str>,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<Product>, DbError>> + Send;

    fn set_product_active(
        &self,
        id: &str,
        active: bool,
    ) -> impl Future<Output = Result<Product, DbError>> + Send;
}
