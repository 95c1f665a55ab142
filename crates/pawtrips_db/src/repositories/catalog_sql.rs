//! SQL implementation of [`CatalogRepository`].

use crate::error::DbError;
use crate::repositories::catalog::{CatalogRepository, NewProduct, NewProvider};
use crate::repositories::rows::{
    fmt_ts, product_from_row, Filter, provider_from_row, PRODUCT_COLUMNS, PROVIDER_COLUMNS,
};
use crate::DbClient;
use chrono::Utc;
use pawtrips_common::models::{Product, Provider};
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SqlCatalogRepository {
    db_client: DbClient,
}

impl SqlCatalogRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

impl CatalogRepository for SqlCatalogRepository {
    async fn create_provider(&self, provider: NewProvider) -> Result<Provider, DbError> {
        let created = Provider {
            id: Uuid::new_v4().to_string(),
            name: provider.name,
            email: provider.email,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO providers (id, name, email, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&created.id)
            .bind(&created.name)
            .bind(&created.email)
            .bind(fmt_ts(&created.created_at))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert provider: {}", e);
                DbError::from_write(e, "provider")
            })?;

        info!("Provider {} created", created.id);
        Ok(created)
    }

    async fn find_provider(&self, id: &str) -> Result<Option<Provider>, DbError> {
        let query = format!("SELECT {} FROM providers WHERE id = $1", PROVIDER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        row.as_ref().map(provider_from_row).transpose()
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, DbError> {
        if self.find_provider(&product.provider_id).await?.is_none() {
            return Err(DbError::NotFound(format!("provider {}", product.provider_id)));
        }

        let created = Product {
            id: Uuid::new_v4().to_string(),
            provider_id: product.provider_id,
            kind: product.kind,
            title: product.title,
            description: product.description,
            location: product.location,
            price_per_adult_cents: product.price_per_adult_cents,
            price_per_dog_cents: product.price_per_dog_cents,
            currency: product.currency.to_lowercase(),
            active: true,
            created_at: Utc::now(),
        };

        let query = r#"
            INSERT INTO products (id, provider_id, kind, title, description, location,
                price_per_adult_cents, price_per_dog_cents, currency, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#;
        sqlx::query(query)
            .bind(&created.id)
            .bind(&created.provider_id)
            .bind(created.kind.as_str())
            .bind(&created.title)
            .bind(&created.description)
            .bind(&created.location)
            .bind(created.price_per_adult_cents)
            .bind(created.price_per_dog_cents)
            .bind(&created.currency)
            .bind(1_i64)
            .bind(fmt_ts(&created.created_at))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert product: {}", e);
                DbError::from_write(e, "product")
            })?;

        info!("Product {} ({}) created", created.id, created.kind);
        Ok(created)
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>, DbError> {
        let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(
        &self,
        provider_id: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<Product>, DbError> {
        debug!("Listing products (provider={:?}, active_only={})", provider_id, active_only);

        let filter = Filter::new()
            .eq("provider_id", provider_id.map(str::to_string))
            .when(active_only, "active = 1");
        let query = format!(
            "SELECT {} FROM products{} ORDER BY title",
            PRODUCT_COLUMNS,
            filter.sql()
        );
        let rows = filter
            .bind(sqlx::query(&query))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn set_product_active(&self, id: &str, active: bool) -> Result<Product, DbError> {
        let affected = sqlx::query("UPDATE products SET active = $1 WHERE id = $2")
            .bind(i64::from(active))
            .bind(id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?
            .rows_affected();
        if affected == 0 {
            return Err(DbError::NotFound(format!("product {}", id)));
        }
        self.find_product(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("product {}", id)))
    }
}
