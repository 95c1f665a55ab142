//! Factory for creating database clients

use crate::client::DbClient;
use crate::error::DbError;
use crate::schema::init_schema;
use pawtrips_config::{AppConfig, DatabaseConfig};
use std::sync::Arc;
use tracing::debug;

/// Builds [`DbClient`]s from the different configuration sources.
#[derive(Debug, Clone)]
pub struct DbClientFactory;

impl DbClientFactory {
    pub fn new() -> Self {
        Self
    }

    /// Connect using the `[database]` section of the application configuration.
    pub async fn from_app_config(&self, config: &Arc<AppConfig>) -> Result<DbClient, DbError> {
        debug!("Creating database client from application configuration");

        let db_config = config
            .database
            .as_ref()
            .ok_or_else(|| DbError::ConfigError("Database configuration is missing".to_string()))?;

        self.from_db_config(db_config).await
    }

    pub async fn from_db_config(&self, db_config: &DatabaseConfig) -> Result<DbClient, DbError> {
        debug!("Creating database client from database configuration");
        DbClient::from_config(db_config).await
    }

    pub async fn from_url(&self, db_url: &str) -> Result<DbClient, DbError> {
        debug!("Creating database client from URL");
        DbClient::from_url(db_url).await
    }

    /// Connect and make sure every table and index exists.
    pub async fn connect_and_migrate(&self, config: &Arc<AppConfig>) -> Result<DbClient, DbError> {
        let client = self.from_app_config(config).await?;
        init_schema(&client).await?;
        Ok(client)
    }
}

impl Default for DbClientFactory {
    fn default() -> Self {
        Self::new()
    }
}
