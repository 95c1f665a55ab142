//! SQL implementation of [`AvailabilityRepository`].
//!
//! The counter statements take a plain connection so booking transitions can
//! run them inside their own transaction.

use crate::error::DbError;
use crate::repositories::availability::{AvailabilityRepository, NewSlot};
use crate::repositories::rows::{fmt_date, fmt_time, slot_from_row, Filter, SLOT_COLUMNS};
use crate::DbClient;
use chrono::NaiveDate;
use pawtrips_common::models::AvailabilitySlot;
use sqlx::AnyConnection;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const RESERVE: &str = r#"
    UPDATE availability_slots
    SET booked_adults = booked_adults + $2,
        booked_dogs = booked_dogs + $3
    WHERE id = $1
      AND booked_adults + $2 <= max_adults
      AND booked_dogs + $3 <= max_dogs
"#;

const RELEASE: &str = r#"
    UPDATE availability_slots
    SET booked_adults = CASE WHEN booked_adults >= $2 THEN booked_adults - $2 ELSE 0 END,
        booked_dogs = CASE WHEN booked_dogs >= $3 THEN booked_dogs - $3 ELSE 0 END
    WHERE id = $1
"#;

pub(crate) async fn find_slot_on(
    conn: &mut AnyConnection,
    slot_id: &str,
) -> Result<Option<AvailabilitySlot>, DbError> {
    let query = format!("SELECT {} FROM availability_slots WHERE id = $1", SLOT_COLUMNS);
    let row = sqlx::query(&query)
        .bind(slot_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    row.as_ref().map(slot_from_row).transpose()
}

async fn require_slot_on(conn: &mut AnyConnection, slot_id: &str) -> Result<AvailabilitySlot, DbError> {
    find_slot_on(conn, slot_id)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("slot {}", slot_id)))
}

/// The guarded increment. Zero rows affected means the party does not fit
/// (or the slot does not exist).
pub(crate) async fn reserve_on(
    conn: &mut AnyConnection,
    slot_id: &str,
    adults: i64,
    dogs: i64,
) -> Result<(), DbError> {
    if adults < 0 || dogs < 0 {
        return Err(DbError::QueryError("party sizes must not be negative".to_string()));
    }

    let affected = sqlx::query(RESERVE)
        .bind(slot_id)
        .bind(adults)
        .bind(dogs)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to reserve capacity on slot {}: {}", slot_id, e);
            DbError::QueryError(e.to_string())
        })?
        .rows_affected();

    if affected == 0 {
        require_slot_on(conn, slot_id).await?;
        debug!("Slot {} cannot hold {} adults / {} dogs", slot_id, adults, dogs);
        return Err(DbError::CapacityExceeded {
            slot_id: slot_id.to_string(),
            adults,
            dogs,
        });
    }
    Ok(())
}

pub(crate) async fn release_on(
    conn: &mut AnyConnection,
    slot_id: &str,
    adults: i64,
    dogs: i64,
) -> Result<(), DbError> {
    let affected = sqlx::query(RELEASE)
        .bind(slot_id)
        .bind(adults.max(0))
        .bind(dogs.max(0))
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            error!("Failed to release capacity on slot {}: {}", slot_id, e);
            DbError::QueryError(e.to_string())
        })?
        .rows_affected();

    if affected == 0 {
        warn!("Release on unknown slot {}", slot_id);
        return Err(DbError::NotFound(format!("slot {}", slot_id)));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SqlAvailabilityRepository {
    db_client: DbClient,
}

impl SqlAvailabilityRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

impl AvailabilityRepository for SqlAvailabilityRepository {
    async fn create_slot(&self, slot: NewSlot) -> Result<AvailabilitySlot, DbError> {
        if slot.max_adults < 0 || slot.max_dogs < 0 {
            return Err(DbError::QueryError("capacity must not be negative".to_string()));
        }

        let product_exists = sqlx::query("SELECT id FROM products WHERE id = $1")
            .bind(&slot.product_id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?
            .is_some();
        if !product_exists {
            return Err(DbError::NotFound(format!("product {}", slot.product_id)));
        }

        let created = AvailabilitySlot {
            id: Uuid::new_v4().to_string(),
            product_id: slot.product_id,
            date: slot.date,
            start_time: slot.start_time,
            end_date: slot.end_date,
            max_adults: slot.max_adults,
            max_dogs: slot.max_dogs,
            booked_adults: 0,
            booked_dogs: 0,
        };

        let query = r#"
            INSERT INTO availability_slots (id, product_id, slot_date, start_time, end_date,
                max_adults, max_dogs, booked_adults, booked_dogs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0)
        "#;
        sqlx::query(query)
            .bind(&created.id)
            .bind(&created.product_id)
            .bind(fmt_date(&created.date))
            .bind(created.start_time.as_ref().map(fmt_time))
            .bind(created.end_date.as_ref().map(fmt_date))
            .bind(created.max_adults)
            .bind(created.max_dogs)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert slot: {}", e);
                DbError::from_write(e, "slot")
            })?;

        info!("Slot {} created for product {} on {}", created.id, created.product_id, created.date);
        Ok(created)
    }

    async fn find_slot(&self, id: &str) -> Result<Option<AvailabilitySlot>, DbError> {
        let mut conn = self.db_client.pool().acquire().await?;
        find_slot_on(&mut conn, id).await
    }

    async fn list_slots(
        &self,
        product_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilitySlot>, DbError> {
        let filter = Filter::new()
            .eq("product_id", Some(product_id.to_string()))
            .at_least("slot_date", from.as_ref().map(fmt_date))
            .at_most("slot_date", to.as_ref().map(fmt_date));
        let query = format!(
            "SELECT {} FROM availability_slots{} ORDER BY slot_date, start_time",
            SLOT_COLUMNS,
            filter.sql()
        );
        let rows = filter
            .bind(sqlx::query(&query))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        rows.iter().map(slot_from_row).collect()
    }

    async fn reserve(&self, slot_id: &str, adults: i64, dogs: i64) -> Result<AvailabilitySlot, DbError> {
        let mut tx = self.db_client.begin().await?;
        reserve_on(&mut tx, slot_id, adults, dogs).await?;
        let slot = require_slot_on(&mut tx, slot_id).await?;
        tx.commit().await?;
        Ok(slot)
    }

    async fn release(&self, slot_id: &str, adults: i64, dogs: i64) -> Result<AvailabilitySlot, DbError> {
        let mut tx = self.db_client.begin().await?;
        release_on(&mut tx, slot_id, adults, dogs).await?;
        let slot = require_slot_on(&mut tx, slot_id).await?;
        tx.commit().await?;
        Ok(slot)
    }

    async fn update_capacity(
        &self,
        slot_id: &str,
        max_adults: i64,
        max_dogs: i64,
    ) -> Result<AvailabilitySlot, DbError> {
        if max_adults < 0 || max_dogs < 0 {
            return Err(DbError::QueryError("capacity must not be negative".to_string()));
        }

        let mut tx = self.db_client.begin().await?;
        let affected = sqlx::query(
            r#"
            UPDATE availability_slots
            SET max_adults = $2, max_dogs = $3
            WHERE id = $1 AND booked_adults <= $2 AND booked_dogs <= $3
            "#,
        )
        .bind(slot_id)
        .bind(max_adults)
        .bind(max_dogs)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?
        .rows_affected();

        let slot = require_slot_on(&mut tx, slot_id).await?;
        if affected == 0 {
            return Err(DbError::Conflict(format!(
                "slot {} already has {} adults and {} dogs booked",
                slot_id, slot.booked_adults, slot.booked_dogs
            )));
        }
        tx.commit().await?;
        Ok(slot)
    }
}
