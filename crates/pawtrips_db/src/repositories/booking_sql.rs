//! SQL implementation of [`BookingRepository`].

use crate::error::DbError;
use crate::repositories::availability_sql::{release_on, reserve_on};
use crate::repositories::booking::{BookingFilter, BookingRepository, NewBooking, Transition};
use crate::repositories::rows::{booking_from_row, fmt_ts, Filter, BOOKING_COLUMNS};
use crate::DbClient;
use chrono::Utc;
use pawtrips_common::models::{Booking, BookingStatus};
use sqlx::{AnyConnection, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

pub(crate) async fn find_booking_on(
    conn: &mut AnyConnection,
    id: &str,
) -> Result<Option<Booking>, DbError> {
    let query = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    row.as_ref().map(booking_from_row).transpose()
}

/// Compare-and-set on the status column followed by the counter change.
///
/// The status UPDATE runs first so the transaction holds the write lock
/// before anything else is read.
pub(crate) async fn apply_transition_on(
    conn: &mut AnyConnection,
    current: &Booking,
    to: BookingStatus,
    payment_reference: Option<&str>,
) -> Result<Booking, DbError> {
    let from = current.status;
    if !from.can_transition_to(to) {
        return Err(DbError::InvalidTransition { from, to });
    }

    let affected = sqlx::query(
        r#"
        UPDATE bookings
        SET status = $2,
            payment_reference = COALESCE($3, payment_reference),
            updated_at = $4
        WHERE id = $1 AND status = $5
        "#,
    )
    .bind(&current.id)
    .bind(to.as_str())
    .bind(payment_reference.map(str::to_string))
    .bind(fmt_ts(&Utc::now()))
    .bind(from.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!("Failed to update booking {} status: {}", current.id, e);
        DbError::from_write(e, "payment reference")
    })?
    .rows_affected();

    if affected == 0 {
        return Err(DbError::Conflict(format!(
            "booking {} is no longer {}",
            current.id, from
        )));
    }

    if to.holds_capacity() && !from.holds_capacity() {
        reserve_on(conn, &current.slot_id, current.adults, current.dogs).await?;
    } else if from.holds_capacity() && !to.holds_capacity() {
        release_on(conn, &current.slot_id, current.adults, current.dogs).await?;
    }

    find_booking_on(conn, &current.id)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("booking {}", current.id)))
}

#[derive(Debug, Clone)]
pub struct SqlBookingRepository {
    db_client: DbClient,
}

impl SqlBookingRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    async fn find_by_column(&self, column: &str, value: &str) -> Result<Option<Booking>, DbError> {
        let query = format!("SELECT {} FROM bookings WHERE {} = $1", BOOKING_COLUMNS, column);
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        row.as_ref().map(booking_from_row).transpose()
    }
}

impl BookingRepository for SqlBookingRepository {
    async fn create(&self, booking: NewBooking) -> Result<Booking, DbError> {
        let now = Utc::now();
        let created = Booking {
            id: Uuid::new_v4().to_string(),
            product_id: booking.product_id,
            slot_id: booking.slot_id,
            customer_name: booking.customer_name,
            customer_email: booking.customer_email,
            customer_phone: booking.customer_phone,
            notes: booking.notes,
            adults: booking.adults,
            dogs: booking.dogs,
            total_cents: booking.total_cents,
            currency: booking.currency,
            status: BookingStatus::Pending,
            payment_reference: None,
            idempotency_key: booking.idempotency_key,
            checkout_session_id: None,
            checkout_url: None,
            created_at: now,
            updated_at: now,
        };

        let query = r#"
            INSERT INTO bookings (id, product_id, slot_id, customer_name, customer_email,
                customer_phone, notes, adults, dogs, total_cents, currency, status,
                payment_reference, idempotency_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NULL, $13, $14, $14)
        "#;
        sqlx::query(query)
            .bind(&created.id)
            .bind(&created.product_id)
            .bind(&created.slot_id)
            .bind(&created.customer_name)
            .bind(&created.customer_email)
            .bind(&created.customer_phone)
            .bind(&created.notes)
            .bind(created.adults)
            .bind(created.dogs)
            .bind(created.total_cents)
            .bind(&created.currency)
            .bind(created.status.as_str())
            .bind(&created.idempotency_key)
            .bind(fmt_ts(&now))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert booking: {}", e);
                DbError::from_write(e, "booking with this idempotency key")
            })?;

        info!("Booking {} created for slot {}", created.id, created.slot_id);
        Ok(created)
    }

    async fn find(&self, id: &str) -> Result<Option<Booking>, DbError> {
        self.find_by_column("id", id).await
    }

    async fn find_by_payment_reference(&self, reference: &str) -> Result<Option<Booking>, DbError> {
        self.find_by_column("payment_reference", reference).await
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Booking>, DbError> {
        self.find_by_column("idempotency_key", key).await
    }

    async fn list(&self, filter: BookingFilter) -> Result<Vec<Booking>, DbError> {
        debug!("Listing bookings with {:?}", filter);
        let where_clause = Filter::new()
            .eq("status", filter.status.map(|s| s.as_str().to_string()))
            .eq("product_id", filter.product_id)
            .eq("slot_id", filter.slot_id);
        let query = format!(
            "SELECT {} FROM bookings{} ORDER BY created_at DESC",
            BOOKING_COLUMNS,
            where_clause.sql()
        );
        let rows = where_clause
            .bind(sqlx::query(&query))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn transition_status(
        &self,
        id: &str,
        to: BookingStatus,
        payment_reference: Option<String>,
    ) -> Result<Transition, DbError> {
        let current = self
            .find(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("booking {}", id)))?;

        let mut tx = self.db_client.begin().await?;
        let booking =
            apply_transition_on(&mut tx, &current, to, payment_reference.as_deref()).await?;
        tx.commit().await?;

        info!("Booking {} moved {} -> {}", id, current.status, booking.status);
        Ok(Transition {
            previous: current.status,
            booking,
        })
    }

    async fn attach_checkout(
        &self,
        id: &str,
        session_id: &str,
        url: &str,
    ) -> Result<Booking, DbError> {
        let affected = sqlx::query(
            r#"
            UPDATE bookings
            SET checkout_session_id = $2, checkout_url = $3, updated_at = $4
            WHERE id = $1 AND status = 'pending' AND checkout_session_id IS NULL
            "#,
        )
        .bind(id)
        .bind(session_id)
        .bind(url)
        .bind(fmt_ts(&Utc::now()))
        .execute(self.db_client.pool())
        .await
        .map_err(|e| DbError::from_write(e, "checkout session"))?
        .rows_affected();

        if affected == 0 {
            debug!("Booking {} already has a checkout or left pending", id);
        } else {
            info!("Checkout {} attached to booking {}", session_id, id);
        }
        self.find(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("booking {}", id)))
    }

    async fn confirmed_party_totals(&self, slot_id: &str) -> Result<(i64, i64), DbError> {
        let row = sqlx::query(
            r#"
            SELECT CAST(COALESCE(SUM(adults), 0) AS BIGINT) AS adults,
                   CAST(COALESCE(SUM(dogs), 0) AS BIGINT) AS dogs
            FROM bookings
            WHERE slot_id = $1 AND status = 'confirmed'
            "#,
        )
        .bind(slot_id)
        .fetch_one(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;

        let adults: i64 = row
            .try_get("adults")
            .map_err(|e| DbError::DecodeError(e.to_string()))?;
        let dogs: i64 = row
            .try_get("dogs")
            .map_err(|e| DbError::DecodeError(e.to_string()))?;
        Ok((adults, dogs))
    }
}
