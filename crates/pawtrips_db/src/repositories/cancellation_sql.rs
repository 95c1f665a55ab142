//! SQL implementation of [`CancellationRepository`].

use crate::error::DbError;
use crate::repositories::booking_sql::{apply_transition_on, find_booking_on};
use crate::repositories::cancellation::{CancellationRepository, Decision, NewCancellation};
use crate::repositories::rows::{cancellation_from_row, fmt_ts, Filter, CANCELLATION_COLUMNS};
use crate::DbClient;
use chrono::Utc;
use pawtrips_common::models::{BookingStatus, CancellationRequest, CancellationStatus};
use sqlx::AnyConnection;
use tracing::{debug, error, info};
use uuid::Uuid;

async fn find_request_on(
    conn: &mut AnyConnection,
    id: &str,
) -> Result<Option<CancellationRequest>, DbError> {
    let query = format!("SELECT {} FROM cancellation_requests WHERE id = $1", CANCELLATION_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    row.as_ref().map(cancellation_from_row).transpose()
}

#[derive(Debug, Clone)]
pub struct SqlCancellationRepository {
    db_client: DbClient,
}

impl SqlCancellationRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    async fn find_by_column(
        &self,
        column: &str,
        value: &str,
        extra: &str,
    ) -> Result<Option<CancellationRequest>, DbError> {
        let query = format!(
            "SELECT {} FROM cancellation_requests WHERE {} = $1{}",
            CANCELLATION_COLUMNS, column, extra
        );
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        row.as_ref().map(cancellation_from_row).transpose()
    }
}

impl CancellationRepository for SqlCancellationRepository {
    async fn create(&self, request: NewCancellation) -> Result<CancellationRequest, DbError> {
        let created = CancellationRequest {
            id: Uuid::new_v4().to_string(),
            booking_id: request.booking_id,
            token: request.token,
            requested_by: request.requested_by,
            reason: request.reason,
            status: CancellationStatus::Pending,
            admin_note: None,
            expires_at: request.expires_at,
            created_at: Utc::now(),
            decided_at: None,
        };

        // The NOT EXISTS guard and the partial unique index both refuse a
        // second pending request for the same booking.
        let query = r#"
            INSERT INTO cancellation_requests (id, booking_id, token, requested_by, reason,
                status, admin_note, expires_at, created_at, decided_at)
            SELECT $1, $2, $3, $4, $5, 'pending', NULL, $6, $7, NULL
            WHERE NOT EXISTS (
                SELECT 1 FROM cancellation_requests WHERE booking_id = $2 AND status = 'pending'
            )
        "#;
        let affected = sqlx::query(query)
            .bind(&created.id)
            .bind(&created.booking_id)
            .bind(&created.token)
            .bind(created.requested_by.as_str())
            .bind(&created.reason)
            .bind(fmt_ts(&created.expires_at))
            .bind(fmt_ts(&created.created_at))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert cancellation request: {}", e);
                DbError::from_write(e, "pending cancellation request for this booking")
            })?
            .rows_affected();

        if affected == 0 {
            return Err(DbError::Conflict(format!(
                "booking {} already has a pending cancellation request",
                created.booking_id
            )));
        }

        info!(
            "Cancellation request {} created for booking {} by {}",
            created.id, created.booking_id, created.requested_by
        );
        Ok(created)
    }

    async fn find(&self, id: &str) -> Result<Option<CancellationRequest>, DbError> {
        self.find_by_column("id", id, "").await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<CancellationRequest>, DbError> {
        self.find_by_column("token", token, "").await
    }

    async fn find_pending_for_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<CancellationRequest>, DbError> {
        self.find_by_column("booking_id", booking_id, " AND status = 'pending'")
            .await
    }

    async fn list(
        &self,
        status: Option<CancellationStatus>,
    ) -> Result<Vec<CancellationRequest>, DbError> {
        debug!("Listing cancellation requests (status={:?})", status);
        let filter = Filter::new().eq("status", status.map(|s| s.as_str().to_string()));
        let query = format!(
            "SELECT {} FROM cancellation_requests{} ORDER BY created_at DESC",
            CANCELLATION_COLUMNS,
            filter.sql()
        );
        let rows = filter
            .bind(sqlx::query(&query))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        rows.iter().map(cancellation_from_row).collect()
    }

    async fn decide(
        &self,
        id: &str,
        decision: CancellationStatus,
        admin_note: Option<String>,
    ) -> Result<Decision, DbError> {
        if !decision.is_final() {
            return Err(DbError::QueryError(format!(
                "'{}' is not a decision",
                decision
            )));
        }

        let mut tx = self.db_client.begin().await?;

        let affected = sqlx::query(
            r#"
            UPDATE cancellation_requests
            SET status = $2, admin_note = $3, decided_at = $4
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(decision.as_str())
        .bind(&admin_note)
        .bind(fmt_ts(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to decide cancellation request {}: {}", id, e);
            DbError::QueryError(e.to_string())
        })?
        .rows_affected();

        let request = find_request_on(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("cancellation request {}", id)))?;
        if affected == 0 {
            return Err(DbError::Conflict(format!(
                "cancellation request {} is already {}",
                id, request.status
            )));
        }

        let booking = find_booking_on(&mut tx, &request.booking_id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("booking {}", request.booking_id)))?;

        let (booking, released_capacity) =
            if decision == CancellationStatus::Approved && booking.status != BookingStatus::Cancelled {
                let was_confirmed = booking.status.holds_capacity();
                let cancelled =
                    apply_transition_on(&mut tx, &booking, BookingStatus::Cancelled, None).await?;
                (cancelled, was_confirmed)
            } else {
                (booking, false)
            };

        tx.commit().await?;

        info!(
            "Cancellation request {} {} (booking {} now {})",
            id, decision, booking.id, booking.status
        );
        Ok(Decision {
            request,
            booking,
            released_capacity,
        })
    }
}
