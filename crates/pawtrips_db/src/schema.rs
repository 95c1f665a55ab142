//! Table and index definitions.
//!
//! Timestamps are stored as RFC 3339 text and dates as `YYYY-MM-DD` so the
//! same statements work through the `Any` driver on every backend.

use crate::client::DbClient;
use crate::error::DbError;
use tracing::{debug, info};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS providers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        provider_id TEXT NOT NULL REFERENCES providers(id),
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        location TEXT,
        price_per_adult_cents BIGINT NOT NULL,
        price_per_dog_cents BIGINT NOT NULL,
        currency TEXT NOT NULL,
        active BIGINT NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS availability_slots (
        id TEXT PRIMARY KEY,
        product_id TEXT NOT NULL REFERENCES products(id),
        slot_date TEXT NOT NULL,
        start_time TEXT,
        end_date TEXT,
        max_adults BIGINT NOT NULL,
        max_dogs BIGINT NOT NULL,
        booked_adults BIGINT NOT NULL DEFAULT 0,
        booked_dogs BIGINT NOT NULL DEFAULT 0,
        CHECK (booked_adults >= 0 AND booked_adults <= max_adults),
        CHECK (booked_dogs >= 0 AND booked_dogs <= max_dogs)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_slots_product_date ON availability_slots(product_id, slot_date)",
    r#"
    CREATE TABLE IF NOT EXISTS bookings (
        id TEXT PRIMARY KEY,
        product_id TEXT NOT NULL REFERENCES products(id),
        slot_id TEXT NOT NULL REFERENCES availability_slots(id),
        customer_name TEXT NOT NULL,
        customer_email TEXT NOT NULL,
        customer_phone TEXT,
        notes TEXT,
        adults BIGINT NOT NULL,
        dogs BIGINT NOT NULL,
        total_cents BIGINT NOT NULL,
        currency TEXT NOT NULL,
        status TEXT NOT NULL,
        payment_reference TEXT UNIQUE,
        idempotency_key TEXT UNIQUE,
        checkout_session_id TEXT UNIQUE,
        checkout_url TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_bookings_slot ON bookings(slot_id)",
    "CREATE INDEX IF NOT EXISTS ix_bookings_status ON bookings(status)",
    r#"
    CREATE TABLE IF NOT EXISTS cancellation_requests (
        id TEXT PRIMARY KEY,
        booking_id TEXT NOT NULL REFERENCES bookings(id),
        token TEXT NOT NULL UNIQUE,
        requested_by TEXT NOT NULL,
        reason TEXT,
        status TEXT NOT NULL,
        admin_note TEXT,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        decided_at TEXT
    )
    "#,
    // At most one open request per booking, even under concurrent inserts.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS ux_cancellation_one_pending
        ON cancellation_requests(booking_id) WHERE status = 'pending'
    "#,
    "CREATE INDEX IF NOT EXISTS ix_cancellation_status ON cancellation_requests(status)",
];

/// Creates every table and index if missing. Safe to run on each start.
pub async fn init_schema(db_client: &DbClient) -> Result<(), DbError> {
    debug!("Initializing database schema");
    for statement in STATEMENTS {
        db_client.execute(statement).await?;
    }
    info!("Database schema initialized ({} statements)", STATEMENTS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let client = DbClient::from_url("sqlite::memory:").await.unwrap();
        init_schema(&client).await.unwrap();
        init_schema(&client).await.unwrap();
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name IN \
             ('providers', 'products', 'availability_slots', 'bookings', 'cancellation_requests')",
        )
        .fetch_one(client.pool())
        .await
        .unwrap();
        let n: i64 = sqlx::Row::try_get(&row, "n").unwrap();
        assert_eq!(n, 5);
    }
}
