//! Row decoding shared by the SQL repositories.
//!
//! `sqlx::Any` only decodes primitive types, so dates and timestamps travel
//! as text and are parsed here. The `Any` SQLite driver cannot decode NULL
//! into `Option<String>`, so nullable text columns are selected through
//! `COALESCE(col, '')` and an empty string reads back as `None`.

use crate::error::DbError;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use pawtrips_common::models::{
    AvailabilitySlot, Booking, CancellationRequest, Product, Provider,
};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Row};
use std::str::FromStr;

pub(crate) const PROVIDER_COLUMNS: &str = "id, name, email, created_at";

pub(crate) const PRODUCT_COLUMNS: &str = "id, provider_id, kind, title, \
     COALESCE(description, '') AS description, COALESCE(location, '') AS location, \
     price_per_adult_cents, price_per_dog_cents, currency, active, created_at";

pub(crate) const SLOT_COLUMNS: &str = "id, product_id, slot_date, \
     COALESCE(start_time, '') AS start_time, COALESCE(end_date, '') AS end_date, \
     max_adults, max_dogs, booked_adults, booked_dogs";

pub(crate) const BOOKING_COLUMNS: &str = "id, product_id, slot_id, customer_name, customer_email, \
     COALESCE(customer_phone, '') AS customer_phone, COALESCE(notes, '') AS notes, \
     adults, dogs, total_cents, currency, status, \
     COALESCE(payment_reference, '') AS payment_reference, \
     COALESCE(idempotency_key, '') AS idempotency_key, \
     COALESCE(checkout_session_id, '') AS checkout_session_id, \
     COALESCE(checkout_url, '') AS checkout_url, created_at, updated_at";

pub(crate) const CANCELLATION_COLUMNS: &str = "id, booking_id, token, requested_by, \
     COALESCE(reason, '') AS reason, status, COALESCE(admin_note, '') AS admin_note, \
     expires_at, created_at, COALESCE(decided_at, '') AS decided_at";

/// Fixed-width UTC form so text ordering matches time ordering.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn fmt_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn fmt_time(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// WHERE clause built from optional filters, numbering `$n` as it goes.
#[derive(Debug, Default)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    params: Vec<String>,
}

impl Filter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(mut self, column: &str, op: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.params.push(value);
            self.clauses
                .push(format!("{} {} ${}", column, op, self.params.len()));
        }
        self
    }

    pub(crate) fn eq(self, column: &str, value: Option<String>) -> Self {
        self.push(column, "=", value)
    }

    pub(crate) fn at_least(self, column: &str, value: Option<String>) -> Self {
        self.push(column, ">=", value)
    }

    pub(crate) fn at_most(self, column: &str, value: Option<String>) -> Self {
        self.push(column, "<=", value)
    }

    /// Adds a clause without parameters.
    pub(crate) fn when(mut self, condition: bool, clause: &str) -> Self {
        if condition {
            self.clauses.push(clause.to_string());
        }
        self
    }

    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn bind<'q>(
        &self,
        query: Query<'q, Any, AnyArguments<'q>>,
    ) -> Query<'q, Any, AnyArguments<'q>> {
        self.params
            .iter()
            .fold(query, |query, param| query.bind(param.clone()))
    }
}

fn get<'r, T>(row: &'r AnyRow, column: &str) -> Result<T, DbError>
where
    T: sqlx::Decode<'r, sqlx::Any> + sqlx::Type<sqlx::Any>,
{
    row.try_get(column)
        .map_err(|e| DbError::DecodeError(format!("{}: {}", column, e)))
}

/// Nullable text column, selected as `COALESCE(col, '')`.
fn opt_text(row: &AnyRow, column: &str) -> Result<Option<String>, DbError> {
    let raw: String = get(row, column)?;
    Ok(text_to_option(raw))
}

fn text_to_option(raw: String) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::DecodeError(format!("{}: {}", column, e)))
}

fn parse_date(column: &str, value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DbError::DecodeError(format!("{}: {}", column, e)))
}

fn parse_time(column: &str, value: &str) -> Result<NaiveTime, DbError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| DbError::DecodeError(format!("{}: {}", column, e)))
}

fn parse_enum<T: FromStr>(column: &str, value: &str) -> Result<T, DbError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| DbError::DecodeError(format!("{}: {}", column, e)))
}

fn ts(row: &AnyRow, column: &str) -> Result<DateTime<Utc>, DbError> {
    let raw: String = get(row, column)?;
    parse_ts(column, &raw)
}

fn opt_ts(row: &AnyRow, column: &str) -> Result<Option<DateTime<Utc>>, DbError> {
    opt_text(row, column)?
        .map(|v| parse_ts(column, &v))
        .transpose()
}

pub(crate) fn provider_from_row(row: &AnyRow) -> Result<Provider, DbError> {
    Ok(Provider {
        id: get(row, "id")?,
        name: get(row, "name")?,
        email: get(row, "email")?,
        created_at: ts(row, "created_at")?,
    })
}

pub(crate) fn product_from_row(row: &AnyRow) -> Result<Product, DbError> {
    let kind: String = get(row, "kind")?;
    let active: i64 = get(row, "active")?;
    Ok(Product {
        id: get(row, "id")?,
        provider_id: get(row, "provider_id")?,
        kind: parse_enum("kind", &kind)?,
        title: get(row, "title")?,
        description: opt_text(row, "description")?,
        location: opt_text(row, "location")?,
        price_per_adult_cents: get(row, "price_per_adult_cents")?,
        price_per_dog_cents: get(row, "price_per_dog_cents")?,
        currency: get(row, "currency")?,
        active: active != 0,
        created_at: ts(row, "created_at")?,
    })
}

pub(crate) fn slot_from_row(row: &AnyRow) -> Result<AvailabilitySlot, DbError> {
    let date: String = get(row, "slot_date")?;
    let start_time = opt_text(row, "start_time")?;
    let end_date = opt_text(row, "end_date")?;
    Ok(AvailabilitySlot {
        id: get(row, "id")?,
        product_id: get(row, "product_id")?,
        date: parse_date("slot_date", &date)?,
        start_time: start_time.map(|t| parse_time("start_time", &t)).transpose()?,
        end_date: end_date.map(|d| parse_date("end_date", &d)).transpose()?,
        max_adults: get(row, "max_adults")?,
        max_dogs: get(row, "max_dogs")?,
        booked_adults: get(row, "booked_adults")?,
        booked_dogs: get(row, "booked_dogs")?,
    })
}

pub(crate) fn booking_from_row(row: &AnyRow) -> Result<Booking, DbError> {
    let status: String = get(row, "status")?;
    Ok(Booking {
        id: get(row, "id")?,
        product_id: get(row, "product_id")?,
        slot_id: get(row, "slot_id")?,
        customer_name: get(row, "customer_name")?,
        customer_email: get(row, "customer_email")?,
        customer_phone: opt_text(row, "customer_phone")?,
        notes: opt_text(row, "notes")?,
        adults: get(row, "adults")?,
        dogs: get(row, "dogs")?,
        total_cents: get(row, "total_cents")?,
        currency: get(row, "currency")?,
        status: parse_enum("status", &status)?,
        payment_reference: opt_text(row, "payment_reference")?,
        idempotency_key: opt_text(row, "idempotency_key")?,
        checkout_session_id: opt_text(row, "checkout_session_id")?,
        checkout_url: opt_text(row, "checkout_url")?,
        created_at: ts(row, "created_at")?,
        updated_at: ts(row, "updated_at")?,
    })
}

pub(crate) fn cancellation_from_row(row: &AnyRow) -> Result<CancellationRequest, DbError> {
    let requested_by: String = get(row, "requested_by")?;
    let status: String = get(row, "status")?;
    Ok(CancellationRequest {
        id: get(row, "id")?,
        booking_id: get(row, "booking_id")?,
        token: get(row, "token")?,
        requested_by: parse_enum("requested_by", &requested_by)?,
        reason: opt_text(row, "reason")?,
        status: parse_enum("status", &status)?,
        admin_note: opt_text(row, "admin_note")?,
        expires_at: ts(row, "expires_at")?,
        created_at: ts(row, "created_at")?,
        decided_at: opt_ts(row, "decided_at")?,
    })
}
