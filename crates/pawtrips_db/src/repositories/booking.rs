//! Bookings and their status transitions.

use crate::error::DbError;
use pawtrips_common::models::{Booking, BookingStatus};
use std::future::Future;

/// A booking as submitted. It is stored as `pending`.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub product_id: String,
    pub slot_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub adults: i64,
    pub dogs: i64,
    pub total_cents: i64,
    pub currency: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub product_id: Option<String>,
    pub slot_id: Option<String>,
}

/// Result of a successful transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub previous: BookingStatus,
    pub booking: Booking,
}

pub trait BookingRepository {
    /// Inserts a pending booking. `Conflict` when the idempotency key is taken.
    fn create(&self, booking: NewBooking) -> impl Future<Output = Result<Booking, DbError>> + Send;

    fn find(&self, id: &str) -> impl Future<Output = Result<Option<Booking>, DbError>> + Send;

    fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<Option<Booking>, DbError>> + Send;

    fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Booking>, DbError>> + Send;

    /// Newest first.
    fn list(&self, filter: BookingFilter) -> impl Future<Output = Result<Vec<Booking>, DbError>> + Send;

    /// Moves a booking to `to` and applies the capacity side effect in the
    /// same transaction:
    ///
    /// * entering `confirmed` reserves the party on the slot
    ///   (`CapacityExceeded` rolls everything back)
    /// * `confirmed -> cancelled` releases it
    /// * `pending -> cancelled` leaves the counters alone
    ///
    /// `payment_reference`, when given, is stored with the new status.
    fn transition_status(
        &self,
        id: &str,
        to: BookingStatus,
        payment_reference: Option<String>,
    ) -> impl Future<Output = Result<Transition, DbError>> + Send;

    /// Stores the checkout session of a pending booking unless one is
    /// already stored, and returns the booking as it now is. Callers compare
    /// `checkout_session_id` to learn whether theirs was kept.
    fn attach_checkout(
        &self,
        id: &str,
        session_id: &str,
        url: &str,
    ) -> impl Future<Output = Result<Booking, DbError>> + Send;

    /// Sum of confirmed adults and dogs on a slot.
    fn confirmed_party_totals(
        &self,
        slot_id: &str,
    ) -> impl Future<Output = Result<(i64, i64), DbError>> + Send;
}
