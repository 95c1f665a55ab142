//! Cancellation requests.

use crate::error::DbError;
use chrono::{DateTime, Utc};
use pawtrips_common::models::{Booking, CancellationRequest, CancellationStatus, RequestedBy};
use std::future::Future;

#[derive(Debug, Clone)]
pub struct NewCancellation {
    pub booking_id: String,
    pub token: String,
    pub requested_by: RequestedBy,
    pub reason: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of deciding a request.
#[derive(Debug, Clone)]
pub struct Decision {
    pub request: CancellationRequest,
    /// The booking after the decision.
    pub booking: Booking,
    /// True when the booking was confirmed and its seats went back to the slot.
    pub released_capacity: bool,
}

pub trait CancellationRepository {
    /// Stores a pending request. `Conflict` if the booking already has one pending.
    fn create(
        &self,
        request: NewCancellation,
    ) -> impl Future<Output = Result<CancellationRequest, DbError>> + Send;

    fn find(&self, id: &str) -> impl Future<Output = Result<Option<CancellationRequest>, DbError>> + Send;

    fn find_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<CancellationRequest>, DbError>> + Send;

    fn find_pending_for_booking(
        &self,
        booking_id: &str,
    ) -> impl Future<Output = Result<Option<CancellationRequest>, DbError>> + Send;

    /// Newest first.
    fn list(
        &self,
        status: Option<CancellationStatus>,
    ) -> impl Future<Output = Result<Vec<CancellationRequest>, DbError>> + Send;

    /// Moves a pending request to `approved` or `rejected`.
    ///
    /// Approval cancels the booking in the same transaction, releasing its
    /// capacity when it was confirmed. `Conflict` when the request is no
    /// longer pending.
    fn decide(
        &self,
        id: &str,
        decision: CancellationStatus,
        admin_note: Option<String>,
    ) -> impl Future<Output = Result<Decision, DbError>> + Send;
}
