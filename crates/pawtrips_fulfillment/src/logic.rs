// --- File: crates/pawtrips_fulfillment/src/logic.rs ---
use pawtrips_bookings::logic::{get_booking, BookingStatusResponse};
use pawtrips_bookings::{confirm_booking, expire_pending_booking, BookingError};
use pawtrips_common::models::{Booking, BookingStatus};
use pawtrips_common::services::ServiceFactory;
use pawtrips_db::Repositories;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::FulfillmentError;

/// Sent by the Stripe webhook once a booking checkout is paid.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookingConfirmationRequest {
    pub booking_id: String,
    /// Payment intent id, kept for refunds.
    pub payment_reference: String,
    /// Amount Stripe collected, in minor units.
    pub amount_total: i64,
    pub currency: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookingExpiredRequest {
    pub booking_id: String,
    /// The session that expired. Sessions other than the booking's own are ignored.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FulfillmentResponse {
    pub success: bool,
    pub booking_id: String,
    pub status: BookingStatus,
    /// True when the call was a repeat and nothing changed.
    pub unchanged: bool,
    pub message: String,
    /// Set when the payment was returned because the booking was already cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
}

impl FulfillmentResponse {
    fn from_transition(result: BookingStatusResponse, message: &str) -> Self {
        Self {
            success: true,
            booking_id: result.booking.id,
            status: result.booking.status,
            unchanged: result.unchanged,
            message: message.to_string(),
            refund_id: None,
        }
    }
}

/// Confirms a paid booking. Repeated deliveries of the same payment are no-ops.
///
/// A payment that arrives after the booking was cancelled is refunded in
/// full so the customer is never charged for a booking they do not have.
pub async fn fulfill_booking_confirmation(
    repos: &Repositories,
    services: &dyn ServiceFactory,
    request: BookingConfirmationRequest,
) -> Result<FulfillmentResponse, FulfillmentError> {
    let booking = get_booking(repos, &request.booking_id).await?;

    if !request.currency.eq_ignore_ascii_case(&booking.currency) {
        error!(
            "[Fulfillment] Booking {} paid in {} instead of {}",
            booking.id, request.currency, booking.currency
        );
        return Err(FulfillmentError::CurrencyMismatch {
            booking_id: booking.id,
            paid: request.currency,
            expected: booking.currency,
        });
    }
    if request.amount_total < booking.total_cents {
        error!(
            "[Fulfillment] Booking {} underpaid: {} < {}",
            booking.id, request.amount_total, booking.total_cents
        );
        return Err(FulfillmentError::Underpaid {
            booking_id: booking.id,
            paid: request.amount_total,
            due: booking.total_cents,
        });
    }

    let notifier = services.notification_service();
    let payment_reference = request.payment_reference.clone();
    let result = match confirm_booking(repos, notifier.as_ref(), &booking.id, Some(payment_reference)).await {
        Ok(result) => result,
        Err(BookingError::WrongState { .. }) => {
            let current = get_booking(repos, &booking.id).await?;
            if current.status != BookingStatus::Cancelled {
                return Err(FulfillmentError::Booking(BookingError::WrongState {
                    booking_id: current.id,
                    status: current.status.to_string(),
                }));
            }
            return refund_late_payment(services, current, &request.payment_reference).await;
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        "[Fulfillment] Booking {} confirmed (unchanged: {})",
        result.booking.id, result.unchanged
    );
    let message = if result.unchanged {
        "Booking was already confirmed"
    } else {
        "Booking confirmed"
    };
    Ok(FulfillmentResponse::from_transition(result, message))
}

async fn refund_late_payment(
    services: &dyn ServiceFactory,
    booking: Booking,
    payment_reference: &str,
) -> Result<FulfillmentResponse, FulfillmentError> {
    warn!(
        "[Fulfillment] Payment {} arrived for cancelled booking {}, refunding",
        payment_reference, booking.id
    );
    let payments = services
        .payment_service()
        .ok_or_else(|| FulfillmentError::RefundFailed {
            booking_id: booking.id.clone(),
            message: "no payment service configured".to_string(),
        })?;
    let refund = payments
        .create_refund(payment_reference, None, Some("requested_by_customer"))
        .await
        .map_err(|e| {
            error!("[Fulfillment] Refund for booking {} failed: {}", booking.id, e);
            FulfillmentError::RefundFailed {
                booking_id: booking.id.clone(),
                message: e.to_string(),
            }
        })?;
    info!("[Fulfillment] Refund {} issued for cancelled booking {}", refund.id, booking.id);
    Ok(FulfillmentResponse {
        success: true,
        booking_id: booking.id,
        status: booking.status,
        unchanged: true,
        message: "Booking was cancelled, payment refunded".to_string(),
        refund_id: Some(refund.id),
    })
}

/// Releases a booking whose checkout expired unpaid.
pub async fn fulfill_booking_expired(
    repos: &Repositories,
    request: BookingExpiredRequest,
) -> Result<FulfillmentResponse, FulfillmentError> {
    let result =
        expire_pending_booking(repos, &request.booking_id, request.session_id.as_deref()).await?;
    let message = if result.unchanged {
        "Booking was not pending, nothing to expire"
    } else {
        "Pending booking cancelled"
    };
    Ok(FulfillmentResponse::from_transition(result, message))
}
