// --- File: crates/pawtrips_fulfillment/src/handlers.rs ---

use axum::{extract::State, response::Json};
use pawtrips_common::services::ServiceFactory;
use pawtrips_common::PawtripsError;
use pawtrips_config::AppConfig;
use pawtrips_db::Repositories;
use std::sync::Arc;
use tracing::info;

use crate::logic::{
    fulfill_booking_confirmation, fulfill_booking_expired, BookingConfirmationRequest,
    BookingExpiredRequest, FulfillmentResponse,
};

#[derive(Clone)]
pub struct FulfillmentState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub services: Arc<dyn ServiceFactory>,
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/fulfill/booking-confirmation",
    request_body = BookingConfirmationRequest,
    params(("X-Internal-Auth-Secret" = String, Header, description = "Shared fulfillment secret")),
    responses(
        (status = 200, description = "Booking confirmed, already confirmed, or cancelled and refunded", body = FulfillmentResponse),
        (status = 401, description = "Unauthorized - Missing or invalid auth"),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Slot full"),
        (status = 422, description = "Paid amount or currency does not match the booking")
    ),
    tag = "Fulfillment"
))]
pub async fn booking_confirmation_handler(
    State(state): State<Arc<FulfillmentState>>,
    Json(payload): Json<BookingConfirmationRequest>,
) -> Result<Json<FulfillmentResponse>, PawtripsError> {
    info!("[Fulfillment Handler] Payment received for booking {}", payload.booking_id);
    let response = fulfill_booking_confirmation(&state.repos, state.services.as_ref(), payload).await?;
    Ok(Json(response))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/fulfill/booking-expired",
    request_body = BookingExpiredRequest,
    params(("X-Internal-Auth-Secret" = String, Header, description = "Shared fulfillment secret")),
    responses(
        (status = 200, description = "Pending booking cancelled, or nothing to do", body = FulfillmentResponse),
        (status = 401, description = "Unauthorized - Missing or invalid auth"),
        (status = 404, description = "Unknown booking")
    ),
    tag = "Fulfillment"
))]
pub async fn booking_expired_handler(
    State(state): State<Arc<FulfillmentState>>,
    Json(payload): Json<BookingExpiredRequest>,
) -> Result<Json<FulfillmentResponse>, PawtripsError> {
    info!("[Fulfillment Handler] Checkout expired for booking {}", payload.booking_id);
    Ok(Json(fulfill_booking_expired(&state.repos, payload).await?))
}
