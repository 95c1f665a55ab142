// --- File: crates/pawtrips_fulfillment/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::logic::{BookingConfirmationRequest, BookingExpiredRequest, FulfillmentResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::booking_confirmation_handler,
        crate::handlers::booking_expired_handler
    ),
    components(schemas(BookingConfirmationRequest, BookingExpiredRequest, FulfillmentResponse)),
    tags((name = "Fulfillment", description = "Internal endpoints applying payment results to bookings"))
)]
pub struct FulfillmentApiDoc;
