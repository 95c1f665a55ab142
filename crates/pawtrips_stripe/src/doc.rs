// --- File: crates/pawtrips_stripe/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::WebhookAck;
use crate::logic::{
    OrderConfirmationDetails, StripeCustomerDetails, StripeEvent, StripeEventData, WebhookOutcome,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::stripe_webhook_handler,
        crate::handlers::stripe_checkout_success_handler,
        crate::handlers::stripe_checkout_cancel_handler,
        crate::handlers::get_checkout_session_details_handler
    ),
    components(
        schemas(
            StripeEvent,
            StripeEventData,
            StripeCustomerDetails,
            OrderConfirmationDetails,
            WebhookAck,
            WebhookOutcome
        )
    ),
    tags(
        (name = "Stripe", description = "Stripe Payment Integration API"),
        (name = "Stripe Webhooks", description = "Stripe Server-to-Server Webhooks"),
        (name = "Stripe Redirects", description = "User-facing redirect pages for Stripe Checkout")
    )
)]
pub struct StripeApiDoc;
