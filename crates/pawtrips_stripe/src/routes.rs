// --- File: crates/pawtrips_stripe/src/routes.rs ---

use crate::handlers::{
    get_checkout_session_details_handler, stripe_checkout_cancel_handler,
    stripe_checkout_success_handler, stripe_webhook_handler, StripeState,
};
use axum::{
    routing::{get, post},
    Router,
};
use pawtrips_config::AppConfig;
use std::sync::Arc;

/// Creates a router containing all routes for the Stripe feature.
pub fn routes(config: Arc<AppConfig>) -> Router {
    let stripe_state = Arc::new(StripeState { config });

    Router::new()
        .route("/stripe/webhook", post(stripe_webhook_handler))
        // User-facing redirect endpoints
        .route("/stripe/checkout-success", get(stripe_checkout_success_handler))
        .route("/stripe/checkout-cancel", get(stripe_checkout_cancel_handler))
        .route(
            "/stripe/order-confirmation-details",
            get(get_checkout_session_details_handler),
        )
        .with_state(stripe_state)
}
