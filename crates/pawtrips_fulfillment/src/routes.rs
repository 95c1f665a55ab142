// --- File: crates/pawtrips_fulfillment/src/routes.rs ---

use crate::auth::{fulfillment_auth_middleware, FulfillmentAuthState};
use crate::handlers::{booking_confirmation_handler, booking_expired_handler, FulfillmentState};
use axum::{middleware, routing::post, Router};
use pawtrips_common::services::ServiceFactory;
use pawtrips_config::AppConfig;
use pawtrips_db::Repositories;
use std::sync::Arc;

/// Internal routes called by the payment webhooks.
pub fn routes(config: Arc<AppConfig>, repos: Repositories, services: Arc<dyn ServiceFactory>) -> Router {
    let handler_state = Arc::new(FulfillmentState {
        config: config.clone(),
        repos,
        services,
    });
    let auth_middleware_state = Arc::new(FulfillmentAuthState { config });

    Router::new()
        .route("/fulfill/booking-confirmation", post(booking_confirmation_handler))
        .route("/fulfill/booking-expired", post(booking_expired_handler))
        .route_layer(middleware::from_fn_with_state(
            auth_middleware_state,
            fulfillment_auth_middleware,
        ))
        .with_state(handler_state)
}
