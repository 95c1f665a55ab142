// --- File: crates/pawtrips_bookings/src/routes.rs ---

use crate::handlers::{
    cancel_booking_handler, confirm_booking_handler, create_booking_handler,
    create_product_handler, create_provider_handler, create_slot_handler,
    get_availability_handler, get_booking_handler, list_bookings_handler,
    update_capacity_handler, BookingState,
};
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use pawtrips_common::auth::admin_auth_middleware;
use pawtrips_common::services::ServiceFactory;
use pawtrips_config::AppConfig;
use pawtrips_db::Repositories;
use std::sync::Arc;

/// Public booking routes plus the admin routes guarded by `X-Admin-Api-Key`.
pub fn routes(
    config: Arc<AppConfig>,
    repos: Repositories,
    services: Arc<dyn ServiceFactory>,
) -> Router {
    let state = Arc::new(BookingState {
        config: config.clone(),
        repos,
        services,
    });

    let admin = Router::new()
        .route("/admin/bookings", get(list_bookings_handler))
        .route("/admin/bookings/{id}/confirm", post(confirm_booking_handler))
        .route("/admin/bookings/{id}/cancel", post(cancel_booking_handler))
        .route("/admin/providers", post(create_provider_handler))
        .route("/admin/products", post(create_product_handler))
        .route("/admin/availability", post(create_slot_handler))
        .route("/admin/availability/{id}", patch(update_capacity_handler))
        .route_layer(middleware::from_fn_with_state(config, admin_auth_middleware));

    Router::new()
        .route("/availability", get(get_availability_handler))
        .route("/bookings", post(create_booking_handler))
        .route("/bookings/{id}", get(get_booking_handler))
        .merge(admin)
        .with_state(state)
}
