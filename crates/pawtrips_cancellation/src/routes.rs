// --- File: crates/pawtrips_cancellation/src/routes.rs ---

use crate::handlers::{
    admin_cancel_handler, approve_by_id_handler, approve_by_token_handler,
    create_cancellation_handler, list_cancellations_handler, reject_by_id_handler,
    reject_by_token_handler, view_cancellation_handler, CancellationState,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use pawtrips_common::auth::admin_auth_middleware;
use pawtrips_common::services::ServiceFactory;
use pawtrips_config::AppConfig;
use pawtrips_db::Repositories;
use std::sync::Arc;

/// Customer and magic-link routes plus the header-authenticated admin routes.
///
/// The magic-link decisions check the admin key from the `key` query
/// parameter themselves, since they are opened from an email.
pub fn routes(
    config: Arc<AppConfig>,
    repos: Repositories,
    services: Arc<dyn ServiceFactory>,
) -> Router {
    let state = Arc::new(CancellationState {
        config: config.clone(),
        repos,
        services,
    });

    let admin = Router::new()
        .route("/admin/cancellations", get(list_cancellations_handler))
        .route("/admin/cancellations/{id}/approve", post(approve_by_id_handler))
        .route("/admin/cancellations/{id}/reject", post(reject_by_id_handler))
        .route("/admin/bookings/{id}/cancellation", post(admin_cancel_handler))
        .route_layer(middleware::from_fn_with_state(config, admin_auth_middleware));

    Router::new()
        .route("/cancellations", post(create_cancellation_handler))
        .route("/cancellations/{token}", get(view_cancellation_handler))
        .route("/cancellations/{token}/approve", get(approve_by_token_handler))
        .route("/cancellations/{token}/reject", get(reject_by_token_handler))
        .merge(admin)
        .with_state(state)
}
