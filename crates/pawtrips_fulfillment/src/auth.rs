// --- File: crates/pawtrips_fulfillment/src/auth.rs ---

use axum::{
    body::Body as AxumBody,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use constant_time_eq::constant_time_eq;
use pawtrips_common::{is_fulfillment_enabled, PawtripsError};
use pawtrips_config::AppConfig;
use std::sync::Arc;
use tracing::{debug, warn};

pub const INTERNAL_AUTH_HEADER: &str = "X-Internal-Auth-Secret";

#[derive(Clone)]
pub struct FulfillmentAuthState {
    pub config: Arc<AppConfig>,
}

/// Authenticates internal fulfillment requests by the shared secret in
/// `X-Internal-Auth-Secret`.
pub async fn fulfillment_auth_middleware(
    State(auth_state): State<Arc<FulfillmentAuthState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Response {
    let expected = match auth_state
        .config
        .fulfillment
        .as_ref()
        .and_then(|f| f.shared_secret.as_deref())
        .filter(|_| is_fulfillment_enabled(&auth_state.config))
    {
        Some(secret) => secret,
        None => {
            warn!("Fulfillment request while fulfillment is disabled");
            return PawtripsError::ServiceUnavailable("Fulfillment is disabled.".to_string()).into_response();
        }
    };

    let provided = req
        .headers()
        .get(INTERNAL_AUTH_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(provided) if constant_time_eq(provided.as_bytes(), expected.as_bytes()) => {
            debug!("Fulfillment request authenticated");
            next.run(req).await
        }
        Some(_) => {
            warn!("Fulfillment request with an invalid secret");
            PawtripsError::AuthError("Invalid credentials.".to_string()).into_response()
        }
        None => PawtripsError::AuthError(format!("Missing {} header.", INTERNAL_AUTH_HEADER)).into_response(),
    }
}
