// --- File: crates/pawtrips_stripe/src/handlers.rs ---
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, Json},
};
use chrono::Utc;
use pawtrips_common::{is_stripe_enabled, PawtripsError};
use pawtrips_config::AppConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::StripeError;
use crate::logic::{
    get_checkout_session_details, process_stripe_webhook, verify_stripe_signature,
    OrderConfirmationDetails, StripeEvent, WebhookOutcome,
};

#[derive(Clone)]
pub struct StripeState {
    pub config: Arc<AppConfig>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: WebhookOutcome,
}

fn ensure_enabled(config: &AppConfig) -> Result<(), PawtripsError> {
    if is_stripe_enabled(config) {
        Ok(())
    } else {
        Err(PawtripsError::ServiceUnavailable("Stripe service is disabled.".to_string()))
    }
}

/// Stripe server-to-server notifications.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/stripe/webhook",
    request_body = StripeEvent,
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, description = "Webhook received and acknowledged", body = WebhookAck),
        (status = 400, description = "Invalid signature or payload"),
        (status = 502, description = "Fulfillment failed, Stripe will retry"),
        (status = 503, description = "Stripe is disabled")
    ),
    tag = "Stripe Webhooks"
))]
pub async fn stripe_webhook_handler(
    State(state): State<Arc<StripeState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, PawtripsError> {
    ensure_enabled(&state.config)?;

    let webhook_secret = state
        .config
        .stripe
        .as_ref()
        .and_then(|s| s.webhook_secret.as_deref())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            error!("stripe.webhook_secret is not configured");
            StripeError::ConfigError("stripe.webhook_secret is not set".to_string())
        })?;

    let sig_header = headers.get("Stripe-Signature").and_then(|h| h.to_str().ok());
    if let Err(e) = verify_stripe_signature(&body, sig_header, webhook_secret, Utc::now()) {
        warn!("Stripe webhook signature verification failed: {}", e);
        return Err(e.into());
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| StripeError::WebhookProcessingError(format!("Invalid payload format: {}", e)))?;

    let outcome = process_stripe_webhook(event, &state.config).await.map_err(|e| {
        error!("Error processing Stripe webhook: {}", e);
        e
    })?;
    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}

// --- Redirect Handlers (Client-Side) ---

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct StripeRedirectQuery {
    /// Appended by Stripe when the success URL contains `{CHECKOUT_SESSION_ID}`
    #[cfg_attr(feature = "openapi", param(example = "cs_test_a1..."))]
    pub session_id: Option<String>,
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/stripe/checkout-success",
    params(StripeRedirectQuery),
    responses((status = 200, description = "Checkout success page", content_type = "text/html")),
    tag = "Stripe Redirects"
))]
pub async fn stripe_checkout_success_handler(Query(params): Query<StripeRedirectQuery>) -> Html<&'static str> {
    info!("Customer returned from Stripe checkout, session {:?}", params.session_id);
    Html("<h1>Payment received</h1><p>Thank you! Your booking is confirmed as soon as the payment clears. We will email you shortly.</p><a href='/'>Back to PawTrips</a>")
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/stripe/checkout-cancel",
    params(StripeRedirectQuery),
    responses((status = 200, description = "Checkout cancellation page", content_type = "text/html")),
    tag = "Stripe Redirects"
))]
pub async fn stripe_checkout_cancel_handler(Query(params): Query<StripeRedirectQuery>) -> Html<&'static str> {
    info!("Customer left Stripe checkout, session {:?}", params.session_id);
    Html("<h1>Payment cancelled</h1><p>You have not been charged. Your booking stays unpaid until the checkout link expires.</p><a href='/'>Back to PawTrips</a>")
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct GetSessionDetailsQuery {
    pub session_id: String,
}

/// Details for the order confirmation page after a paid checkout.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/stripe/order-confirmation-details",
    params(GetSessionDetailsQuery),
    responses(
        (status = 200, description = "Checkout session details", body = OrderConfirmationDetails),
        (status = 404, description = "Session not found or not paid"),
        (status = 503, description = "Stripe is disabled")
    ),
    tag = "Stripe"
))]
pub async fn get_checkout_session_details_handler(
    State(state): State<Arc<StripeState>>,
    Query(query): Query<GetSessionDetailsQuery>,
) -> Result<Json<OrderConfirmationDetails>, PawtripsError> {
    ensure_enabled(&state.config)?;
    let session = get_checkout_session_details(&state.config, &query.session_id).await?;
    if !session.is_paid() {
        return Err(StripeError::SessionNotFoundOrNotPaid.into());
    }
    Ok(Json(session.into()))
}
