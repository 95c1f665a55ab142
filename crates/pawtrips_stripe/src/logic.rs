// --- File: crates/pawtrips_stripe/src/logic.rs ---
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use pawtrips_common::services::{CheckoutRequest, CheckoutResult, RefundResult};
use pawtrips_common::{is_fulfillment_enabled, send_with_retry, RetryPolicy, HTTP_CLIENT};
use pawtrips_config::{AppConfig, StripeConfig};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::error::StripeError;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Accepted distance between the signature timestamp and our clock.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// `metadata[ff_type]` of sessions created for bookings.
pub const FF_TYPE_BOOKING_CONFIRMATION: &str = "booking_confirmation";

pub const INTERNAL_AUTH_HEADER: &str = "X-Internal-Auth-Secret";

type HmacSha256 = Hmac<Sha256>;

// --- Data Structures ---

/// Represents the `data` field within a Stripe Event.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StripeEventData {
    /// The object the event is about; its shape depends on the event type.
    pub object: serde_json::Value,
}

/// Represents the outer Stripe Event object.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StripeEvent {
    pub id: String,
    pub object: String, // "event"
    pub api_version: Option<String>,
    pub created: i64,
    pub livemode: bool,
    #[serde(rename = "type")]
    pub event_type: String, // e.g., "checkout.session.completed"
    pub data: StripeEventData,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// A Checkout Session as delivered by webhooks and `GET /v1/checkout/sessions/{id}`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StripeCheckoutSessionData {
    pub id: String,
    pub object: String, // "checkout.session"
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    pub payment_intent: Option<String>,
    pub payment_status: Option<String>, // "paid", "unpaid", "no_payment_required"
    pub status: Option<String>,         // "open", "complete", "expired"
    pub client_reference_id: Option<String>,
    pub created: Option<i64>,
    pub expires_at: Option<i64>,
}

impl StripeCheckoutSessionData {
    fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.get(key)).map(String::as_str)
    }

    /// The booking this session pays for, from metadata or the client reference.
    pub fn booking_id(&self) -> Option<&str> {
        self.metadata_value("booking_id")
            .or(self.client_reference_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

#[derive(Deserialize, Debug)]
struct StripeCheckoutSessionApiResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StripeRefundApiResponse {
    id: String,
    status: Option<String>,
    amount: i64,
    currency: String,
}

/// Body posted to `/api/fulfill/booking-confirmation`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BookingConfirmationPayload {
    pub booking_id: String,
    pub payment_reference: String,
    pub amount_total: i64,
    pub currency: String,
}

/// Body posted to `/api/fulfill/booking-expired`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BookingExpiredPayload {
    pub booking_id: String,
    pub session_id: String,
}

/// What the webhook did with an event.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    BookingConfirmed,
    BookingExpired,
    Ignored,
}

/// Session details shown on the order confirmation page.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OrderConfirmationDetails {
    pub session_id: String,
    pub booking_id: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
}

impl From<StripeCheckoutSessionData> for OrderConfirmationDetails {
    fn from(session: StripeCheckoutSessionData) -> Self {
        Self {
            booking_id: session.booking_id().map(str::to_string),
            session_id: session.id,
            payment_status: session.payment_status,
            amount_total: session.amount_total,
            currency: session.currency,
            customer_email: session.customer_details.and_then(|d| d.email),
        }
    }
}

// --- Stripe API ---

fn stripe_config(config: &AppConfig) -> Result<&StripeConfig, StripeError> {
    config
        .stripe
        .as_ref()
        .ok_or_else(|| StripeError::ConfigError("[stripe] section is missing".to_string()))
}

fn secret_key(stripe: &StripeConfig) -> Result<&str, StripeError> {
    stripe
        .secret_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| StripeError::ConfigError("stripe.secret_key is not set".to_string()))
}

fn api_url(stripe: &StripeConfig, path: &str) -> String {
    let base = stripe.api_base.as_deref().unwrap_or(STRIPE_API_BASE);
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Pulls `error.message` out of a Stripe error body, falling back to the raw text.
fn stripe_error_message(body_text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body_text)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body_text.to_string())
}

async fn read_success(response: Response, what: &str) -> Result<String, StripeError> {
    let status = response.status();
    let body_text = response.text().await?;
    if status.is_success() {
        return Ok(body_text);
    }
    let message = stripe_error_message(&body_text);
    error!("[Stripe Logic] {} failed with HTTP status {}: {}", what, status, message);
    Err(StripeError::ApiError {
        status_code: status.as_u16(),
        message,
    })
}

/// Form body of `POST /v1/checkout/sessions` for one booking.
pub fn checkout_form(stripe: &StripeConfig, request: &CheckoutRequest) -> Vec<(String, String)> {
    let currency = if request.currency.is_empty() {
        stripe.default_currency.clone().unwrap_or_else(|| "chf".to_string())
    } else {
        request.currency.clone()
    };

    let mut form_body: Vec<(String, String)> = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), stripe.success_url.clone()),
        ("cancel_url".to_string(), stripe.cancel_url.clone()),
        ("line_items[0][price_data][currency]".to_string(), currency.to_lowercase()),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.description.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount_cents.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("client_reference_id".to_string(), request.booking_id.clone()),
        (
            "metadata[ff_type]".to_string(),
            FF_TYPE_BOOKING_CONFIRMATION.to_string(),
        ),
        ("metadata[booking_id]".to_string(), request.booking_id.clone()),
    ];
    if let Some(email) = request.customer_email.as_ref().filter(|e| !e.is_empty()) {
        form_body.push(("customer_email".to_string(), email.clone()));
    }
    form_body
}

/// Creates a Stripe Checkout Session paying the booking total.
pub async fn create_checkout_session(
    config: &AppConfig,
    request: &CheckoutRequest,
) -> Result<CheckoutResult, StripeError> {
    let stripe = stripe_config(config)?;
    let key = secret_key(stripe)?;
    if request.amount_cents <= 0 {
        return Err(StripeError::InternalError(format!(
            "Refusing a checkout of {} cents for booking {}",
            request.amount_cents, request.booking_id
        )));
    }

    let form_body = checkout_form(stripe, request);
    let url = api_url(stripe, "/v1/checkout/sessions");
    // One key for all retries so Stripe never creates two sessions
    let idempotency_key = uuid::Uuid::new_v4().to_string();
    info!(
        "[Stripe Logic] Creating Checkout Session for booking {} ({} {})",
        request.booking_id, request.amount_cents, request.currency
    );

    let response = send_with_retry(&RetryPolicy::from_config(&config.http), || {
        HTTP_CLIENT
            .post(&url)
            .basic_auth(key, None::<&str>)
            .header("Idempotency-Key", &idempotency_key)
            .form(&form_body)
    })
    .await?;
    let body_text = read_success(response, "Checkout Session creation").await?;

    let session: StripeCheckoutSessionApiResponse = serde_json::from_str(&body_text)?;
    let url = session
        .url
        .ok_or_else(|| StripeError::InternalError("Stripe response missing checkout URL".to_string()))?;
    info!("[Stripe Logic] Checkout Session {} created", session.id);
    Ok(CheckoutResult {
        session_id: session.id,
        url,
    })
}

/// Refunds a payment intent, in full when `amount` is `None`.
pub async fn create_refund(
    config: &AppConfig,
    payment_intent: &str,
    amount: Option<i64>,
    reason: Option<&str>,
) -> Result<RefundResult, StripeError> {
    let stripe = stripe_config(config)?;
    let key = secret_key(stripe)?;

    let mut form_body = vec![("payment_intent".to_string(), payment_intent.to_string())];
    if let Some(amount) = amount {
        form_body.push(("amount".to_string(), amount.to_string()));
    }
    if let Some(reason) = reason {
        form_body.push(("reason".to_string(), reason.to_string()));
    }

    let url = api_url(stripe, "/v1/refunds");
    let idempotency_key = uuid::Uuid::new_v4().to_string();
    info!("[Stripe Logic] Refunding {} (amount {:?})", payment_intent, amount);

    let response = send_with_retry(&RetryPolicy::from_config(&config.http), || {
        HTTP_CLIENT
            .post(&url)
            .basic_auth(key, None::<&str>)
            .header("Idempotency-Key", &idempotency_key)
            .form(&form_body)
    })
    .await?;
    let body_text = read_success(response, "Refund").await?;

    let refund: StripeRefundApiResponse = serde_json::from_str(&body_text)?;
    info!("[Stripe Logic] Refund {} is {:?}", refund.id, refund.status);
    Ok(RefundResult {
        id: refund.id,
        status: refund.status.unwrap_or_else(|| "pending".to_string()),
        amount: refund.amount,
        currency: refund.currency,
    })
}

/// Retrieves details of a Stripe Checkout Session.
pub async fn get_checkout_session_details(
    config: &AppConfig,
    session_id: &str,
) -> Result<StripeCheckoutSessionData, StripeError> {
    let stripe = stripe_config(config)?;
    let key = secret_key(stripe)?;
    if session_id.is_empty() || !session_id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(StripeError::SessionNotFoundOrNotPaid);
    }

    let url = api_url(stripe, &format!("/v1/checkout/sessions/{}", session_id));
    let response = send_with_retry(&RetryPolicy::from_config(&config.http), || {
        HTTP_CLIENT.get(&url).basic_auth(key, None::<&str>)
    })
    .await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(StripeError::SessionNotFoundOrNotPaid);
    }
    let body_text = read_success(response, "Session lookup").await?;

    let session: StripeCheckoutSessionData = serde_json::from_str(&body_text)?;
    if !session.is_paid() {
        info!(
            "[Stripe Logic] Session {} is {:?}, payment_status {:?}",
            session_id, session.status, session.payment_status
        );
    }
    Ok(session)
}

// --- Webhook Processing Logic ---

/// Computes the `v1` signature Stripe sends for `payload` at `timestamp`.
pub fn compute_signature(payload: &[u8], timestamp: &str, secret: &str) -> Result<String, StripeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        StripeError::WebhookSignatureError("Invalid webhook secret format for HMAC".to_string())
    })?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies the `Stripe-Signature` header of a webhook request.
///
/// The header carries `t=<unix seconds>` and one or more `v1=<hex>` values
/// (several during secret rotation). The timestamp must lie within
/// [`SIGNATURE_TOLERANCE_SECS`] of `now` and one `v1` must match.
pub fn verify_stripe_signature(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), StripeError> {
    let sig_header_value = sig_header
        .ok_or_else(|| StripeError::WebhookSignatureError("Missing Stripe-Signature header".to_string()))?;

    let mut timestamp_str: Option<&str> = None;
    let mut v1_signatures_hex: Vec<&str> = Vec::new();
    for item in sig_header_value.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp_str = Some(value),
            Some(("v1", value)) => v1_signatures_hex.push(value),
            _ => {}
        }
    }

    let timestamp_str = timestamp_str.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing timestamp 't' in Stripe-Signature".to_string())
    })?;
    let parsed_timestamp = timestamp_str.parse::<i64>().map_err(|_| {
        StripeError::WebhookSignatureError("Invalid timestamp format in Stripe-Signature".to_string())
    })?;
    if v1_signatures_hex.is_empty() {
        return Err(StripeError::WebhookSignatureError(
            "Missing v1 signature in Stripe-Signature".to_string(),
        ));
    }

    let drift = (now.timestamp() - parsed_timestamp).abs();
    if drift > SIGNATURE_TOLERANCE_SECS {
        warn!(
            "Stripe signature timestamp outside tolerance. Now: {}, Event: {}",
            now.timestamp(),
            parsed_timestamp
        );
        return Err(StripeError::WebhookSignatureError(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let calculated_signature_hex = compute_signature(payload_bytes, timestamp_str, secret)?;
    let matched = v1_signatures_hex.iter().any(|provided| {
        constant_time_eq::constant_time_eq(calculated_signature_hex.as_bytes(), provided.as_bytes())
    });
    if matched {
        Ok(())
    } else {
        debug!("Stripe signature mismatch for timestamp {}", parsed_timestamp);
        Err(StripeError::WebhookSignatureError("Signature mismatch".to_string()))
    }
}

fn parse_session(event: StripeEvent) -> Result<StripeCheckoutSessionData, StripeError> {
    serde_json::from_value(event.data.object).map_err(|e| {
        StripeError::WebhookProcessingError(format!("Failed to parse checkout session object: {}", e))
    })
}

/// Sessions we did not create for a booking are acknowledged and left alone.
fn is_booking_session(session: &StripeCheckoutSessionData) -> bool {
    match session.metadata_value("ff_type") {
        Some(ff_type) => ff_type == FF_TYPE_BOOKING_CONFIRMATION,
        None => session.client_reference_id.is_some(),
    }
}

/// Posts `payload` to one of our own `/api/fulfill/*` endpoints.
async fn call_fulfillment<T: Serialize>(config: &AppConfig, path: &str, payload: &T) -> Result<(), StripeError> {
    let secret = config
        .fulfillment
        .as_ref()
        .and_then(|f| f.shared_secret.as_deref())
        .filter(|_| is_fulfillment_enabled(config))
        .ok_or_else(|| StripeError::ConfigError("fulfillment is disabled or has no shared_secret".to_string()))?;

    let fulfillment_url = format!("http://{}:{}/api/fulfill/{}", config.server.host, config.server.port, path);
    info!("[Stripe Webhook] Calling fulfillment service at {}", fulfillment_url);

    let response = send_with_retry(&RetryPolicy::from_config(&config.http), || {
        HTTP_CLIENT
            .post(&fulfillment_url)
            .header(INTERNAL_AUTH_HEADER, secret)
            .json(payload)
    })
    .await
    .map_err(|e| StripeError::FulfillmentError(format!("Error calling fulfillment service: {}", e)))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let err_text = response.text().await.unwrap_or_default();
    error!("[Stripe Webhook] Fulfillment call to {} failed: {} - {}", path, status, err_text);
    Err(StripeError::FulfillmentError(format!(
        "Fulfillment service call failed: {} - {}",
        status, err_text
    )))
}

/// Processes a verified Stripe webhook event.
pub async fn process_stripe_webhook(event: StripeEvent, config: &AppConfig) -> Result<WebhookOutcome, StripeError> {
    info!("Processing Stripe event {} of type {}", event.id, event.event_type);

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session = parse_session(event)?;
            if !is_booking_session(&session) {
                info!("[Stripe Webhook] Session {} is not a booking checkout", session.id);
                return Ok(WebhookOutcome::Ignored);
            }
            if !session.is_paid() {
                info!(
                    "Checkout session {} completed, but payment status is {:?}. No fulfillment action taken.",
                    session.id, session.payment_status
                );
                return Ok(WebhookOutcome::Ignored);
            }
            let booking_id = session
                .booking_id()
                .ok_or_else(|| StripeError::MissingFulfillmentData(session.id.clone()))?;

            let payload = BookingConfirmationPayload {
                booking_id: booking_id.to_string(),
                payment_reference: session.payment_intent.clone().unwrap_or_else(|| session.id.clone()),
                amount_total: session.amount_total.unwrap_or(0),
                currency: session.currency.clone().unwrap_or_default(),
            };
            call_fulfillment(config, "booking-confirmation", &payload).await?;
            info!("[Stripe Webhook] Booking {} paid via session {}", booking_id, session.id);
            Ok(WebhookOutcome::BookingConfirmed)
        }
        "checkout.session.expired" => {
            let session = parse_session(event)?;
            if !is_booking_session(&session) {
                return Ok(WebhookOutcome::Ignored);
            }
            let booking_id = session
                .booking_id()
                .ok_or_else(|| StripeError::MissingFulfillmentData(session.id.clone()))?;

            let payload = BookingExpiredPayload {
                booking_id: booking_id.to_string(),
                session_id: session.id.clone(),
            };
            call_fulfillment(config, "booking-expired", &payload).await?;
            info!("[Stripe Webhook] Checkout for booking {} expired", booking_id);
            Ok(WebhookOutcome::BookingExpired)
        }
        "payment_intent.payment_failed" => {
            let payment_intent_id = event.data.object.get("id").and_then(|v| v.as_str());
            warn!("PaymentIntent failed: {:?}", payment_intent_id);
            Ok(WebhookOutcome::Ignored)
        }
        _ => {
            info!("Received unhandled Stripe event type: {}", event.event_type);
            Ok(WebhookOutcome::Ignored)
        }
    }
}
