// --- File: crates/pawtrips_stripe/src/error.rs ---
use pawtrips_common::{external_service_error, HttpStatusCode, PawtripsError};
use thiserror::Error;

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// The request never produced a response (after retries)
    #[error("Stripe API request failed: {0}")]
    RequestError(String),

    /// Error returned by the Stripe API
    #[error("Stripe API returned an error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse Stripe API response: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Stripe configuration missing or incomplete: {0}")]
    ConfigError(String),

    #[error("Stripe webhook signature verification failed: {0}")]
    WebhookSignatureError(String),

    #[error("Stripe webhook event processing error: {0}")]
    WebhookProcessingError(String),

    /// The internal fulfillment endpoint refused or failed
    #[error("Fulfillment service call failed: {0}")]
    FulfillmentError(String),

    #[error("Missing booking_id in checkout session {0}")]
    MissingFulfillmentData(String),

    #[error("Session not found or not paid")]
    SessionNotFoundOrNotPaid,

    #[error("Internal processing error: {0}")]
    InternalError(String),
}

impl From<reqwest::Error> for StripeError {
    fn from(err: reqwest::Error) -> Self {
        StripeError::RequestError(err.to_string())
    }
}

impl From<PawtripsError> for StripeError {
    fn from(err: PawtripsError) -> Self {
        StripeError::RequestError(err.to_string())
    }
}

impl From<StripeError> for PawtripsError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::RequestError(msg) => PawtripsError::HttpError(format!("Stripe request error: {}", msg)),
            StripeError::ApiError { status_code, message } => external_service_error(
                "Stripe API",
                format!("Status: {}, Message: {}", status_code, message),
            ),
            StripeError::ParseError(e) => PawtripsError::ParseError(format!("Stripe response parse error: {}", e)),
            StripeError::ConfigError(msg) => PawtripsError::ConfigError(msg),
            StripeError::WebhookSignatureError(msg) => {
                PawtripsError::ValidationError(format!("Stripe webhook signature error: {}", msg))
            }
            StripeError::WebhookProcessingError(msg) => PawtripsError::ValidationError(msg),
            StripeError::FulfillmentError(msg) => external_service_error("Fulfillment service", msg),
            e @ StripeError::MissingFulfillmentData(_) => PawtripsError::ValidationError(e.to_string()),
            StripeError::SessionNotFoundOrNotPaid => {
                PawtripsError::NotFoundError("Stripe session not found or not paid".to_string())
            }
            StripeError::InternalError(msg) => PawtripsError::InternalError(format!("Stripe internal error: {}", msg)),
        }
    }
}

impl HttpStatusCode for StripeError {
    fn status_code(&self) -> u16 {
        match self {
            StripeError::RequestError(_) => 500,
            StripeError::ApiError { status_code, .. } => *status_code,
            StripeError::ParseError(_) => 400,
            StripeError::ConfigError(_) => 500,
            StripeError::WebhookSignatureError(_) => 400,
            StripeError::WebhookProcessingError(_) => 400,
            StripeError::FulfillmentError(_) => 502,
            StripeError::MissingFulfillmentData(_) => 400,
            StripeError::SessionNotFoundOrNotPaid => 404,
            StripeError::InternalError(_) => 500,
        }
    }
}
