pub mod auth; // Admin key checks
pub mod error; // Error handling
pub mod features; // Runtime feature switches
pub mod http; // HTTP responses and the outbound client
pub mod logging; // Logging utilities
pub mod models; // Domain types
pub mod routes; // Health route
pub mod services; // Payment / notification abstractions

pub use routes::routes;

pub use error::{
    conflict, config_error, external_service_error, gone, internal_error, not_found,
    service_unavailable, unprocessable, validation_error, Context, HttpStatusCode, PawtripsError,
};

pub use http::{
    client::{create_client, send_with_retry, RetryPolicy, HTTP_CLIENT},
    handle_json_result, handle_result, IntoHttpResponse,
};

pub use logging::{init, init_from_config, init_with_level, log_error, log_result};

pub use features::{is_email_enabled, is_feature_enabled, is_fulfillment_enabled, is_stripe_enabled};
