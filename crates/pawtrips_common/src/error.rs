use std::fmt;
use thiserror::Error;

/// The base error type for all PawTrips errors.
///
/// Each feature crate defines its own error enum and implements
/// `From<ItsError> for PawtripsError` so handlers can answer uniformly.
#[derive(Error, Debug)]
pub enum PawtripsError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during authentication or authorization
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Request was well formed but violates a business rule
    #[error("Unprocessable: {0}")]
    UnprocessableError(String),

    /// Error occurred during database operation
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to a conflict (e.g., resource already exists)
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// The resource existed but is no longer usable (expired link)
    #[error("Gone: {0}")]
    GoneError(String),

    /// The feature is switched off in the runtime configuration
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Error occurred due to a timeout
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Error occurred due to rate limiting
    #[error("Rate limited: {0}")]
    RateLimitError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Error that doesn't fit into any other category
    #[error("Other error: {0}")]
    OtherError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for PawtripsError {
    fn status_code(&self) -> u16 {
        match self {
            PawtripsError::HttpError(_) => 500,
            PawtripsError::ParseError(_) => 400,
            PawtripsError::ConfigError(_) => 500,
            PawtripsError::AuthError(_) => 401,
            PawtripsError::ValidationError(_) => 400,
            PawtripsError::UnprocessableError(_) => 422,
            PawtripsError::DatabaseError(_) => 500,
            PawtripsError::ExternalServiceError { .. } => 502,
            PawtripsError::ConflictError(_) => 409,
            PawtripsError::NotFoundError(_) => 404,
            PawtripsError::GoneError(_) => 410,
            PawtripsError::ServiceUnavailable(_) => 503,
            PawtripsError::TimeoutError(_) => 504,
            PawtripsError::RateLimitError(_) => 429,
            PawtripsError::InternalError(_) => 500,
            PawtripsError::OtherError(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, PawtripsError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, PawtripsError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, PawtripsError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| PawtripsError::InternalError(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, PawtripsError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| PawtripsError::InternalError(format!("{}: {}", f(), error)))
    }
}

// Common error conversions
impl From<reqwest::Error> for PawtripsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PawtripsError::TimeoutError(err.to_string())
        } else {
            PawtripsError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PawtripsError {
    fn from(err: serde_json::Error) -> Self {
        PawtripsError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for PawtripsError {
    fn from(err: std::io::Error) -> Self {
        PawtripsError::InternalError(err.to_string())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::ConfigError(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::ValidationError(message.to_string())
}

pub fn unprocessable<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::UnprocessableError(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::NotFoundError(message.to_string())
}

pub fn conflict<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::ConflictError(message.to_string())
}

pub fn gone<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::GoneError(message.to_string())
}

pub fn service_unavailable<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::ServiceUnavailable(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> PawtripsError {
    PawtripsError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> PawtripsError {
    PawtripsError::InternalError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_http_semantics() {
        assert_eq!(validation_error("x").status_code(), 400);
        assert_eq!(unprocessable("x").status_code(), 422);
        assert_eq!(conflict("x").status_code(), 409);
        assert_eq!(gone("x").status_code(), 410);
        assert_eq!(not_found("x").status_code(), 404);
        assert_eq!(service_unavailable("x").status_code(), 503);
        assert_eq!(external_service_error("Brevo", "down").status_code(), 502);
    }

    #[test]
    fn context_wraps_source_error() {
        let res: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let err = res.context("writing receipt").unwrap_err();
        assert_eq!(err.to_string(), "Internal error: writing receipt: disk full");
    }
}
