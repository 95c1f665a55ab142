use pawtrips_common::services::EmailTemplate;
use pawtrips_common::PawtripsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    /// The request never produced a response (after retries)
    #[error("Email request failed: {0}")]
    RequestError(String),

    /// Brevo answered with a non-success status
    #[error("Brevo returned an error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Email configuration missing or incomplete: {0}")]
    ConfigError(String),

    #[error("No template id configured for {0:?}")]
    MissingTemplate(EmailTemplate),
}

impl From<PawtripsError> for EmailError {
    fn from(err: PawtripsError) -> Self {
        EmailError::RequestError(err.to_string())
    }
}

impl From<EmailError> for PawtripsError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::ConfigError(msg) => PawtripsError::ConfigError(msg),
            e @ EmailError::MissingTemplate(_) => PawtripsError::ConfigError(e.to_string()),
            other => PawtripsError::ExternalServiceError {
                service_name: "brevo".to_string(),
                message: other.to_string(),
            },
        }
    }
}
