/// Errors of the Brevo integration.
pub mod error;
/// Best-effort sending helper.
pub mod notify;
/// Brevo and log-only notification services.
pub mod service;
pub mod templates;


pub use error::EmailError;
pub use notify::{notify, SharedNotifier};
pub use service::{BrevoMailer, LogMailer};
pub use templates::template_id;
