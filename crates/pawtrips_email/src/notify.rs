use pawtrips_common::services::{BoxedError, NotificationService, TemplateEmail};
use std::sync::Arc;
use tracing::{debug, warn};

pub type SharedNotifier = Arc<dyn NotificationService<Error = BoxedError>>;

/// Sends `email` if a notifier is configured. Failures are logged, never returned:
/// a mail that cannot go out must not undo the booking change that caused it.
///
/// Returns whether the provider accepted the mail.
pub async fn notify(notifier: Option<&SharedNotifier>, email: TemplateEmail) -> bool {
    let Some(notifier) = notifier else {
        debug!("No notification service, skipping {:?} to {}", email.template, email.to_email);
        return false;
    };

    let template = email.template;
    let to = email.to_email.clone();
    match notifier.send_template_email(email).await {
        Ok(result) => {
            debug!("{:?} to {} accepted ({})", template, to, result.id);
            true
        }
        Err(err) => {
            warn!("Failed to send {:?} to {}: {}", template, to, err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawtrips_common::services::testing::RecordingMailer;
    use pawtrips_common::services::{boxed_notification_service, EmailTemplate};

    fn mail() -> TemplateEmail {
        TemplateEmail {
            to_email: "owner@example.com".into(),
            to_name: Some("Owner".into()),
            template: EmailTemplate::CancellationReceived,
            params: serde_json::json!({ "booking_id": "b-1" }),
        }
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let notifier = boxed_notification_service(RecordingMailer::failing());
        assert!(!notify(Some(&notifier), mail()).await);
    }

    #[tokio::test]
    async fn missing_notifier_is_a_no_op() {
        assert!(!notify(None, mail()).await);
    }

    #[tokio::test]
    async fn delivered_mail_reports_true() {
        let notifier = boxed_notification_service(RecordingMailer::default());
        assert!(notify(Some(&notifier), mail()).await);
    }
}
