use pawtrips_common::services::EmailTemplate;
use pawtrips_config::EmailTemplateIds;

/// The Brevo template id configured for `template`, if any.
pub fn template_id(ids: &EmailTemplateIds, template: EmailTemplate) -> Option<i64> {
    match template {
        EmailTemplate::BookingConfirmed => ids.booking_confirmed,
        EmailTemplate::CancellationReceived => ids.cancellation_received,
        EmailTemplate::CancellationAdminReview => ids.cancellation_admin_review,
        EmailTemplate::CancellationApproved => ids.cancellation_approved,
        EmailTemplate::CancellationRejected => ids.cancellation_rejected,
    }
}
