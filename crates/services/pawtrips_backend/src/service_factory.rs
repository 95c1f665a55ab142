// --- File: crates/services/pawtrips_backend/src/service_factory.rs ---
//! Builds the payment and notification services the feature crates use.

use pawtrips_common::services::{
    boxed_notification_service, boxed_payment_service, BoxedError, NotificationService, PaymentService,
    ServiceFactory,
};
use pawtrips_common::{is_email_enabled, is_stripe_enabled};
use pawtrips_config::AppConfig;
use pawtrips_email::{BrevoMailer, LogMailer};
use pawtrips_stripe::StripePaymentService;
use std::sync::Arc;
use tracing::{error, info};

pub struct PawtripsServiceFactory {
    payment_service: Option<Arc<dyn PaymentService<Error = BoxedError>>>,
    notification_service: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
}

impl PawtripsServiceFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let payment_service = if is_stripe_enabled(&config) {
            info!("Initializing Stripe payment service");
            Some(boxed_payment_service(StripePaymentService::new(config.clone())))
        } else {
            info!("Stripe disabled, bookings are confirmed by admins only");
            None
        };

        // Without a working Brevo setup mails are logged, never silently dropped
        let notification_service = if is_email_enabled(&config) {
            match BrevoMailer::from_config(&config) {
                Ok(mailer) => {
                    info!("Initializing Brevo email service");
                    boxed_notification_service(mailer)
                }
                Err(e) => {
                    error!("Email enabled but misconfigured, falling back to logging: {}", e);
                    boxed_notification_service(LogMailer)
                }
            }
        } else {
            info!("Email disabled, notifications are written to the log");
            boxed_notification_service(LogMailer)
        };

        Self {
            payment_service,
            notification_service: Some(notification_service),
        }
    }
}

impl ServiceFactory for PawtripsServiceFactory {
    fn payment_service(&self) -> Option<Arc<dyn PaymentService<Error = BoxedError>>> {
        self.payment_service.clone()
    }

    fn notification_service(&self) -> Option<Arc<dyn NotificationService<Error = BoxedError>>> {
        self.notification_service.clone()
    }
}
