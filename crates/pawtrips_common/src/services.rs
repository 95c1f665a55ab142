//! Service abstractions for external providers.
//!
//! Payment and email are reached through these object-safe traits so the
//! booking logic can run against fakes in tests and against Stripe/Brevo in
//! production.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A wrapper error type that erases the concrete error of a service.
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

/// Payment provider operations.
pub trait PaymentService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Starts a hosted checkout for a pending booking.
    fn create_checkout(&self, request: CheckoutRequest) -> BoxFuture<'_, CheckoutResult, Self::Error>;

    /// Refunds a captured payment. `amount` of `None` refunds in full.
    fn create_refund(
        &self,
        payment_reference: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> BoxFuture<'_, RefundResult, Self::Error>;
}

/// Transactional email templates known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    BookingConfirmed,
    CancellationReceived,
    CancellationAdminReview,
    CancellationApproved,
    CancellationRejected,
}

/// A template email: the provider renders `params` into the stored template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEmail {
    pub to_email: String,
    pub to_name: Option<String>,
    pub template: EmailTemplate,
    pub params: serde_json::Value,
}

/// Notification provider operations.
pub trait NotificationService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send_template_email(&self, email: TemplateEmail) -> BoxFuture<'_, NotificationResult, Self::Error>;
}

/// Gives feature crates access to whichever services are configured.
pub trait ServiceFactory: Send + Sync {
    fn payment_service(&self) -> Option<Arc<dyn PaymentService<Error = BoxedError>>>;

    fn notification_service(&self) -> Option<Arc<dyn NotificationService<Error = BoxedError>>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub booking_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub currency: String,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub id: String,
    pub status: String,
}

/// Erases the error type of a concrete payment service.
pub struct BoxedPaymentService<S> {
    inner: S,
}

impl<S> PaymentService for BoxedPaymentService<S>
where
    S: PaymentService,
{
    type Error = BoxedError;

    fn create_checkout(&self, request: CheckoutRequest) -> BoxFuture<'_, CheckoutResult, Self::Error> {
        Box::pin(async move {
            self.inner
                .create_checkout(request)
                .await
                .map_err(|e| BoxedError(Box::new(e)))
        })
    }

    fn create_refund(
        &self,
        payment_reference: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> BoxFuture<'_, RefundResult, Self::Error> {
        let payment_reference = payment_reference.to_string();
        let reason = reason.map(|s| s.to_string());
        Box::pin(async move {
            self.inner
                .create_refund(&payment_reference, amount, reason.as_deref())
                .await
                .map_err(|e| BoxedError(Box::new(e)))
        })
    }
}

/// Erases the error type of a concrete notification service.
pub struct BoxedNotificationService<S> {
    inner: S,
}

impl<S> NotificationService for BoxedNotificationService<S>
where
    S: NotificationService,
{
    type Error = BoxedError;

    fn send_template_email(&self, email: TemplateEmail) -> BoxFuture<'_, NotificationResult, Self::Error> {
        Box::pin(async move {
            self.inner
                .send_template_email(email)
                .await
                .map_err(|e| BoxedError(Box::new(e)))
        })
    }
}

pub fn boxed_payment_service<S>(service: S) -> Arc<dyn PaymentService<Error = BoxedError>>
where
    S: PaymentService + 'static,
{
    Arc::new(BoxedPaymentService { inner: service })
}

pub fn boxed_notification_service<S>(service: S) -> Arc<dyn NotificationService<Error = BoxedError>>
where
    S: NotificationService + 'static,
{
    Arc::new(BoxedNotificationService { inner: service })
}

/// In-memory fakes for tests of crates that depend on these traits.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("fake provider failure: {0}")]
    pub struct FakeError(pub String);

    /// Records every email instead of sending it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<TemplateEmail>>,
        pub fail: AtomicBool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            let mailer = Self::default();
            mailer.fail.store(true, Ordering::SeqCst);
            mailer
        }

        pub fn sent(&self) -> Vec<TemplateEmail> {
            self.sent.lock().map(|v| v.clone()).unwrap_or_default()
        }

        pub fn templates(&self) -> Vec<EmailTemplate> {
            self.sent().into_iter().map(|e| e.template).collect()
        }
    }

    impl NotificationService for RecordingMailer {
        type Error = FakeError;

        fn send_template_email(&self, email: TemplateEmail) -> BoxFuture<'_, NotificationResult, Self::Error> {
            Box::pin(async move {
                if self.fail.load(Ordering::SeqCst) {
                    return Err(FakeError("mailer down".into()));
                }
                if let Ok(mut sent) = self.sent.lock() {
                    sent.push(email);
                }
                Ok(NotificationResult {
                    id: "msg_fake".into(),
                    status: "queued".into(),
                })
            })
        }
    }

    /// Accepts checkouts and records refunds.
    #[derive(Default)]
    pub struct FakePayments {
        pub checkouts: Mutex<Vec<String>>,
        pub refunds: Mutex<Vec<(String, Option<i64>)>>,
        pub fail_refunds: AtomicBool,
    }

    impl FakePayments {
        /// Session ids handed out so far, oldest first.
        pub fn checkouts(&self) -> Vec<String> {
            self.checkouts.lock().map(|v| v.clone()).unwrap_or_default()
        }

        pub fn refunds(&self) -> Vec<(String, Option<i64>)> {
            self.refunds.lock().map(|v| v.clone()).unwrap_or_default()
        }
    }

    impl PaymentService for FakePayments {
        type Error = FakeError;

        fn create_checkout(&self, request: CheckoutRequest) -> BoxFuture<'_, CheckoutResult, Self::Error> {
            Box::pin(async move {
                let mut checkouts = self
                    .checkouts
                    .lock()
                    .map_err(|_| FakeError("checkout log poisoned".into()))?;
                let session_id = match checkouts.len() {
                    0 => format!("cs_test_{}", request.booking_id),
                    n => format!("cs_test_{}_{}", request.booking_id, n + 1),
                };
                checkouts.push(session_id.clone());
                Ok(CheckoutResult {
                    url: format!("https://checkout.test/{}", session_id.trim_start_matches("cs_test_")),
                    session_id,
                })
            })
        }

        fn create_refund(
            &self,
            payment_reference: &str,
            amount: Option<i64>,
            _reason: Option<&str>,
        ) -> BoxFuture<'_, RefundResult, Self::Error> {
            let payment_reference = payment_reference.to_string();
            Box::pin(async move {
                if self.fail_refunds.load(Ordering::SeqCst) {
                    return Err(FakeError("refund rejected".into()));
                }
                if let Ok(mut refunds) = self.refunds.lock() {
                    refunds.push((payment_reference.clone(), amount));
                }
                Ok(RefundResult {
                    id: format!("re_{}", payment_reference),
                    status: "succeeded".into(),
                    amount: amount.unwrap_or(0),
                    currency: "chf".into(),
                })
            })
        }
    }

    /// A factory over shared fakes, so tests can inspect them afterwards.
    #[derive(Default, Clone)]
    pub struct FakeServiceFactory {
        pub mailer: Option<Arc<RecordingMailer>>,
        pub payments: Option<Arc<FakePayments>>,
    }

    struct SharedMailer(Arc<RecordingMailer>);

    impl NotificationService for SharedMailer {
        type Error = FakeError;

        fn send_template_email(&self, email: TemplateEmail) -> BoxFuture<'_, NotificationResult, Self::Error> {
            self.0.send_template_email(email)
        }
    }

    struct SharedPayments(Arc<FakePayments>);

    impl PaymentService for SharedPayments {
        type Error = FakeError;

        fn create_checkout(&self, request: CheckoutRequest) -> BoxFuture<'_, CheckoutResult, Self::Error> {
            self.0.create_checkout(request)
        }

        fn create_refund(
            &self,
            payment_reference: &str,
            amount: Option<i64>,
            reason: Option<&str>,
        ) -> BoxFuture<'_, RefundResult, Self::Error> {
            self.0.create_refund(payment_reference, amount, reason)
        }
    }

    impl ServiceFactory for FakeServiceFactory {
        fn payment_service(&self) -> Option<Arc<dyn PaymentService<Error = BoxedError>>> {
            self.payments
                .clone()
                .map(|p| boxed_payment_service(SharedPayments(p)))
        }

        fn notification_service(&self) -> Option<Arc<dyn NotificationService<Error = BoxedError>>> {
            self.mailer
                .clone()
                .map(|m| boxed_notification_service(SharedMailer(m)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn boxed_service_keeps_error_message() {
        let service = boxed_notification_service(RecordingMailer::failing());
        let err = service
            .send_template_email(TemplateEmail {
                to_email: "a@b.ch".into(),
                to_name: None,
                template: EmailTemplate::BookingConfirmed,
                params: serde_json::json!({}),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "fake provider failure: mailer down");
    }

    #[tokio::test]
    async fn fake_factory_shares_recorders() {
        let mailer = Arc::new(RecordingMailer::default());
        let factory = FakeServiceFactory {
            mailer: Some(mailer.clone()),
            payments: None,
        };
        assert!(factory.payment_service().is_none());
        factory
            .notification_service()
            .unwrap()
            .send_template_email(TemplateEmail {
                to_email: "a@b.ch".into(),
                to_name: None,
                template: EmailTemplate::CancellationApproved,
                params: serde_json::json!({ "booking_id": "b1" }),
            })
            .await
            .unwrap();
        assert_eq!(mailer.templates(), vec![EmailTemplate::CancellationApproved]);
    }
}
