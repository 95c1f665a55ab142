// --- File: crates/pawtrips_stripe/src/service.rs ---
use pawtrips_common::services::{BoxFuture, CheckoutRequest, CheckoutResult, PaymentService, RefundResult};
use pawtrips_config::AppConfig;
use std::sync::Arc;

use crate::error::StripeError;
use crate::logic::{create_checkout_session, create_refund};

/// Stripe payment service implementation
pub struct StripePaymentService {
    config: Arc<AppConfig>,
}

impl StripePaymentService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

impl PaymentService for StripePaymentService {
    type Error = StripeError;

    fn create_checkout(&self, request: CheckoutRequest) -> BoxFuture<'_, CheckoutResult, Self::Error> {
        Box::pin(async move { create_checkout_session(&self.config, &request).await })
    }

    fn create_refund(
        &self,
        payment_reference: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> BoxFuture<'_, RefundResult, Self::Error> {
        let payment_reference = payment_reference.to_string();
        let reason = reason.map(|s| s.to_string());
        Box::pin(async move { create_refund(&self.config, &payment_reference, amount, reason.as_deref()).await })
    }
}
