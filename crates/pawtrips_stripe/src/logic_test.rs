#[cfg(test)]
mod tests {
    use crate::error::StripeError;
    use crate::logic::*;
    use chrono::{Duration, TimeZone, Utc};
    use pawtrips_common::services::CheckoutRequest;
    use pawtrips_config::{AppConfig, FulfillmentConfig, StripeConfig};
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "whsec_test_secret";

    fn header_for(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let sig = compute_signature(payload, &timestamp.to_string(), secret).unwrap();
        format!("t={},v1={}", timestamp, sig)
    }

    fn config_for(server: &MockServer) -> AppConfig {
        let mut config = AppConfig {
            use_stripe: true,
            use_fulfillment: true,
            stripe: Some(StripeConfig {
                success_url: "https://pawtrips.test/paid?session_id={CHECKOUT_SESSION_ID}".into(),
                cancel_url: "https://pawtrips.test/cancelled".into(),
                default_currency: Some("chf".into()),
                secret_key: Some("sk_test_123".into()),
                webhook_secret: Some(SECRET.into()),
                api_base: Some(server.uri()),
            }),
            fulfillment: Some(FulfillmentConfig {
                shared_secret: Some("internal".into()),
            }),
            ..Default::default()
        };
        config.server.host = server.address().ip().to_string();
        config.server.port = server.address().port();
        config.http.max_retries = 2;
        config.http.initial_backoff_ms = 1;
        config.http.max_backoff_ms = 2;
        config
    }

    fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            booking_id: "bk_1".into(),
            description: "Sunrise hike, 2 adults, 1 dog".into(),
            amount_cents: 17_000,
            currency: "CHF".into(),
            customer_email: Some("lea@example.com".into()),
        }
    }

    fn session_event(event_type: &str, payment_status: &str) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "object": "event",
            "api_version": "2024-06-20",
            "created": 1_700_000_000,
            "livemode": false,
            "type": event_type,
            "data": { "object": {
                "id": "cs_test_1",
                "object": "checkout.session",
                "amount_total": 17000,
                "currency": "chf",
                "metadata": { "ff_type": "booking_confirmation", "booking_id": "bk_1" },
                "payment_intent": "pi_123",
                "payment_status": payment_status,
                "status": "complete",
                "client_reference_id": "bk_1"
            }}
        }))
        .unwrap()
    }

    // --- Signature verification ---

    #[test]
    fn accepts_a_valid_signature() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let payload = br#"{"id":"evt_1"}"#;
        let sig = header_for(payload, now.timestamp(), SECRET);
        assert!(verify_stripe_signature(payload, Some(&sig), SECRET, now).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1_during_rotation() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let payload = br#"{"id":"evt_1"}"#;
        let good = compute_signature(payload, &now.timestamp().to_string(), SECRET).unwrap();
        let sig = format!("t={}, v1={}, v1={}, v0=abc", now.timestamp(), "00".repeat(32), good);
        assert!(verify_stripe_signature(payload, Some(&sig), SECRET, now).is_ok());
    }

    #[test]
    fn rejects_tampered_payload_and_wrong_secret() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let sig = header_for(br#"{"amount":100}"#, now.timestamp(), SECRET);
        assert!(verify_stripe_signature(br#"{"amount":1}"#, Some(&sig), SECRET, now).is_err());

        let other = header_for(br#"{"amount":100}"#, now.timestamp(), "whsec_other");
        assert!(verify_stripe_signature(br#"{"amount":100}"#, Some(&other), SECRET, now).is_err());
    }

    #[test]
    fn rejects_stale_and_future_timestamps() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let payload = b"{}";

        let edge = header_for(payload, (now - Duration::seconds(300)).timestamp(), SECRET);
        assert!(verify_stripe_signature(payload, Some(&edge), SECRET, now).is_ok());

        let stale = header_for(payload, (now - Duration::seconds(301)).timestamp(), SECRET);
        let err = verify_stripe_signature(payload, Some(&stale), SECRET, now).unwrap_err();
        assert!(err.to_string().contains("tolerance"));

        let future = header_for(payload, (now + Duration::minutes(10)).timestamp(), SECRET);
        assert!(verify_stripe_signature(payload, Some(&future), SECRET, now).is_err());
    }

    #[test]
    fn rejects_malformed_headers() {
        let now = Utc::now();
        for header in [None, Some(""), Some("v1=abc"), Some("t=abc,v1=abc"), Some("t=123")] {
            assert!(matches!(
                verify_stripe_signature(b"{}", header, SECRET, now),
                Err(StripeError::WebhookSignatureError(_))
            ));
        }
    }

    // --- Checkout and refunds ---

    #[test]
    fn checkout_form_links_the_booking() {
        let stripe = StripeConfig {
            success_url: "s".into(),
            cancel_url: "c".into(),
            ..Default::default()
        };
        let form = checkout_form(&stripe, &checkout_request());
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("client_reference_id"), Some("bk_1"));
        assert_eq!(get("metadata[booking_id]"), Some("bk_1"));
        assert_eq!(get("metadata[ff_type]"), Some("booking_confirmation"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("17000"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("chf"));
        assert_eq!(get("customer_email"), Some("lea@example.com"));
    }

    #[tokio::test]
    async fn creates_a_checkout_session_and_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header_exists("authorization"))
            .and(header_exists("idempotency-key"))
            .and(body_string_contains("client_reference_id=bk_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = create_checkout_session(&config_for(&server), &checkout_request())
            .await
            .unwrap();
        assert_eq!(result.session_id, "cs_test_1");
        assert_eq!(result.url, "https://checkout.stripe.com/c/pay/cs_test_1");
    }

    #[tokio::test]
    async fn surfaces_stripe_error_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Invalid currency: xyz" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = create_checkout_session(&config_for(&server), &checkout_request())
            .await
            .unwrap_err();
        match err {
            StripeError::ApiError { status_code, message } => {
                assert_eq!(status_code, 400);
                assert_eq!(message, "Invalid currency: xyz");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_secret_key_is_a_config_error() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        if let Some(stripe) = config.stripe.as_mut() {
            stripe.secret_key = None;
        }
        let err = create_checkout_session(&config, &checkout_request()).await.unwrap_err();
        assert!(matches!(err, StripeError::ConfigError(_)));
    }

    #[tokio::test]
    async fn refunds_by_payment_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .and(body_string_contains("payment_intent=pi_123"))
            .and(body_string_contains("reason=requested_by_customer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "re_1", "status": "succeeded", "amount": 17000, "currency": "chf"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refund = create_refund(&config_for(&server), "pi_123", None, Some("requested_by_customer"))
            .await
            .unwrap();
        assert_eq!(refund.id, "re_1");
        assert_eq!(refund.status, "succeeded");
        assert_eq!(refund.amount, 17_000);
    }

    // --- Webhook dispatch ---

    #[tokio::test]
    async fn paid_session_is_forwarded_to_fulfillment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/fulfill/booking-confirmation"))
            .and(header("X-Internal-Auth-Secret", "internal"))
            .and(body_json(json!({
                "booking_id": "bk_1",
                "payment_reference": "pi_123",
                "amount_total": 17000,
                "currency": "chf"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = process_stripe_webhook(session_event("checkout.session.completed", "paid"), &config_for(&server))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::BookingConfirmed);
    }

    #[tokio::test]
    async fn unpaid_sessions_and_unknown_events_are_acknowledged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let config = config_for(&server);

        let unpaid = process_stripe_webhook(session_event("checkout.session.completed", "unpaid"), &config)
            .await
            .unwrap();
        assert_eq!(unpaid, WebhookOutcome::Ignored);

        let other = process_stripe_webhook(session_event("charge.refunded", "paid"), &config)
            .await
            .unwrap();
        assert_eq!(other, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn expired_session_releases_the_booking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/fulfill/booking-expired"))
            .and(body_json(json!({ "booking_id": "bk_1", "session_id": "cs_test_1" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = process_stripe_webhook(session_event("checkout.session.expired", "unpaid"), &config_for(&server))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::BookingExpired);
    }

    #[tokio::test]
    async fn fulfillment_refusal_fails_the_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/fulfill/booking-confirmation"))
            .respond_with(ResponseTemplate::new(422).set_body_string("amount too low"))
            .expect(1)
            .mount(&server)
            .await;

        let err = process_stripe_webhook(session_event("checkout.session.completed", "paid"), &config_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::FulfillmentError(msg) if msg.contains("amount too low")));
    }

    #[tokio::test]
    async fn disabled_fulfillment_is_a_config_error() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.use_fulfillment = false;
        let err = process_stripe_webhook(session_event("checkout.session.completed", "paid"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::ConfigError(_)));
    }
}
