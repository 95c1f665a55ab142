use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use pawtrips_config::{AppConfig, FulfillmentConfig, StripeConfig};
use pawtrips_stripe::logic::compute_signature;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "whsec_api";

fn config(server: &MockServer, use_stripe: bool) -> AppConfig {
    let mut config = AppConfig {
        use_stripe,
        use_fulfillment: true,
        stripe: Some(StripeConfig {
            success_url: "https://pawtrips.test/paid".into(),
            cancel_url: "https://pawtrips.test/cancelled".into(),
            secret_key: Some("sk_test".into()),
            webhook_secret: Some(SECRET.into()),
            api_base: Some(server.uri()),
            ..Default::default()
        }),
        fulfillment: Some(FulfillmentConfig {
            shared_secret: Some("internal".into()),
        }),
        ..Default::default()
    };
    config.server.host = server.address().ip().to_string();
    config.server.port = server.address().port();
    config.http.max_retries = 0;
    config
}

fn completed_event() -> String {
    json!({
        "id": "evt_api",
        "object": "event",
        "created": 1_700_000_000,
        "livemode": false,
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_api",
            "object": "checkout.session",
            "amount_total": 9000,
            "currency": "chf",
            "metadata": { "ff_type": "booking_confirmation", "booking_id": "bk_api" },
            "payment_intent": "pi_api",
            "payment_status": "paid"
        }}
    })
    .to_string()
}

async fn post_webhook(config: AppConfig, body: String, signature: Option<String>) -> (StatusCode, Value) {
    let app = pawtrips_stripe::routes(Arc::new(config));
    let mut builder = Request::builder()
        .method("POST")
        .uri("/stripe/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    let response = app.oneshot(builder.body(Body::from(body)).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn sign(body: &str) -> String {
    let t = Utc::now().timestamp().to_string();
    format!("t={},v1={}", t, compute_signature(body.as_bytes(), &t, SECRET).unwrap())
}

#[tokio::test]
async fn signed_webhook_reaches_fulfillment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/fulfill/booking-confirmation"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let body = completed_event();
    let signature = sign(&body);
    let (status, ack) = post_webhook(config(&server, true), body, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "booking_confirmed");
}

#[tokio::test]
async fn bad_signatures_are_rejected_before_processing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let body = completed_event();
    let (status, _) = post_webhook(config(&server, true), body.clone(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let forged = sign(&body.replace("9000", "1"));
    let (status, err) = post_webhook(config(&server, true), body, Some(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"]["message"].as_str().unwrap().contains("signature"));
}

#[tokio::test]
async fn disabled_stripe_answers_unavailable() {
    let server = MockServer::start().await;
    let body = completed_event();
    let signature = sign(&body);
    let (status, _) = post_webhook(config(&server, false), body, Some(signature)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn redirect_pages_render() {
    let server = MockServer::start().await;
    let app = pawtrips_stripe::routes(Arc::new(config(&server, true)));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/stripe/checkout-cancel?session_id=cs_test_x")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn order_details_require_a_paid_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_paid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_paid",
            "object": "checkout.session",
            "amount_total": 9000,
            "currency": "chf",
            "customer_details": { "email": "lea@example.com" },
            "metadata": { "booking_id": "bk_api" },
            "payment_status": "paid",
            "status": "complete"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_open",
            "object": "checkout.session",
            "payment_status": "unpaid",
            "status": "open"
        })))
        .mount(&server)
        .await;

    let app = pawtrips_stripe::routes(Arc::new(config(&server, true)));
    let get = |uri: &'static str| {
        let app = app.clone();
        async move {
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null))
        }
    };

    let (status, details) = get("/stripe/order-confirmation-details?session_id=cs_test_paid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["booking_id"], "bk_api");
    assert_eq!(details["customer_email"], "lea@example.com");

    let (status, _) = get("/stripe/order-confirmation-details?session_id=cs_test_open").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
