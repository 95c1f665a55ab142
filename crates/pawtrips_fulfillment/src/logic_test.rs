#[cfg(test)]
mod tests {
    use crate::error::FulfillmentError;
    use crate::logic::*;
    use chrono::{Duration, Utc};
    use pawtrips_bookings::logic::{
        create_booking, create_product, create_provider, create_slot, get_booking, CreateBookingRequest,
        CreateProductRequest, CreateProviderRequest, CreateSlotRequest,
    };
    use pawtrips_bookings::BookingError;
    use pawtrips_common::models::{BookingStatus, ProductKind};
    use pawtrips_common::services::testing::{FakePayments, FakeServiceFactory, RecordingMailer};
    use pawtrips_common::services::EmailTemplate;
    use pawtrips_config::{AppConfig, StripeConfig};
    use pawtrips_db::{in_memory, AvailabilityRepository, BookingRepository, Repositories};
    use std::sync::Arc;

    struct Fixture {
        config: AppConfig,
        repos: Repositories,
        mailer: Arc<RecordingMailer>,
        payments: Arc<FakePayments>,
        services: FakeServiceFactory,
        booking_id: String,
        product_id: String,
        slot_id: String,
    }

    async fn fixture() -> Fixture {
        fixture_with(AppConfig::default()).await
    }

    // Bookings open a checkout through the fake payment service.
    async fn stripe_fixture() -> Fixture {
        fixture_with(AppConfig {
            use_stripe: true,
            stripe: Some(StripeConfig {
                success_url: "https://pawtrips.test/paid".into(),
                cancel_url: "https://pawtrips.test/cancelled".into(),
                ..Default::default()
            }),
            ..Default::default()
        })
        .await
    }

    async fn fixture_with(config: AppConfig) -> Fixture {
        let client = in_memory().await.unwrap();
        let repos = Repositories::new(&client);
        let mailer = Arc::new(RecordingMailer::default());
        let payments = Arc::new(FakePayments::default());
        let services = FakeServiceFactory {
            mailer: Some(mailer.clone()),
            payments: Some(payments.clone()),
        };

        let provider = create_provider(
            &repos,
            CreateProviderRequest {
                name: "Trail Tails".into(),
                email: "team@trailtails.test".into(),
            },
        )
        .await
        .unwrap();
        let product = create_product(
            &config,
            &repos,
            CreateProductRequest {
                provider_id: provider.id,
                kind: ProductKind::Experience,
                title: "Lake swim with dogs".into(),
                description: None,
                location: None,
                price_per_adult_cents: 4_000,
                price_per_dog_cents: 1_000,
                currency: Some("chf".into()),
            },
        )
        .await
        .unwrap();
        let slot = create_slot(
            &repos,
            CreateSlotRequest {
                product_id: product.id.clone(),
                date: (Utc::now() + Duration::days(20)).date_naive().to_string(),
                start_time: Some("09:30".into()),
                end_date: None,
                max_adults: 4,
                max_dogs: 2,
            },
        )
        .await
        .unwrap();
        let booking = create_booking(
            &config,
            &repos,
            &services,
            CreateBookingRequest {
                product_id: product.id.clone(),
                slot_id: slot.id.clone(),
                customer_name: "Noa".into(),
                customer_email: "noa@example.com".into(),
                customer_phone: None,
                notes: None,
                adults: 2,
                dogs: 1,
                idempotency_key: Some("noa-1".into()),
            },
        )
        .await
        .unwrap()
        .booking;

        Fixture {
            config,
            repos,
            mailer,
            payments,
            services,
            booking_id: booking.id,
            product_id: product.id,
            slot_id: slot.id,
        }
    }

    fn booking_request(f: &Fixture) -> CreateBookingRequest {
        CreateBookingRequest {
            product_id: f.product_id.clone(),
            slot_id: f.slot_id.clone(),
            customer_name: "Noa".into(),
            customer_email: "noa@example.com".into(),
            customer_phone: None,
            notes: None,
            adults: 2,
            dogs: 1,
            idempotency_key: Some("noa-1".into()),
        }
    }

    fn expired(booking_id: &str, session_id: Option<&str>) -> BookingExpiredRequest {
        BookingExpiredRequest {
            booking_id: booking_id.to_string(),
            session_id: session_id.map(str::to_string),
        }
    }

    fn paid(booking_id: &str, amount_total: i64) -> BookingConfirmationRequest {
        BookingConfirmationRequest {
            booking_id: booking_id.to_string(),
            payment_reference: "pi_noa".into(),
            amount_total,
            currency: "CHF".into(),
        }
    }

    #[tokio::test]
    async fn payment_confirms_and_takes_seats() {
        let f = fixture().await;
        let response = fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 9_000))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.status, BookingStatus::Confirmed);
        assert!(!response.unchanged);

        let slot = f.repos.availability.find_slot(&f.slot_id).await.unwrap().unwrap();
        assert_eq!((slot.booked_adults, slot.booked_dogs), (2, 1));
        let booking = get_booking(&f.repos, &f.booking_id).await.unwrap();
        assert_eq!(booking.payment_reference.as_deref(), Some("pi_noa"));
        assert_eq!(f.mailer.templates(), vec![EmailTemplate::BookingConfirmed]);
    }

    #[tokio::test]
    async fn repeated_delivery_is_a_no_op() {
        let f = fixture().await;
        fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 9_000))
            .await
            .unwrap();
        let again = fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 9_000))
            .await
            .unwrap();
        assert!(again.unchanged);

        let slot = f.repos.availability.find_slot(&f.slot_id).await.unwrap().unwrap();
        assert_eq!(slot.booked_adults, 2);
    }

    #[tokio::test]
    async fn underpayment_and_wrong_currency_are_refused() {
        let f = fixture().await;
        let err = fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 8_999))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Underpaid { paid: 8_999, due: 9_000, .. }));

        let mut euros = paid(&f.booking_id, 9_000);
        euros.currency = "eur".into();
        let err = fulfill_booking_confirmation(&f.repos, &f.services, euros).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::CurrencyMismatch { .. }));

        let booking = get_booking(&f.repos, &f.booking_id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_booking_is_not_found() {
        let f = fixture().await;
        let err = fulfill_booking_confirmation(&f.repos, &f.services, paid("nope", 9_000))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Booking(BookingError::NotFound(_))));
    }

    #[tokio::test]
    async fn expiry_cancels_only_pending_bookings() {
        let f = fixture().await;
        let expired = fulfill_booking_expired(
            &f.repos,
            expired(&f.booking_id, None),
        )
        .await
        .unwrap();
        assert_eq!(expired.status, BookingStatus::Cancelled);
        assert!(!expired.unchanged);

        let again = fulfill_booking_expired(
            &f.repos,
            self::expired(&f.booking_id, None),
        )
        .await
        .unwrap();
        assert!(again.unchanged);

        let slot = f.repos.availability.find_slot(&f.slot_id).await.unwrap().unwrap();
        assert_eq!(slot.booked_adults, 0);
    }

    #[tokio::test]
    async fn expiry_after_payment_keeps_the_booking() {
        let f = fixture().await;
        fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 9_000))
            .await
            .unwrap();
        let response = fulfill_booking_expired(
            &f.repos,
            expired(&f.booking_id, None),
        )
        .await
        .unwrap();
        assert!(response.unchanged);
        assert_eq!(response.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn replayed_booking_reuses_its_checkout() {
        let f = stripe_fixture().await;
        let booking = get_booking(&f.repos, &f.booking_id).await.unwrap();
        let first_session = booking.checkout_session_id.clone().unwrap();

        let replay = create_booking(&f.config, &f.repos, &f.services, booking_request(&f))
            .await
            .unwrap();
        assert!(replay.duplicate);
        assert_eq!(replay.checkout_url, booking.checkout_url);
        assert_eq!(f.payments.checkouts(), vec![first_session]);
    }

    #[tokio::test]
    async fn expiry_of_a_foreign_session_keeps_the_booking_payable() {
        let f = stripe_fixture().await;
        let booking = get_booking(&f.repos, &f.booking_id).await.unwrap();
        let current = booking.checkout_session_id.clone().unwrap();

        // A session the booking no longer pays through, e.g. one opened by a
        // client that lost the race to store its checkout.
        let stale = fulfill_booking_expired(&f.repos, expired(&f.booking_id, Some("cs_test_stale")))
            .await
            .unwrap();
        assert!(stale.unchanged);
        assert_eq!(stale.status, BookingStatus::Pending);

        let confirmed = fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 9_000))
            .await
            .unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let own = fulfill_booking_expired(&f.repos, expired(&f.booking_id, Some(&current)))
            .await
            .unwrap();
        assert!(own.unchanged);
        assert_eq!(own.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn own_session_expiry_cancels_the_pending_booking() {
        let f = stripe_fixture().await;
        let booking = get_booking(&f.repos, &f.booking_id).await.unwrap();
        let session = booking.checkout_session_id.unwrap();

        let response = fulfill_booking_expired(&f.repos, expired(&f.booking_id, Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn payment_for_a_cancelled_booking_is_refunded() {
        let f = fixture().await;
        f.repos
            .bookings
            .transition_status(&f.booking_id, BookingStatus::Cancelled, None)
            .await
            .unwrap();

        let response = fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 9_000))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.status, BookingStatus::Cancelled);
        assert_eq!(response.refund_id.as_deref(), Some("re_pi_noa"));
        assert_eq!(f.payments.refunds(), vec![("pi_noa".to_string(), None)]);

        let slot = f.repos.availability.find_slot(&f.slot_id).await.unwrap().unwrap();
        assert_eq!(slot.booked_adults, 0);
        assert!(f.mailer.templates().is_empty());
    }

    #[tokio::test]
    async fn failed_refund_for_a_cancelled_booking_is_an_error() {
        let f = fixture().await;
        f.payments
            .fail_refunds
            .store(true, std::sync::atomic::Ordering::SeqCst);
        f.repos
            .bookings
            .transition_status(&f.booking_id, BookingStatus::Cancelled, None)
            .await
            .unwrap();

        let err = fulfill_booking_confirmation(&f.repos, &f.services, paid(&f.booking_id, 9_000))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::RefundFailed { .. }));
    }
}
