#[cfg(test)]
mod tests {
    use crate::error::CancellationError;
    use crate::logic::*;
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use pawtrips_bookings::logic::{
        confirm_booking, create_booking, create_product, create_provider, create_slot,
        CreateBookingRequest, CreateProductRequest, CreateProviderRequest, CreateSlotRequest,
    };
    use pawtrips_common::models::{
        AvailabilitySlot, Booking, BookingStatus, CancellationStatus, ProductKind, RequestedBy,
    };
    use pawtrips_common::services::testing::{FakePayments, FakeServiceFactory, RecordingMailer};
    use pawtrips_common::services::EmailTemplate;
    use pawtrips_config::{AdminConfig, AppConfig, EmailConfig, StripeConfig};
    use pawtrips_db::{in_memory, AvailabilityRepository, CancellationRepository, Repositories};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    struct Setup {
        config: AppConfig,
        repos: Repositories,
        slot: AvailabilitySlot,
        mailer: Arc<RecordingMailer>,
        payments: Arc<FakePayments>,
        services: FakeServiceFactory,
    }

    fn config() -> AppConfig {
        let mut config = AppConfig {
            use_stripe: true,
            stripe: Some(StripeConfig {
                success_url: "https://pawtrips.test/ok".into(),
                cancel_url: "https://pawtrips.test/cancel".into(),
                default_currency: Some("chf".into()),
                secret_key: Some("sk_test".into()),
                webhook_secret: None,
                api_base: None,
            }),
            email: Some(EmailConfig {
                api_url: "http://localhost/v3/smtp/email".into(),
                api_key: Some("xkeysib".into()),
                sender_email: "bookings@pawtrips.test".into(),
                sender_name: None,
                admin_email: "admin@pawtrips.test".into(),
                templates: Default::default(),
            }),
            admin: Some(AdminConfig {
                api_key: Some("adm".into()),
            }),
            ..Default::default()
        };
        config.cancellation.public_base_url = "https://pawtrips.test/".into();
        config
    }

    async fn setup() -> Setup {
        let client = in_memory().await.unwrap();
        let repos = Repositories::new(&client);
        let config = config();
        let provider = create_provider(
            &repos,
            CreateProviderRequest {
                name: "Dog Days".into(),
                email: "hi@dogdays.test".into(),
            },
        )
        .await
        .unwrap();
        let product = create_product(
            &config,
            &repos,
            CreateProductRequest {
                provider_id: provider.id,
                kind: ProductKind::Trip,
                title: "Ticino dog retreat".into(),
                description: None,
                location: Some("Ascona".into()),
                price_per_adult_cents: 30_000,
                price_per_dog_cents: 5_000,
                currency: None,
            },
        )
        .await
        .unwrap();
        let date = (Utc::now() + Duration::days(10)).date_naive();
        let slot = create_slot(
            &repos,
            CreateSlotRequest {
                product_id: product.id,
                date: date.to_string(),
                start_time: Some("10:00".into()),
                end_date: Some((date + Duration::days(2)).to_string()),
                max_adults: 8,
                max_dogs: 6,
            },
        )
        .await
        .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let payments = Arc::new(FakePayments::default());
        let services = FakeServiceFactory {
            mailer: Some(mailer.clone()),
            payments: Some(payments.clone()),
        };
        Setup {
            config,
            repos,
            slot,
            mailer,
            payments,
            services,
        }
    }

    async fn booking(s: &Setup, paid: Option<&str>) -> Booking {
        let created = create_booking(
            &s.config,
            &s.repos,
            &s.services,
            CreateBookingRequest {
                product_id: s.slot.product_id.clone(),
                slot_id: s.slot.id.clone(),
                customer_name: "Nora".into(),
                customer_email: "Nora@Example.com".into(),
                customer_phone: None,
                notes: None,
                adults: 2,
                dogs: 2,
                idempotency_key: None,
            },
        )
        .await
        .unwrap();
        match paid {
            Some(reference) => {
                confirm_booking(&s.repos, None, &created.booking.id, Some(reference.into()))
                    .await
                    .unwrap()
                    .booking
            }
            None => created.booking,
        }
    }

    fn ask(booking: &Booking, email: &str) -> CreateCancellationRequest {
        CreateCancellationRequest {
            booking_id: booking.id.clone(),
            customer_email: email.into(),
            reason: Some("Dog is sick".into()),
        }
    }

    async fn token_of(s: &Setup, request_id: &str) -> String {
        s.repos.cancellations.find(request_id).await.unwrap().unwrap().token
    }

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn magic_links_carry_the_admin_key() {
        let links = magic_links(&config(), "tok");
        assert_eq!(links.status_url, "https://pawtrips.test/api/cancellations/tok");
        assert_eq!(links.approve_url, "https://pawtrips.test/api/cancellations/tok/approve?key=adm");
        assert_eq!(links.reject_url, "https://pawtrips.test/api/cancellations/tok/reject?key=adm");
    }

    #[test]
    fn slot_start_is_read_in_the_business_timezone() {
        let slot = AvailabilitySlot {
            id: "s".into(),
            product_id: "p".into(),
            date: NaiveDate::from_ymd_opt(2030, 7, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0),
            end_date: None,
            max_adults: 1,
            max_dogs: 1,
            booked_adults: 0,
            booked_dogs: 0,
        };
        let start = slot_start_utc(&slot, chrono_tz::Tz::Europe__Zurich);
        assert_eq!(start, Utc.with_ymd_and_hms(2030, 7, 1, 8, 0, 0).unwrap());

        let at = |h: i64| start - Duration::hours(h);
        assert!(check_cutoff(&slot, chrono_tz::Tz::Europe__Zurich, 48, at(49)).is_ok());
        assert!(check_cutoff(&slot, chrono_tz::Tz::Europe__Zurich, 48, at(48)).is_ok());
        assert!(matches!(
            check_cutoff(&slot, chrono_tz::Tz::Europe__Zurich, 48, at(47)),
            Err(CancellationError::TooLate { min_hours: 48 })
        ));
    }

    #[tokio::test]
    async fn email_mismatch_looks_like_an_unknown_booking() {
        let s = setup().await;
        let b = booking(&s, Some("pi_1")).await;
        let err = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "other@example.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CancellationError::NotFound(_)));
        assert!(s.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn request_notifies_customer_and_admin() {
        let s = setup().await;
        let b = booking(&s, Some("pi_1")).await;
        let created = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.COM"), Utc::now())
            .await
            .unwrap();
        assert_eq!(created.status, CancellationStatus::Pending);

        let sent = s.mailer.sent();
        assert_eq!(
            s.mailer.templates(),
            vec![EmailTemplate::CancellationReceived, EmailTemplate::CancellationAdminReview]
        );
        assert_eq!(sent[1].to_email, "admin@pawtrips.test");
        let token = token_of(&s, &created.request_id).await;
        assert_eq!(
            sent[1].params["approve_url"],
            format!("https://pawtrips.test/api/cancellations/{token}/approve?key=adm")
        );
        assert_eq!(sent[1].params["reason"], "Dog is sick");
    }

    #[tokio::test]
    async fn second_request_while_pending_conflicts() {
        let s = setup().await;
        let b = booking(&s, Some("pi_1")).await;
        let first = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap();
        let err = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap_err();
        match err {
            CancellationError::DuplicatePending { request_id } => assert_eq!(request_id, first.request_id),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn requests_close_before_the_start() {
        let s = setup().await;
        let b = booking(&s, Some("pi_1")).await;
        let start = slot_start_utc(&s.slot, chrono_tz::Tz::UTC);
        let err = request_cancellation(
            &s.config,
            &s.repos,
            &s.services,
            ask(&b, "nora@example.com"),
            start - Duration::hours(47),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CancellationError::TooLate { .. }));
    }

    #[tokio::test]
    async fn approval_cancels_releases_and_refunds() {
        let s = setup().await;
        let b = booking(&s, Some("pi_paid")).await;
        let created = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap();
        let token = token_of(&s, &created.request_id).await;

        let decided = decide_by_token(
            &s.config,
            &s.repos,
            &s.services,
            &token,
            CancellationStatus::Approved,
            Some("get well soon".into()),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(decided.request.status, CancellationStatus::Approved);
        assert_eq!(decided.request.admin_note.as_deref(), Some("get well soon"));
        assert_eq!(decided.booking.status, BookingStatus::Cancelled);
        assert!(decided.released_capacity);
        assert_eq!(decided.refund.as_ref().map(|r| r.status.as_str()), Some("succeeded"));
        assert_eq!(s.payments.refunds(), vec![("pi_paid".to_string(), None)]);

        let slot = s.repos.availability.find_slot(&s.slot.id).await.unwrap().unwrap();
        assert_eq!((slot.booked_adults, slot.booked_dogs), (0, 0));
        assert_eq!(s.mailer.templates().last(), Some(&EmailTemplate::CancellationApproved));

        let again = decide_by_id(&s.config, &s.repos, &s.services, &created.request_id, CancellationStatus::Rejected, None).await;
        assert!(matches!(again, Err(CancellationError::AlreadyDecided(status)) if status == "approved"));
    }

    #[tokio::test]
    async fn rejection_keeps_the_booking() {
        let s = setup().await;
        let b = booking(&s, Some("pi_1")).await;
        let created = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap();

        let decided = decide_by_id(&s.config, &s.repos, &s.services, &created.request_id, CancellationStatus::Rejected, None)
            .await
            .unwrap();
        assert_eq!(decided.booking.status, BookingStatus::Confirmed);
        assert!(decided.refund.is_none());
        assert!(s.payments.refunds().is_empty());
        assert_eq!(s.mailer.templates().last(), Some(&EmailTemplate::CancellationRejected));

        // A new request is possible once the previous one is decided.
        assert!(request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn expired_links_are_gone_but_admin_can_still_decide() {
        let s = setup().await;
        let b = booking(&s, Some("pi_1")).await;
        let created = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap();
        let token = token_of(&s, &created.request_id).await;
        let later = Utc::now() + Duration::hours(s.config.cancellation.token_ttl_hours + 1);

        assert!(view_by_token(&s.repos, &token, Utc::now()).await.is_ok());
        assert!(matches!(view_by_token(&s.repos, &token, later).await, Err(CancellationError::Expired)));
        let by_link = decide_by_token(&s.config, &s.repos, &s.services, &token, CancellationStatus::Approved, None, later).await;
        assert!(matches!(by_link, Err(CancellationError::Expired)));

        let by_id = decide_by_id(&s.config, &s.repos, &s.services, &created.request_id, CancellationStatus::Approved, None)
            .await
            .unwrap();
        assert_eq!(by_id.booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn refund_failure_is_reported_not_rolled_back() {
        let s = setup().await;
        s.payments.fail_refunds.store(true, Ordering::SeqCst);
        let b = booking(&s, Some("pi_1")).await;
        let created = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap();

        let decided = decide_by_id(&s.config, &s.repos, &s.services, &created.request_id, CancellationStatus::Approved, None)
            .await
            .unwrap();
        assert_eq!(decided.booking.status, BookingStatus::Cancelled);
        let refund = decided.refund.unwrap();
        assert_eq!(refund.status, "failed");
        assert!(refund.error.is_some());
    }

    #[tokio::test]
    async fn unpaid_booking_is_cancelled_without_refund() {
        let s = setup().await;
        let b = booking(&s, None).await;
        let created = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap();

        let decided = decide_by_id(&s.config, &s.repos, &s.services, &created.request_id, CancellationStatus::Approved, None)
            .await
            .unwrap();
        assert_eq!(decided.booking.status, BookingStatus::Cancelled);
        assert!(!decided.released_capacity);
        assert!(decided.refund.is_none());
    }

    #[tokio::test]
    async fn admin_cancellation_is_approved_immediately() {
        let s = setup().await;
        let b = booking(&s, Some("pi_9")).await;

        let decided = admin_cancel(
            &s.config,
            &s.repos,
            &s.services,
            &b.id,
            AdminCancellationRequest {
                reason: Some("Guide unavailable".into()),
                note: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(decided.request.requested_by, RequestedBy::Admin);
        assert_eq!(decided.request.status, CancellationStatus::Approved);
        assert_eq!(decided.booking.status, BookingStatus::Cancelled);
        assert_eq!(s.payments.refunds().len(), 1);

        let again = admin_cancel(&s.config, &s.repos, &s.services, &b.id, AdminCancellationRequest::default(), Utc::now()).await;
        assert!(matches!(again, Err(CancellationError::AlreadyCancelled(_))));
        let by_customer = request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now()).await;
        assert!(matches!(by_customer, Err(CancellationError::AlreadyCancelled(_))));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let s = setup().await;
        let b = booking(&s, Some("pi_1")).await;
        request_cancellation(&s.config, &s.repos, &s.services, ask(&b, "nora@example.com"), Utc::now())
            .await
            .unwrap();

        let pending = list_requests(&s.repos, CancellationListQuery { status: Some("pending".into()) })
            .await
            .unwrap();
        assert_eq!(pending.requests.len(), 1);
        let approved = list_requests(&s.repos, CancellationListQuery { status: Some("approved".into()) })
            .await
            .unwrap();
        assert!(approved.requests.is_empty());
        assert!(list_requests(&s.repos, CancellationListQuery { status: Some("maybe".into()) }).await.is_err());
    }
}
