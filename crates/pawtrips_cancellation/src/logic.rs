// --- File: crates/pawtrips_cancellation/src/logic.rs ---
//! Customer cancellation requests, magic links and admin decisions.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use pawtrips_bookings::logic::{booking_context, booking_params, business_timezone};
use pawtrips_common::is_stripe_enabled;
use pawtrips_common::models::{
    AvailabilitySlot, Booking, BookingStatus, CancellationRequest, CancellationStatus, RequestedBy,
};
use pawtrips_common::services::{EmailTemplate, ServiceFactory, TemplateEmail};
use pawtrips_config::AppConfig;
use pawtrips_db::{
    AvailabilityRepository, BookingRepository, CancellationRepository, DbError, Decision,
    NewCancellation, Repositories,
};
use pawtrips_email::notify;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CancellationError;

// --- Request / response types ---

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateCancellationRequest {
    pub booking_id: String,
    /// Must match the booking's email (case-insensitive).
    pub customer_email: String,
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CancellationCreatedResponse {
    pub request_id: String,
    pub booking_id: String,
    pub status: CancellationStatus,
    pub expires_at: DateTime<Utc>,
}

/// What the magic link shows: the request and where its booking stands.
#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CancellationView {
    pub request_id: String,
    pub booking_id: String,
    pub status: CancellationStatus,
    pub requested_by: RequestedBy,
    pub reason: Option<String>,
    pub admin_note: Option<String>,
    pub booking_status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct MagicLinkQuery {
    /// Admin API key
    pub key: Option<String>,
    pub note: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DecisionRequest {
    pub note: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AdminCancellationRequest {
    pub reason: Option<String>,
    pub note: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct CancellationListQuery {
    pub status: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CancellationListResponse {
    pub requests: Vec<CancellationRequest>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RefundSummary {
    /// `succeeded`, `pending`, ... as reported by the provider, or `failed`.
    pub status: String,
    pub refund_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DecisionResponse {
    pub request: CancellationRequest,
    pub booking: Booking,
    pub released_capacity: bool,
    /// Present when a refund was attempted.
    pub refund: Option<RefundSummary>,
}

// --- Tokens, links and the cutoff ---

/// 32 random bytes (two v4 UUIDs), URL-safe base64 without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct MagicLinks {
    pub status_url: String,
    pub approve_url: String,
    pub reject_url: String,
}

pub fn magic_links(config: &AppConfig, token: &str) -> MagicLinks {
    let base = config.cancellation.public_base_url.trim_end_matches('/');
    let status_url = format!("{}/api/cancellations/{}", base, token);
    let key = config
        .admin
        .as_ref()
        .and_then(|a| a.api_key.as_deref())
        .and_then(|k| serde_urlencoded::to_string([("key", k)]).ok())
        .map(|query| format!("?{}", query))
        .unwrap_or_default();
    MagicLinks {
        approve_url: format!("{}/approve{}", status_url, key),
        reject_url: format!("{}/reject{}", status_url, key),
        status_url,
    }
}

/// When the slot starts, read in the business timezone. Slots without a
/// start time start at midnight.
pub fn slot_start_utc(slot: &AvailabilitySlot, tz: Tz) -> DateTime<Utc> {
    let local = slot.date.and_time(slot.start_time.unwrap_or(NaiveTime::MIN));
    match tz.from_local_datetime(&local).earliest() {
        Some(start) => start.with_timezone(&Utc),
        // Inside a DST gap: the wall-clock time does not exist, use it as UTC.
        None => Utc.from_utc_datetime(&local),
    }
}

pub fn check_cutoff(
    slot: &AvailabilitySlot,
    tz: Tz,
    min_hours_before_start: i64,
    now: DateTime<Utc>,
) -> Result<(), CancellationError> {
    if slot_start_utc(slot, tz) - now < Duration::hours(min_hours_before_start) {
        return Err(CancellationError::TooLate {
            min_hours: min_hours_before_start,
        });
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn with_extra(mut params: Value, extra: &[(&str, Option<&str>)]) -> Value {
    if let Some(map) = params.as_object_mut() {
        for (name, value) in extra {
            map.insert((*name).to_string(), value.map(Value::from).unwrap_or(Value::Null));
        }
    }
    params
}

fn view(request: CancellationRequest, booking_status: BookingStatus) -> CancellationView {
    CancellationView {
        request_id: request.id,
        booking_id: request.booking_id,
        status: request.status,
        requested_by: request.requested_by,
        reason: request.reason,
        admin_note: request.admin_note,
        booking_status,
        created_at: request.created_at,
        decided_at: request.decided_at,
        expires_at: request.expires_at,
    }
}

// --- Operations ---

/// Files a customer request for `booking_id`.
///
/// An unknown booking and an email mismatch both answer `NotFound`.
pub async fn request_cancellation(
    config: &AppConfig,
    repos: &Repositories,
    services: &dyn ServiceFactory,
    request: CreateCancellationRequest,
    now: DateTime<Utc>,
) -> Result<CancellationCreatedResponse, CancellationError> {
    let not_found = || CancellationError::NotFound(format!("booking {}", request.booking_id));
    let booking = repos
        .bookings
        .find(&request.booking_id)
        .await?
        .filter(|b| b.email_matches(&request.customer_email))
        .ok_or_else(not_found)?;

    if booking.status == BookingStatus::Cancelled {
        return Err(CancellationError::AlreadyCancelled(booking.id));
    }
    if let Some(existing) = repos.cancellations.find_pending_for_booking(&booking.id).await? {
        return Err(CancellationError::DuplicatePending {
            request_id: existing.id,
        });
    }

    let slot = repos
        .availability
        .find_slot(&booking.slot_id)
        .await?
        .ok_or_else(|| CancellationError::NotFound(format!("slot {}", booking.slot_id)))?;
    check_cutoff(
        &slot,
        business_timezone(config),
        config.cancellation.min_hours_before_start,
        now,
    )?;

    let created = create_pending(config, repos, &booking, RequestedBy::Customer, non_empty(request.reason), now).await?;
    info!(
        "Cancellation request {} filed for booking {}",
        created.id, booking.id
    );

    let notifier = services.notification_service();
    let (product, _) = booking_context(repos, &booking).await;
    let params = booking_params(&booking, product.as_ref(), Some(&slot));
    let links = magic_links(config, &created.token);
    let expires = created.expires_at.to_rfc3339();

    notify(
        notifier.as_ref(),
        TemplateEmail {
            to_email: booking.customer_email.clone(),
            to_name: Some(booking.customer_name.clone()),
            template: EmailTemplate::CancellationReceived,
            params: with_extra(
                params.clone(),
                &[
                    ("status_url", Some(links.status_url.as_str())),
                    ("reason", created.reason.as_deref()),
                ],
            ),
        },
    )
    .await;

    match config.email.as_ref().map(|e| e.admin_email.trim()).filter(|e| !e.is_empty()) {
        Some(admin_email) => {
            notify(
                notifier.as_ref(),
                TemplateEmail {
                    to_email: admin_email.to_string(),
                    to_name: None,
                    template: EmailTemplate::CancellationAdminReview,
                    params: with_extra(
                        params,
                        &[
                            ("customer_email", Some(booking.customer_email.as_str())),
                            ("reason", created.reason.as_deref()),
                            ("approve_url", Some(links.approve_url.as_str())),
                            ("reject_url", Some(links.reject_url.as_str())),
                            ("expires_at", Some(expires.as_str())),
                        ],
                    ),
                },
            )
            .await;
        }
        None => warn!("No admin email configured, request {} needs manual review", created.id),
    }

    Ok(CancellationCreatedResponse {
        request_id: created.id,
        booking_id: created.booking_id,
        status: created.status,
        expires_at: created.expires_at,
    })
}

async fn create_pending(
    config: &AppConfig,
    repos: &Repositories,
    booking: &Booking,
    requested_by: RequestedBy,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<CancellationRequest, CancellationError> {
    let created = repos
        .cancellations
        .create(NewCancellation {
            booking_id: booking.id.clone(),
            token: generate_token(),
            requested_by,
            reason,
            expires_at: now + Duration::hours(config.cancellation.token_ttl_hours),
        })
        .await;

    match created {
        Ok(request) => Ok(request),
        // Raced with another request for the same booking.
        Err(DbError::Conflict(msg)) => match repos.cancellations.find_pending_for_booking(&booking.id).await? {
            Some(existing) => Err(CancellationError::DuplicatePending {
                request_id: existing.id,
            }),
            None => Err(CancellationError::Db(DbError::Conflict(msg))),
        },
        Err(e) => Err(e.into()),
    }
}

/// The magic-link status view. Expired links are refused.
pub async fn view_by_token(
    repos: &Repositories,
    token: &str,
    now: DateTime<Utc>,
) -> Result<CancellationView, CancellationError> {
    let request = find_live_by_token(repos, token, now).await?;
    let booking_status = repos
        .bookings
        .find(&request.booking_id)
        .await?
        .map(|b| b.status)
        .ok_or_else(|| CancellationError::NotFound(format!("booking {}", request.booking_id)))?;
    Ok(view(request, booking_status))
}

async fn find_live_by_token(
    repos: &Repositories,
    token: &str,
    now: DateTime<Utc>,
) -> Result<CancellationRequest, CancellationError> {
    let request = repos
        .cancellations
        .find_by_token(token)
        .await?
        .ok_or_else(|| CancellationError::NotFound("cancellation request".to_string()))?;
    if request.is_expired(now) {
        return Err(CancellationError::Expired);
    }
    Ok(request)
}

/// Decides through a magic link. The caller has already checked the admin key.
pub async fn decide_by_token(
    config: &AppConfig,
    repos: &Repositories,
    services: &dyn ServiceFactory,
    token: &str,
    decision: CancellationStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<DecisionResponse, CancellationError> {
    let request = find_live_by_token(repos, token, now).await?;
    decide(config, repos, services, request, decision, note).await
}

/// Decides by request id. Token expiry does not apply here.
pub async fn decide_by_id(
    config: &AppConfig,
    repos: &Repositories,
    services: &dyn ServiceFactory,
    id: &str,
    decision: CancellationStatus,
    note: Option<String>,
) -> Result<DecisionResponse, CancellationError> {
    let request = repos
        .cancellations
        .find(id)
        .await?
        .ok_or_else(|| CancellationError::NotFound(format!("cancellation request {}", id)))?;
    decide(config, repos, services, request, decision, note).await
}

/// Files and immediately approves a request on behalf of the provider.
pub async fn admin_cancel(
    config: &AppConfig,
    repos: &Repositories,
    services: &dyn ServiceFactory,
    booking_id: &str,
    body: AdminCancellationRequest,
    now: DateTime<Utc>,
) -> Result<DecisionResponse, CancellationError> {
    let booking = repos
        .bookings
        .find(booking_id)
        .await?
        .ok_or_else(|| CancellationError::NotFound(format!("booking {}", booking_id)))?;
    if booking.status == BookingStatus::Cancelled {
        return Err(CancellationError::AlreadyCancelled(booking.id));
    }
    let request = create_pending(config, repos, &booking, RequestedBy::Admin, non_empty(body.reason), now).await?;
    info!("Admin cancellation {} for booking {}", request.id, booking.id);
    decide(config, repos, services, request, CancellationStatus::Approved, body.note).await
}

pub async fn list_requests(
    repos: &Repositories,
    query: CancellationListQuery,
) -> Result<CancellationListResponse, CancellationError> {
    let status = query
        .status
        .as_deref()
        .map(CancellationStatus::from_str)
        .transpose()
        .map_err(|e| CancellationError::Validation(e.to_string()))?;
    let requests = repos.cancellations.list(status).await?;
    Ok(CancellationListResponse { requests })
}

async fn decide(
    config: &AppConfig,
    repos: &Repositories,
    services: &dyn ServiceFactory,
    request: CancellationRequest,
    decision: CancellationStatus,
    note: Option<String>,
) -> Result<DecisionResponse, CancellationError> {
    if request.status.is_final() {
        return Err(CancellationError::AlreadyDecided(request.status.to_string()));
    }

    let Decision {
        request,
        booking,
        released_capacity,
    } = match repos.cancellations.decide(&request.id, decision, non_empty(note)).await {
        Ok(d) => d,
        Err(DbError::Conflict(_)) => {
            // Decided concurrently.
            let status = repos
                .cancellations
                .find(&request.id)
                .await?
                .map(|r| r.status.to_string())
                .unwrap_or_else(|| "gone".to_string());
            return Err(CancellationError::AlreadyDecided(status));
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        "Cancellation request {} {} (booking {} now {})",
        request.id, request.status, booking.id, booking.status
    );

    let refund = if decision == CancellationStatus::Approved && released_capacity {
        refund_booking(config, services, &booking).await
    } else {
        None
    };

    let template = match decision {
        CancellationStatus::Approved => EmailTemplate::CancellationApproved,
        _ => EmailTemplate::CancellationRejected,
    };
    let (product, slot) = booking_context(repos, &booking).await;
    let refund_status = refund.as_ref().map(|r| r.status.clone());
    notify(
        services.notification_service().as_ref(),
        TemplateEmail {
            to_email: booking.customer_email.clone(),
            to_name: Some(booking.customer_name.clone()),
            template,
            params: with_extra(
                booking_params(&booking, product.as_ref(), slot.as_ref()),
                &[
                    ("admin_note", request.admin_note.as_deref()),
                    ("refund_status", refund_status.as_deref()),
                ],
            ),
        },
    )
    .await;

    Ok(DecisionResponse {
        request,
        booking,
        released_capacity,
        refund,
    })
}

/// Refunds a paid booking in full. Failures are reported, never raised:
/// the cancellation stands either way.
async fn refund_booking(
    config: &AppConfig,
    services: &dyn ServiceFactory,
    booking: &Booking,
) -> Option<RefundSummary> {
    let payment_reference = booking.payment_reference.as_deref()?;
    if !is_stripe_enabled(config) {
        return None;
    }
    let Some(payments) = services.payment_service() else {
        warn!("Stripe enabled but no payment service, booking {} not refunded", booking.id);
        return None;
    };

    match payments
        .create_refund(payment_reference, None, Some("requested_by_customer"))
        .await
    {
        Ok(refund) => {
            info!("Refund {} ({}) for booking {}", refund.id, refund.status, booking.id);
            Some(RefundSummary {
                status: refund.status,
                refund_id: Some(refund.id),
                amount_cents: Some(refund.amount),
                error: None,
            })
        }
        Err(err) => {
            warn!("Refund for booking {} failed: {}", booking.id, err);
            Some(RefundSummary {
                status: "failed".to_string(),
                refund_id: None,
                amount_cents: None,
                error: Some(err.to_string()),
            })
        }
    }
}
