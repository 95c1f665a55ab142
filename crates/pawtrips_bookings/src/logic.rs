// --- File: crates/pawtrips_bookings/src/logic.rs ---
//! Booking rules: validation, pricing, dedup and the confirm/cancel flow.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use pawtrips_common::models::{AvailabilitySlot, Booking, BookingStatus, Product, ProductKind, Provider};
use pawtrips_common::services::{CheckoutRequest, EmailTemplate, ServiceFactory, TemplateEmail};
use pawtrips_common::is_stripe_enabled;
use pawtrips_config::AppConfig;
use pawtrips_db::{
    AvailabilityRepository, BookingFilter, BookingRepository, CatalogRepository, DbError, NewBooking,
    NewProduct, NewProvider, NewSlot, Repositories, Transition,
};
use pawtrips_email::{notify, SharedNotifier};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{invalid, BookingError};

pub const MAX_ADULTS_PER_BOOKING: i64 = 20;
pub const MAX_DOGS_PER_BOOKING: i64 = 10;
pub const MAX_AVAILABILITY_RANGE_DAYS: i64 = 366;

// --- Request / response types ---

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AvailabilityQuery {
    pub product_id: String,
    /// YYYY-MM-DD, defaults to today
    pub from: Option<String>,
    /// YYYY-MM-DD, defaults to one year after `from`
    pub to: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SlotAvailability {
    pub slot_id: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub remaining_adults: i64,
    pub remaining_dogs: i64,
    pub sold_out: bool,
}

impl From<&AvailabilitySlot> for SlotAvailability {
    fn from(slot: &AvailabilitySlot) -> Self {
        Self {
            slot_id: slot.id.clone(),
            date: slot.date,
            start_time: slot.start_time,
            end_date: slot.end_date,
            remaining_adults: slot.remaining_adults(),
            remaining_dogs: slot.remaining_dogs(),
            sold_out: slot.is_sold_out(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AvailabilityResponse {
    pub product_id: String,
    pub bookable: bool,
    pub slots: Vec<SlotAvailability>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBookingRequest {
    pub product_id: String,
    pub slot_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub adults: i64,
    #[serde(default)]
    pub dogs: i64,
    /// Client-chosen key; repeating a request with the same key returns the first booking.
    pub idempotency_key: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBookingResponse {
    pub booking: Booking,
    /// True when an earlier booking with the same idempotency key was returned.
    pub duplicate: bool,
    pub checkout_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub product_id: Option<String>,
    pub slot_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookingStatusResponse {
    pub booking: Booking,
    pub previous_status: BookingStatus,
    /// True when nothing changed (e.g. a retried confirmation).
    pub unchanged: bool,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateProviderRequest {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateProductRequest {
    pub provider_id: String,
    pub kind: ProductKind,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_adult_cents: i64,
    #[serde(default)]
    pub price_per_dog_cents: i64,
    pub currency: Option<String>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateSlotRequest {
    pub product_id: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM
    pub start_time: Option<String>,
    /// YYYY-MM-DD, last day of a multi-day trip
    pub end_date: Option<String>,
    pub max_adults: i64,
    pub max_dogs: i64,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateCapacityRequest {
    pub max_adults: i64,
    pub max_dogs: i64,
}

// --- Helpers ---

/// The zone slot dates are expressed in. Unknown names fall back to UTC.
pub fn business_timezone(config: &AppConfig) -> Tz {
    Tz::from_str(&config.cancellation.timezone).unwrap_or_else(|_| {
        warn!(
            "Unknown timezone '{}', using UTC",
            config.cancellation.timezone
        );
        Tz::UTC
    })
}

pub fn local_today(config: &AppConfig) -> NaiveDate {
    Utc::now().with_timezone(&business_timezone(config)).date_naive()
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(format!("Invalid {} format (YYYY-MM-DD)", field)))
}

pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime, BookingError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| invalid(format!("Invalid {} format (HH:MM)", field)))
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !email.contains(' '),
        None => false,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves the `[from, to]` window of an availability query.
pub fn availability_window(
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), BookingError> {
    let from = match from {
        Some(raw) => parse_date("from", raw)?,
        None => today,
    };
    let to = match to {
        Some(raw) => parse_date("to", raw)?,
        None => from + Duration::days(MAX_AVAILABILITY_RANGE_DAYS - 1),
    };
    if to < from {
        return Err(invalid("to must not be before from"));
    }
    if (to - from).num_days() >= MAX_AVAILABILITY_RANGE_DAYS {
        return Err(invalid(format!(
            "date range must not exceed {} days",
            MAX_AVAILABILITY_RANGE_DAYS
        )));
    }
    Ok((from, to))
}

/// Checks a booking request against its product and slot and returns the total price.
pub fn validate_booking(
    request: &CreateBookingRequest,
    product: &Product,
    slot: &AvailabilitySlot,
    today: NaiveDate,
) -> Result<i64, BookingError> {
    if request.adults < 1 || request.adults > MAX_ADULTS_PER_BOOKING {
        return Err(invalid(format!(
            "adults must be between 1 and {}",
            MAX_ADULTS_PER_BOOKING
        )));
    }
    if request.dogs < 0 || request.dogs > MAX_DOGS_PER_BOOKING {
        return Err(invalid(format!(
            "dogs must be between 0 and {}",
            MAX_DOGS_PER_BOOKING
        )));
    }
    if request.customer_name.trim().is_empty() {
        return Err(invalid("customer_name is required"));
    }
    if !is_plausible_email(&request.customer_email) {
        return Err(invalid("customer_email is not a valid email address"));
    }
    if !product.active {
        return Err(invalid(format!("product {} is not bookable", product.id)));
    }
    if slot.product_id != product.id {
        return Err(invalid(format!(
            "slot {} does not belong to product {}",
            slot.id, product.id
        )));
    }
    if slot.date < today {
        return Err(invalid(format!("slot {} is in the past", slot.id)));
    }
    // Advisory: the authoritative check is the reserve at confirmation.
    if !slot.can_accommodate(request.adults, request.dogs) {
        return Err(BookingError::InsufficientCapacity {
            remaining_adults: slot.remaining_adults(),
            remaining_dogs: slot.remaining_dogs(),
        });
    }
    product
        .price_for(request.adults, request.dogs)
        .ok_or_else(|| invalid("total price is out of range"))
}

/// Template parameters describing a booking, shared by all booking-related mails.
pub fn booking_params(booking: &Booking, product: Option<&Product>, slot: Option<&AvailabilitySlot>) -> serde_json::Value {
    json!({
        "booking_id": booking.id,
        "customer_name": booking.customer_name,
        "product_title": product.map(|p| p.title.clone()),
        "date": slot.map(|s| s.date.to_string()),
        "start_time": slot.and_then(|s| s.start_time).map(|t| t.format("%H:%M").to_string()),
        "end_date": slot.and_then(|s| s.end_date).map(|d| d.to_string()),
        "adults": booking.adults,
        "dogs": booking.dogs,
        "total_cents": booking.total_cents,
        "currency": booking.currency,
        "status": booking.status,
    })
}

/// Loads product and slot for mail parameters; lookup failures only drop fields.
pub async fn booking_context(
    repos: &Repositories,
    booking: &Booking,
) -> (Option<Product>, Option<AvailabilitySlot>) {
    let product = repos.catalog.find_product(&booking.product_id).await.ok().flatten();
    let slot = repos.availability.find_slot(&booking.slot_id).await.ok().flatten();
    (product, slot)
}

// --- Catalog ---

pub async fn create_provider(
    repos: &Repositories,
    request: CreateProviderRequest,
) -> Result<Provider, BookingError> {
    if request.name.trim().is_empty() {
        return Err(invalid("name is required"));
    }
    if !is_plausible_email(&request.email) {
        return Err(invalid("email is not a valid email address"));
    }
    Ok(repos
        .catalog
        .create_provider(NewProvider {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
        })
        .await?)
}

pub async fn create_product(
    config: &AppConfig,
    repos: &Repositories,
    request: CreateProductRequest,
) -> Result<Product, BookingError> {
    if request.title.trim().is_empty() {
        return Err(invalid("title is required"));
    }
    if request.price_per_adult_cents < 0 || request.price_per_dog_cents < 0 {
        return Err(invalid("prices must not be negative"));
    }
    let currency = request
        .currency
        .or_else(|| config.stripe.as_ref().and_then(|s| s.default_currency.clone()))
        .unwrap_or_else(|| "chf".to_string());
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("currency must be a three letter ISO code"));
    }

    repos
        .catalog
        .create_product(NewProduct {
            provider_id: request.provider_id,
            kind: request.kind,
            title: request.title.trim().to_string(),
            description: non_empty(request.description),
            location: non_empty(request.location),
            price_per_adult_cents: request.price_per_adult_cents,
            price_per_dog_cents: request.price_per_dog_cents,
            currency,
        })
        .await
        .map_err(|e| match e {
            DbError::NotFound(what) => BookingError::NotFound(what),
            other => other.into(),
        })
}

pub async fn create_slot(
    repos: &Repositories,
    request: CreateSlotRequest,
) -> Result<AvailabilitySlot, BookingError> {
    let date = parse_date("date", &request.date)?;
    let start_time = request
        .start_time
        .as_deref()
        .map(|t| parse_time("start_time", t))
        .transpose()?;
    let end_date = request
        .end_date
        .as_deref()
        .map(|d| parse_date("end_date", d))
        .transpose()?;
    if matches!(end_date, Some(end) if end < date) {
        return Err(invalid("end_date must not be before date"));
    }
    if request.max_adults < 1 || request.max_dogs < 0 {
        return Err(invalid("max_adults must be at least 1 and max_dogs not negative"));
    }

    repos
        .availability
        .create_slot(NewSlot {
            product_id: request.product_id,
            date,
            start_time,
            end_date,
            max_adults: request.max_adults,
            max_dogs: request.max_dogs,
        })
        .await
        .map_err(|e| match e {
            DbError::NotFound(what) => BookingError::NotFound(what),
            other => other.into(),
        })
}

pub async fn update_capacity(
    repos: &Repositories,
    slot_id: &str,
    request: UpdateCapacityRequest,
) -> Result<AvailabilitySlot, BookingError> {
    if request.max_adults < 0 || request.max_dogs < 0 {
        return Err(invalid("capacity must not be negative"));
    }
    Ok(repos
        .availability
        .update_capacity(slot_id, request.max_adults, request.max_dogs)
        .await?)
}

pub async fn get_availability(
    repos: &Repositories,
    query: &AvailabilityQuery,
    today: NaiveDate,
) -> Result<AvailabilityResponse, BookingError> {
    let (from, to) = availability_window(query.from.as_deref(), query.to.as_deref(), today)?;
    let product = repos
        .catalog
        .find_product(&query.product_id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("product {}", query.product_id)))?;

    // Past dates are never bookable.
    let from = from.max(today);
    let slots = if from > to {
        Vec::new()
    } else {
        repos
            .availability
            .list_slots(&product.id, Some(from), Some(to))
            .await?
    };

    Ok(AvailabilityResponse {
        product_id: product.id,
        bookable: product.active,
        slots: slots.iter().map(SlotAvailability::from).collect(),
    })
}

// --- Bookings ---

/// Opens the booking's checkout session and stores it on the booking.
///
/// A booking keeps a single session: if another caller stored one first,
/// that one's URL is returned and the new session is left to expire.
async fn start_checkout(
    repos: &Repositories,
    services: &dyn ServiceFactory,
    booking: &Booking,
    product: &Product,
    slot: &AvailabilitySlot,
) -> Result<Option<String>, BookingError> {
    let Some(payments) = services.payment_service() else {
        return Ok(None);
    };
    let checkout = payments
        .create_checkout(CheckoutRequest {
            booking_id: booking.id.clone(),
            description: format!("{} on {}", product.title, slot.date),
            amount_cents: booking.total_cents,
            currency: booking.currency.clone(),
            customer_email: Some(booking.customer_email.clone()),
        })
        .await
        .map_err(|e| BookingError::Payment(e.to_string()))?;
    info!("Checkout {} started for booking {}", checkout.session_id, booking.id);

    let stored = repos
        .bookings
        .attach_checkout(&booking.id, &checkout.session_id, &checkout.url)
        .await?;
    if stored.checkout_session_id.as_deref() != Some(checkout.session_id.as_str()) {
        warn!(
            "Booking {} already has checkout {:?}, dropping {}",
            booking.id, stored.checkout_session_id, checkout.session_id
        );
    }
    Ok(stored.checkout_url)
}

/// Creates a pending booking, or returns the earlier one for a repeated idempotency key.
pub async fn create_booking(
    config: &AppConfig,
    repos: &Repositories,
    services: &dyn ServiceFactory,
    request: CreateBookingRequest,
) -> Result<CreateBookingResponse, BookingError> {
    let idempotency_key = non_empty(request.idempotency_key.clone());
    if let Some(key) = idempotency_key.as_deref() {
        if let Some(existing) = repos.bookings.find_by_idempotency_key(key).await? {
            info!("Idempotency key {} already used by booking {}", key, existing.id);
            return duplicate_response(config, repos, services, existing).await;
        }
    }

    let product = repos
        .catalog
        .find_product(&request.product_id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("product {}", request.product_id)))?;
    let slot = repos
        .availability
        .find_slot(&request.slot_id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("slot {}", request.slot_id)))?;

    let total_cents = validate_booking(&request, &product, &slot, local_today(config))?;

    let created = repos
        .bookings
        .create(NewBooking {
            product_id: product.id.clone(),
            slot_id: slot.id.clone(),
            customer_name: request.customer_name.trim().to_string(),
            customer_email: request.customer_email.trim().to_string(),
            customer_phone: non_empty(request.customer_phone),
            notes: non_empty(request.notes),
            adults: request.adults,
            dogs: request.dogs,
            total_cents,
            currency: product.currency.clone(),
            idempotency_key: idempotency_key.clone(),
        })
        .await;

    let booking = match (created, idempotency_key.as_deref()) {
        (Ok(booking), _) => booking,
        // Lost a race against a concurrent request with the same key.
        (Err(DbError::Conflict(_)), Some(key)) => {
            if let Some(existing) = repos.bookings.find_by_idempotency_key(key).await? {
                return duplicate_response(config, repos, services, existing).await;
            }
            return Err(BookingError::Db(DbError::Conflict(format!(
                "idempotency key {} is in use",
                key
            ))));
        }
        (Err(e), _) => return Err(e.into()),
    };

    let checkout_url = if is_stripe_enabled(config) {
        start_checkout(repos, services, &booking, &product, &slot).await?
    } else {
        None
    };

    Ok(CreateBookingResponse {
        booking,
        duplicate: false,
        checkout_url,
    })
}

async fn duplicate_response(
    config: &AppConfig,
    repos: &Repositories,
    services: &dyn ServiceFactory,
    existing: Booking,
) -> Result<CreateBookingResponse, BookingError> {
    // A retried request for an unpaid booking gets its existing checkout link.
    let checkout_url = match (&existing.checkout_url, existing.status) {
        (Some(url), BookingStatus::Pending) => Some(url.clone()),
        (None, BookingStatus::Pending) if is_stripe_enabled(config) => {
            match booking_context(repos, &existing).await {
                (Some(product), Some(slot)) => {
                    start_checkout(repos, services, &existing, &product, &slot).await?
                }
                _ => None,
            }
        }
        _ => None,
    };
    Ok(CreateBookingResponse {
        booking: existing,
        duplicate: true,
        checkout_url,
    })
}

pub async fn get_booking(repos: &Repositories, id: &str) -> Result<Booking, BookingError> {
    repos
        .bookings
        .find(id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("booking {}", id)))
}

pub async fn list_bookings(
    repos: &Repositories,
    query: BookingListQuery,
) -> Result<BookingListResponse, BookingError> {
    let status = query
        .status
        .as_deref()
        .map(BookingStatus::from_str)
        .transpose()
        .map_err(|e| invalid(e.to_string()))?;
    let bookings = repos
        .bookings
        .list(BookingFilter {
            status,
            product_id: query.product_id,
            slot_id: query.slot_id,
        })
        .await?;
    Ok(BookingListResponse { bookings })
}

/// Confirms a pending booking and reserves its party on the slot.
///
/// Confirming again with the same (or no) payment reference is a no-op, so
/// retried payment webhooks are harmless. A confirmation mail goes out on
/// the first confirmation only; mail failures are logged.
pub async fn confirm_booking(
    repos: &Repositories,
    notifier: Option<&SharedNotifier>,
    booking_id: &str,
    payment_reference: Option<String>,
) -> Result<BookingStatusResponse, BookingError> {
    let booking = get_booking(repos, booking_id).await?;
    if booking.status != BookingStatus::Pending {
        return already_confirmed(booking, payment_reference.as_deref());
    }

    let transition = match repos
        .bookings
        .transition_status(booking_id, BookingStatus::Confirmed, payment_reference.clone())
        .await
    {
        Ok(t) => t,
        Err(DbError::Conflict(msg)) => {
            // Someone else moved it first; a concurrent identical confirmation is fine.
            let current = get_booking(repos, booking_id).await?;
            if current.status == BookingStatus::Pending {
                return Err(BookingError::Db(DbError::Conflict(msg)));
            }
            return already_confirmed(current, payment_reference.as_deref());
        }
        Err(e) => return Err(e.into()),
    };

    let (product, slot) = booking_context(repos, &transition.booking).await;
    notify(
        notifier,
        TemplateEmail {
            to_email: transition.booking.customer_email.clone(),
            to_name: Some(transition.booking.customer_name.clone()),
            template: EmailTemplate::BookingConfirmed,
            params: booking_params(&transition.booking, product.as_ref(), slot.as_ref()),
        },
    )
    .await;

    Ok(BookingStatusResponse {
        booking: transition.booking,
        previous_status: transition.previous,
        unchanged: false,
    })
}

fn already_confirmed(
    booking: Booking,
    payment_reference: Option<&str>,
) -> Result<BookingStatusResponse, BookingError> {
    let same_payment = match (payment_reference, booking.payment_reference.as_deref()) {
        (Some(new), Some(stored)) => new == stored,
        _ => true,
    };
    if booking.status == BookingStatus::Confirmed && same_payment {
        info!("Booking {} already confirmed, nothing to do", booking.id);
        return Ok(BookingStatusResponse {
            previous_status: booking.status,
            booking,
            unchanged: true,
        });
    }
    Err(BookingError::WrongState {
        booking_id: booking.id,
        status: booking.status.to_string(),
    })
}

/// Cancels a booking directly, releasing capacity when it was confirmed.
pub async fn cancel_booking(repos: &Repositories, booking_id: &str) -> Result<Transition, BookingError> {
    let booking = get_booking(repos, booking_id).await?;
    if booking.status == BookingStatus::Cancelled {
        return Err(BookingError::WrongState {
            booking_id: booking.id,
            status: booking.status.to_string(),
        });
    }
    Ok(repos
        .bookings
        .transition_status(booking_id, BookingStatus::Cancelled, None)
        .await?)
}

/// Cancels a booking whose checkout expired. Anything but `pending` is left
/// alone, and so is a booking whose stored checkout is not `session_id`.
pub async fn expire_pending_booking(
    repos: &Repositories,
    booking_id: &str,
    session_id: Option<&str>,
) -> Result<BookingStatusResponse, BookingError> {
    let booking = get_booking(repos, booking_id).await?;
    if booking.status != BookingStatus::Pending {
        info!("Booking {} is {}, ignoring expiry", booking.id, booking.status);
        return Ok(BookingStatusResponse {
            previous_status: booking.status,
            booking,
            unchanged: true,
        });
    }
    if let (Some(expired), Some(current)) = (session_id, booking.checkout_session_id.as_deref()) {
        if expired != current {
            info!(
                "Checkout {} expired but booking {} pays through {}, keeping it",
                expired, booking.id, current
            );
            return Ok(BookingStatusResponse {
                previous_status: booking.status,
                booking,
                unchanged: true,
            });
        }
    }
    match repos
        .bookings
        .transition_status(booking_id, BookingStatus::Cancelled, None)
        .await
    {
        Ok(t) => Ok(BookingStatusResponse {
            booking: t.booking,
            previous_status: t.previous,
            unchanged: false,
        }),
        // Confirmed in the meantime: keep it.
        Err(DbError::Conflict(_)) => {
            let booking = get_booking(repos, booking_id).await?;
            Ok(BookingStatusResponse {
                previous_status: booking.status,
                booking,
                unchanged: true,
            })
        }
        Err(e) => Err(e.into()),
    }
}
