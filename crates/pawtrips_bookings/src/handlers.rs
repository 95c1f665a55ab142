// --- File: crates/pawtrips_bookings/src/handlers.rs ---
use crate::logic::{
    self, AvailabilityQuery, AvailabilityResponse, BookingListQuery, BookingListResponse,
    BookingStatusResponse, CreateBookingRequest, CreateBookingResponse, CreateProductRequest,
    CreateProviderRequest, CreateSlotRequest, UpdateCapacityRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use pawtrips_common::models::{AvailabilitySlot, Booking, Product, Provider};
use pawtrips_common::services::ServiceFactory;
use pawtrips_common::PawtripsError;
use pawtrips_config::AppConfig;
use pawtrips_db::Repositories;
use std::sync::Arc;
use tracing::info;

// Shared state for the booking handlers
#[derive(Clone)]
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub services: Arc<dyn ServiceFactory>,
}

/// Lists the slots of a product with their remaining capacity.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Slots with remaining capacity", body = AvailabilityResponse),
        (status = 400, description = "Invalid dates or range"),
        (status = 404, description = "Unknown product")
    ),
    tag = "Bookings"
))]
pub async fn get_availability_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, PawtripsError> {
    let today = logic::local_today(&state.config);
    let response = logic::get_availability(&state.repos, &query, today).await?;
    Ok(Json(response))
}

/// Creates a pending booking. A repeated idempotency key returns the first booking with 200.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/bookings",
    request_body(content = CreateBookingRequest, example = json!({
        "product_id": "2f0c6a52-5b8e-4a43-9f0e-2d7c3b0f1e11",
        "slot_id": "8d1e2f3a-4b5c-4d6e-8f70-9a1b2c3d4e5f",
        "customer_name": "Lea Muster",
        "customer_email": "lea@example.com",
        "adults": 2,
        "dogs": 1,
        "idempotency_key": "checkout-7f3a"
    })),
    responses(
        (status = 201, description = "Booking created", body = CreateBookingResponse),
        (status = 200, description = "Existing booking for this idempotency key", body = CreateBookingResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Unknown product or slot"),
        (status = 409, description = "Not enough capacity left"),
        (status = 502, description = "Payment provider error")
    ),
    tag = "Bookings"
))]
pub async fn create_booking_handler(
    State(state): State<Arc<BookingState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), PawtripsError> {
    let response =
        logic::create_booking(&state.config, &state.repos, state.services.as_ref(), payload).await?;
    let status = if response.duplicate {
        StatusCode::OK
    } else {
        info!("Booking {} created", response.booking.id);
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking details", body = Booking),
        (status = 404, description = "Unknown booking")
    ),
    tag = "Bookings"
))]
pub async fn get_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, PawtripsError> {
    Ok(Json(logic::get_booking(&state.repos, &id).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/admin/bookings",
    params(BookingListQuery),
    responses(
        (status = 200, description = "Matching bookings, newest first", body = BookingListResponse),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Missing or invalid admin key")
    ),
    security(("admin_key" = [])),
    tag = "Bookings Admin"
))]
pub async fn list_bookings_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<BookingListResponse>, PawtripsError> {
    Ok(Json(logic::list_bookings(&state.repos, query).await?))
}

/// Confirms a pending booking and reserves its seats.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/bookings/{id}/confirm",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking confirmed (or already confirmed)", body = BookingStatusResponse),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Slot full or booking cancelled")
    ),
    security(("admin_key" = [])),
    tag = "Bookings Admin"
))]
pub async fn confirm_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingStatusResponse>, PawtripsError> {
    let notifier = state.services.notification_service();
    let response = logic::confirm_booking(&state.repos, notifier.as_ref(), &id, None).await?;
    Ok(Json(response))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/bookings/{id}/cancel",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking cancelled", body = BookingStatusResponse),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Booking already cancelled")
    ),
    security(("admin_key" = [])),
    tag = "Bookings Admin"
))]
pub async fn cancel_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingStatusResponse>, PawtripsError> {
    let transition = logic::cancel_booking(&state.repos, &id).await?;
    info!(
        "Booking {} cancelled by admin (was {})",
        transition.booking.id, transition.previous
    );
    Ok(Json(BookingStatusResponse {
        booking: transition.booking,
        previous_status: transition.previous,
        unchanged: false,
    }))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/providers",
    request_body = CreateProviderRequest,
    responses(
        (status = 201, description = "Provider created", body = Provider),
        (status = 400, description = "Validation failed")
    ),
    security(("admin_key" = [])),
    tag = "Catalog Admin"
))]
pub async fn create_provider_handler(
    State(state): State<Arc<BookingState>>,
    Json(payload): Json<CreateProviderRequest>,
) -> Result<(StatusCode, Json<Provider>), PawtripsError> {
    let provider = logic::create_provider(&state.repos, payload).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Unknown provider")
    ),
    security(("admin_key" = [])),
    tag = "Catalog Admin"
))]
pub async fn create_product_handler(
    State(state): State<Arc<BookingState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), PawtripsError> {
    let product = logic::create_product(&state.config, &state.repos, payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/availability",
    request_body = CreateSlotRequest,
    responses(
        (status = 201, description = "Slot created", body = AvailabilitySlot),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Unknown product")
    ),
    security(("admin_key" = [])),
    tag = "Catalog Admin"
))]
pub async fn create_slot_handler(
    State(state): State<Arc<BookingState>>,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<AvailabilitySlot>), PawtripsError> {
    let slot = logic::create_slot(&state.repos, payload).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// Changes the capacity of a slot. Shrinking below what is already booked is refused.
#[cfg_attr(feature = "openapi", utoipa::path(
    patch,
    path = "/admin/availability/{id}",
    params(("id" = String, Path, description = "Slot id")),
    request_body = UpdateCapacityRequest,
    responses(
        (status = 200, description = "Slot updated", body = AvailabilitySlot),
        (status = 404, description = "Unknown slot"),
        (status = 409, description = "Capacity below booked seats")
    ),
    security(("admin_key" = [])),
    tag = "Catalog Admin"
))]
pub async fn update_capacity_handler(
    State(state): State<Arc<BookingState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCapacityRequest>,
) -> Result<Json<AvailabilitySlot>, PawtripsError> {
    Ok(Json(logic::update_capacity(&state.repos, &id, payload).await?))
}
