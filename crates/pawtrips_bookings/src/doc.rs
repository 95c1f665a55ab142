// --- File: crates/pawtrips_bookings/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::logic::{
    AvailabilityResponse, BookingListResponse, BookingStatusResponse, CreateBookingRequest,
    CreateBookingResponse, CreateProductRequest, CreateProviderRequest, CreateSlotRequest,
    SlotAvailability, UpdateCapacityRequest,
};
use pawtrips_common::models::{
    AvailabilitySlot, Booking, BookingStatus, Product, ProductKind, Provider,
};

/// Registers the `X-Admin-Api-Key` header used by the admin routes.
pub struct AdminKeySecurity;

impl Modify for AdminKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Admin-Api-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::get_availability_handler,
        crate::handlers::create_booking_handler,
        crate::handlers::get_booking_handler,
        crate::handlers::list_bookings_handler,
        crate::handlers::confirm_booking_handler,
        crate::handlers::cancel_booking_handler,
        crate::handlers::create_provider_handler,
        crate::handlers::create_product_handler,
        crate::handlers::create_slot_handler,
        crate::handlers::update_capacity_handler
    ),
    components(
        schemas(
            AvailabilityResponse,
            SlotAvailability,
            CreateBookingRequest,
            CreateBookingResponse,
            BookingListResponse,
            BookingStatusResponse,
            CreateProviderRequest,
            CreateProductRequest,
            CreateSlotRequest,
            UpdateCapacityRequest,
            Booking,
            BookingStatus,
            Provider,
            Product,
            ProductKind,
            AvailabilitySlot
        )
    ),
    modifiers(&AdminKeySecurity),
    tags(
        (name = "Bookings", description = "Availability and booking API"),
        (name = "Bookings Admin", description = "Booking administration"),
        (name = "Catalog Admin", description = "Providers, products and slots")
    ),
    servers(
        (url = "/api", description = "PawTrips API server")
    )
)]
pub struct BookingsApiDoc;
