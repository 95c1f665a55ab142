// --- File: crates/pawtrips_cancellation/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::logic::{
    AdminCancellationRequest, CancellationCreatedResponse, CancellationListResponse,
    CancellationView, CreateCancellationRequest, DecisionRequest, DecisionResponse,
    RefundSummary,
};
use pawtrips_common::models::{CancellationRequest, CancellationStatus, RequestedBy};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::create_cancellation_handler,
        crate::handlers::view_cancellation_handler,
        crate::handlers::approve_by_token_handler,
        crate::handlers::reject_by_token_handler,
        crate::handlers::list_cancellations_handler,
        crate::handlers::approve_by_id_handler,
        crate::handlers::reject_by_id_handler,
        crate::handlers::admin_cancel_handler
    ),
    components(
        schemas(
            CreateCancellationRequest,
            CancellationCreatedResponse,
            CancellationView,
            CancellationListResponse,
            DecisionRequest,
            DecisionResponse,
            AdminCancellationRequest,
            RefundSummary,
            CancellationRequest,
            CancellationStatus,
            RequestedBy
        )
    ),
    tags(
        (name = "Cancellations", description = "Cancellation requests and magic links"),
        (name = "Cancellations Admin", description = "Cancellation review")
    ),
    servers(
        (url = "/api", description = "PawTrips API server")
    )
)]
pub struct CancellationApiDoc;
