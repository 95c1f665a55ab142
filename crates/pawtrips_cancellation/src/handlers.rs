// --- File: crates/pawtrips_cancellation/src/handlers.rs ---
use crate::logic::{
    self, AdminCancellationRequest, CancellationCreatedResponse, CancellationListQuery,
    CancellationListResponse, CancellationView, CreateCancellationRequest, DecisionRequest,
    DecisionResponse, MagicLinkQuery,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use pawtrips_common::auth::verify_admin_key;
use pawtrips_common::models::CancellationStatus;
use pawtrips_common::services::ServiceFactory;
use pawtrips_common::PawtripsError;
use pawtrips_config::AppConfig;
use pawtrips_db::Repositories;
use std::sync::Arc;

#[derive(Clone)]
pub struct CancellationState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub services: Arc<dyn ServiceFactory>,
}

/// Files a customer cancellation request.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/cancellations",
    request_body(content = CreateCancellationRequest, example = json!({
        "booking_id": "5d2b0c1e-7a7f-4f5e-9c53-1f0a3e2b6c44",
        "customer_email": "lea@example.com",
        "reason": "Our dog is injured"
    })),
    responses(
        (status = 201, description = "Request filed, admin notified", body = CancellationCreatedResponse),
        (status = 404, description = "No booking with this id and email"),
        (status = 409, description = "Booking cancelled or request already pending"),
        (status = 422, description = "too_late: the start is too close")
    ),
    tag = "Cancellations"
))]
pub async fn create_cancellation_handler(
    State(state): State<Arc<CancellationState>>,
    Json(payload): Json<CreateCancellationRequest>,
) -> Result<(StatusCode, Json<CancellationCreatedResponse>), PawtripsError> {
    let created = logic::request_cancellation(
        &state.config,
        &state.repos,
        state.services.as_ref(),
        payload,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/cancellations/{token}",
    params(("token" = String, Path, description = "Magic-link token")),
    responses(
        (status = 200, description = "Request status", body = CancellationView),
        (status = 404, description = "Unknown token"),
        (status = 410, description = "Link expired")
    ),
    tag = "Cancellations"
))]
pub async fn view_cancellation_handler(
    State(state): State<Arc<CancellationState>>,
    Path(token): Path<String>,
) -> Result<Json<CancellationView>, PawtripsError> {
    Ok(Json(logic::view_by_token(&state.repos, &token, Utc::now()).await?))
}

async fn decide_by_link(
    state: &CancellationState,
    token: &str,
    query: MagicLinkQuery,
    decision: CancellationStatus,
) -> Result<Json<DecisionResponse>, PawtripsError> {
    verify_admin_key(&state.config, query.key.as_deref())?;
    let response = logic::decide_by_token(
        &state.config,
        &state.repos,
        state.services.as_ref(),
        token,
        decision,
        query.note,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

/// Magic-link approval from the admin review email.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/cancellations/{token}/approve",
    params(("token" = String, Path, description = "Magic-link token"), MagicLinkQuery),
    responses(
        (status = 200, description = "Approved, booking cancelled", body = DecisionResponse),
        (status = 401, description = "Missing or invalid key"),
        (status = 409, description = "Already decided"),
        (status = 410, description = "Link expired")
    ),
    tag = "Cancellations"
))]
pub async fn approve_by_token_handler(
    State(state): State<Arc<CancellationState>>,
    Path(token): Path<String>,
    Query(query): Query<MagicLinkQuery>,
) -> Result<Json<DecisionResponse>, PawtripsError> {
    decide_by_link(&state, &token, query, CancellationStatus::Approved).await
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/cancellations/{token}/reject",
    params(("token" = String, Path, description = "Magic-link token"), MagicLinkQuery),
    responses(
        (status = 200, description = "Rejected, booking kept", body = DecisionResponse),
        (status = 401, description = "Missing or invalid key"),
        (status = 409, description = "Already decided"),
        (status = 410, description = "Link expired")
    ),
    tag = "Cancellations"
))]
pub async fn reject_by_token_handler(
    State(state): State<Arc<CancellationState>>,
    Path(token): Path<String>,
    Query(query): Query<MagicLinkQuery>,
) -> Result<Json<DecisionResponse>, PawtripsError> {
    decide_by_link(&state, &token, query, CancellationStatus::Rejected).await
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/admin/cancellations",
    params(CancellationListQuery),
    responses(
        (status = 200, description = "Requests, newest first", body = CancellationListResponse),
        (status = 400, description = "Unknown status")
    ),
    security(("admin_key" = [])),
    tag = "Cancellations Admin"
))]
pub async fn list_cancellations_handler(
    State(state): State<Arc<CancellationState>>,
    Query(query): Query<CancellationListQuery>,
) -> Result<Json<CancellationListResponse>, PawtripsError> {
    Ok(Json(logic::list_requests(&state.repos, query).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/cancellations/{id}/approve",
    params(("id" = String, Path, description = "Request id")),
    request_body(content = DecisionRequest, description = "Optional; the body may be omitted"),
    responses(
        (status = 200, description = "Approved", body = DecisionResponse),
        (status = 404, description = "Unknown request"),
        (status = 409, description = "Already decided")
    ),
    security(("admin_key" = [])),
    tag = "Cancellations Admin"
))]
pub async fn approve_by_id_handler(
    State(state): State<Arc<CancellationState>>,
    Path(id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<DecisionResponse>, PawtripsError> {
    let Json(body) = body.unwrap_or_default();
    let response = logic::decide_by_id(
        &state.config,
        &state.repos,
        state.services.as_ref(),
        &id,
        CancellationStatus::Approved,
        body.note,
    )
    .await?;
    Ok(Json(response))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/cancellations/{id}/reject",
    params(("id" = String, Path, description = "Request id")),
    request_body(content = DecisionRequest, description = "Optional; the body may be omitted"),
    responses(
        (status = 200, description = "Rejected", body = DecisionResponse),
        (status = 404, description = "Unknown request"),
        (status = 409, description = "Already decided")
    ),
    security(("admin_key" = [])),
    tag = "Cancellations Admin"
))]
pub async fn reject_by_id_handler(
    State(state): State<Arc<CancellationState>>,
    Path(id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<DecisionResponse>, PawtripsError> {
    let Json(body) = body.unwrap_or_default();
    let response = logic::decide_by_id(
        &state.config,
        &state.repos,
        state.services.as_ref(),
        &id,
        CancellationStatus::Rejected,
        body.note,
    )
    .await?;
    Ok(Json(response))
}

/// Cancels a booking on the provider's initiative: files a request and approves it.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/bookings/{id}/cancellation",
    params(("id" = String, Path, description = "Booking id")),
    request_body(content = AdminCancellationRequest, description = "Optional; the body may be omitted"),
    responses(
        (status = 200, description = "Booking cancelled", body = DecisionResponse),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Already cancelled or a request is pending")
    ),
    security(("admin_key" = [])),
    tag = "Cancellations Admin"
))]
pub async fn admin_cancel_handler(
    State(state): State<Arc<CancellationState>>,
    Path(id): Path<String>,
    body: Option<Json<AdminCancellationRequest>>,
) -> Result<Json<DecisionResponse>, PawtripsError> {
    let Json(body) = body.unwrap_or_default();
    let response = logic::admin_cancel(
        &state.config,
        &state.repos,
        state.services.as_ref(),
        &id,
        body,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}
