// --- File: crates/services/pawtrips_backend/src/app.rs ---
use axum::Router;
use pawtrips_common::services::ServiceFactory;
use pawtrips_config::AppConfig;
use pawtrips_db::Repositories;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// The complete HTTP surface: every feature router under `/api`.
pub fn build_router(config: Arc<AppConfig>, repos: Repositories, services: Arc<dyn ServiceFactory>) -> Router {
    let api_router = Router::new()
        .merge(pawtrips_common::routes())
        .merge(pawtrips_bookings::routes(config.clone(), repos.clone(), services.clone()))
        .merge(pawtrips_cancellation::routes(config.clone(), repos.clone(), services.clone()))
        .merge(pawtrips_stripe::routes(config.clone()))
        .merge(pawtrips_fulfillment::routes(config, repos, services));

    #[allow(unused_mut)] // only mutated with the openapi feature
    let mut app = Router::new().nest("/api", api_router);

    #[cfg(feature = "openapi")]
    {
        app = app.merge(swagger_ui());
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(TraceLayer::new_for_http()).layer(cors)
}

#[cfg(feature = "openapi")]
fn swagger_ui() -> utoipa_swagger_ui::SwaggerUi {
    use pawtrips_bookings::doc::BookingsApiDoc;
    use pawtrips_cancellation::doc::CancellationApiDoc;
    use pawtrips_fulfillment::doc::FulfillmentApiDoc;
    use pawtrips_stripe::doc::StripeApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    #[derive(OpenApi)]
    #[openapi(
        info(
            title = "PawTrips API",
            version = "0.1.0",
            description = "Bookings, cancellations and payments for dog-friendly experiences, classes and trips"
        ),
        tags((name = "PawTrips", description = "Core service endpoints")),
        servers((url = "/api", description = "Main API Prefix"))
    )]
    struct ApiDoc;

    let mut openapi_doc = ApiDoc::openapi();
    openapi_doc.merge(BookingsApiDoc::openapi());
    openapi_doc.merge(CancellationApiDoc::openapi());
    openapi_doc.merge(StripeApiDoc::openapi());
    openapi_doc.merge(FulfillmentApiDoc::openapi());
    tracing::info!("Adding Swagger UI at /api/docs");

    SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc)
}
