use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Routes shared by every deployment (currently only the health probe).
pub fn routes() -> Router {
    Router::new().route("/health", get(health))
}
