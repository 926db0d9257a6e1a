use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version, model in use and catalog readiness.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let catalog = match &state.catalog {
        Some(catalog) => json!({
            "loaded": true,
            "skills": catalog.len(),
            "loaded_at": catalog.loaded_at(),
        }),
        None => json!({ "loaded": false }),
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "careerpath-api",
        "model": state.llm.model_name(),
        "catalog": catalog,
    }))
}

/// GET /api/test
/// Liveness probe kept for the existing front end.
pub async fn api_test_handler() -> Json<Value> {
    Json(json!({ "ok": true, "message": "Backend working" }))
}
