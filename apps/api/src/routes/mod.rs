pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::careers::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/test", get(health::api_test_handler))
        // Career pipeline
        .route("/api/recommend", post(handlers::handle_recommend))
        .route("/api/skillgap", post(handlers::handle_skillgap))
        .route("/api/jobs", post(handlers::handle_jobs))
        .with_state(state)
}
