pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // HTML form
        .route("/", get(handlers::handle_index))
        .route("/evaluate", post(handlers::handle_evaluate_form))
        // JSON API
        .route("/api/v1/evaluations", post(handlers::handle_create_evaluation))
        .route("/api/v1/models", get(handlers::handle_list_models))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
