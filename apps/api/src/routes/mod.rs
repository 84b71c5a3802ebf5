pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::draft::handlers::handle_draft_section;
use crate::outline::handlers::handle_generate_outline;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/outline", post(handle_generate_outline))
        .route("/api/v1/draft", post(handle_draft_section))
        .with_state(state)
}
