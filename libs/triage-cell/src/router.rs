use std::sync::Arc;

use axum::{Router, routing::post};

use shared_config::AppConfig;

use crate::handlers;

pub fn triage_routes(state: Arc<AppConfig>) -> Router {
    // Public on purpose: owners check urgency before they sign in to book
    Router::new()
        .route("/priority-check", post(handlers::priority_check))
        .with_state(state)
}
