use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn emergency_routes(state: Arc<AppConfig>) -> Router {
    // Every emergency route requires authentication
    let protected_routes = Router::new()
        .route("/report", post(handlers::report_emergency))
        .route("/queue", get(handlers::get_emergency_queue))
        .route("/cases/{case_id}/assign", patch(handlers::assign_case))
        .route("/cases/{case_id}/start", patch(handlers::start_treatment))
        .route("/cases/{case_id}/resolve", patch(handlers::resolve_case))
        .route("/cases/{case_id}/cancel", patch(handlers::cancel_case))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
