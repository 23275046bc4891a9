use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/settings", get(handlers::get_clinic_settings))
        .route("/holidays", get(handlers::list_holidays));

    // Protected routes (admin role enforced in handlers)
    let protected_routes = Router::new()
        .route("/settings", put(handlers::update_clinic_settings))
        .route("/holidays", post(handlers::add_holiday))
        .route("/holidays/{holiday_id}", delete(handlers::delete_holiday))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
