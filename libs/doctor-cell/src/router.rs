use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/{doctor_id}/slots", get(handlers::get_doctor_slots))
        .route("/{doctor_id}/schedule", get(handlers::get_doctor_schedule))
        .route("/{doctor_id}/status", get(handlers::get_doctor_status));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        // Weekly pattern management
        .route("/{doctor_id}/schedule", post(handlers::create_schedule_entry))
        .route("/{doctor_id}/schedule/{entry_id}", delete(handlers::delete_schedule_entry))

        // Leave management
        .route("/{doctor_id}/leave", get(handlers::list_doctor_leaves))
        .route("/{doctor_id}/leave", post(handlers::create_leave))
        .route("/{doctor_id}/leave/{leave_id}", delete(handlers::delete_leave))

        // Live status
        .route("/{doctor_id}/status", put(handlers::set_doctor_status))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
