use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use clinic_cell::router::clinic_routes;
use doctor_cell::router::doctor_routes;
use emergency_cell::router::emergency_routes;
use shared_config::AppConfig;
use triage_cell::router::triage_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "PawCare Clinic API is running!" }))
        .nest("/clinic", clinic_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/triage", triage_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/emergency", emergency_routes(state.clone()))
}
