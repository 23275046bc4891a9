use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_staff;
use triage_cell::models::Priority;

use crate::models::{AssignCaseRequest, EmergencyError, ReportEmergencyRequest};
use crate::services::escalation::EmergencyEscalationService;

#[derive(Debug, Deserialize)]
pub struct EmergencyQueueQuery {
    pub date: Option<NaiveDate>,
}

fn map_emergency_error(e: EmergencyError) -> AppError {
    match e {
        EmergencyError::Validation(msg) => AppError::ValidationError(msg),
        EmergencyError::CaseNotFound(id) => {
            AppError::NotFound(format!("Emergency case {} not found", id))
        }
        EmergencyError::InvalidTransition { from, to } => {
            AppError::Unprocessable(format!("Cannot move emergency case from {} to {}", from, to))
        }
        EmergencyError::Database(msg) => AppError::Database(msg),
    }
}

/// Walk-in emergency intake: opens a case on today's queue without any
/// appointment behind it.
#[axum::debug_handler]
pub async fn report_emergency(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ReportEmergencyRequest>,
) -> Result<Json<Value>, AppError> {
    // Owners report for their own pets; staff may report on behalf of anyone
    if !user.is_staff() && user.id != request.owner_id.to_string() {
        return Err(AppError::Auth(
            "You can only report emergencies for your own pets".to_string(),
        ));
    }

    if request.description.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Emergency description must not be empty".to_string(),
        ));
    }

    let escalation_service = EmergencyEscalationService::new(&state);

    let case = escalation_service
        .create(
            None,
            request.pet_id,
            request.owner_id,
            Priority::Emergency,
            request.severity,
            &request.description,
            auth.token(),
        )
        .await
        .map_err(map_emergency_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case,
        "message": "Emergency case created"
    })))
}

#[axum::debug_handler]
pub async fn get_emergency_queue(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<EmergencyQueueQuery>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let escalation_service = EmergencyEscalationService::new(&state);

    let cases = escalation_service
        .list_day_queue(date, auth.token())
        .await
        .map_err(map_emergency_error)?;

    Ok(Json(json!({
        "success": true,
        "date": date,
        "count": cases.len(),
        "cases": cases
    })))
}

#[axum::debug_handler]
pub async fn assign_case(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(case_id): Path<Uuid>,
    Json(request): Json<AssignCaseRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let escalation_service = EmergencyEscalationService::new(&state);

    let case = escalation_service
        .assign(case_id, request.doctor_id, auth.token())
        .await
        .map_err(map_emergency_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case,
        "message": "Case assigned"
    })))
}

#[axum::debug_handler]
pub async fn start_treatment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let escalation_service = EmergencyEscalationService::new(&state);

    let case = escalation_service
        .start_treatment(case_id, auth.token())
        .await
        .map_err(map_emergency_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case,
        "message": "Treatment started"
    })))
}

#[axum::debug_handler]
pub async fn resolve_case(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let escalation_service = EmergencyEscalationService::new(&state);

    let case = escalation_service
        .resolve(case_id, auth.token())
        .await
        .map_err(map_emergency_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case,
        "message": "Case resolved"
    })))
}

#[axum::debug_handler]
pub async fn cancel_case(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let escalation_service = EmergencyEscalationService::new(&state);

    // Owners may withdraw their own case; staff may cancel any
    if !user.is_staff() {
        let case = escalation_service
            .get_case(case_id, auth.token())
            .await
            .map_err(map_emergency_error)?;
        if user.id != case.owner_id.to_string() {
            return Err(AppError::Auth(
                "You can only cancel your own emergency cases".to_string(),
            ));
        }
    }

    let case = escalation_service
        .cancel(case_id, auth.token())
        .await
        .map_err(map_emergency_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case,
        "message": "Case cancelled"
    })))
}
