use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_staff;

use crate::models::{
    CreateLeaveRequest, CreateScheduleEntryRequest, DoctorError, UpdateDoctorStatusRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::schedule::DoctorScheduleService;

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub emergency: Option<bool>,
}

// A doctor may manage their own calendar; admins may manage anyone's.
fn require_self_or_admin(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    require_staff(user)?;
    if !user.is_admin() && user.id != doctor_id.to_string() {
        return Err(AppError::Auth(
            "Doctors can only manage their own calendar".to_string(),
        ));
    }
    Ok(())
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::Validation(msg) => AppError::ValidationError(msg),
        DoctorError::ScheduleNotFound(id) => {
            AppError::NotFound(format!("Schedule entry {} not found", id))
        }
        DoctorError::LeaveNotFound(id) => AppError::NotFound(format!("Leave {} not found", id)),
        DoctorError::DuplicateLeave => {
            AppError::Conflict("Doctor already has leave recorded for this date".to_string())
        }
        DoctorError::Database(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let day = availability_service
        .compute_slots(doctor_id, query.date, query.emergency.unwrap_or(false), None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": day.doctor_id,
        "date": day.date,
        "reason": day.reason,
        "count": day.slots.len(),
        "slots": day.slots
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = DoctorScheduleService::new(&state);

    let entries = schedule_service
        .list_schedule(doctor_id, None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "schedule": entries
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_status(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = DoctorScheduleService::new(&state);

    let status = schedule_service
        .get_status(doctor_id, None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "status": status
    })))
}

// ==============================================================================
// PROTECTED HANDLERS (AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_schedule_entry(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateScheduleEntryRequest>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id)?;

    let schedule_service = DoctorScheduleService::new(&state);

    let entry = schedule_service
        .create_schedule_entry(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "entry": entry,
        "message": "Schedule entry created"
    })))
}

#[axum::debug_handler]
pub async fn delete_schedule_entry(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((doctor_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id)?;

    let schedule_service = DoctorScheduleService::new(&state);

    schedule_service
        .delete_schedule_entry(doctor_id, entry_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule entry deleted"
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_leaves(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let schedule_service = DoctorScheduleService::new(&state);

    let leaves = schedule_service
        .list_leaves(doctor_id, Some(auth.token()))
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "leaves": leaves
    })))
}

#[axum::debug_handler]
pub async fn create_leave(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateLeaveRequest>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id)?;

    let schedule_service = DoctorScheduleService::new(&state);

    let leave = schedule_service
        .create_leave(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "leave": leave,
        "message": "Leave recorded"
    })))
}

#[axum::debug_handler]
pub async fn delete_leave(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((doctor_id, leave_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id)?;

    let schedule_service = DoctorScheduleService::new(&state);

    schedule_service
        .delete_leave(doctor_id, leave_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Leave removed"
    })))
}

#[axum::debug_handler]
pub async fn set_doctor_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id)?;

    let schedule_service = DoctorScheduleService::new(&state);

    let status = schedule_service
        .set_status(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "status": status,
        "message": "Doctor status updated"
    })))
}
