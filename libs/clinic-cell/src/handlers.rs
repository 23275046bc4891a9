use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{ClinicError, CreateHolidayRequest, UpdateClinicSettingsRequest};
use crate::services::calendar::ClinicCalendarService;

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_clinic_settings(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let calendar_service = ClinicCalendarService::new(&state);

    let settings = calendar_service.get_settings(None).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn list_holidays(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let calendar_service = ClinicCalendarService::new(&state);

    let holidays = calendar_service.list_holidays(None).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "holidays": holidays,
        "total": holidays.len()
    })))
}

// ==============================================================================
// PROTECTED ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_clinic_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateClinicSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_admin(&user)?;

    let calendar_service = ClinicCalendarService::new(&state);

    let settings = calendar_service.update_settings(request, token).await
        .map_err(|e| match e {
            ClinicError::Validation(msg) => AppError::ValidationError(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "settings": settings,
        "message": "Clinic settings updated"
    })))
}

#[axum::debug_handler]
pub async fn add_holiday(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateHolidayRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_admin(&user)?;

    let calendar_service = ClinicCalendarService::new(&state);

    let holiday = calendar_service.add_holiday(request, token).await
        .map_err(|e| match e {
            ClinicError::Validation(msg) => AppError::ValidationError(msg),
            ClinicError::DuplicateHoliday => {
                AppError::Conflict("A holiday already exists for that date".to_string())
            },
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "holiday": holiday,
        "message": "Holiday added"
    })))
}

#[axum::debug_handler]
pub async fn delete_holiday(
    State(state): State<Arc<AppConfig>>,
    Path(holiday_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_admin(&user)?;

    let calendar_service = ClinicCalendarService::new(&state);

    calendar_service.remove_holiday(holiday_id, token).await
        .map_err(|e| match e {
            ClinicError::HolidayNotFound(id) => {
                AppError::NotFound(format!("Holiday not found: {}", id))
            },
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Holiday removed"
    })))
}
