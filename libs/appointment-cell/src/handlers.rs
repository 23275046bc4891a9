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

use crate::models::{BookAppointmentRequest, BookingError, CallNextRequest};
use crate::services::booking::BookingService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::queue::QueueService;

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub doctor_id: Uuid,
    pub date: Option<NaiveDate>,
}

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::Validation(msg) => AppError::ValidationError(msg),
        BookingError::SlotUnavailable(msg) => AppError::Conflict(msg),
        BookingError::Closed(msg) => AppError::Unprocessable(msg),
        BookingError::Conflict(msg) => AppError::Conflict(msg),
        BookingError::AppointmentNotFound(id) => {
            AppError::NotFound(format!("Appointment {} not found", id))
        }
        BookingError::InvalidTransition { from, to } => {
            AppError::Unprocessable(format!("Cannot move appointment from {} to {}", from, to))
        }
        BookingError::Database(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Owners book for their own pets; staff may book on behalf of anyone
    if !user.is_staff() && user.id != request.owner_id.to_string() {
        return Err(AppError::Auth(
            "You can only book appointments for your own pets".to_string(),
        ));
    }

    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .book(request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked"
    })))
}

// ==============================================================================
// QUEUE
// ==============================================================================

#[axum::debug_handler]
pub async fn get_queue_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Value>, AppError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let queue_service = QueueService::new(&state);

    let report = queue_service
        .query_status(query.doctor_id, date, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "queue": report
    })))
}

#[axum::debug_handler]
pub async fn get_wait_estimate(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let appointment = lifecycle_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    if !user.is_staff() && user.id != appointment.owner_id.to_string() {
        return Err(AppError::Auth(
            "You can only check the wait for your own appointments".to_string(),
        ));
    }

    let queue_service = QueueService::new(&state);

    let estimate = queue_service
        .estimate_wait(&appointment, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "estimate": estimate
    })))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn check_in_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let appointment = lifecycle_service
        .check_in(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Patient checked in"
    })))
}

#[axum::debug_handler]
pub async fn call_next_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CallNextRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let called = lifecycle_service
        .call_next(request.doctor_id, date, auth.token())
        .await
        .map_err(map_booking_error)?;

    match called {
        Some(appointment) => Ok(Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Next patient called"
        }))),
        None => Ok(Json(json!({
            "success": true,
            "appointment": null,
            "message": "No patients waiting"
        }))),
    }
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let appointment = lifecycle_service
        .complete(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let lifecycle_service = AppointmentLifecycleService::new(&state);

    // Owners may cancel their own appointments; staff may cancel any
    if !user.is_staff() {
        let appointment = lifecycle_service
            .get_appointment(appointment_id, auth.token())
            .await
            .map_err(map_booking_error)?;
        if user.id != appointment.owner_id.to_string() {
            return Err(AppError::Auth(
                "You can only cancel your own appointments".to_string(),
            ));
        }
    }

    let appointment = lifecycle_service
        .cancel(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_staff(&user)?;

    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let appointment = lifecycle_service
        .mark_no_show(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment marked as no-show"
    })))
}
