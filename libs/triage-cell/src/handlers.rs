use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{PriorityCheckRequest, TriageError};
use crate::services::triage::TriageService;

/// Read-only priority check: classifies symptom text without creating any
/// record, so owners can see the urgency tier before booking.
#[axum::debug_handler]
pub async fn priority_check(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<PriorityCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let triage_service = TriageService::new(&state);

    let assessment = triage_service
        .assess(&request.description)
        .await
        .map_err(|e| match e {
            TriageError::Validation(msg) => AppError::ValidationError(msg),
        })?;

    Ok(Json(json!({
        "success": true,
        "priority": assessment.priority,
        "is_emergency": assessment.priority.is_emergency(),
        "rationale": assessment.rationale,
        "is_fallback": assessment.is_fallback
    })))
}
