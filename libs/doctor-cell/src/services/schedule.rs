use chrono::Utc;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, error_status};

use crate::models::{
    CreateLeaveRequest, CreateScheduleEntryRequest, DoctorError, DoctorLeave, DoctorState,
    DoctorStatus, DoctorWeeklySchedule, UpdateDoctorStatusRequest,
};

pub struct DoctorScheduleService {
    supabase: SupabaseClient,
}

impl DoctorScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Weekly pattern rows for a doctor, ordered for display.
    pub async fn list_schedule(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorWeeklySchedule>, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_weekly_schedules?doctor_id=eq.{}&order=weekday.asc,start_time.asc",
            doctor_id
        );

        let entries: Vec<DoctorWeeklySchedule> = self.supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(entries)
    }

    /// Add one weekly range. Overlapping rows are legal on purpose: split
    /// shifts and exclusion carve-outs both rely on it.
    #[instrument(skip(self, auth_token))]
    pub async fn create_schedule_entry(
        &self,
        doctor_id: Uuid,
        request: CreateScheduleEntryRequest,
        auth_token: &str,
    ) -> Result<DoctorWeeklySchedule, DoctorError> {
        if !(0..=6).contains(&request.weekday) {
            return Err(DoctorError::Validation(
                "Weekday must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if request.start_time >= request.end_time {
            return Err(DoctorError::Validation(
                "Start time must be before end time".to_string(),
            ));
        }

        let entry_data = json!({
            "doctor_id": doctor_id,
            "weekday": request.weekday,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "is_available": request.is_available,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<DoctorWeeklySchedule> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_weekly_schedules",
                Some(auth_token),
                Some(entry_data),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Failed to create schedule entry".to_string()))
    }

    #[instrument(skip(self, auth_token))]
    pub async fn delete_schedule_entry(
        &self,
        doctor_id: Uuid,
        entry_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let path = format!(
            "/rest/v1/doctor_weekly_schedules?id=eq.{}&doctor_id=eq.{}",
            entry_id, doctor_id
        );

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let deleted: Vec<DoctorWeeklySchedule> = self.supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if deleted.is_empty() {
            return Err(DoctorError::ScheduleNotFound(entry_id));
        }

        debug!("Deleted schedule entry {} for doctor {}", entry_id, doctor_id);
        Ok(())
    }

    pub async fn list_leaves(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorLeave>, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_leaves?doctor_id=eq.{}&order=leave_date.asc",
            doctor_id
        );

        let leaves: Vec<DoctorLeave> = self.supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(leaves)
    }

    /// One leave row per doctor per date, enforced by a unique index.
    #[instrument(skip(self, auth_token))]
    pub async fn create_leave(
        &self,
        doctor_id: Uuid,
        request: CreateLeaveRequest,
        auth_token: &str,
    ) -> Result<DoctorLeave, DoctorError> {
        let leave_data = json!({
            "doctor_id": doctor_id,
            "leave_date": request.leave_date,
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<DoctorLeave> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_leaves",
                Some(auth_token),
                Some(leave_data),
                Some(headers),
            )
            .await
            .map_err(|e| {
                if error_status(&e) == Some(409) {
                    DoctorError::DuplicateLeave
                } else {
                    DoctorError::Database(e.to_string())
                }
            })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Failed to create leave".to_string()))
    }

    #[instrument(skip(self, auth_token))]
    pub async fn delete_leave(
        &self,
        doctor_id: Uuid,
        leave_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let path = format!(
            "/rest/v1/doctor_leaves?id=eq.{}&doctor_id=eq.{}",
            leave_id, doctor_id
        );

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let deleted: Vec<DoctorLeave> = self.supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if deleted.is_empty() {
            return Err(DoctorError::LeaveNotFound(leave_id));
        }

        debug!("Deleted leave {} for doctor {}", leave_id, doctor_id);
        Ok(())
    }

    /// Live status for a doctor; doctors without a row read as available.
    pub async fn get_status(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<DoctorStatus, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_statuses?doctor_id=eq.{}&select=*",
            doctor_id
        );

        let statuses: Vec<DoctorStatus> = self.supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(statuses.into_iter().next().unwrap_or_else(|| DoctorStatus {
            doctor_id,
            status: DoctorState::Available,
            leave_start: None,
            leave_end: None,
            updated_at: Utc::now(),
        }))
    }

    /// Upsert on doctor_id so setting status never races with row creation.
    #[instrument(skip(self, auth_token))]
    pub async fn set_status(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorStatusRequest,
        auth_token: &str,
    ) -> Result<DoctorStatus, DoctorError> {
        if request.status == DoctorState::OnLeave {
            if let (Some(start), Some(end)) = (request.leave_start, request.leave_end) {
                if end < start {
                    return Err(DoctorError::Validation(
                        "Leave end date must not precede its start date".to_string(),
                    ));
                }
            }
        } else if request.leave_start.is_some() || request.leave_end.is_some() {
            return Err(DoctorError::Validation(
                "Leave dates are only valid with an on_leave status".to_string(),
            ));
        }

        let status_data = json!({
            "doctor_id": doctor_id,
            "status": request.status,
            "leave_start": request.leave_start,
            "leave_end": request.leave_end,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let result: Vec<DoctorStatus> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_statuses?on_conflict=doctor_id",
                Some(auth_token),
                Some(status_data),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Failed to update doctor status".to_string()))
    }
}
