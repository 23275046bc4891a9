use chrono::{Datelike, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, error_status};

use crate::models::{
    ClinicError, ClinicHoliday, ClinicSettings, CreateHolidayRequest,
    UpdateClinicSettingsRequest,
};

/// Weekday number used across the scheduling tables: 0 = Sunday .. 6 = Saturday.
pub fn weekday_number(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

pub struct ClinicCalendarService {
    supabase: SupabaseClient,
}

impl ClinicCalendarService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch the singleton settings row, falling back to the standard
    /// values when nobody has saved one yet.
    pub async fn get_settings(&self, auth_token: Option<&str>) -> Result<ClinicSettings, ClinicError> {
        let result: Vec<ClinicSettings> = self.supabase
            .request(
                Method::GET,
                "/rest/v1/clinic_settings?id=eq.1&select=*",
                auth_token,
                None,
            )
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(settings) => Ok(settings),
            None => {
                warn!("No clinic settings row found, using standard values");
                Ok(ClinicSettings::standard())
            }
        }
    }

    pub async fn update_settings(
        &self,
        request: UpdateClinicSettingsRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings, ClinicError> {
        if let Some(duration) = request.slot_duration_minutes {
            if duration <= 0 {
                return Err(ClinicError::Validation("Slot duration must be positive".to_string()));
            }
        }
        if let (Some(open), Some(close)) = (request.opening_time, request.closing_time) {
            if open >= close {
                return Err(ClinicError::Validation("Opening time must be before closing time".to_string()));
            }
        }
        if let Some(weekdays) = &request.closed_weekdays {
            if weekdays.iter().any(|d| *d < 0 || *d > 6) {
                return Err(ClinicError::Validation("Weekdays must be between 0 (Sunday) and 6 (Saturday)".to_string()));
            }
        }

        let mut update_data = serde_json::Map::new();
        if let Some(open) = request.opening_time {
            update_data.insert("opening_time".to_string(), json!(open.format("%H:%M:%S").to_string()));
        }
        if let Some(close) = request.closing_time {
            update_data.insert("closing_time".to_string(), json!(close.format("%H:%M:%S").to_string()));
        }
        if let Some(duration) = request.slot_duration_minutes {
            update_data.insert("slot_duration_minutes".to_string(), json!(duration));
        }
        if let Some(weekdays) = request.closed_weekdays {
            update_data.insert("closed_weekdays".to_string(), json!(weekdays));
        }
        if let Some(avg) = request.average_consultation_minutes {
            update_data.insert("average_consultation_minutes".to_string(), json!(avg));
        }
        if let Some(enabled) = request.emergency_enabled {
            update_data.insert("emergency_enabled".to_string(), json!(enabled));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<ClinicSettings> = self.supabase
            .request_with_headers(
                Method::PATCH,
                "/rest/v1/clinic_settings?id=eq.1",
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        result.into_iter().next()
            .ok_or_else(|| ClinicError::Database("Failed to update clinic settings".to_string()))
    }

    pub async fn list_holidays(&self, auth_token: Option<&str>) -> Result<Vec<ClinicHoliday>, ClinicError> {
        let holidays: Vec<ClinicHoliday> = self.supabase
            .request(
                Method::GET,
                "/rest/v1/clinic_holidays?select=*&order=holiday_date.asc",
                auth_token,
                None,
            )
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(holidays)
    }

    pub async fn add_holiday(
        &self,
        request: CreateHolidayRequest,
        auth_token: &str,
    ) -> Result<ClinicHoliday, ClinicError> {
        if request.label.trim().is_empty() {
            return Err(ClinicError::Validation("Holiday label must not be empty".to_string()));
        }

        let holiday_data = json!({
            "holiday_date": request.holiday_date,
            "label": request.label.trim(),
            "recurs_annually": request.recurs_annually.unwrap_or(false),
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        // holiday_date carries a unique index, a second insert for the same
        // date comes back as 409
        let result: Vec<ClinicHoliday> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/clinic_holidays",
                Some(auth_token),
                Some(holiday_data),
                Some(headers),
            )
            .await
            .map_err(|e| {
                if error_status(&e) == Some(409) {
                    ClinicError::DuplicateHoliday
                } else {
                    ClinicError::Database(e.to_string())
                }
            })?;

        let holiday = result.into_iter().next()
            .ok_or_else(|| ClinicError::Database("Failed to create holiday".to_string()))?;

        debug!("Holiday created: {} on {}", holiday.label, holiday.holiday_date);
        Ok(holiday)
    }

    pub async fn remove_holiday(&self, holiday_id: Uuid, auth_token: &str) -> Result<(), ClinicError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase
            .request_with_headers(
                Method::DELETE,
                &format!("/rest/v1/clinic_holidays?id=eq.{}", holiday_id),
                Some(auth_token),
                None,
                Some(headers),
            )
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(ClinicError::HolidayNotFound(holiday_id));
        }

        Ok(())
    }

    /// The clinic-open gate used by availability resolution: closed weekdays
    /// and holidays (including annually recurring ones) both close the day.
    pub fn is_open_on(date: NaiveDate, settings: &ClinicSettings, holidays: &[ClinicHoliday]) -> bool {
        if settings.is_closed_weekday(weekday_number(date)) {
            return false;
        }
        !holidays.iter().any(|h| h.applies_to(date))
    }
}
