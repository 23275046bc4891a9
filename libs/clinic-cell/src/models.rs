use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Clinic-wide scheduling configuration, stored as a single row.
/// Weekdays are numbered 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: i32,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub closed_weekdays: Vec<i32>,
    pub average_consultation_minutes: i32,
    pub emergency_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl ClinicSettings {
    /// Fallback values used until an administrator saves a settings row.
    pub fn standard() -> Self {
        Self {
            id: 1,
            opening_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            closing_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            slot_duration_minutes: 30,
            closed_weekdays: vec![0],
            average_consultation_minutes: 15,
            emergency_enabled: true,
            updated_at: Utc::now(),
        }
    }

    pub fn is_closed_weekday(&self, weekday: i32) -> bool {
        self.closed_weekdays.contains(&weekday)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicHoliday {
    pub id: Uuid,
    pub holiday_date: NaiveDate,
    pub label: String,
    pub recurs_annually: bool,
    pub created_at: DateTime<Utc>,
}

impl ClinicHoliday {
    /// Whether this holiday applies to `date`, honoring annual recurrence
    /// (same month and day in any later year).
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        if self.holiday_date == date {
            return true;
        }
        if self.recurs_annually {
            use chrono::Datelike;
            return self.holiday_date.month() == date.month()
                && self.holiday_date.day() == date.day()
                && date >= self.holiday_date;
        }
        false
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateClinicSettingsRequest {
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub slot_duration_minutes: Option<i32>,
    pub closed_weekdays: Option<Vec<i32>>,
    pub average_consultation_minutes: Option<i32>,
    pub emergency_enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHolidayRequest {
    pub holiday_date: NaiveDate,
    pub label: String,
    pub recurs_annually: Option<bool>,
}

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Holiday already exists for that date")]
    DuplicateHoliday,

    #[error("Holiday not found: {0}")]
    HolidayNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(String),
}
