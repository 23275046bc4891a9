use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use triage_cell::models::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(&self, target: &AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, target) {
            (Scheduled, Confirmed) => true,
            (Confirmed, InProgress) => true,
            (InProgress, Completed) => true,
            (Scheduled, Cancelled) => true,
            (Confirmed, Cancelled) => true,
            (Scheduled, NoShow) => true,
            (Confirmed, NoShow) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub priority: Priority,
    pub is_emergency: bool,
    /// Per-doctor daily queue position, assigned at commit and never reused.
    pub token_number: Option<i32>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub reason: String,
    #[serde(default)]
    pub is_emergency: bool,
}

/// Persisted per-(doctor, date) counter row. `next_token` is advanced by a
/// database function at booking commit; `last_called_token` by call-next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueCounterRow {
    pub doctor_id: Uuid,
    pub counter_date: NaiveDate,
    pub next_token: i32,
    pub last_called_token: i32,
}

/// Computed day view of one doctor's queue. Counts are derived from live
/// appointment statuses, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusReport {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub current_token_counter: i32,
    pub last_called_token: i32,
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitEstimate {
    pub appointment_id: Uuid,
    pub token_number: Option<i32>,
    pub patients_ahead: usize,
    pub estimated_wait_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallNextRequest {
    pub doctor_id: Uuid,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Closed: {0}")]
    Closed(String),

    #[error("Booking conflict: {0}")]
    Conflict(String),

    #[error("Appointment {0} not found")]
    AppointmentNotFound(Uuid),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Database error: {0}")]
    Database(String),
}
