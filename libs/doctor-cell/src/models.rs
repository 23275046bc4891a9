use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One recurring weekly working range. Weekday uses 0 = Sunday .. 6 =
/// Saturday. `is_available = false` rows are exclusions that carve time out
/// of otherwise-open ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorWeeklySchedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// A single-day hard block. Leave always wins over the weekly pattern and
/// is never bypassed, not even for emergencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorLeave {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub leave_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoctorState {
    Available,
    Busy,
    OnLeave,
    Offline,
}

impl std::fmt::Display for DoctorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoctorState::Available => write!(f, "available"),
            DoctorState::Busy => write!(f, "busy"),
            DoctorState::OnLeave => write!(f, "on_leave"),
            DoctorState::Offline => write!(f, "offline"),
        }
    }
}

/// Live doctor status. Informational except for ON_LEAVE, which blocks
/// booking for any date inside its range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorStatus {
    pub doctor_id: Uuid,
    pub status: DoctorState,
    pub leave_start: Option<NaiveDate>,
    pub leave_end: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorStatus {
    /// True when the doctor is marked ON_LEAVE for `date`. An open-ended
    /// range (no dates set) blocks every date while the status lasts.
    pub fn on_leave_for(&self, date: NaiveDate) -> bool {
        if self.status != DoctorState::OnLeave {
            return false;
        }
        let after_start = self.leave_start.map_or(true, |start| date >= start);
        let before_end = self.leave_end.map_or(true, |end| date <= end);
        after_start && before_end
    }
}

/// Day-level outcome of slot resolution, so an empty list still tells the
/// caller why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityReason {
    Ok,
    ClinicClosed,
    DoctorOnLeave,
    FullyBooked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDay {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub reason: AvailabilityReason,
    pub slots: Vec<SlotCandidate>,
}

impl SlotDay {
    pub fn contains_start(&self, time: NaiveTime) -> bool {
        self.slots.iter().any(|slot| slot.start_time == time)
    }
}

/// Appointment fields the resolver needs for booked-slot subtraction.
#[derive(Debug, Clone, Deserialize)]
pub struct BookedSlot {
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduleEntryRequest {
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLeaveRequest {
    pub leave_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoctorStatusRequest {
    pub status: DoctorState,
    pub leave_start: Option<NaiveDate>,
    pub leave_end: Option<NaiveDate>,
}

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Schedule entry not found: {0}")]
    ScheduleNotFound(Uuid),

    #[error("Leave entry not found: {0}")]
    LeaveNotFound(Uuid),

    #[error("Leave already exists for that date")]
    DuplicateLeave,

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_leave_covers_range() {
        let status = DoctorStatus {
            doctor_id: Uuid::new_v4(),
            status: DoctorState::OnLeave,
            leave_start: Some("2025-06-10".parse().unwrap()),
            leave_end: Some("2025-06-12".parse().unwrap()),
            updated_at: Utc::now(),
        };
        assert!(!status.on_leave_for("2025-06-09".parse().unwrap()));
        assert!(status.on_leave_for("2025-06-10".parse().unwrap()));
        assert!(status.on_leave_for("2025-06-12".parse().unwrap()));
        assert!(!status.on_leave_for("2025-06-13".parse().unwrap()));
    }

    #[test]
    fn open_ended_leave_blocks_everything() {
        let status = DoctorStatus {
            doctor_id: Uuid::new_v4(),
            status: DoctorState::OnLeave,
            leave_start: None,
            leave_end: None,
            updated_at: Utc::now(),
        };
        assert!(status.on_leave_for("2025-01-01".parse().unwrap()));
        assert!(status.on_leave_for("2030-12-31".parse().unwrap()));
    }

    #[test]
    fn available_status_never_reads_as_leave() {
        let status = DoctorStatus {
            doctor_id: Uuid::new_v4(),
            status: DoctorState::Busy,
            leave_start: Some("2025-06-10".parse().unwrap()),
            leave_end: Some("2025-06-12".parse().unwrap()),
            updated_at: Utc::now(),
        };
        assert!(!status.on_leave_for("2025-06-11".parse().unwrap()));
    }
}
