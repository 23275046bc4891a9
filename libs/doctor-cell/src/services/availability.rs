use chrono::{Duration, NaiveDate, NaiveTime};
use reqwest::Method;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use clinic_cell::models::{ClinicHoliday, ClinicSettings};
use clinic_cell::services::calendar::{ClinicCalendarService, weekday_number};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AvailabilityReason, BookedSlot, DoctorError, DoctorStatus, DoctorWeeklySchedule,
    SlotCandidate, SlotDay,
};

/// A half-open working window within one day.
type TimeWindow = (NaiveTime, NaiveTime);

pub struct AvailabilityService {
    supabase: SupabaseClient,
    calendar: ClinicCalendarService,
    default_open_when_unscheduled: bool,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            calendar: ClinicCalendarService::new(config),
            default_open_when_unscheduled: config.default_open_when_unscheduled,
        }
    }

    /// Resolve the bookable start times for a doctor on a date.
    ///
    /// Ordering of the gates matters: the clinic-open check runs first and is
    /// the only one an emergency may bypass; doctor leave is checked second
    /// and is final. The remaining steps intersect the weekly pattern with
    /// clinic hours, carve out exclusions, generate fixed-duration slots and
    /// drop the ones already taken.
    #[instrument(skip(self, auth_token))]
    pub async fn compute_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        allow_emergency_override: bool,
        auth_token: Option<&str>,
    ) -> Result<SlotDay, DoctorError> {
        let settings = self.calendar.get_settings(auth_token).await
            .map_err(|e| DoctorError::Database(e.to_string()))?;
        let holidays = self.calendar.list_holidays(auth_token).await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if !ClinicCalendarService::is_open_on(date, &settings, &holidays)
            && !allow_emergency_override
        {
            debug!("Clinic closed on {}, no slots for doctor {}", date, doctor_id);
            return Ok(SlotDay {
                doctor_id,
                date,
                reason: AvailabilityReason::ClinicClosed,
                slots: Vec::new(),
            });
        }

        if self.is_doctor_on_leave(doctor_id, date, auth_token).await? {
            debug!("Doctor {} on leave on {}", doctor_id, date);
            return Ok(SlotDay {
                doctor_id,
                date,
                reason: AvailabilityReason::DoctorOnLeave,
                slots: Vec::new(),
            });
        }

        let schedule_entries = self
            .get_weekly_entries(doctor_id, weekday_number(date), auth_token)
            .await?;

        let clinic_hours = (settings.opening_time, settings.closing_time);
        let windows = resolve_windows(
            &schedule_entries,
            clinic_hours,
            self.default_open_when_unscheduled,
        );

        let candidates = generate_slots(&windows, settings.slot_duration_minutes);
        if candidates.is_empty() {
            return Ok(SlotDay {
                doctor_id,
                date,
                reason: AvailabilityReason::Ok,
                slots: Vec::new(),
            });
        }

        let booked = self.get_booked_slots(doctor_id, date, auth_token).await?;
        let open_slots = remove_booked_slots(candidates, &booked);

        let reason = if open_slots.is_empty() {
            AvailabilityReason::FullyBooked
        } else {
            AvailabilityReason::Ok
        };

        debug!(
            "Resolved {} open slots for doctor {} on {} ({:?})",
            open_slots.len(), doctor_id, date, reason
        );

        Ok(SlotDay {
            doctor_id,
            date,
            reason,
            slots: open_slots,
        })
    }

    /// Leave is a hard block from two sources: an explicit leave row for the
    /// date, or a live ON_LEAVE status whose range covers it.
    async fn is_doctor_on_leave(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<bool, DoctorError> {
        let leave_path = format!(
            "/rest/v1/doctor_leaves?doctor_id=eq.{}&leave_date=eq.{}&select=id",
            doctor_id, date
        );
        let leaves: Vec<serde_json::Value> = self.supabase
            .request(Method::GET, &leave_path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        if !leaves.is_empty() {
            return Ok(true);
        }

        let status_path = format!(
            "/rest/v1/doctor_statuses?doctor_id=eq.{}&select=*",
            doctor_id
        );
        let statuses: Vec<DoctorStatus> = self.supabase
            .request(Method::GET, &status_path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(statuses.first().map_or(false, |status| status.on_leave_for(date)))
    }

    async fn get_weekly_entries(
        &self,
        doctor_id: Uuid,
        weekday: i32,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorWeeklySchedule>, DoctorError> {
        // Exclusion rows matter too, so no is_available filter here
        let path = format!(
            "/rest/v1/doctor_weekly_schedules?doctor_id=eq.{}&weekday=eq.{}&order=start_time.asc",
            doctor_id, weekday
        );

        let entries: Vec<DoctorWeeklySchedule> = self.supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(entries)
    }

    async fn get_booked_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<BookedSlot>, DoctorError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=neq.cancelled&select=start_time,duration_minutes&order=start_time.asc",
            doctor_id, date
        );

        let booked: Vec<BookedSlot> = self.supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(booked)
    }
}

/// Turn the weekly pattern into concrete working windows for one day.
///
/// No declared entries means the doctor follows clinic hours when the
/// permissive default is enabled, and has no windows otherwise. Declared
/// `available` ranges are clipped to clinic hours; `unavailable` ranges are
/// carved out afterwards and win over any overlap.
pub fn resolve_windows(
    entries: &[DoctorWeeklySchedule],
    clinic_hours: TimeWindow,
    default_open_when_unscheduled: bool,
) -> Vec<TimeWindow> {
    if entries.is_empty() {
        if default_open_when_unscheduled {
            return vec![clinic_hours];
        }
        return Vec::new();
    }

    let mut windows: Vec<TimeWindow> = Vec::new();
    for entry in entries.iter().filter(|e| e.is_available) {
        if let Some(window) = clip_window((entry.start_time, entry.end_time), clinic_hours) {
            windows.push(window);
        } else {
            warn!(
                "Schedule entry {}..{} lies outside clinic hours, skipping",
                entry.start_time, entry.end_time
            );
        }
    }

    for entry in entries.iter().filter(|e| !e.is_available) {
        windows = subtract_window(windows, (entry.start_time, entry.end_time));
    }

    windows.sort_by_key(|w| w.0);
    windows
}

fn clip_window(window: TimeWindow, bounds: TimeWindow) -> Option<TimeWindow> {
    let start = window.0.max(bounds.0);
    let end = window.1.min(bounds.1);
    if start < end {
        Some((start, end))
    } else {
        None
    }
}

fn subtract_window(windows: Vec<TimeWindow>, exclusion: TimeWindow) -> Vec<TimeWindow> {
    let mut result = Vec::new();
    for (start, end) in windows {
        if exclusion.1 <= start || exclusion.0 >= end {
            result.push((start, end));
            continue;
        }
        if start < exclusion.0 {
            result.push((start, exclusion.0));
        }
        if exclusion.1 < end {
            result.push((exclusion.1, end));
        }
    }
    result
}

/// Candidate starts at fixed intervals, dropping any slot that would run
/// past its window end.
pub fn generate_slots(windows: &[TimeWindow], duration_minutes: i32) -> Vec<SlotCandidate> {
    if duration_minutes <= 0 {
        return Vec::new();
    }
    let step = Duration::minutes(duration_minutes as i64);

    let mut slots = Vec::new();
    for &(window_start, window_end) in windows {
        let mut current = window_start;
        loop {
            let slot_end = current + step;
            // NaiveTime addition wraps past midnight, detect it by ordering
            if slot_end <= current || slot_end > window_end {
                break;
            }
            slots.push(SlotCandidate {
                start_time: current,
                end_time: slot_end,
                duration_minutes,
            });
            current = slot_end;
        }
    }

    slots.sort_by_key(|s| s.start_time);
    slots.dedup_by_key(|s| s.start_time);
    slots
}

/// Drop candidates that overlap a committed appointment.
pub fn remove_booked_slots(candidates: Vec<SlotCandidate>, booked: &[BookedSlot]) -> Vec<SlotCandidate> {
    candidates
        .into_iter()
        .filter(|slot| {
            !booked.iter().any(|apt| {
                let apt_start = apt.start_time;
                let apt_end = apt.start_time + Duration::minutes(apt.duration_minutes as i64);
                slot.start_time < apt_end && slot.end_time > apt_start
            })
        })
        .collect()
}
