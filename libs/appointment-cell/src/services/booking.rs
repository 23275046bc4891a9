use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use clinic_cell::services::calendar::ClinicCalendarService;
use doctor_cell::models::AvailabilityReason;
use doctor_cell::services::availability::AvailabilityService;
use emergency_cell::services::escalation::EmergencyEscalationService;
use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, error_status};
use triage_cell::models::Priority;
use triage_cell::services::triage::TriageService;

use crate::models::{Appointment, AppointmentStatus, BookAppointmentRequest, BookingError};
use crate::services::queue::QueueService;

/// Coordinates a booking end to end: triage, availability gates, and the
/// atomic slot commit with token assignment and emergency escalation.
pub struct BookingService {
    supabase: SupabaseClient,
    calendar: ClinicCalendarService,
    availability: AvailabilityService,
    triage: TriageService,
    queue: QueueService,
    escalation: EmergencyEscalationService,
    lock_timeout_seconds: i64,
    max_retry_attempts: u32,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            calendar: ClinicCalendarService::new(config),
            availability: AvailabilityService::new(config),
            triage: TriageService::new(config),
            queue: QueueService::new(config),
            escalation: EmergencyEscalationService::new(config),
            lock_timeout_seconds: 30,
            max_retry_attempts: 3,
        }
    }

    /// Book an appointment.
    ///
    /// Triage runs strictly before the slot lock is taken, so a slow remote
    /// classifier can never stall other bookings. Doctor leave is final; a
    /// closed clinic day is bypassed only by an EMERGENCY-tier request.
    #[instrument(skip(self, request, auth_token))]
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        self.validate_request(&request)?;

        let priority = if request.is_emergency {
            debug!("Explicit emergency flag set, skipping triage");
            Priority::Emergency
        } else {
            let assessment = self
                .triage
                .assess(&request.reason)
                .await
                .map_err(|e| BookingError::Validation(e.to_string()))?;
            debug!(
                "Triage resolved priority {} ({})",
                assessment.priority, assessment.rationale
            );
            assessment.priority
        };

        let day = self
            .availability
            .compute_slots(
                request.doctor_id,
                request.appointment_date,
                priority.is_emergency(),
                Some(auth_token),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        match day.reason {
            AvailabilityReason::DoctorOnLeave => {
                return Err(BookingError::Closed(format!(
                    "Doctor is on leave on {}",
                    request.appointment_date
                )));
            }
            AvailabilityReason::ClinicClosed => {
                return Err(BookingError::Closed(format!(
                    "Clinic is closed on {}",
                    request.appointment_date
                )));
            }
            AvailabilityReason::FullyBooked if !priority.is_emergency() => {
                return Err(BookingError::SlotUnavailable(format!(
                    "No open slots remain for {}",
                    request.appointment_date
                )));
            }
            _ => {}
        }

        if !priority.is_emergency() && !day.contains_start(request.start_time) {
            return Err(BookingError::SlotUnavailable(format!(
                "{} is not among the doctor's open slots on {}",
                request.start_time, request.appointment_date
            )));
        }

        let settings = self
            .calendar
            .get_settings(Some(auth_token))
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let lock_key = generate_lock_key(
            request.doctor_id,
            request.appointment_date,
            request.start_time,
        );

        for attempt in 1..=self.max_retry_attempts {
            debug!(
                "Atomic booking attempt {} for doctor {} at {} {}",
                attempt, request.doctor_id, request.appointment_date, request.start_time
            );

            match self
                .try_commit(
                    &lock_key,
                    &request,
                    priority,
                    settings.slot_duration_minutes,
                    auth_token,
                )
                .await
            {
                Ok(appointment) => {
                    info!(
                        "Booked appointment {} (token {:?}) for doctor {}",
                        appointment.id, appointment.token_number, appointment.doctor_id
                    );
                    return Ok(appointment);
                }
                Err(BookingError::Conflict(msg)) if attempt < self.max_retry_attempts => {
                    warn!(
                        "Booking conflict ({}), retrying attempt {}/{}",
                        msg, attempt, self.max_retry_attempts
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64))
                        .await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(BookingError::Conflict(
            "Slot was booked by a concurrent request".to_string(),
        ))
    }

    fn validate_request(&self, request: &BookAppointmentRequest) -> Result<(), BookingError> {
        if request.reason.trim().is_empty() {
            return Err(BookingError::Validation(
                "Reason for visit must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let today = now.date_naive();
        if request.appointment_date < today {
            return Err(BookingError::Validation(
                "Cannot book an appointment in the past".to_string(),
            ));
        }
        if request.appointment_date == today && request.start_time <= now.time() {
            return Err(BookingError::Validation(
                "Cannot book an appointment earlier today".to_string(),
            ));
        }

        Ok(())
    }

    /// One pass through the critical section: lock, re-check, token, insert,
    /// escalate. The lock is released on every exit path; if escalation
    /// fails the freshly inserted appointment is deleted first, so either
    /// both records persist or neither does.
    async fn try_commit(
        &self,
        lock_key: &str,
        request: &BookAppointmentRequest,
        priority: Priority,
        duration_minutes: i32,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let lock_acquired = self.acquire_booking_lock(lock_key, request.doctor_id).await?;
        if !lock_acquired {
            return Err(BookingError::Conflict(
                "Another booking for this slot is in progress".to_string(),
            ));
        }

        if self
            .slot_is_taken(
                request.doctor_id,
                request.appointment_date,
                request.start_time,
                auth_token,
            )
            .await?
        {
            self.release_booking_lock(lock_key).await?;
            return Err(BookingError::Conflict(
                "Slot is already booked".to_string(),
            ));
        }

        let token_number = match self
            .queue
            .next_token(request.doctor_id, request.appointment_date, auth_token)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                self.release_booking_lock(lock_key).await?;
                return Err(e);
            }
        };

        let appointment = match self
            .insert_appointment(request, priority, duration_minutes, token_number, auth_token)
            .await
        {
            Ok(appointment) => appointment,
            Err(e) => {
                self.release_booking_lock(lock_key).await?;
                return Err(e);
            }
        };

        if priority.is_emergency() {
            if let Err(e) = self
                .escalation
                .create(
                    Some(appointment.id),
                    request.pet_id,
                    request.owner_id,
                    priority,
                    None,
                    &request.reason,
                    auth_token,
                )
                .await
            {
                warn!(
                    "Emergency escalation failed for appointment {}, rolling back: {}",
                    appointment.id, e
                );
                self.delete_appointment(appointment.id, auth_token).await;
                self.release_booking_lock(lock_key).await?;
                return Err(BookingError::Database(format!(
                    "Emergency escalation failed, booking rolled back: {}",
                    e
                )));
            }
        }

        self.release_booking_lock(lock_key).await?;
        Ok(appointment)
    }

    async fn slot_is_taken(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        let time_str = time.format("%H:%M:%S").to_string();
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&start_time=eq.{}&status=neq.cancelled&select=id",
            doctor_id,
            date,
            urlencoding::encode(&time_str)
        );

        let existing: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        Ok(!existing.is_empty())
    }

    async fn insert_appointment(
        &self,
        request: &BookAppointmentRequest,
        priority: Priority,
        duration_minutes: i32,
        token_number: i32,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "pet_id": request.pet_id,
            "owner_id": request.owner_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.appointment_date,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "duration_minutes": duration_minutes,
            "status": AppointmentStatus::Scheduled,
            "priority": priority,
            "is_emergency": priority.is_emergency(),
            "token_number": token_number,
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Appointment> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| {
                // The partial unique index on (doctor, date, time) backstops
                // the lock: a lost race surfaces as a conflict, not a 500
                if error_status(&e) == Some(409) {
                    BookingError::Conflict("Slot is already booked".to_string())
                } else {
                    BookingError::Database(e.to_string())
                }
            })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Database("Failed to create appointment".to_string()))
    }

    /// Compensation for a failed escalation. Follow-up errors are logged and
    /// swallowed: the caller is already on an error path.
    async fn delete_appointment(&self, appointment_id: Uuid, auth_token: &str) {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Result<Vec<Value>, _> = self.supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await;

        if let Err(e) = result {
            warn!(
                "Failed to delete appointment {} during rollback: {}",
                appointment_id, e
            );
        }
    }

    async fn acquire_booking_lock(
        &self,
        lock_key: &str,
        doctor_id: Uuid,
    ) -> Result<bool, BookingError> {
        if self.try_acquire_lock_once(lock_key, doctor_id).await? {
            debug!("Booking lock acquired: {}", lock_key);
            return Ok(true);
        }

        // Insert refused: a lock row exists. Clear it if stale, then make a
        // single follow-up attempt.
        let cleaned_up = self.check_and_cleanup_expired_lock(lock_key).await?;
        if cleaned_up {
            self.try_acquire_lock_once(lock_key, doctor_id).await
        } else {
            Ok(false)
        }
    }

    async fn try_acquire_lock_once(
        &self,
        lock_key: &str,
        doctor_id: Uuid,
    ) -> Result<bool, BookingError> {
        let lock_data = json!({
            "lock_key": lock_key,
            "doctor_id": doctor_id,
            "acquired_at": Utc::now().to_rfc3339(),
            "expires_at": (Utc::now() + Duration::seconds(self.lock_timeout_seconds)).to_rfc3339(),
            "process_id": format!("scheduler_{}", Uuid::new_v4())
        });

        match self.supabase
            .request::<Value>(
                Method::POST,
                "/rest/v1/booking_locks",
                None, // Internal locking needs no user token
                Some(lock_data),
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    async fn release_booking_lock(&self, lock_key: &str) -> Result<(), BookingError> {
        let _response: Value = self.supabase
            .request(
                Method::DELETE,
                &format!("/rest/v1/booking_locks?lock_key=eq.{}", lock_key),
                None,
                None,
            )
            .await
            .map_err(|e| BookingError::Database(format!("Lock release failed: {}", e)))?;

        debug!("Booking lock released: {}", lock_key);
        Ok(())
    }

    async fn check_and_cleanup_expired_lock(&self, lock_key: &str) -> Result<bool, BookingError> {
        let response: Value = self.supabase
            .request(
                Method::GET,
                &format!("/rest/v1/booking_locks?lock_key=eq.{}&select=*", lock_key),
                None,
                None,
            )
            .await
            .map_err(|e| BookingError::Database(format!("Lock check failed: {}", e)))?;

        if let Some(locks) = response.as_array() {
            if let Some(lock) = locks.first() {
                if let Some(expires_at_str) = lock.get("expires_at").and_then(|v| v.as_str()) {
                    if let Ok(expires_at) = chrono::DateTime::parse_from_rfc3339(expires_at_str) {
                        if expires_at.with_timezone(&Utc) < Utc::now() {
                            self.release_booking_lock(lock_key).await?;
                            return Ok(true);
                        }
                    }
                }
            }
        }

        Ok(false)
    }
}

fn generate_lock_key(doctor_id: Uuid, date: NaiveDate, time: NaiveTime) -> String {
    format!("slot_{}_{}_{}", doctor_id, date, time.format("%H:%M"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_pins_doctor_date_and_time() {
        let doctor = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let key = generate_lock_key(doctor, date, nine);
        assert_eq!(key, format!("slot_{}_2025-06-02_09:00", doctor));

        // Same slot yields the same key; adjacent slot yields a different one
        assert_eq!(key, generate_lock_key(doctor, date, nine));
        let nine_thirty = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_ne!(key, generate_lock_key(doctor, date, nine_thirty));
    }
}
