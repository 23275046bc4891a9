use chrono::{NaiveDate, Utc};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use doctor_cell::models::{DoctorState, UpdateDoctorStatusRequest};
use doctor_cell::services::schedule::DoctorScheduleService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentStatus, BookingError};
use crate::services::queue::QueueService;

/// Clinical-workflow transitions on committed appointments. Every move is
/// checked against the status transition table before anything is written.
pub struct AppointmentLifecycleService {
    supabase: SupabaseClient,
    queue: QueueService,
    doctor_status: DoctorScheduleService,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            queue: QueueService::new(config),
            doctor_status: DoctorScheduleService::new(config),
        }
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=*", appointment_id);

        let rows: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(BookingError::AppointmentNotFound(appointment_id))
    }

    /// Front-desk arrival: SCHEDULED -> CONFIRMED.
    #[instrument(skip(self, auth_token))]
    pub async fn check_in(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        self.transition(&appointment, AppointmentStatus::Confirmed, auth_token)
            .await
    }

    /// Call the next patient for a doctor: the CONFIRMED appointment with the
    /// smallest token above `last_called_token` moves to IN_PROGRESS, the
    /// counter advances past any cancelled tokens in between, and the doctor
    /// flips to BUSY. Returns `None` when nobody is waiting.
    #[instrument(skip(self, auth_token))]
    pub async fn call_next(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Option<Appointment>, BookingError> {
        let last_called = self
            .queue
            .get_counter(doctor_id, date, auth_token)
            .await?
            .map(|c| c.last_called_token)
            .unwrap_or(0);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=eq.confirmed&token_number=gt.{}&order=token_number.asc&limit=1&select=*",
            doctor_id, date, last_called
        );

        let candidates: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let Some(next) = candidates.into_iter().next() else {
            debug!("No confirmed patients waiting for doctor {} on {}", doctor_id, date);
            return Ok(None);
        };

        let called = self
            .transition(&next, AppointmentStatus::InProgress, auth_token)
            .await?;

        if let Some(token) = called.token_number {
            self.advance_last_called(doctor_id, date, token, auth_token)
                .await?;
        }

        self.doctor_status
            .set_status(
                doctor_id,
                UpdateDoctorStatusRequest {
                    status: DoctorState::Busy,
                    leave_start: None,
                    leave_end: None,
                },
                auth_token,
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        info!(
            "Called token {:?} for doctor {} on {}",
            called.token_number, doctor_id, date
        );
        Ok(Some(called))
    }

    /// Consultation done: IN_PROGRESS -> COMPLETED. The doctor goes back to
    /// AVAILABLE once no other consultation of theirs is still running.
    #[instrument(skip(self, auth_token))]
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        let completed = self
            .transition(&appointment, AppointmentStatus::Completed, auth_token)
            .await?;

        let still_running = self
            .count_in_progress(completed.doctor_id, completed.appointment_date, auth_token)
            .await?;
        if still_running == 0 {
            self.doctor_status
                .set_status(
                    completed.doctor_id,
                    UpdateDoctorStatusRequest {
                        status: DoctorState::Available,
                        leave_start: None,
                        leave_end: None,
                    },
                    auth_token,
                )
                .await
                .map_err(|e| BookingError::Database(e.to_string()))?;
        }

        Ok(completed)
    }

    /// Soft cancel: the row stays and the token stays burned, so the day's
    /// sequence is never renumbered.
    #[instrument(skip(self, auth_token))]
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        self.transition(&appointment, AppointmentStatus::Cancelled, auth_token)
            .await
    }

    #[instrument(skip(self, auth_token))]
    pub async fn mark_no_show(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        self.transition(&appointment, AppointmentStatus::NoShow, auth_token)
            .await
    }

    async fn transition(
        &self,
        appointment: &Appointment,
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        if !appointment.status.can_transition_to(&target) {
            return Err(BookingError::InvalidTransition {
                from: appointment.status,
                to: target,
            });
        }

        let update = json!({
            "status": target,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Appointment> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &format!("/rest/v1/appointments?id=eq.{}", appointment.id),
                Some(auth_token),
                Some(update),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(BookingError::AppointmentNotFound(appointment.id))
    }

    async fn advance_last_called(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        token: i32,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        let counter_data = json!({
            "doctor_id": doctor_id,
            "counter_date": date,
            "last_called_token": token
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        // merge-duplicates only touches the columns sent, so next_token keeps
        // its issued value
        let _rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/queue_statuses?on_conflict=doctor_id,counter_date",
                Some(auth_token),
                Some(counter_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        Ok(())
    }

    async fn count_in_progress(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<usize, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=eq.in_progress&select=id",
            doctor_id, date
        );

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        Ok(rows.len())
    }
}
