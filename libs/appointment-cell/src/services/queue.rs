use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use clinic_cell::services::calendar::ClinicCalendarService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentStatus, BookingError, QueueCounterRow, QueueStatusReport, WaitEstimate,
};

/// Per-doctor daily token counters and the derived queue views built on them.
pub struct QueueService {
    supabase: SupabaseClient,
    calendar: ClinicCalendarService,
}

impl QueueService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            calendar: ClinicCalendarService::new(config),
        }
    }

    /// Next token for (doctor, date), starting at 1. The database function
    /// upserts the counter row and returns the incremented value in one
    /// transaction, so concurrent bookings can never share a token.
    #[instrument(skip(self, auth_token))]
    pub async fn next_token(
        &self,
        doctor_id: Uuid,
        for_date: NaiveDate,
        auth_token: &str,
    ) -> Result<i32, BookingError> {
        self.supabase
            .rpc(
                "next_queue_token",
                Some(auth_token),
                json!({ "doctor_id": doctor_id, "for_date": for_date }),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }

    /// Live day view of one doctor's queue. Counts are derived from
    /// appointment statuses at read time; token history is never touched.
    #[instrument(skip(self, auth_token))]
    pub async fn query_status(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<QueueStatusReport, BookingError> {
        let appointments = self
            .list_day_appointments(doctor_id, date, auth_token)
            .await?;
        let counter = self.get_counter(doctor_id, date, auth_token).await?;

        let (waiting, in_progress, completed, cancelled) = bucket_counts(&appointments);

        Ok(QueueStatusReport {
            doctor_id,
            date,
            current_token_counter: counter.as_ref().map(|c| c.next_token).unwrap_or(0),
            last_called_token: counter.as_ref().map(|c| c.last_called_token).unwrap_or(0),
            waiting,
            in_progress,
            completed,
            cancelled,
        })
    }

    /// Estimated wait = patients ahead x the clinic's average consultation
    /// time. Ahead means a waiting appointment whose token sits between the
    /// last called token and this appointment's token.
    #[instrument(skip(self, appointment, auth_token))]
    pub async fn estimate_wait(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<WaitEstimate, BookingError> {
        let token = appointment.token_number.ok_or_else(|| {
            BookingError::Validation("Appointment has no queue token".to_string())
        })?;

        let counter = self
            .get_counter(appointment.doctor_id, appointment.appointment_date, auth_token)
            .await?;
        let last_called = counter.map(|c| c.last_called_token).unwrap_or(0);

        let appointments = self
            .list_day_appointments(appointment.doctor_id, appointment.appointment_date, auth_token)
            .await?;
        let patients_ahead = count_patients_ahead(&appointments, last_called, token);

        let settings = self
            .calendar
            .get_settings(Some(auth_token))
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        Ok(WaitEstimate {
            appointment_id: appointment.id,
            token_number: appointment.token_number,
            patients_ahead,
            estimated_wait_minutes: patients_ahead as i32 * settings.average_consultation_minutes,
        })
    }

    pub(crate) async fn get_counter(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Option<QueueCounterRow>, BookingError> {
        let path = format!(
            "/rest/v1/queue_statuses?doctor_id=eq.{}&counter_date=eq.{}&select=*",
            doctor_id, date
        );

        let rows: Vec<QueueCounterRow> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn list_day_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&select=*&order=token_number.asc",
            doctor_id, date
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }
}

fn bucket_counts(appointments: &[Appointment]) -> (usize, usize, usize, usize) {
    let mut waiting = 0;
    let mut in_progress = 0;
    let mut completed = 0;
    let mut cancelled = 0;

    for appointment in appointments {
        match appointment.status {
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed => waiting += 1,
            AppointmentStatus::InProgress => in_progress += 1,
            AppointmentStatus::Completed | AppointmentStatus::NoShow => completed += 1,
            AppointmentStatus::Cancelled => cancelled += 1,
        }
    }

    (waiting, in_progress, completed, cancelled)
}

fn count_patients_ahead(appointments: &[Appointment], last_called_token: i32, token: i32) -> usize {
    appointments
        .iter()
        .filter(|a| {
            matches!(
                a.status,
                AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
            )
        })
        .filter_map(|a| a.token_number)
        .filter(|t| *t > last_called_token && *t < token)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use triage_cell::models::Priority;

    fn appointment(status: AppointmentStatus, token: Option<i32>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration_minutes: 30,
            status,
            priority: Priority::Normal,
            is_emergency: false,
            token_number: token,
            reason: "Routine checkup".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn buckets_follow_appointment_status() {
        let day = vec![
            appointment(AppointmentStatus::Scheduled, Some(1)),
            appointment(AppointmentStatus::Confirmed, Some(2)),
            appointment(AppointmentStatus::InProgress, Some(3)),
            appointment(AppointmentStatus::Completed, Some(4)),
            appointment(AppointmentStatus::NoShow, Some(5)),
            appointment(AppointmentStatus::Cancelled, Some(6)),
        ];

        assert_eq!(bucket_counts(&day), (2, 1, 2, 1));
    }

    #[test]
    fn patients_ahead_counts_waiting_tokens_between_last_called_and_mine() {
        let day = vec![
            appointment(AppointmentStatus::Completed, Some(1)),
            appointment(AppointmentStatus::InProgress, Some(2)),
            appointment(AppointmentStatus::Confirmed, Some(3)),
            appointment(AppointmentStatus::Scheduled, Some(4)),
            appointment(AppointmentStatus::Confirmed, Some(5)),
        ];

        // Tokens 3 and 4 are waiting ahead of token 5; token 2 was already
        // called and token 1 is done
        assert_eq!(count_patients_ahead(&day, 2, 5), 2);
    }

    #[test]
    fn cancelled_appointments_never_count_toward_wait() {
        let day = vec![
            appointment(AppointmentStatus::Cancelled, Some(1)),
            appointment(AppointmentStatus::Confirmed, Some(2)),
        ];

        assert_eq!(count_patients_ahead(&day, 0, 3), 1);
    }

    #[test]
    fn first_in_line_waits_for_nobody() {
        let day = vec![
            appointment(AppointmentStatus::Confirmed, Some(1)),
            appointment(AppointmentStatus::Scheduled, Some(2)),
        ];

        assert_eq!(count_patients_ahead(&day, 0, 1), 0);
    }
}
