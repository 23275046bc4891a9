use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use triage_cell::models::Priority;

use crate::models::{CaseStatus, EmergencyCase, EmergencyError, Severity};

/// Where a case notification should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTarget {
    Doctor(Uuid),
    Broadcast,
}

/// Delivery seam for emergency alerts. Fire-and-forget: failures are the
/// sink's problem and never fail the case mutation that triggered them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, target: NotificationTarget, case_id: Uuid);
}

/// Default sink: writes the alert to the log stream.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, target: NotificationTarget, case_id: Uuid) {
        match target {
            NotificationTarget::Doctor(doctor_id) => {
                info!("Emergency alert for case {} routed to doctor {}", case_id, doctor_id)
            }
            NotificationTarget::Broadcast => {
                info!("Emergency alert for case {} broadcast to on-duty staff", case_id)
            }
        }
    }
}

pub struct EmergencyEscalationService {
    supabase: SupabaseClient,
    notifier: Arc<dyn NotificationSink>,
}

impl EmergencyEscalationService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_notifier(config, Arc::new(LogSink))
    }

    pub fn with_notifier(config: &AppConfig, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            notifier,
        }
    }

    /// Open a new case on today's clinic-wide emergency queue.
    ///
    /// The queue number comes from a day-scoped counter advanced inside the
    /// database, so concurrent escalations can never share a number. Severity
    /// falls back to the fixed priority mapping when the caller has no
    /// explicit grade.
    #[instrument(skip(self, description, auth_token))]
    pub async fn create(
        &self,
        appointment_id: Option<Uuid>,
        pet_id: Uuid,
        owner_id: Uuid,
        priority: Priority,
        severity_hint: Option<Severity>,
        description: &str,
        auth_token: &str,
    ) -> Result<EmergencyCase, EmergencyError> {
        let severity = severity_hint.unwrap_or_else(|| Severity::default_for(priority));
        let case_date = Utc::now().date_naive();
        let queue_number = self.next_queue_number(case_date, auth_token).await?;

        let case_data = json!({
            "appointment_id": appointment_id,
            "pet_id": pet_id,
            "owner_id": owner_id,
            "severity": severity,
            "description": description,
            "status": CaseStatus::Waiting,
            "queue_number": queue_number,
            "case_date": case_date,
            "reported_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<EmergencyCase> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/emergency_cases",
                Some(auth_token),
                Some(case_data),
                Some(headers),
            )
            .await
            .map_err(|e| EmergencyError::Database(e.to_string()))?;

        let case = result
            .into_iter()
            .next()
            .ok_or_else(|| EmergencyError::Database("Failed to create emergency case".to_string()))?;

        debug!(
            "Created emergency case {} with queue number {} ({})",
            case.id, case.queue_number, case.severity
        );
        self.notifier.notify(NotificationTarget::Broadcast, case.id).await;

        Ok(case)
    }

    /// Day-scoped monotonic counter shared across all doctors. Advanced by a
    /// database function so the increment is atomic.
    async fn next_queue_number(
        &self,
        case_date: NaiveDate,
        auth_token: &str,
    ) -> Result<i32, EmergencyError> {
        self.supabase
            .rpc(
                "next_emergency_queue_number",
                Some(auth_token),
                json!({ "case_date": case_date }),
            )
            .await
            .map_err(|e| EmergencyError::Database(e.to_string()))
    }

    pub async fn get_case(
        &self,
        case_id: Uuid,
        auth_token: &str,
    ) -> Result<EmergencyCase, EmergencyError> {
        let path = format!("/rest/v1/emergency_cases?id=eq.{}&select=*", case_id);

        let cases: Vec<EmergencyCase> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| EmergencyError::Database(e.to_string()))?;

        cases
            .into_iter()
            .next()
            .ok_or(EmergencyError::CaseNotFound(case_id))
    }

    /// The day's cases in queue order.
    pub async fn list_day_queue(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<EmergencyCase>, EmergencyError> {
        let path = format!(
            "/rest/v1/emergency_cases?case_date=eq.{}&order=queue_number.asc",
            date
        );

        let cases: Vec<EmergencyCase> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| EmergencyError::Database(e.to_string()))?;

        Ok(cases)
    }

    #[instrument(skip(self, auth_token))]
    pub async fn assign(
        &self,
        case_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<EmergencyCase, EmergencyError> {
        let updates = json!({
            "status": CaseStatus::Assigned,
            "assigned_doctor_id": doctor_id
        });
        let case = self
            .transition(case_id, CaseStatus::Assigned, updates, auth_token)
            .await?;

        self.notifier
            .notify(NotificationTarget::Doctor(doctor_id), case.id)
            .await;

        Ok(case)
    }

    pub async fn start_treatment(
        &self,
        case_id: Uuid,
        auth_token: &str,
    ) -> Result<EmergencyCase, EmergencyError> {
        let updates = json!({ "status": CaseStatus::InTreatment });
        self.transition(case_id, CaseStatus::InTreatment, updates, auth_token)
            .await
    }

    pub async fn resolve(
        &self,
        case_id: Uuid,
        auth_token: &str,
    ) -> Result<EmergencyCase, EmergencyError> {
        let updates = json!({
            "status": CaseStatus::Resolved,
            "resolved_at": Utc::now().to_rfc3339()
        });
        self.transition(case_id, CaseStatus::Resolved, updates, auth_token)
            .await
    }

    pub async fn cancel(
        &self,
        case_id: Uuid,
        auth_token: &str,
    ) -> Result<EmergencyCase, EmergencyError> {
        let updates = json!({ "status": CaseStatus::Cancelled });
        self.transition(case_id, CaseStatus::Cancelled, updates, auth_token)
            .await
    }

    /// Load, validate against the state machine, then persist the move.
    async fn transition(
        &self,
        case_id: Uuid,
        target: CaseStatus,
        updates: serde_json::Value,
        auth_token: &str,
    ) -> Result<EmergencyCase, EmergencyError> {
        let case = self.get_case(case_id, auth_token).await?;

        if !case.status.can_transition_to(&target) {
            return Err(EmergencyError::InvalidTransition {
                from: case.status,
                to: target,
            });
        }

        let path = format!("/rest/v1/emergency_cases?id=eq.{}", case_id);

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<EmergencyCase> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(updates),
                Some(headers),
            )
            .await
            .map_err(|e| EmergencyError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(EmergencyError::CaseNotFound(case_id))
    }
}
