use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use triage_cell::models::Priority;

/// Clinical urgency grade of an emergency case, distinct from the booking
/// priority tier that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl Severity {
    /// Fixed priority→severity mapping used when no explicit grade is given.
    pub fn default_for(priority: Priority) -> Self {
        match priority {
            Priority::Emergency => Severity::Severe,
            Priority::High => Severity::Moderate,
            Priority::Normal | Priority::Low => Severity::Mild,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Critical => "critical",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Waiting,
    Assigned,
    InTreatment,
    Resolved,
    Cancelled,
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Resolved | CaseStatus::Cancelled)
    }

    pub fn can_transition_to(&self, target: &CaseStatus) -> bool {
        use CaseStatus::*;
        match (self, target) {
            (Waiting, Assigned) => true,
            (Assigned, InTreatment) => true,
            (InTreatment, Resolved) => true,
            (Waiting, Cancelled) => true,
            (Assigned, Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CaseStatus::Waiting => "waiting",
            CaseStatus::Assigned => "assigned",
            CaseStatus::InTreatment => "in_treatment",
            CaseStatus::Resolved => "resolved",
            CaseStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyCase {
    pub id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    pub severity: Severity,
    pub description: String,
    pub assigned_doctor_id: Option<Uuid>,
    pub status: CaseStatus,
    pub queue_number: i32,
    pub case_date: NaiveDate,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportEmergencyRequest {
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    pub description: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignCaseRequest {
    pub doctor_id: Uuid,
}

#[derive(Debug, Error)]
pub enum EmergencyError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Emergency case {0} not found")]
    CaseNotFound(Uuid),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },

    #[error("Database error: {0}")]
    Database(String),
}
