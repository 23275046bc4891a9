use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Priority tier for an appointment request. Ordering matters: variants are
/// declared lowest to highest so tiers compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Emergency,
}

impl Priority {
    pub fn is_emergency(&self) -> bool {
        matches!(self, Priority::Emergency)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of classifying a symptom description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub priority: Priority,
    pub rationale: String,
    /// True when the deterministic keyword heuristic produced this result
    /// instead of the remote classifier.
    pub is_fallback: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriorityCheckRequest {
    pub description: String,
}

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Validation error: {0}")]
    Validation(String),
}
