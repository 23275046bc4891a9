use std::time::Duration;

use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{TriageAssessment, TriageError};
use crate::services::classifier::{RemoteClassifier, SymptomClassifier};
use crate::services::keywords::KeywordClassifier;

/// Front door for symptom triage. Tries the remote classifier under a strict
/// timeout and absorbs every remote failure into the keyword heuristic, so
/// callers always get an assessment for non-empty input.
pub struct TriageService {
    remote: Option<RemoteClassifier>,
    fallback: KeywordClassifier,
    timeout: Duration,
}

impl TriageService {
    pub fn new(config: &AppConfig) -> Self {
        let remote = if config.is_triage_configured() {
            Some(RemoteClassifier::new(config))
        } else {
            None
        };

        Self {
            remote,
            fallback: KeywordClassifier::new(),
            timeout: Duration::from_millis(config.triage_timeout_ms),
        }
    }

    pub async fn assess(&self, description: &str) -> Result<TriageAssessment, TriageError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TriageError::Validation(
                "Symptom description must not be empty".to_string(),
            ));
        }

        if let Some(remote) = &self.remote {
            match tokio::time::timeout(self.timeout, remote.classify(description)).await {
                Ok(Ok(assessment)) => {
                    debug!("Remote classifier returned {}", assessment.priority);
                    return Ok(assessment);
                }
                Ok(Err(e)) => {
                    warn!("Remote classifier failed, using keyword fallback: {}", e);
                }
                Err(_) => {
                    warn!(
                        "Remote classifier exceeded {}ms, using keyword fallback",
                        self.timeout.as_millis()
                    );
                }
            }
        }

        Ok(self.fallback.classify(description))
    }
}
