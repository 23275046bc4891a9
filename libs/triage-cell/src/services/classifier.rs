use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{Priority, TriageAssessment};

#[async_trait]
pub trait SymptomClassifier: Send + Sync {
    async fn classify(&self, description: &str) -> Result<TriageAssessment>;
}

/// Symptom classification over an OpenAI-style chat completions endpoint.
/// The model is pinned to a two-line reply so parsing stays trivial.
pub struct RemoteClassifier {
    api_url: String,
    api_key: String,
    http_client: Client,
}

impl RemoteClassifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_url: config.triage_api_url.clone(),
            api_key: config.triage_api_key.clone(),
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl SymptomClassifier for RemoteClassifier {
    async fn classify(&self, description: &str) -> Result<TriageAssessment> {
        debug!("Requesting remote classification");

        let prompt = json!({
            "model": "gpt-4o",
            "messages": [
                {
                    "role": "system",
                    "content": "You are a veterinary triage assistant. Assess the urgency of the symptom description for a pet. Reply with exactly two lines:\nCategory: <LOW|NORMAL|HIGH|EMERGENCY>\nReason: <one short sentence>"
                },
                {
                    "role": "user",
                    "content": format!("Symptom description: {}", description)
                }
            ],
            "temperature": 0.0
        });

        let response = self.http_client.post(&self.api_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&prompt)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Classifier API error: {}", error_text));
        }

        let ai_response: Value = response.json().await?;
        let reply = ai_response["choices"][0]["message"]["content"].as_str()
            .ok_or_else(|| anyhow!("Invalid classifier response format"))?;

        parse_reply(reply)
    }
}

/// Parse the two-line `Category:` / `Reason:` reply. The category line is
/// mandatory; a missing reason gets a placeholder rather than failing the
/// whole classification.
fn parse_reply(text: &str) -> Result<TriageAssessment> {
    let mut priority = None;
    let mut rationale = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(value) = strip_label(line, "category") {
            priority = parse_category(value);
        } else if let Some(value) = strip_label(line, "reason") {
            if !value.is_empty() {
                rationale = Some(value.to_string());
            }
        }
    }

    let priority = priority
        .ok_or_else(|| anyhow!("Classifier reply has no recognizable category: {}", text))?;

    Ok(TriageAssessment {
        priority,
        rationale: rationale.unwrap_or_else(|| "Remote classification".to_string()),
        is_fallback: false,
    })
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let (head, tail) = line.split_once(':')?;
    if head.trim().eq_ignore_ascii_case(label) {
        Some(tail.trim())
    } else {
        None
    }
}

fn parse_category(raw: &str) -> Option<Priority> {
    match raw.to_lowercase().as_str() {
        "emergency" | "critical" => Some(Priority::Emergency),
        "high" | "urgent" => Some(Priority::High),
        "normal" | "routine" | "standard" => Some(Priority::Normal),
        "low" | "elective" => Some(Priority::Low),
        _ => None,
    }
}
