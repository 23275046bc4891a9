use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub triage_api_url: String,
    pub triage_api_key: String,
    pub triage_timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            triage_api_url: String::new(),
            triage_api_key: "test-triage-key".to_string(),
            triage_timeout_ms: 250,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            triage_api_url: self.triage_api_url.clone(),
            triage_api_key: self.triage_api_key.clone(),
            triage_timeout_ms: self.triage_timeout_ms,
            default_open_when_unscheduled: true,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "owner".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn owner(email: &str) -> Self {
        Self::new(email, "owner")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn clinic_settings_row() -> serde_json::Value {
        json!({
            "id": 1,
            "opening_time": "09:00:00",
            "closing_time": "18:00:00",
            "slot_duration_minutes": 30,
            "closed_weekdays": [0],
            "average_consultation_minutes": 15,
            "emergency_enabled": true,
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn holiday_row(date: &str, label: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "holiday_date": date,
            "label": label,
            "recurs_annually": false,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn weekly_schedule_row(doctor_id: &str, weekday: u8, start: &str, end: &str, available: bool) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "weekday": weekday,
            "start_time": start,
            "end_time": end,
            "is_available": available,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(appointment_id: &str, owner_id: &str, doctor_id: &str,
                           date: &str, time: &str, status: &str, token: i32) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "pet_id": Uuid::new_v4(),
            "owner_id": owner_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "start_time": time,
            "duration_minutes": 30,
            "status": status,
            "priority": "normal",
            "is_emergency": false,
            "token_number": token,
            "reason": "annual checkup",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn emergency_case_row(case_id: &str, owner_id: &str, queue_number: i32) -> serde_json::Value {
        json!({
            "id": case_id,
            "appointment_id": null,
            "pet_id": Uuid::new_v4(),
            "owner_id": owner_id,
            "severity": "severe",
            "assigned_doctor_id": null,
            "status": "waiting",
            "queue_number": queue_number,
            "case_date": "2024-01-01",
            "description": "collapsed after vomiting",
            "reported_at": "2024-01-01T00:00:00Z",
            "resolved_at": null
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(app_config.default_open_when_unscheduled);
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_staff_role_helpers() {
        assert!(TestUser::admin("a@example.com").to_user().is_admin());
        assert!(TestUser::doctor("d@example.com").to_user().is_staff());
        assert!(!TestUser::owner("o@example.com").to_user().is_staff());
    }
}
