use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub triage_api_url: String,
    pub triage_api_key: String,
    pub triage_timeout_ms: u64,
    pub default_open_when_unscheduled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            triage_api_url: env::var("TRIAGE_API_URL")
                .unwrap_or_else(|_| {
                    warn!("TRIAGE_API_URL not set, symptom triage will use the keyword fallback only");
                    String::new()
                }),
            triage_api_key: env::var("TRIAGE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("TRIAGE_API_KEY not set, using empty value");
                    String::new()
                }),
            triage_timeout_ms: env::var("TRIAGE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4000),
            default_open_when_unscheduled: env::var("DEFAULT_OPEN_WHEN_UNSCHEDULED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_triage_configured(&self) -> bool {
        !self.triage_api_url.is_empty() && !self.triage_api_key.is_empty()
    }
}
