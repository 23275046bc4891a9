use std::fmt;

use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// HTTP status carried inside transport errors so callers can react to
/// specific outcomes (409 on a unique-index hit, 404 on a missing row)
/// without parsing message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiStatus(pub u16);

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API status {}", self.0)
    }
}

/// Extract the HTTP status attached to a request error, if any.
pub fn error_status(err: &anyhow::Error) -> Option<u16> {
    err.downcast_ref::<ApiStatus>().map(|s| s.0)
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
            );
        }

        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    /// Same as `request` but with extra headers, e.g. PostgREST's
    /// `Prefer: return=representation` on writes.
    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            let message = match status.as_u16() {
                401 | 403 => format!("Authentication error: {}", error_text),
                404 => format!("Resource not found: {}", error_text),
                409 => format!("Conflict: {}", error_text),
                _ => format!("API error ({}): {}", status, error_text),
            };
            return Err(anyhow!(ApiStatus(status.as_u16())).context(message));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Call a PostgREST RPC function. Counter functions (`next_queue_token`,
    /// `next_emergency_queue_number`) increment and return inside a single
    /// database transaction, which is what keeps them safe under concurrency.
    pub async fn rpc<T>(&self, function: &str, auth_token: Option<&str>, args: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request_with_headers(Method::POST, &path, auth_token, Some(args), None).await
    }
}
