use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::model::config::ApiConfig;
use crate::ops::auth::{AuthApi, AuthResponse, LoginRequest, SignupRequest};
use crate::ops::submit::ListingSubmitter;

/// Error type for backend calls
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("could not build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Rejected { status: u16, message: Option<String> },
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// The `message` the server sent with a rejection, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub status: u16,
    pub message: Option<String>,
    pub body: Value,
}

/// HTTP client for the marketplace backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    host: String,
}

impl ApiClient {
    pub fn new(host: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::Client)?;
        Ok(ApiClient {
            http,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(&config.host, config.timeout_secs.map(Duration::from_secs))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `<host>/api/<path>`
    pub fn url(&self, path: &str) -> String {
        api_url(&self.host, path)
    }

    /// `POST` a JSON body; any 2xx is success.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Receipt, ApiError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);
        debug!(%url, status = status.as_u16(), "response");

        if status.is_success() {
            Ok(Receipt {
                status: status.as_u16(),
                message: message_of(&body),
                body,
            })
        } else {
            Err(ApiError::Rejected {
                status: status.as_u16(),
                message: message_of(&body),
            })
        }
    }

    /// Listings for one service key (`GET /api/all-services?services=<key>`).
    pub async fn fetch_listings(&self, service_key: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.url("all-services");
        debug!(%url, service_key, "GET");
        let response = self
            .http
            .get(&url)
            .query(&[("services", service_key)])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);
        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: message_of(&body),
            });
        }
        Ok(extract_entities(&body, service_key))
    }

    async fn post_auth<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthResponse, ApiError> {
        let receipt = self.post_json(path, body).await?;
        decode(receipt.body)
    }
}

impl ListingSubmitter for ApiClient {
    async fn submit_listing(&self, endpoint: &str, payload: &Value) -> Result<Receipt, ApiError> {
        self.post_json(endpoint, payload).await
    }
}

impl AuthApi for ApiClient {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.post_auth("users/signup", request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post_auth("users/login", request).await
    }
}

pub fn api_url(host: &str, path: &str) -> String {
    format!(
        "{}/api/{}",
        host.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Response bodies that are not JSON are kept as a string value.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// The body's top-level `message` string, when it has one.
pub fn message_of(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

/// `data.<key>.data` from an all-services response; anything missing is an
/// empty list.
pub fn extract_entities(body: &Value, service_key: &str) -> Vec<Value> {
    body.get("data")
        .and_then(|d| d.get(service_key))
        .and_then(|s| s.get("data"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Malformed(e.to_string()))
}
