//! HTTP client for the accounting backend.
//!
//! Every request built here is passed through the [`AuthGate`] before it is
//! sent. A request the gate rejects never touches the network.
//!
//! # Status Mapping
//!
//! | Backend response        | Result                            |
//! |-------------------------|-----------------------------------|
//! | 2xx, body matches type  | `Ok(T)`                           |
//! | 2xx, body doesn't match | `ApiError::MalformedResponse`     |
//! | 4xx                     | `ApiError::Validation` (verbatim) |
//! | 5xx / unreachable       | `ApiError::RequestFailed`         |

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthGate;
use crate::error::ApiError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed JSON client for the backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    gate: AuthGate,
}

impl ApiClient {
    /// Create a client for `base_url` with the default timeout.
    pub fn new(base_url: &str, gate: AuthGate) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, gate, DEFAULT_TIMEOUT)
    }

    /// Create a client for `base_url` with a custom request timeout.
    pub fn with_timeout(base_url: &str, gate: AuthGate, timeout: Duration) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            gate,
        })
    }

    /// The gate this client dispatches through.
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request URL from a path (starting with `/`) and query pairs.
    ///
    /// The path is appended to the base URL verbatim, so a base URL with a
    /// path prefix (`https://host/v1`) keeps that prefix.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// GET `path` and decode the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path, query)?;
        let body = self.dispatch(Method::GET, url, None).await?;
        decode(path, &body)
    }

    /// Send `body` as JSON with `method` and decode the JSON response.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        let payload = serde_json::to_vec(body).map_err(|e| ApiError::MalformedResponse {
            path: path.to_string(),
            message: format!("request body could not be serialized: {}", e),
        })?;
        let response = self.dispatch(method, url, Some(payload)).await?;
        decode(path, &response)
    }

    /// DELETE `path`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path, &[])?;
        self.dispatch(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// Authorize, send, and classify the response status.
    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        self.gate.authorize(&mut headers)?;

        debug!(method = %method, url = %url, "Dispatching request");

        let mut request = self.http.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(method = %method, url = %url, "Backend unreachable: {}", e);
            ApiError::RequestFailed {
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| ApiError::RequestFailed {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body, status.canonical_reason().unwrap_or("error"));
        if status.is_client_error() {
            debug!(status = status.as_u16(), url = %url, "Backend rejected request: {}", message);
            Err(ApiError::Validation {
                status: status.as_u16(),
                message,
            })
        } else {
            warn!(status = status.as_u16(), url = %url, "Backend request failed: {}", message);
            Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message,
            })
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedResponse {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Extract the user-facing message from an error response body.
///
/// Prefers a JSON `message` field, then `error`, then a bare JSON string,
/// then the raw body text. Falls back to `fallback` for empty bodies.
pub fn error_message(body: &[u8], fallback: &str) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        match &value {
            serde_json::Value::Object(map) => {
                for key in ["message", "error"] {
                    if let Some(serde_json::Value::String(text)) = map.get(key) {
                        return text.clone();
                    }
                }
            }
            serde_json::Value::String(text) => return text.clone(),
            _ => {}
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        fallback.to_string()
    } else {
        text
    }
}
