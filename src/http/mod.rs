//! HTTP adapter: authenticated requests against the backend REST API.
//!
//! All outbound traffic goes through [`HttpClient`]: it joins relative
//! resource paths onto the configured base URL, attaches the bearer
//! access token, and applies the per-request timeout.
//!
//! # 401 handling
//!
//! A request that comes back 401 gets exactly one refresh-and-retry
//! cycle: the adapter refreshes the access token via `/auth/refresh/`
//! (serialised so concurrent 401s coalesce on one refresh), then
//! re-issues the original request once. A second 401 on the retried
//! request, a refresh failure, or a missing refresh token all clear the
//! session and surface [`HermodError::SessionExpired`]. The retried state
//! is an explicit [`Attempt`] value threaded through the call, never a
//! flag mutated on a request object.
//!
//! # List payloads
//!
//! List endpoints return either a bare array or `{"results": [...]}`
//! depending on backend pagination. [`HttpClient::get_list`] decodes both
//! shapes into one `Vec<T>`; no caller sees the difference.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::multipart::Form;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{AuthSession, SignOutReason};
use crate::error::{HermodError, Result};
use crate::telemetry;

/// Default API root, matching a local development backend.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Token refresh endpoint, used by the adapter itself.
const AUTH_REFRESH_PATH: &str = "auth/refresh/";

/// Network configuration for the adapter.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root; resource paths are joined onto it.
    pub base_url: String,
    /// Applied to every request, including the refresh round trip.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("HERMOD_API_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Whether a request has already been through the refresh-and-retry
/// cycle. Replaces the original's in-place `_retry` flag mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retried,
}

/// Authenticated HTTP client for the backend API.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base: Url,
    auth: AuthSession,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig, auth: AuthSession) -> Result<Self> {
        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url)
            .map_err(|e| HermodError::Configuration(format!("invalid base URL {base_url:?}: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            auth,
            timeout: config.timeout,
        })
    }

    /// The session this adapter reads tokens from.
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HermodError::Configuration(format!("invalid path {path:?}: {e}")))
    }

    // ========================================================================
    // Typed entry points
    // ========================================================================

    /// GET a single JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path, None).await?;
        decode_json(response).await
    }

    /// GET a list endpoint, normalising both payload shapes.
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let response = self.request(Method::GET, path, None).await?;
        let payload: ListPayload<T> = decode_json(response).await?;
        Ok(payload.into_items())
    }

    /// POST a JSON body, decoding a JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.request(Method::POST, path, Some(body)).await?;
        decode_json(response).await
    }

    /// PUT a JSON body, decoding a JSON response.
    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.request(Method::PUT, path, Some(body)).await?;
        decode_json(response).await
    }

    /// PATCH a JSON body, decoding a JSON response.
    pub async fn patch_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.request(Method::PATCH, path, Some(body)).await?;
        decode_json(response).await
    }

    /// DELETE a resource; the response body is discarded.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Fetch a binary payload (PDF endpoints). `body` is sent as JSON
    /// when present (delivery-note generation POSTs an empty object).
    pub async fn download(&self, method: Method, path: &str, body: Option<Value>) -> Result<Vec<u8>> {
        let response = self.request(method, path, body).await?;
        Ok(response.bytes().await.map_err(HermodError::from)?.to_vec())
    }

    /// POST a multipart form (document upload). The form is rebuilt per
    /// attempt because multipart bodies are single-use.
    pub async fn upload<T, F>(&self, path: &str, make_form: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> Form + Send + Sync,
    {
        let url = self.endpoint(path)?;
        let response = self
            .dispatch("POST", &|| self.http.post(url.clone()).multipart(make_form()))
            .await?;
        decode_json(response).await
    }

    /// Issue a request and run the response through status mapping and
    /// the 401 refresh cycle.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        self.dispatch(method.as_str(), &|| {
            let mut builder = self.http.request(method.clone(), url.clone());
            if let Some(body) = &body {
                builder = builder.json(body);
            }
            builder
        })
        .await
    }

    // ========================================================================
    // Dispatch and refresh cycle
    // ========================================================================

    async fn dispatch(
        &self,
        method: &str,
        make: &(dyn Fn() -> reqwest::RequestBuilder + Send + Sync),
    ) -> Result<reqwest::Response> {
        // Observed before the request goes out: a generation change
        // between the 401 and the refresh lock means another task
        // already rotated the token.
        let observed_generation = self.auth.generation();

        let response = self.send(method, make, Attempt::First).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }
        if self.auth.access_token().is_none() {
            // No credentials were presented (e.g. a bad login); there is
            // nothing to refresh.
            return check_status(response).await;
        }

        debug!(method, "401 received, starting refresh cycle");
        self.refresh_access(observed_generation).await?;

        let retried = self.send(method, make, Attempt::Retried).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            // The retried request was rejected with the fresh token; do
            // not loop into a second refresh.
            warn!(method, "retried request rejected, clearing session");
            self.auth.sign_out(SignOutReason::RefreshFailed);
            return Err(HermodError::SessionExpired);
        }
        check_status(retried).await
    }

    async fn send(
        &self,
        method: &str,
        make: &(dyn Fn() -> reqwest::RequestBuilder + Send + Sync),
        attempt: Attempt,
    ) -> Result<reqwest::Response> {
        let mut builder = make().timeout(self.timeout);
        if let Some(token) = self.auth.access_token() {
            builder = builder.bearer_auth(token);
        }

        let started = Instant::now();
        let result = builder.send().await;
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "method" => method.to_owned())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "method" => method.to_owned(), "status" => "ok")
                .increment(1);
                debug!(method, ?attempt, status = %response.status(), "request completed");
                Ok(response)
            }
            Err(e) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "method" => method.to_owned(), "status" => "error")
                .increment(1);
                if e.is_timeout() {
                    Err(HermodError::Timeout(self.timeout))
                } else {
                    Err(HermodError::Http(e.to_string()))
                }
            }
        }
    }

    /// Refresh the access token, serialised across concurrent callers.
    ///
    /// `observed` is the token generation from before the rejected
    /// request. On success the session carries the new access token; on
    /// any failure the session is cleared and `SessionExpired` returned.
    async fn refresh_access(&self, observed: u64) -> Result<()> {
        let _guard = self.auth.refresh_lock().lock().await;

        if self.auth.generation() != observed {
            // Another task completed a refresh (or sign-out) while we
            // waited for the lock.
            return if self.auth.access_token().is_some() {
                Ok(())
            } else {
                Err(HermodError::SessionExpired)
            };
        }

        let Some(refresh) = self.auth.refresh_token() else {
            metrics::counter!(telemetry::TOKEN_REFRESHES_TOTAL, "status" => "error").increment(1);
            self.auth.sign_out(SignOutReason::RefreshFailed);
            return Err(HermodError::SessionExpired);
        };

        let url = self.endpoint(AUTH_REFRESH_PATH)?;
        let outcome = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await;

        let refreshed = match outcome {
            Ok(response) if response.status().is_success() => {
                response.json::<RefreshedAccess>().await.ok()
            }
            _ => None,
        };

        match refreshed {
            Some(payload) => {
                metrics::counter!(telemetry::TOKEN_REFRESHES_TOTAL, "status" => "ok").increment(1);
                debug!("access token refreshed");
                self.auth.replace_access(payload.access);
                Ok(())
            }
            None => {
                metrics::counter!(telemetry::TOKEN_REFRESHES_TOTAL, "status" => "error")
                    .increment(1);
                warn!("token refresh failed, clearing session");
                self.auth.sign_out(SignOutReason::RefreshFailed);
                Err(HermodError::SessionExpired)
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct RefreshedAccess {
    access: String,
}

/// Accept both list payload shapes.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ListPayload<T> {
    Paginated { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListPayload<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListPayload::Paginated { results } => results,
            ListPayload::Bare(items) => items,
        }
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let text = response.text().await.map_err(HermodError::from)?;
    Ok(serde_json::from_str(&text)?)
}

/// Map non-success statuses onto the error taxonomy.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: Value = response.json().await.unwrap_or(Value::Null);
    Err(error_from_status(status, body))
}

fn error_from_status(status: StatusCode, body: Value) -> HermodError {
    if status == StatusCode::UNAUTHORIZED {
        // Reached only for unauthenticated flows (e.g. a bad login);
        // session 401s are consumed by the refresh cycle first.
        return HermodError::AuthenticationFailed;
    }

    if status.is_client_error() {
        if let Some(map) = body.as_object() {
            let mut fields = BTreeMap::new();
            let mut non_field = Vec::new();
            for (key, value) in map {
                let messages = value_messages(value);
                if key == "detail" || key == "non_field_errors" {
                    non_field.extend(messages);
                } else {
                    fields.insert(key.clone(), messages);
                }
            }
            if !fields.is_empty() {
                return HermodError::Validation { fields, non_field };
            }
            if let Some(message) = non_field.into_iter().next() {
                return HermodError::Api {
                    status: status.as_u16(),
                    message,
                };
            }
        }
    }

    HermodError::Api {
        status: status.as_u16(),
        message: extract_detail(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
    }
}

/// Flatten a validation payload value into its messages.
fn value_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

fn extract_detail(body: &Value) -> Option<String> {
    body.get("detail").and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_payload_decodes_bare_array() {
        let items: ListPayload<u32> = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(items.into_items(), vec![1, 2, 3]);
    }

    #[test]
    fn list_payload_decodes_paginated() {
        let items: ListPayload<u32> = serde_json::from_str(r#"{"results": [4, 5]}"#).unwrap();
        assert_eq!(items.into_items(), vec![4, 5]);
    }

    #[test]
    fn field_payload_maps_to_validation() {
        let body = serde_json::json!({
            "name": ["This field is required."],
            "non_field_errors": ["period overlaps an existing one"]
        });
        let err = error_from_status(StatusCode::BAD_REQUEST, body);
        match err {
            HermodError::Validation { fields, non_field } => {
                assert_eq!(fields["name"], vec!["This field is required."]);
                assert_eq!(non_field, vec!["period overlaps an existing one"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn detail_only_payload_maps_to_api_error() {
        let body = serde_json::json!({ "detail": "Not found." });
        let err = error_from_status(StatusCode::NOT_FOUND, body);
        match err {
            HermodError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not found.");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn server_error_uses_canonical_reason_without_body() {
        let err = error_from_status(StatusCode::INTERNAL_SERVER_ERROR, Value::Null);
        match err {
            HermodError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = HttpClient::new(
            &HttpConfig {
                base_url: "http://example.test/api".to_string(),
                timeout: DEFAULT_TIMEOUT,
            },
            AuthSession::new(),
        )
        .unwrap();
        let url = client.endpoint("/clients/").unwrap();
        assert_eq!(url.as_str(), "http://example.test/api/clients/");
    }
}
