//! Request execution: auth, status classification and rate-limit retry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::Result;
use crate::error::{ApiError, Error, RateLimitError, TransportError, ValidationError};
use crate::retry::{RateLimitHints, RetryDecision, RetryPolicy, RetryState};
use crate::tokens::ApiToken;
use crate::transport::{HttpRequest, HttpResponse, Method, RequestBody, Transport};
use crate::types::ApiUrl;

/// A campaign-relative path such as `entities/100/posts`.
///
/// Segments are kept apart so free text (a search term) is percent-encoded
/// as one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath(Vec<String>);

impl ApiPath {
    pub fn new(first: impl fmt::Display) -> Self {
        Self(vec![first.to_string()])
    }

    /// Appends a segment.
    #[must_use]
    pub fn join(mut self, segment: impl fmt::Display) -> Self {
        self.0.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Sends campaign-scoped requests through a [`Transport`].
///
/// This is the only place that looks at status codes. A 429 is retried
/// according to the [`RetryPolicy`]; every other failure is returned as-is.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    api: ApiUrl,
    version: String,
    campaign_id: u64,
    token: ApiToken,
    retry: RetryPolicy,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("api", &self.api)
            .field("version", &self.version)
            .field("campaign_id", &self.campaign_id)
            .field("token", &self.token)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        api: ApiUrl,
        version: impl Into<String>,
        campaign_id: u64,
        token: ApiToken,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            api,
            version: version.into(),
            campaign_id,
            token,
            retry,
        }
    }

    pub fn campaign_id(&self) -> u64 {
        self.campaign_id
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Absolute URL of a campaign-relative path.
    pub fn url(&self, path: &ApiPath) -> String {
        self.api
            .campaign_endpoint(&self.version, self.campaign_id, path.segments())
    }

    /// Performs one logical call and returns the parsed body.
    ///
    /// An empty body (as sent for deletes) parses to `Value::Null`.
    #[instrument(skip(self, query, body), fields(campaign = self.campaign_id, %method, %path))]
    pub async fn execute(
        &self,
        method: Method,
        path: &ApiPath,
        query: &[(String, String)],
        body: RequestBody,
    ) -> Result<Value> {
        let url = self.url(path);
        let mut state = RetryState::new(&self.retry);

        loop {
            let request = HttpRequest {
                method,
                url: url.clone(),
                headers: self.headers(),
                query: query.to_vec(),
                body: body.clone(),
            };

            debug!("sending request");
            trace!(?query, "query parameters");

            let response = self.transport.send(request).await?;
            trace!(status = response.status, "response");

            if response.is_success() {
                return decode_body(&response.body);
            }

            if response.status == 429 {
                let now = Utc::now();
                let hints = RateLimitHints::from_response(&response, now);
                if let RetryDecision::Retry(delay) = state.on_rate_limited(&hints, now) {
                    warn!(
                        attempt = state.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            return Err(classify(&response, path, state.attempts()));
        }
    }

    pub async fn get(&self, path: &ApiPath, query: &[(String, String)]) -> Result<Value> {
        self.execute(Method::Get, path, query, RequestBody::Empty)
            .await
    }

    pub async fn post(&self, path: &ApiPath, body: RequestBody) -> Result<Value> {
        self.execute(Method::Post, path, &[], body).await
    }

    pub async fn patch(&self, path: &ApiPath, body: Value) -> Result<Value> {
        self.execute(Method::Patch, path, &[], RequestBody::Json(body))
            .await
    }

    pub async fn delete(&self, path: &ApiPath, query: &[(String, String)]) -> Result<Value> {
        self.execute(Method::Delete, path, query, RequestBody::Empty)
            .await
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), self.token.bearer()),
            ("Accept".to_string(), "application/json".to_string()),
        ]
    }
}

fn decode_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| {
        TransportError::Decode {
            message: e.to_string(),
        }
        .into()
    })
}

/// Pulls `data` out of a response envelope.
pub(crate) fn take_data(mut body: Value, path: &ApiPath) -> Result<Value> {
    match body.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Err(TransportError::Decode {
            message: format!("response to {} has no 'data' field", path),
        }
        .into()),
    }
}

/// Maps a non-success response onto the error taxonomy.
fn classify(response: &HttpResponse, path: &ApiPath, attempts: u32) -> Error {
    let status = response.status;
    let path = path.to_string();
    let body: Option<Value> = serde_json::from_slice(&response.body).ok();

    let message = match body.as_ref() {
        Some(body) => ["message", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        None => {
            let text = String::from_utf8_lossy(&response.body).trim().to_string();
            (!text.is_empty()).then_some(text)
        }
    };

    match status {
        401 => Error::Authentication(ApiError::new(status, path, message)),
        403 => Error::Forbidden(ApiError::new(status, path, message)),
        404 => Error::NotFound(ApiError::new(status, path, message)),
        422 => Error::Validation(ValidationError {
            status,
            path,
            message,
            errors: body
                .as_ref()
                .and_then(|body| body.get("errors"))
                .map(field_errors)
                .unwrap_or_default(),
        }),
        429 => Error::RateLimited(RateLimitError {
            status,
            path,
            message,
            attempts,
        }),
        _ => Error::Api(ApiError::new(status, path, message)),
    }
}

fn field_errors(errors: &Value) -> BTreeMap<String, Vec<String>> {
    let Some(errors) = errors.as_object() else {
        return BTreeMap::new();
    };
    errors
        .iter()
        .map(|(field, messages)| {
            let messages = match messages {
                Value::Array(items) => items
                    .iter()
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                    .collect(),
                Value::String(s) => vec![s.clone()],
                other => vec![other.to_string()],
            };
            (field.clone(), messages)
        })
        .collect()
}
