//! Error types for the kanka client.
//!
//! Every failure surfaces as one [`Error`] value, so callers can match a
//! single kind (`Error::NotFound`) or handle everything broadly. Errors that
//! originate from an HTTP response keep the status code and whatever message
//! the server sent.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// The unified error type for kanka operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The API token was rejected (HTTP 401).
    #[error("authentication failed: {0}")]
    Authentication(ApiError),

    /// The token is valid but may not access the resource (HTTP 403).
    #[error("access forbidden: {0}")]
    Forbidden(ApiError),

    /// The addressed resource does not exist (HTTP 404).
    #[error("resource not found: {0}")]
    NotFound(ApiError),

    /// The server rejected the payload (HTTP 422).
    #[error("validation failed: {0}")]
    Validation(ValidationError),

    /// The rate limit was hit and retrying is disabled or exhausted (HTTP 429).
    #[error("rate limit exceeded: {0}")]
    RateLimited(RateLimitError),

    /// Any other 4xx/5xx response.
    #[error("API error: {0}")]
    Api(ApiError),

    /// The transport failed before a response was available.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A payload did not match the record schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Caller-supplied input could not be used.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// A local file could not be read for upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The HTTP status code, if this error came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication(e) | Error::Forbidden(e) | Error::NotFound(e) | Error::Api(e) => {
                Some(e.status)
            }
            Error::Validation(e) => Some(e.status),
            Error::RateLimited(e) => Some(e.status),
            _ => None,
        }
    }

    /// The server-provided message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::Authentication(e) | Error::Forbidden(e) | Error::NotFound(e) | Error::Api(e) => {
                e.message.as_deref()
            }
            Error::Validation(e) => e.message.as_deref(),
            Error::RateLimited(e) => e.message.as_deref(),
            _ => None,
        }
    }

    /// Returns true for a 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Details of a non-success API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Campaign-relative path of the failed request.
    pub path: String,
    /// Error message from the server.
    pub message: Option<String>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: u16, path: impl Into<String>, message: Option<String>) -> Self {
        Self {
            status,
            path: path.into(),
            message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} on {}", self.status, self.path)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// A 422 response with per-field messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// HTTP status code (always 422).
    pub status: u16,
    /// Campaign-relative path of the failed request.
    pub path: String,
    /// Summary message from the server.
    pub message: Option<String>,
    /// Field name to messages, as sent in the `errors` object.
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Messages reported for one field.
    pub fn field(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} on {}", self.status, self.path)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        for (field, messages) in &self.errors {
            write!(f, " [{}: {}]", field, messages.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A 429 response that was not (or no longer) retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitError {
    /// HTTP status code (always 429).
    pub status: u16,
    /// Campaign-relative path of the failed request.
    pub path: String,
    /// Error message from the server.
    pub message: Option<String>,
    /// Number of requests sent before giving up.
    pub attempts: u32,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP {} on {} after {} attempt(s)",
            self.status, self.path, self.attempts
        )?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for RateLimitError {}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// The response body was not the expected JSON.
    #[error("could not decode response: {message}")]
    Decode { message: String },
}

/// Errors raised while mapping a payload onto a record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A required field is absent or null.
    #[error("{schema}: missing required field '{field}'")]
    MissingField { schema: &'static str, field: String },

    /// A field value could not be coerced to its declared type.
    #[error("{schema}: invalid value for '{field}': {reason}")]
    InvalidField {
        schema: &'static str,
        field: String,
        reason: String,
    },

    /// The payload is not a JSON object.
    #[error("{schema}: payload must be a JSON object")]
    NotAnObject { schema: &'static str },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// A record carries no universal id, so it cannot address sub-resources.
    #[error("{schema} record has no universal id")]
    MissingUniversalId { schema: &'static str },

    /// A record carries no type-scoped id.
    #[error("{schema} record has no id")]
    MissingId { schema: &'static str },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
