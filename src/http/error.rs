//! Error taxonomy for API calls and the classifier that maps raw failures onto it.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Upstream error details longer than this are truncated.
const MAX_DETAIL_CHARS: usize = 200;

const REDACTED: &str = "[REDACTED]";

/// The closed set of failure kinds an API call can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 401
    Authentication,
    /// HTTP 403
    Authorization,
    /// HTTP 404
    NotFound,
    /// HTTP 429
    RateLimited,
    /// HTTP 400, 422 and other client errors, or a request rejected before sending
    Validation,
    /// The request never got a response
    Network,
    /// The request or the whole call ran out of time, or was cancelled
    Timeout,
    /// HTTP 5xx
    ServerError,
    /// Anything else, including unreadable success bodies
    Unknown,
}

impl ErrorKind {
    /// Whether a failure of this kind may succeed if the same request is sent again.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::Network | ErrorKind::Timeout | ErrorKind::ServerError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not found",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ServerError => "server error",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified API failure.
///
/// This is the only error type returned by the client. By the time a caller
/// sees one, every applicable retry has already been spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Upstream HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Wait requested by the service before trying again.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Timeout, "Request cancelled before it completed.")
    }

    pub(crate) fn deadline_exceeded() -> Self {
        Self::new(
            ErrorKind::Timeout,
            "Request deadline exceeded before the service responded.",
        )
    }

    /// Replaces every occurrence of the given secrets in the message.
    pub(crate) fn scrub(mut self, secrets: &[&str]) -> Self {
        for secret in secrets.iter().filter(|s| !s.is_empty()) {
            if self.message.contains(secret) {
                self.message = self.message.replace(secret, REDACTED);
            }
        }
        self
    }
}

/// What went wrong below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    Timeout,
    Connect,
    Other,
}

/// A transport failure reduced to the parts the classifier needs.
///
/// The request URL is never part of `detail`, since it carries credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: TransportFailureKind,
    pub detail: String,
}

impl TransportFailure {
    pub fn new(kind: TransportFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn from_reqwest(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportFailureKind::Timeout
        } else if error.is_connect() {
            TransportFailureKind::Connect
        } else {
            TransportFailureKind::Other
        };

        let error = error.without_url();
        let mut detail = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !detail.contains(&cause_text) {
                detail.push_str(": ");
                detail.push_str(&cause_text);
            }
            source = cause.source();
        }

        Self { kind, detail }
    }
}

/// A failed attempt, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    /// No response was received.
    Transport(TransportFailure),
    /// A non-2xx response was received.
    Status {
        status: StatusCode,
        retry_after: Option<Duration>,
        body: Option<String>,
    },
}

/// Maps a raw failure onto exactly one [`ApiError`].
///
/// Total and pure: the same input always yields the same error.
pub fn classify(failure: &RawFailure) -> ApiError {
    match failure {
        RawFailure::Transport(transport) => classify_transport(transport),
        RawFailure::Status {
            status,
            retry_after,
            body,
        } => classify_status(*status, *retry_after, body.as_deref()),
    }
}

fn classify_transport(failure: &TransportFailure) -> ApiError {
    match failure.kind {
        TransportFailureKind::Timeout => ApiError::new(
            ErrorKind::Timeout,
            format!("Request timed out: {}", failure.detail),
        ),
        TransportFailureKind::Connect => ApiError::new(
            ErrorKind::Network,
            format!("Network error: could not connect to the service: {}", failure.detail),
        ),
        TransportFailureKind::Other => ApiError::new(
            ErrorKind::Network,
            format!("Network error: {}", failure.detail),
        ),
    }
}

fn classify_status(status: StatusCode, retry_after: Option<Duration>, body: Option<&str>) -> ApiError {
    let code = status.as_u16();
    let detail = body.and_then(upstream_detail);

    // 429 is checked before the generic client-error arm
    if status == StatusCode::TOO_MANY_REQUESTS {
        let error = match retry_after {
            Some(wait) => ApiError::new(
                ErrorKind::RateLimited,
                format!("Rate limit exceeded, retry after {}s.", wait.as_secs_f64().ceil() as u64),
            )
            .with_retry_after(wait),
            None => ApiError::new(ErrorKind::RateLimited, "Rate limit exceeded, retry later."),
        };
        return error.with_status(code);
    }

    let (kind, summary) = match status {
        StatusCode::UNAUTHORIZED => (
            ErrorKind::Authentication,
            "Authentication failed: the API key or token was rejected".to_string(),
        ),
        StatusCode::FORBIDDEN => (
            ErrorKind::Authorization,
            "Access denied: the token is not allowed to access this resource".to_string(),
        ),
        StatusCode::NOT_FOUND => (ErrorKind::NotFound, "Resource not found".to_string()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            (ErrorKind::Validation, "Invalid request".to_string())
        }
        StatusCode::REQUEST_TIMEOUT => (
            ErrorKind::Timeout,
            "The service timed out waiting for the request".to_string(),
        ),
        s if s.is_client_error() => (
            ErrorKind::Validation,
            format!("Request rejected by the service (HTTP {})", code),
        ),
        s if s.is_server_error() => (ErrorKind::ServerError, format!("Server error (HTTP {})", code)),
        _ => (ErrorKind::Unknown, format!("Unexpected response (HTTP {})", code)),
    };

    let message = match detail {
        Some(detail) => format!("{}: {}", summary, detail),
        None => format!("{}.", summary),
    };

    ApiError::new(kind, message).with_status(code)
}

/// Pulls a short human-readable reason out of an error body.
fn upstream_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let text = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|field| map.get(*field).and_then(|v| v.as_str()))
            .map(str::to_string)?,
        Ok(serde_json::Value::String(s)) => s,
        Ok(_) => return None,
        Err(_) if body.starts_with('<') => return None,
        Err(_) => body.to_string(),
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.chars().count() > MAX_DETAIL_CHARS {
        let truncated: String = text.chars().take(MAX_DETAIL_CHARS).collect();
        Some(format!("{}...", truncated))
    } else {
        Some(text.to_string())
    }
}
