//! Request descriptions and URL construction.

use std::fmt;

use reqwest::{Method, Url};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::auth::Credentials;
use super::error::ApiError;

/// Query parameter names reserved for credentials.
const RESERVED_PARAMS: &[&str] = &["key", "token"];

/// A path relative to the API base URL, kept as unencoded segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    segments: Vec<String>,
}

impl Endpoint {
    /// Starts a path at a top-level resource, e.g. `cards`.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            segments: vec![resource.into()],
        }
    }

    /// Appends one path segment. Slashes inside it are encoded, not split.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Deadline and cancellation applied to one logical call, retries included.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub deadline: Option<Instant>,
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Resolves with the matching error once the call must stop; never resolves otherwise.
    pub(crate) async fn interrupted(&self) -> ApiError {
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => ApiError::cancelled(),
            _ = expired => ApiError::deadline_exceeded(),
        }
    }
}

/// One logical API call: what to send and where.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    operation: String,
    method: Method,
    endpoint: Endpoint,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    options: CallOptions,
}

impl ApiRequest {
    /// `operation` is a human-readable label used only in logs.
    pub fn new(operation: impl Into<String>, method: Method, endpoint: Endpoint) -> Self {
        Self {
            operation: operation.into(),
            method,
            endpoint,
            query: Vec::new(),
            body: None,
            options: CallOptions::default(),
        }
    }

    pub fn get(operation: impl Into<String>, endpoint: Endpoint) -> Self {
        Self::new(operation, Method::GET, endpoint)
    }

    pub fn post(operation: impl Into<String>, endpoint: Endpoint) -> Self {
        Self::new(operation, Method::POST, endpoint)
    }

    pub fn put(operation: impl Into<String>, endpoint: Endpoint) -> Self {
        Self::new(operation, Method::PUT, endpoint)
    }

    pub fn delete(operation: impl Into<String>, endpoint: Endpoint) -> Self {
        Self::new(operation, Method::DELETE, endpoint)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn query_opt<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    /// Sets a JSON body from any serializable value.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::validation(format!("Request body could not be serialized: {}", e))
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }
}

/// Builds the full request URL with credentials attached.
///
/// Fails without touching the network when the endpoint or a parameter name
/// is malformed.
pub(crate) fn build_url(
    base: &Url,
    request: &ApiRequest,
    credentials: &Credentials,
) -> Result<Url, ApiError> {
    for segment in request.endpoint.segments() {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(ApiError::validation(format!(
                "Invalid path segment {:?} in {}",
                segment, request.endpoint
            )));
        }
    }

    for (name, _) in &request.query {
        validate_param_name(name)?;
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::validation(format!("Base URL {} cannot carry a path", base)))?
        .pop_if_empty()
        .extend(request.endpoint.segments());

    url.query_pairs_mut()
        .extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .append_pair("key", credentials.api_key())
        .append_pair("token", credentials.token());

    Ok(url)
}

/// Parameter names must look like identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn validate_param_name(name: &str) -> Result<(), ApiError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid {
        return Err(ApiError::validation(format!(
            "Invalid query parameter name {:?}",
            name
        )));
    }

    if RESERVED_PARAMS.contains(&name) {
        return Err(ApiError::validation(format!(
            "Query parameter {:?} is reserved for credentials",
            name
        )));
    }

    Ok(())
}
