//! HTTP client that authenticates, retries and classifies every API call.

use log::debug;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use super::auth::Credentials;
use super::error::{ApiError, ErrorKind, RawFailure, TransportFailure, classify};
use super::rate_limit::{RateLimitInfo, parse_retry_after};
use super::request::{ApiRequest, build_url};
use super::retry::RetryPolicy;

/// Base URL of the remote API.
pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";

/// A successful call: the parsed body and the rate-limit state it reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub rate_limit: Option<RateLimitInfo>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            rate_limit: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            rate_limit: self.rate_limit,
        }
    }
}

/// HTTP client with credentials and a retry policy baked in.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Wraps a reqwest `Client`. Fails if `base_url` is not an absolute http(s) URL.
    pub fn new(
        client: Client,
        base_url: &str,
        credentials: Credentials,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::validation(format!("Invalid base URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::validation(format!(
                "Invalid base URL {:?}: expected an http(s) URL",
                base_url.as_str()
            )));
        }

        Ok(Self {
            client,
            base_url,
            credentials,
            retry,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Performs one logical call, retrying transient failures per the retry policy.
    ///
    /// Malformed requests fail before any network call. A triggered deadline or
    /// cancellation aborts the in-flight attempt or backoff sleep.
    #[tracing::instrument(skip(self, request), fields(operation = %request.operation(), endpoint = %request.endpoint()))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = build_url(&self.base_url, &request, &self.credentials)
            .map_err(|e| e.scrub(&self.credentials.secrets()))?;

        debug!(
            "{} {} ({})...",
            request.method(),
            request.endpoint(),
            request.operation()
        );

        let options = request.options();
        let attempts = self
            .retry
            .run(request.operation(), |_| self.send_once::<T>(&request, &url));

        tokio::select! {
            biased;
            error = options.interrupted() => {
                debug!("{}: {}", request.operation(), error);
                Err(error)
            }
            result = attempts => result,
        }
    }

    /// Exactly one network call, classified.
    async fn send_once<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        url: &Url,
    ) -> Result<ApiResponse<T>, ApiError> {
        let secrets = self.credentials.secrets();

        let mut builder = self.client.request(request.method().clone(), url.clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            classify(&RawFailure::Transport(TransportFailure::from_reqwest(e))).scrub(&secrets)
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.ok();
            return Err(classify(&RawFailure::Status {
                status,
                retry_after,
                body,
            })
            .scrub(&secrets));
        }

        let rate_limit = RateLimitInfo::from_headers(response.headers());

        let text = response.text().await.map_err(|e| {
            ApiError::new(
                ErrorKind::Unknown,
                format!(
                    "Failed to read response body: {}",
                    TransportFailure::from_reqwest(e).detail
                ),
            )
            .scrub(&secrets)
        })?;

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        let data = serde_json::from_str(text).map_err(|e| {
            ApiError::new(
                ErrorKind::Unknown,
                format!("Unexpected response from the service: {}", e),
            )
            .scrub(&secrets)
        })?;

        Ok(ApiResponse { data, rate_limit })
    }
}
