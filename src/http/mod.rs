//! HTTP client module with retry logic and error handling.

mod auth;
mod client;
mod error;
mod rate_limit;
mod request;
mod retry;

pub use auth::Credentials;
pub use client::{ApiResponse, DEFAULT_BASE_URL, HttpClient};
pub use error::{
    ApiError, ErrorKind, RawFailure, TransportFailure, TransportFailureKind, classify,
};
pub use rate_limit::{RateLimitInfo, parse_retry_after};
pub use request::{ApiRequest, CallOptions, Endpoint};
pub use retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_RETRIES, RetryPolicy};

/// Result of one logical API call.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
