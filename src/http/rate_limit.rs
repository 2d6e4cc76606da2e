//! Rate-limit metadata carried on response headers.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;

const LIMIT_HEADERS: &[&str] = &["x-rate-limit-limit", "x-rate-limit-api-token-max"];
const REMAINING_HEADERS: &[&str] = &["x-rate-limit-remaining", "x-rate-limit-api-token-remaining"];
const RESET_HEADER: &str = "x-rate-limit-reset";

/// Rate-limit state reported by the service on a single response.
///
/// Recomputed for every response and never accumulated across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds) at which the window resets, when reported.
    pub reset_at: Option<u64>,
}

impl RateLimitInfo {
    /// Reads rate-limit headers, returning `None` when the response carried none.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = first_number(headers, LIMIT_HEADERS)?;
        let remaining = first_number(headers, REMAINING_HEADERS)?;
        let reset_at = header_number(headers, RESET_HEADER);

        Some(Self {
            limit,
            remaining,
            reset_at,
        })
    }
}

/// Parses the `retry-after` header as a number of seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn first_number(headers: &HeaderMap, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|name| header_number(headers, name))
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
