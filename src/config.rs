use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Client;
use std::env::VarError;
use std::time::Duration;

use crate::{
    http::{
        Credentials, DEFAULT_BASE_DELAY_MS, DEFAULT_BASE_URL, DEFAULT_MAX_DELAY_MS,
        DEFAULT_MAX_RETRIES, HttpClient, RetryPolicy,
    },
    runtime::Runtime,
    trello::TrelloClient,
};

pub const ENV_API_KEY: &str = "TRELLO_API_KEY";
pub const ENV_TOKEN: &str = "TRELLO_TOKEN";
pub const ENV_API_URL: &str = "TRELLO_API_URL";
pub const ENV_MAX_RETRIES: &str = "TRELLO_MAX_RETRIES";
pub const ENV_BASE_DELAY_MS: &str = "TRELLO_BASE_DELAY_MS";
pub const ENV_MAX_DELAY_MS: &str = "TRELLO_MAX_DELAY_MS";
pub const ENV_RETRY_JITTER: &str = "TRELLO_RETRY_JITTER";
pub const ENV_TIMEOUT_MS: &str = "TRELLO_TIMEOUT_MS";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const USER_AGENT: &str = concat!("trelloctl/", env!("CARGO_PKG_VERSION"));

/// Everything needed to talk to the service, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub retry: RetryPolicy,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_runtime<R: Runtime + ?Sized>(runtime: &R) -> Result<Self> {
        let api_key = required(runtime, ENV_API_KEY)?;
        let token = required(runtime, ENV_TOKEN)?;
        debug!("Using credentials from {} and {}", ENV_API_KEY, ENV_TOKEN);

        let max_retries = optional_number(runtime, ENV_MAX_RETRIES)?
            .map(u32::try_from)
            .transpose()
            .with_context(|| format!("{} is too large", ENV_MAX_RETRIES))?
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let base_delay = optional_number(runtime, ENV_BASE_DELAY_MS)?.unwrap_or(DEFAULT_BASE_DELAY_MS);
        let max_delay = optional_number(runtime, ENV_MAX_DELAY_MS)?.unwrap_or(DEFAULT_MAX_DELAY_MS);
        if max_delay < base_delay {
            bail!(
                "{} ({}) must not be smaller than {} ({})",
                ENV_MAX_DELAY_MS,
                max_delay,
                ENV_BASE_DELAY_MS,
                base_delay
            );
        }
        let jitter = optional(runtime, ENV_RETRY_JITTER)?
            .map(|v| parse_flag(ENV_RETRY_JITTER, &v))
            .transpose()?
            .unwrap_or(false);

        let timeout_ms = optional_number(runtime, ENV_TIMEOUT_MS)?.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            bail!("{} must be greater than zero", ENV_TIMEOUT_MS);
        }

        let base_url = optional(runtime, ENV_API_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            credentials: Credentials::new(api_key, token),
            retry: RetryPolicy::new(
                max_retries,
                Duration::from_millis(base_delay),
                Duration::from_millis(max_delay),
            )
            .with_jitter(jitter),
            base_url,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(mut self, api_url: Option<String>, max_retries: Option<u32>) -> Self {
        if let Some(url) = api_url {
            self.base_url = url;
        }
        if let Some(max_retries) = max_retries {
            self.retry = RetryPolicy::new(max_retries, self.retry.base_delay(), self.retry.max_delay())
                .with_jitter(self.retry.jitter());
        }
        self
    }

    pub fn build_client(&self) -> Result<TrelloClient> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let http = HttpClient::new(
            client,
            &self.base_url,
            self.credentials.clone(),
            self.retry,
        )?;
        Ok(TrelloClient::new(http))
    }
}

fn optional<R: Runtime + ?Sized>(runtime: &R, key: &str) -> Result<Option<String>> {
    match runtime.env_var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", key)),
    }
}

fn required<R: Runtime + ?Sized>(runtime: &R, key: &str) -> Result<String> {
    optional(runtime, key)?.with_context(|| format!("{} is not set", key))
}

fn optional_number<R: Runtime + ?Sized>(runtime: &R, key: &str) -> Result<Option<u64>> {
    optional(runtime, key)?
        .map(|v| {
            v.parse::<u64>()
                .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, v))
        })
        .transpose()
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{} must be true or false, got {:?}", key, value),
    }
}
