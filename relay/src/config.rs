//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup into an immutable [`Config`] that is
//! handed to each component; nothing reads the environment afterwards.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

use crate::error::RelayError;
use crate::webhook::UnsignedWebhookPolicy;

/// Default GraphQL endpoint of the provider.
pub const DEFAULT_API_URL: &str = "https://api.fireflies.ai/graphql";

/// Default route the provider calls back on.
pub const DEFAULT_WEBHOOK_PATH: &str = "/fireflies-webhook";

/// Routes the webhook receiver cannot be mounted on.
const RESERVED_PATHS: [&str; 3] = ["/", "/health", "/transcribe"];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Bearer credential for the provider API
    pub api_key: Option<String>,

    /// Provider GraphQL endpoint
    pub api_url: String,

    /// Shared secret for webhook HMAC verification
    pub webhook_secret: Option<String>,

    /// Publicly reachable base URL used to build the callback URL
    pub server_base_url: Option<String>,

    /// Route the webhook receiver is mounted on
    pub webhook_path: String,

    /// What to do with webhooks that carry no signature header
    pub unsigned_webhooks: UnsignedWebhookPolicy,

    /// Language code sent with submissions unless the caller overrides it
    pub default_language: String,

    /// Outbound HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_number("PORT", 3001),

            api_key: non_empty("FIREFLIES_API_KEY"),

            api_url: non_empty("FIREFLIES_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),

            webhook_secret: non_empty("WEBHOOK_SECRET"),

            server_base_url: non_empty("SERVER_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),

            webhook_path: resolve_webhook_path(non_empty("WEBHOOK_PATH").as_deref()),

            unsigned_webhooks: parse_policy("WEBHOOK_UNSIGNED_POLICY"),

            default_language: non_empty("TRANSCRIPT_LANGUAGE").unwrap_or_else(|| "es".to_string()),

            request_timeout_ms: parse_number("REQUEST_TIMEOUT_MS", 30_000),
        }
    }

    /// URL the provider should call when a transcription finishes.
    pub fn callback_url(&self) -> Result<String, RelayError> {
        let base = self.server_base_url.as_deref().ok_or_else(|| {
            RelayError::Configuration(
                "SERVER_BASE_URL is not set; the provider has no public URL to notify".to_string(),
            )
        })?;
        Ok(format!("{}{}", base, self.webhook_path))
    }

    /// Problems that do not stop the server but will break part of the flow.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();

        if self.api_key.is_none() {
            warnings.push("FIREFLIES_API_KEY is not set; every provider call will fail");
        }
        if self.webhook_secret.is_none() {
            warnings.push("WEBHOOK_SECRET is not set; signed webhooks cannot be verified");
        }
        match self.server_base_url.as_deref() {
            None => warnings.push(
                "SERVER_BASE_URL is not set; /transcribe cannot build a callback URL",
            ),
            Some(base) if points_at_localhost(base) => warnings.push(
                "SERVER_BASE_URL points at localhost; the provider cannot reach it without a public tunnel",
            ),
            Some(_) => {}
        }
        if self.unsigned_webhooks == UnsignedWebhookPolicy::Accept {
            warnings.push("WEBHOOK_UNSIGNED_POLICY=accept; unsigned webhooks are processed unverified");
        }

        warnings
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    let raw = match non_empty(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, default = %default, "Invalid number, using default");
            default
        }
    }
}

fn parse_policy(name: &str) -> UnsignedWebhookPolicy {
    let raw = match non_empty(name) {
        Some(v) => v,
        None => return UnsignedWebhookPolicy::default(),
    };

    match raw.parse() {
        Ok(policy) => policy,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid webhook policy, using default");
            UnsignedWebhookPolicy::default()
        }
    }
}

/// Ensure a route path starts with exactly one slash and has no trailing one.
fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    format!("/{}", trimmed)
}

/// Normalized webhook route; falls back to the default when the configured
/// one would collide with another route.
fn resolve_webhook_path(raw: Option<&str>) -> String {
    let path = normalize_path(raw.unwrap_or(DEFAULT_WEBHOOK_PATH));
    if RESERVED_PATHS.contains(&path.as_str()) {
        warn!(env_var = "WEBHOOK_PATH", value = %path, default = DEFAULT_WEBHOOK_PATH, "Reserved webhook path, using default");
        return DEFAULT_WEBHOOK_PATH.to_string();
    }
    path
}

fn points_at_localhost(base: &str) -> bool {
    url::Url::parse(base)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .map(|host| host == "localhost" || host == "127.0.0.1" || host == "[::1]")
        .unwrap_or_else(|| base.contains("localhost"))
}
