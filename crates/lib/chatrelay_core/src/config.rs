//! Runtime configuration for providers and the message store.
//!
//! Read once at startup. Parsing goes through a lookup function so tests can
//! supply variables without touching the process environment.

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MISTRAL_MODEL: &str = "mistral-medium-latest";
const DEFAULT_MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Configuration errors. Any of these stops the server before it binds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Credentials and endpoint for one AI provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

// Keep API keys out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Where messages are persisted.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Direct PostgreSQL connection.
    Postgres { database_url: String },
    /// Supabase REST endpoint.
    Supabase { url: String, key: String },
    /// Process memory; development only.
    Memory,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Postgres { .. } => f.write_str("Postgres"),
            StoreConfig::Supabase { url, .. } => {
                f.debug_struct("Supabase").field("url", url).finish_non_exhaustive()
            }
            StoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

/// Provider and store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Primary provider.
    pub gemini: ProviderConfig,
    /// Secondary provider.
    pub mistral: ProviderConfig,
    pub store: StoreConfig,
    /// Total budget for one provider request.
    pub provider_timeout: Duration,
    /// Budget for one store request (pool acquire for PostgreSQL).
    pub store_timeout: Duration,
}

impl RelayConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                | Default                                            |
    /// |-------------------------|----------------------------------------------------|
    /// | `GOOGLE_API_KEY`        | required                                           |
    /// | `MISTRAL_API_KEY`       | required                                           |
    /// | `DATABASE_URL`          | one of this or `SUPABASE_URL` + `SUPABASE_KEY`     |
    /// | `GEMINI_MODEL`          | `gemini-2.5-flash`                                 |
    /// | `GEMINI_BASE_URL`       | `https://generativelanguage.googleapis.com/v1beta` |
    /// | `MISTRAL_MODEL`         | `mistral-medium-latest`                            |
    /// | `MISTRAL_BASE_URL`      | `https://api.mistral.ai/v1`                        |
    /// | `PROVIDER_TIMEOUT_SECS` | `30`                                               |
    /// | `STORE_TIMEOUT_SECS`    | `10`                                               |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key: &str| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but with a fixed store, skipping
    /// store credentials.
    pub fn from_env_with_store(store: StoreConfig) -> Result<Self, ConfigError> {
        Self::resolve(&|key: &str| env::var(key).ok(), Some(store))
    }

    /// Resolve configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve(&lookup, None)
    }

    fn resolve<F>(lookup: &F, store: Option<StoreConfig>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini = ProviderConfig {
            api_key: required(lookup, "GOOGLE_API_KEY")?,
            model: optional(lookup, "GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            base_url: optional(lookup, "GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
        };
        let mistral = ProviderConfig {
            api_key: required(lookup, "MISTRAL_API_KEY")?,
            model: optional(lookup, "MISTRAL_MODEL", DEFAULT_MISTRAL_MODEL),
            base_url: optional(lookup, "MISTRAL_BASE_URL", DEFAULT_MISTRAL_BASE_URL),
        };
        let store = match store {
            Some(store) => store,
            None => resolve_store(lookup)?,
        };

        Ok(Self {
            gemini,
            mistral,
            store,
            provider_timeout: seconds(
                lookup,
                "PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )?,
            store_timeout: seconds(lookup, "STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?,
        })
    }
}

/// `DATABASE_URL` wins; otherwise both Supabase variables are required.
fn resolve_store<F>(lookup: &F) -> Result<StoreConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(database_url) = present(lookup, "DATABASE_URL") {
        return Ok(StoreConfig::Postgres { database_url });
    }
    match (present(lookup, "SUPABASE_URL"), present(lookup, "SUPABASE_KEY")) {
        (Some(url), Some(key)) => Ok(StoreConfig::Supabase { url, key }),
        (Some(_), None) => Err(ConfigError::Missing("SUPABASE_KEY".into())),
        (None, Some(_)) => Err(ConfigError::Missing("SUPABASE_URL".into())),
        (None, None) => Err(ConfigError::Missing(
            "DATABASE_URL or SUPABASE_URL/SUPABASE_KEY".into(),
        )),
    }
}

/// Trimmed, non-empty value of `key`.
fn present<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    present(lookup, key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn optional<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    present(lookup, key).unwrap_or_else(|| default.to_string())
}

fn seconds<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = present(lookup, key) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var: key.to_string(),
            reason: "must be greater than zero".into(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
    }
}
