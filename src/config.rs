use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Credentials checked on every protected request.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub api_key: String,
    /// Browser origin allowed to call the API; `*` allows any.
    pub allowed_origin: String,
}

// Keep the secret out of startup logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &"<redacted>")
            .field("allowed_origin", &self.allowed_origin)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub probe_concurrency: usize,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://duckduckgo.com".to_string(),
            timeout_secs: 15,
            probe_timeout_secs: 5,
            probe_concurrency: 8,
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("API_KEY must be set"))?;

        let defaults = SearchConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&lookup, "PORT", 8000)?,
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            },
            auth: AuthConfig {
                api_key,
                allowed_origin: lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "*".to_string()),
            },
            search: SearchConfig {
                base_url: lookup("DDG_BASE_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.base_url),
                timeout_secs: parse_or(&lookup, "SEARCH_TIMEOUT_SECS", defaults.timeout_secs)?,
                probe_timeout_secs: parse_or(
                    &lookup,
                    "PROBE_TIMEOUT_SECS",
                    defaults.probe_timeout_secs,
                )?,
                probe_concurrency: parse_or(
                    &lookup,
                    "PROBE_CONCURRENCY",
                    defaults.probe_concurrency,
                )?
                .max(1),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
