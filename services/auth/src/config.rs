use serde::Deserialize;

use realworld_core::config::Config;

use crate::domain::types::DEFAULT_REFRESH_TOKEN_TTL_SECS;

/// Auth service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// Lifetime of a newly issued refresh token (default 7 days).
    /// Env var: `REFRESH_TOKEN_TTL_SECS`.
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: u64,
    /// Period between cleanup runs (default 1 hour). Env var: `CLEANUP_INTERVAL_SECS`.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Expired rows are kept this long past expiry before cleanup removes them.
    /// Env var: `CLEANUP_GRACE_SECS`.
    #[serde(default)]
    pub cleanup_grace_secs: u64,
}

impl Config for AuthConfig {}

fn default_refresh_token_ttl_secs() -> u64 {
    DEFAULT_REFRESH_TOKEN_TTL_SECS as u64
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

impl AuthConfig {
    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_ttl_secs as i64)
    }

    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn cleanup_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cleanup_grace_secs as i64)
    }
}
