use anyhow::Context;
use serde::Deserialize;

/// Process-level configuration, read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Shared secret callers must present in the `X-API-KEY` header.
    pub api_key: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_key: std::env::var("API_KEY").context("API_KEY must be set")?,
        })
    }
}
