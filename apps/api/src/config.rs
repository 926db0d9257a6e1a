use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::retry::RetryPolicy;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a numeric one does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub resource_catalog_path: PathBuf,
    pub llm_max_attempts: u32,
    pub llm_retry_delay_ms: u64,
    pub llm_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_max_attempts: u32 = parse_env_or("LLM_MAX_ATTEMPTS", 3)?;
        if llm_max_attempts == 0 {
            anyhow::bail!("LLM_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            port: parse_env_or("PORT", 3001)?,
            rust_log: env_or("RUST_LOG", "info"),
            resource_catalog_path: PathBuf::from(env_or("RESOURCE_CATALOG_PATH", "resources.json")),
            llm_max_attempts,
            llm_retry_delay_ms: parse_env_or("LLM_RETRY_DELAY_MS", 4000)?,
            llm_timeout_secs: parse_env_or("LLM_TIMEOUT_SECS", 120)?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.llm_max_attempts,
            base_delay: Duration::from_millis(self.llm_retry_delay_ms),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
