use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_IDLE_MINUTES: u64 = 30;

/// Runtime configuration, read from the environment (and `.env` in development).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub upload_dir: PathBuf,
    /// Origin used to build absolute `file_url`s for stored uploads.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = get("DATABASE_URL")
            .context("DATABASE_URL must be set (copy .env.example to .env)")?;

        let port = parse_or(&get, "PORT", DEFAULT_PORT)?;
        let max_upload_bytes = parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let idle_minutes = parse_or(&get, "SESSION_IDLE_MINUTES", DEFAULT_IDLE_MINUTES)?;

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            database_url,
            port,
            ollama_base_url: get("OLLAMA_API_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./uploads")),
            public_base_url,
            max_upload_bytes,
            session_idle_timeout: Duration::from_secs(idle_minutes * 60),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
