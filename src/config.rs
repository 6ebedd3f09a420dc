use std::{env, time::Duration};

use anyhow::{Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origin: Option<String>,
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub groq_model: String,
    pub gmail_api_base: String,
    pub pipeline: PipelineSettings,
}

/// Tunables handed to the extraction pipeline components.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub max_tokens: usize,
    pub rate_limit_cooldown: Duration,
    pub rate_limit_max_retries: u32,
    pub page_size: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            rate_limit_cooldown: Duration::from_secs(30),
            rate_limit_max_retries: 3,
            page_size: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let cors_allowed_origin = Some(
            env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        );
        let groq_api_key = env::var("GROQ_API_KEY").context("GROQ_API_KEY must be set")?;
        let groq_base_url =
            env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_GROQ_BASE_URL.to_string());
        let groq_model = env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_GROQ_MODEL.to_string());
        let gmail_api_base =
            env::var("GMAIL_API_BASE").unwrap_or_else(|_| DEFAULT_GMAIL_API_BASE.to_string());
        let pipeline = PipelineSettings::from_env()?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            cors_allowed_origin,
            groq_api_key,
            groq_base_url,
            groq_model,
            gmail_api_base,
            pipeline,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

impl PipelineSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let max_tokens = match env::var("EXTRACT_MAX_TOKENS") {
            Ok(value) => value
                .parse()
                .context("EXTRACT_MAX_TOKENS must be a positive integer")?,
            Err(_) => defaults.max_tokens,
        };
        let rate_limit_cooldown = match env::var("RATE_LIMIT_COOLDOWN_SECS") {
            Ok(value) => Duration::from_secs(
                value
                    .parse()
                    .context("RATE_LIMIT_COOLDOWN_SECS must be an integer")?,
            ),
            Err(_) => defaults.rate_limit_cooldown,
        };
        let rate_limit_max_retries = match env::var("RATE_LIMIT_MAX_RETRIES") {
            Ok(value) => value
                .parse()
                .context("RATE_LIMIT_MAX_RETRIES must be an integer")?,
            Err(_) => defaults.rate_limit_max_retries,
        };
        let page_size = match env::var("GMAIL_PAGE_SIZE") {
            Ok(value) => value
                .parse()
                .context("GMAIL_PAGE_SIZE must be an integer")?,
            Err(_) => defaults.page_size,
        };

        Ok(Self {
            max_tokens,
            rate_limit_cooldown,
            rate_limit_max_retries,
            page_size,
        })
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
