use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails with context if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub completion_api_key: String,
    pub completion_base_url: String,
    pub primary_model: String,
    pub secondary_model: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            completion_api_key: require_env("COMPLETION_API_KEY")?,
            completion_base_url: std::env::var("COMPLETION_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            primary_model: std::env::var("PRIMARY_MODEL")
                .unwrap_or_else(|_| "gpt-4o".to_string()),
            secondary_model: std::env::var("SECONDARY_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
