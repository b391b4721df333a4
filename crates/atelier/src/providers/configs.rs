use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SELECTOR_MODEL: &str = "gpt-4o";

/// Fixed wait before retrying a transient completion failure
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    pub retry_wait: Duration,
}

impl OpenAiProviderConfig {
    pub fn new(host: String, api_key: String, model: String) -> Self {
        Self {
            host,
            api_key,
            model,
            temperature: Some(0.0),
            max_tokens: None,
            retry_wait: DEFAULT_RETRY_WAIT,
        }
    }

    /// Read the provider configuration from the environment, using the
    /// worker model unless `ATELIER_MODEL` overrides it
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let host = env::var("OPENAI_HOST").unwrap_or_else(|_| OPENAI_HOST.to_string());
        let model = env::var("ATELIER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(host, api_key, model))
    }

    /// Same credentials, but the stronger model used for speaker selection
    pub fn selector_from_env() -> Result<Self> {
        let mut config = Self::from_env()?;
        config.model = env::var("ATELIER_SELECTOR_MODEL")
            .unwrap_or_else(|_| DEFAULT_SELECTOR_MODEL.to_string());
        Ok(config)
    }
}
