use crate::autofill::{AutofillConfig, DEFAULT_GENERATION_TIMEOUT};
use crate::chat::ChatCompletionClient;
use crate::llm::{CannedResponder, TextGenerator};
use crate::profile::{AiService, Options};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEEPSEEK_KEY_VAR: &str = "DEEPSEEK_API_KEY";
pub const TIMEOUT_VAR: &str = "JOB_AUTOFILL_TIMEOUT_SECS";
pub const STORE_VAR: &str = "JOB_AUTOFILL_STORE";
pub const DEFAULT_STORE_PATH: &str = "job-autofill.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings threaded into the autofill run. Nothing here is global; each run
/// receives the configuration it should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub service: AiService,
    pub generation_timeout: Duration,
    pub store_path: PathBuf,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            service: AiService::default(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl AssistantConfig {
    /// Reads `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = var(OPENAI_KEY_VAR) {
            config.api_key = Some(key);
            config.service = AiService::OpenAi;
        } else if let Some(key) = var(DEEPSEEK_KEY_VAR) {
            config.api_key = Some(key);
            config.service = AiService::DeepSeek;
        }

        if let Some(value) = var(TIMEOUT_VAR) {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: TIMEOUT_VAR,
                    value: value.clone(),
                })?;
            config.generation_timeout = Duration::from_secs(secs);
        }

        if let Some(path) = var(STORE_VAR) {
            config.store_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Stored options win over the environment when they carry a key.
    pub fn with_options(mut self, options: &Options) -> Self {
        if let Some(key) = options.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key.to_string());
            self.service = options.service.unwrap_or_default();
        } else if let Some(service) = options.service {
            self.service = service;
        }
        self
    }

    pub fn without_ai(mut self) -> Self {
        self.api_key = None;
        self
    }

    /// Remote client when a key is configured, canned answers otherwise.
    pub fn generator(&self) -> Arc<dyn TextGenerator> {
        let Some(key) = self.api_key.as_deref() else {
            info!("No API key configured, using canned answers");
            return Arc::new(CannedResponder);
        };
        match ChatCompletionClient::new(key, self.service) {
            Ok(client) => {
                info!("Using {} for essay answers", self.service);
                Arc::new(client)
            }
            Err(e) => {
                warn!("Failed to create {} client, using canned answers: {}", self.service, e);
                Arc::new(CannedResponder)
            }
        }
    }

    pub fn autofill_config(&self) -> AutofillConfig {
        AutofillConfig {
            generation_timeout: self.generation_timeout,
        }
    }
}
