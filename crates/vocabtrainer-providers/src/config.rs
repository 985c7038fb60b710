//! Configuration loading and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use vocabtrainer_core::agents::AgentConfig;
use vocabtrainer_core::retriever::{RetrieverConfig, DEFAULT_MASTERY_THRESHOLD, DEFAULT_PER_KEYWORD};
use vocabtrainer_core::session::{SessionConfig, DEFAULT_NUM_QUESTIONS, DEFAULT_NUM_WORDS};
use vocabtrainer_core::traits::LlmProvider;

use crate::anthropic::AnthropicProvider;
use crate::mock::{MockProvider, MockRule};
use crate::openai::OpenAiProvider;
use crate::retry::RetryingProvider;

pub const CONFIG_FILE_NAME: &str = "vocabtrainer.toml";

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Mock {
        #[serde(default)]
        responses: Vec<MockRule>,
        #[serde(default)]
        default_response: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock {
                responses,
                default_response,
            } => f
                .debug_struct("Mock")
                .field("responses", &responses.len())
                .field("default_response", default_response)
                .finish(),
        }
    }
}

/// Top-level vocabtrainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Max retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds; doubles per retry.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// GloVe-format text file.
    #[serde(default = "default_embeddings_path")]
    pub embeddings_path: PathBuf,
    #[serde(default = "default_query_log_path")]
    pub query_log_path: PathBuf,
    #[serde(default = "default_num_words")]
    pub num_words: usize,
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
    #[serde(default = "default_per_keyword")]
    pub per_keyword: usize,
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: f64,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_database_path() -> PathBuf {
    PathBuf::from("./vocabtrainer-data/words.db")
}
fn default_embeddings_path() -> PathBuf {
    PathBuf::from("./vocabtrainer-data/glove.6B.50d.txt")
}
fn default_query_log_path() -> PathBuf {
    PathBuf::from("./vocabtrainer-data/queries.json")
}
fn default_num_words() -> usize {
    DEFAULT_NUM_WORDS
}
fn default_num_questions() -> usize {
    DEFAULT_NUM_QUESTIONS
}
fn default_per_keyword() -> usize {
    DEFAULT_PER_KEYWORD
}
fn default_mastery_threshold() -> f64 {
    DEFAULT_MASTERY_THRESHOLD
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            database_path: default_database_path(),
            embeddings_path: default_embeddings_path(),
            query_log_path: default_query_log_path(),
            num_words: default_num_words(),
            num_questions: default_num_questions(),
            per_keyword: default_per_keyword(),
            mastery_threshold: default_mastery_threshold(),
        }
    }
}

impl TrainerConfig {
    pub fn agent_config(&self, model_override: Option<&str>) -> AgentConfig {
        AgentConfig {
            model: model_override.unwrap_or(&self.default_model).to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            per_keyword: self.per_keyword,
            mastery_threshold: self.mastery_threshold,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            num_words: self.num_words,
            num_questions: self.num_questions,
        }
    }

    /// Build the named provider (or the default one) with retries applied.
    pub fn provider(&self, name: Option<&str>) -> Result<Box<dyn LlmProvider>> {
        let name = name.unwrap_or(&self.default_provider);
        let provider_config = self.providers.get(name).with_context(|| {
            format!("provider '{name}' is not configured (run `vocabtrainer init` for a sample config)")
        })?;
        let inner = create_provider(name, provider_config)?;
        Ok(Box::new(RetryingProvider::new(
            inner,
            self.max_retries,
            Duration::from_millis(self.retry_delay_ms),
        )))
    }

    fn validate(&self) -> Result<()> {
        if self.num_words == 0 || self.num_questions == 0 {
            anyhow::bail!("num_words and num_questions must be at least 1");
        }
        if self.per_keyword == 0 {
            anyhow::bail!("per_keyword must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.mastery_threshold) {
            anyhow::bail!(
                "mastery_threshold must be within [0, 1], got {}",
                self.mastery_threshold
            );
        }
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    // Substituted values are copied through as-is, never expanded again.
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        mock @ ProviderConfig::Mock { .. } => mock.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `vocabtrainer.toml` in the current directory
/// 2. `~/.config/vocabtrainer/config.toml`
///
/// Environment variable overrides: `VOCABTRAINER_OPENAI_KEY`, `VOCABTRAINER_ANTHROPIC_KEY`.
pub fn load_config() -> Result<TrainerConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<TrainerConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<TrainerConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => TrainerConfig::default(),
    };

    if let Ok(key) = std::env::var("VOCABTRAINER_ANTHROPIC_KEY") {
        let entry = config
            .providers
            .entry("anthropic".into())
            .or_insert(ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Anthropic { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("VOCABTRAINER_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    config.validate()?;
    if let Some(path) = &config_path {
        tracing::debug!("loaded config from {}", path.display());
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("vocabtrainer"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    let provider: Box<dyn LlmProvider> = match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            if api_key.is_empty() {
                anyhow::bail!("provider '{name}' has no API key");
            }
            Box::new(AnthropicProvider::new(api_key, base_url.clone())?)
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            if api_key.is_empty() {
                anyhow::bail!("provider '{name}' has no API key");
            }
            Box::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )?)
        }
        ProviderConfig::Mock {
            responses,
            default_response,
        } => {
            let mock = MockProvider::new(responses.clone());
            Box::new(match default_response {
                Some(response) => mock.with_default_response(response),
                None => mock,
            })
        }
    };
    Ok(provider)
}
