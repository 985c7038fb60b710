//! vocabtrainer-providers: LLM provider integrations.
//!
//! Implements the `LlmProvider` trait for OpenAI and Anthropic plus a
//! scripted mock, wraps any of them in a retry layer, and loads the
//! `vocabtrainer.toml` configuration.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod mock;
pub mod openai;
pub mod retry;

pub use config::{create_provider, load_config, ProviderConfig, TrainerConfig};
pub use error::ProviderError;
pub use retry::RetryingProvider;
