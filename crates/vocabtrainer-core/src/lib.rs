//! vocabtrainer-core: word store, retrieval pipeline and mastery tracking.
//!
//! This crate holds the persisted vocabulary, the embedding lookup, candidate
//! retrieval, validation of every LLM response, and the session that ties the
//! stages together. LLM transport lives behind [`traits::LlmProvider`].

pub mod agents;
pub mod boundary;
pub mod embedding;
pub mod error;
pub mod import;
pub mod mastery;
pub mod model;
pub mod prompts;
pub mod quality;
pub mod query_log;
pub mod retriever;
pub mod session;
pub mod store;
pub mod traits;
