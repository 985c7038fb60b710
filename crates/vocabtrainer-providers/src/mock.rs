//! Mock provider for testing and offline runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vocabtrainer_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

/// Reply with `response` when the prompt contains `contains`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockRule {
    pub contains: String,
    pub response: String,
}

impl MockRule {
    pub fn new(contains: &str, response: &str) -> Self {
        Self {
            contains: contains.to_string(),
            response: response.to_string(),
        }
    }
}

/// A mock LLM provider that answers from prompt-matching rules.
///
/// Rules are checked in order against the user prompt and then the system
/// prompt; the first match wins.
pub struct MockProvider {
    rules: Vec<MockRule>,
    /// Returned when no rule matches.
    default_response: String,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    pub fn new(rules: Vec<MockRule>) -> Self {
        Self {
            rules,
            default_response: "{}".to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn respond(&self, request: &GenerateRequest) -> String {
        let system = request.system_prompt.as_deref().unwrap_or_default();
        self.rules
            .iter()
            .find(|rule| request.prompt.contains(&rule.contains))
            .or_else(|| self.rules.iter().find(|rule| system.contains(&rule.contains)))
            .map(|rule| rule.response.clone())
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let content = self.respond(request);
        let prompt_tokens = (request.prompt.len() / 4) as u32; // Rough estimate
        let completion_tokens = (content.len() / 4) as u32;

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                estimated_cost_usd: 0.0,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str, system: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            model: "mock-model".into(),
            prompt: prompt.into(),
            system_prompt: system.map(str::to_string),
            max_tokens: 100,
            temperature: 0.0,
            json_response: false,
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let provider = MockProvider::with_fixed_response("apple\ncar");
        let response = provider.generate(&request("anything", None)).await.unwrap();
        assert_eq!(response.content, "apple\ncar");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test]
    async fn first_matching_rule_wins() {
        let provider = MockProvider::new(vec![
            MockRule::new("Learner's goal", r#"{"exam": null, "topic": "fruit", "keywords": ["apple"]}"#),
            MockRule::new("Recommend", "apple"),
            MockRule::new("goal", "never reached"),
        ]);

        let resp = provider
            .generate(&request("Learner's goal: \"fruit\"", None))
            .await
            .unwrap();
        assert!(resp.content.contains("keywords"));

        let resp = provider
            .generate(&request("Recommend 7 words", None))
            .await
            .unwrap();
        assert_eq!(resp.content, "apple");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn system_prompt_is_a_fallback_match() {
        let provider = MockProvider::new(vec![MockRule::new("grade", r#"{"apple": 1.0}"#)])
            .with_default_response("unmatched");

        let resp = provider
            .generate(&request("Words tested: apple", Some("You grade answers.")))
            .await
            .unwrap();
        assert_eq!(resp.content, r#"{"apple": 1.0}"#);

        let resp = provider.generate(&request("hello", None)).await.unwrap();
        assert_eq!(resp.content, "unmatched");
    }
}
