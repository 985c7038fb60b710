//! LLM-backed pipeline stages.
//!
//! Each agent renders a prompt, makes exactly one provider call and hands the
//! raw text to its boundary validator. Nothing here re-prompts on bad output;
//! a malformed response surfaces as [`PipelineError::UpstreamFormat`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::boundary::intent::parse_intent;
use crate::boundary::quiz::{parse_quiz, Quiz, QuizItem};
use crate::boundary::scoring::{parse_scores, WordScores};
use crate::boundary::selection::{
    parse_selection_response, parse_word_list, render_candidate_table, render_vocab_table,
    validate_selection, Selection,
};
use crate::error::PipelineError;
use crate::model::{CandidateSet, Intent};
use crate::prompts;
use crate::store::WordStore;
use crate::traits::{GenerateRequest, GenerateResponse, LlmProvider};

/// Model settings shared by every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

async fn complete(
    provider: &dyn LlmProvider,
    config: &AgentConfig,
    stage: &'static str,
    system_prompt: &str,
    prompt: String,
    json_response: bool,
) -> Result<GenerateResponse, PipelineError> {
    let request = GenerateRequest {
        model: config.model.clone(),
        prompt,
        system_prompt: Some(system_prompt.to_string()),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        json_response,
    };
    let response = provider
        .generate(&request)
        .await
        .map_err(|error| PipelineError::Provider { stage, error })?;
    tracing::debug!(
        "{stage}: {} tokens in {}ms",
        response.token_usage.total_tokens,
        response.latency_ms
    );
    Ok(response)
}

/// Turns free-text goals into an [`Intent`].
pub struct GoalInterpreter {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl GoalInterpreter {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn interpret(&self, goal: &str) -> Result<Intent, PipelineError> {
        const STAGE: &str = "goal interpreter";
        let response = complete(
            self.provider.as_ref(),
            &self.config,
            STAGE,
            prompts::GOAL_SYSTEM_PROMPT,
            prompts::goal_prompt(goal),
            true,
        )
        .await?;
        parse_intent(&response.content).map_err(|e| PipelineError::format(STAGE, e))
    }
}

/// Picks the words to study from a candidate set.
pub struct WordSelector {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl WordSelector {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Ask for `k` words and keep only those the store knows.
    #[instrument(skip(self, candidates, store), fields(candidates = candidates.len()))]
    pub async fn select(
        &self,
        candidates: &CandidateSet,
        k: usize,
        store: &WordStore,
    ) -> Result<Selection, PipelineError> {
        let response = complete(
            self.provider.as_ref(),
            &self.config,
            "word selector",
            prompts::SELECT_SYSTEM_PROMPT,
            prompts::selection_prompt(&render_candidate_table(candidates), k),
            false,
        )
        .await?;
        let words = parse_selection_response(&response.content);
        let selection = validate_selection(words, k, store)?;
        if selection.words.len() < k {
            tracing::info!("selector returned {} of {k} requested words", selection.words.len());
        }
        Ok(selection)
    }
}

/// Single-call selector that sees the goal and the whole store, with no
/// interpretation or retrieval. A reference point for `evaluate`.
pub struct BaselineSelector {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl BaselineSelector {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Returned words are not checked against the store.
    #[instrument(skip(self, store))]
    pub async fn select(
        &self,
        goal: &str,
        k: usize,
        store: &WordStore,
    ) -> Result<Vec<String>, PipelineError> {
        const STAGE: &str = "baseline selector";
        let table = render_vocab_table(&store.query_all()?);
        let response = complete(
            self.provider.as_ref(),
            &self.config,
            STAGE,
            prompts::BASELINE_SYSTEM_PROMPT,
            prompts::baseline_prompt(&table, goal, k),
            true,
        )
        .await?;
        parse_word_list(&response.content, k).map_err(|e| PipelineError::format(STAGE, e))
    }
}

/// Writes quizzes for a word list.
pub struct QuizBuilder {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl QuizBuilder {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    #[instrument(skip(self, words), fields(words = words.len()))]
    pub async fn build(&self, words: &[String], num_questions: usize) -> Result<Quiz, PipelineError> {
        const STAGE: &str = "quiz builder";
        let response = complete(
            self.provider.as_ref(),
            &self.config,
            STAGE,
            prompts::QUIZ_SYSTEM_PROMPT,
            prompts::quiz_prompt(words, num_questions),
            true,
        )
        .await?;
        parse_quiz(&response.content, words).map_err(|e| PipelineError::format(STAGE, e))
    }
}

/// Grades one answer into per-word ratings.
pub struct AnswerScorer {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl AnswerScorer {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    #[instrument(skip(self, item, answer), fields(kind = item.kind()))]
    pub async fn score(&self, item: &QuizItem, answer: &str) -> Result<WordScores, PipelineError> {
        const STAGE: &str = "answer scorer";
        let response = complete(
            self.provider.as_ref(),
            &self.config,
            STAGE,
            prompts::SCORE_SYSTEM_PROMPT,
            prompts::scoring_prompt(item, answer),
            true,
        )
        .await?;
        parse_scores(&response.content, item).map_err(|e| PipelineError::format(STAGE, e))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;
    use crate::boundary::quiz::ScenarioBased;
    use crate::model::{Candidate, CefrLevel, ExamFlags};

    fn agent_config() -> AgentConfig {
        AgentConfig {
            model: "test-model".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn interpreter_parses_intent() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            r#"{"exam": "ielts", "topic": "Travel", "keywords": ["Airport"]}"#,
        ]));
        let agent = GoalInterpreter::new(provider.clone(), agent_config());
        let intent = agent.interpret("IELTS travel words").await.unwrap();
        assert_eq!(intent.exam.as_deref(), Some("IELTS"));
        assert_eq!(intent.keywords, vec!["airport"]);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert!(requests[0].json_response);
        assert!(requests[0].prompt.contains("IELTS travel words"));
    }

    #[tokio::test]
    async fn interpreter_does_not_reprompt_on_bad_output() {
        let provider = Arc::new(ScriptedProvider::new(vec!["I think you want travel words."]));
        let agent = GoalInterpreter::new(provider.clone(), agent_config());
        let err = agent.interpret("travel").await.unwrap_err();
        assert!(err.is_upstream_format());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_not_a_format_error() {
        let provider = Arc::new(ScriptedProvider::failing("connection reset"));
        let agent = GoalInterpreter::new(provider, agent_config());
        let err = agent.interpret("travel").await.unwrap_err();
        assert!(!err.is_upstream_format());
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn selector_validates_against_store() {
        let store = WordStore::open_in_memory().unwrap();
        for (i, word) in ["apple", "banana", "cherry"].iter().enumerate() {
            store
                .add(word, &[1.0, i as f32], CefrLevel::A2, ExamFlags::default())
                .unwrap();
        }
        let candidates: CandidateSet = ["apple", "banana", "cherry"]
            .iter()
            .map(|w| Candidate {
                word: w.to_string(),
                cefr_level: CefrLevel::A2,
                understanding_rating: 0.0,
            })
            .collect();

        let provider = Arc::new(ScriptedProvider::new(vec!["banana\ndragonfruit\napple\ncherry"]));
        let agent = WordSelector::new(provider.clone(), agent_config());
        let selection = agent.select(&candidates, 2, &store).await.unwrap();
        assert_eq!(selection.words, vec!["banana", "apple"]);
        assert_eq!(selection.discarded, vec!["dragonfruit"]);

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("cherry, A2, 0.00"));
        assert!(!requests[0].json_response);
    }

    #[tokio::test]
    async fn baseline_sees_whole_store_and_keeps_unknown_words() {
        let store = WordStore::open_in_memory().unwrap();
        store
            .add("apple", &[1.0, 0.0], CefrLevel::A1, ExamFlags::default())
            .unwrap();
        store
            .add("car", &[0.0, 1.0], CefrLevel::A2, ExamFlags { ielts: true, gre: false })
            .unwrap();

        let provider = Arc::new(ScriptedProvider::new(vec![
            r#"{"words": ["Apple", "unicorn", "car"]}"#,
        ]));
        let agent = BaselineSelector::new(provider.clone(), agent_config());
        let words = agent.select("fruit words", 2, &store).await.unwrap();
        assert_eq!(words, vec!["apple", "unicorn"]);

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].json_response);
        assert!(requests[0].prompt.contains("fruit words"));
        assert!(requests[0].prompt.contains("apple, A1, 0.00, 0, 0"));
        assert!(requests[0].prompt.contains("car, A2, 0.00, 1, 0"));
    }

    #[tokio::test]
    async fn quiz_builder_rejects_unselected_words() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            r#"{"short-answer": [{"word": "pear", "question": "What is a pear?"}]}"#,
        ]));
        let agent = QuizBuilder::new(provider, agent_config());
        let err = agent.build(&["apple".to_string()], 1).await.unwrap_err();
        assert!(err.is_upstream_format());
    }

    #[tokio::test]
    async fn scorer_returns_ratings() {
        let provider = Arc::new(ScriptedProvider::new(vec!["```json\n{\"apple\": 0.9}\n```"]));
        let agent = AnswerScorer::new(provider, agent_config());
        let item = QuizItem::ScenarioBased(ScenarioBased {
            word: "apple".into(),
            scenario: "At the market.".into(),
            question: "Ask for a fruit.".into(),
            answer: "An apple, please.".into(),
        });
        let scores = agent.score(&item, "One apple please").await.unwrap();
        assert_eq!(scores.get("apple"), Some(&0.9));
    }
}
