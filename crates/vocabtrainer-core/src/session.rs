//! A study session: goal in, quiz out, answers back into the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::{AgentConfig, AnswerScorer, GoalInterpreter, QuizBuilder, WordSelector};
use crate::boundary::quiz::{Quiz, QuizItem};
use crate::boundary::selection::Selection;
use crate::error::PipelineError;
use crate::mastery::{apply_scores, MasteryReport};
use crate::model::{CandidateSet, Intent};
use crate::query_log::QueryLog;
use crate::retriever::{CandidateRetriever, Retrieval};
use crate::store::WordStore;
use crate::traits::LlmProvider;

/// Default number of words picked per session.
pub const DEFAULT_NUM_WORDS: usize = 7;
/// Default number of quiz questions per session.
pub const DEFAULT_NUM_QUESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub num_words: usize,
    pub num_questions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            num_words: DEFAULT_NUM_WORDS,
            num_questions: DEFAULT_NUM_QUESTIONS,
        }
    }
}

/// Everything produced while planning a quiz for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedQuiz {
    pub goal: String,
    /// `None` when the candidates came from the query log.
    pub intent: Option<Intent>,
    pub candidates: CandidateSet,
    pub selection: Selection,
    pub quiz: Quiz,
}

impl PlannedQuiz {
    pub fn from_cache(&self) -> bool {
        self.intent.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Quiz(PlannedQuiz),
    /// Every word relevant to the goal is already learned.
    AllWordsMastered,
}

pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    store: WordStore,
    retriever: CandidateRetriever,
    query_log: QueryLog,
    interpreter: GoalInterpreter,
    selector: WordSelector,
    quiz_builder: QuizBuilder,
    scorer: AnswerScorer,
    config: SessionConfig,
}

impl Session {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        agent_config: AgentConfig,
        store: WordStore,
        retriever: CandidateRetriever,
        query_log: QueryLog,
        config: SessionConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        tracing::info!("session {id} started with provider {}", provider.name());
        Self {
            id,
            started_at: Utc::now(),
            store,
            retriever,
            query_log,
            interpreter: GoalInterpreter::new(provider.clone(), agent_config.clone()),
            selector: WordSelector::new(provider.clone(), agent_config.clone()),
            quiz_builder: QuizBuilder::new(provider.clone(), agent_config.clone()),
            scorer: AnswerScorer::new(provider, agent_config),
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn store(&self) -> &WordStore {
        &self.store
    }

    /// Build a quiz for `goal`.
    ///
    /// A goal seen before reuses the logged candidates and skips both the
    /// interpreter and retrieval.
    pub async fn plan(&mut self, goal: &str) -> Result<PlanOutcome, PipelineError> {
        let (intent, candidates) = match self.query_log.lookup(goal) {
            Some(entry) => {
                tracing::info!(
                    "reusing {} logged candidates for goal (logged {})",
                    entry.candidates.len(),
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
                (None, entry.candidates.clone())
            }
            None => {
                let intent = self.interpreter.interpret(goal).await?;
                tracing::info!(
                    "goal interpreted: exam={:?} topic={:?} keywords={:?}",
                    intent.exam,
                    intent.topic,
                    intent.keywords
                );
                let candidates = match self.retriever.retrieve(&self.store, &intent)? {
                    Retrieval::Candidates(set) => set,
                    Retrieval::AllWordsMastered => return Ok(PlanOutcome::AllWordsMastered),
                };
                if let Err(e) = self.query_log.record(goal, candidates.clone()) {
                    tracing::warn!("failed to write query log: {e}");
                }
                (Some(intent), candidates)
            }
        };

        let selection = self
            .selector
            .select(&candidates, self.config.num_words, &self.store)
            .await?;
        let quiz = self
            .quiz_builder
            .build(&selection.words, self.config.num_questions)
            .await?;
        tracing::info!(
            "session {}: {} words, {} questions",
            self.id,
            selection.words.len(),
            quiz.len()
        );

        Ok(PlanOutcome::Quiz(PlannedQuiz {
            goal: goal.trim().to_string(),
            intent,
            candidates,
            selection,
            quiz,
        }))
    }

    /// Score `answer` to `item` and write the ratings back.
    pub async fn submit(&self, item: &QuizItem, answer: &str) -> Result<MasteryReport, PipelineError> {
        let scores = self.scorer.score(item, answer).await?;
        let report = apply_scores(&self.store, &scores)?;
        for rejected in report.rejected() {
            tracing::debug!("session {}: no update for '{}'", self.id, rejected.word());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedProvider;
    use crate::embedding::{Embedder, EmbeddingTable};
    use crate::model::{CefrLevel, ExamFlags};
    use crate::retriever::RetrieverConfig;

    const INTENT: &str = r#"{"exam": null, "topic": "fruit", "keywords": ["apple"]}"#;
    const QUIZ: &str = r#"{"scenario-based": [{"word": "apple", "scenario": "At the market.", "question": "Ask for a fruit.", "answer": "An apple, please."}]}"#;

    fn session(responses: Vec<&str>, log: QueryLog) -> (Session, Arc<ScriptedProvider>) {
        let table =
            EmbeddingTable::from_pairs([("apple", vec![1.0, 0.0]), ("car", vec![0.0, 1.0])]).unwrap();
        let embedder = Embedder::new(Arc::new(table));
        let store = WordStore::open_in_memory().unwrap();
        for word in ["apple", "car"] {
            store
                .add(word, &embedder.encode(word), CefrLevel::A1, ExamFlags::default())
                .unwrap();
        }
        let provider = Arc::new(ScriptedProvider::new(responses));
        let session = Session::new(
            provider.clone(),
            AgentConfig::default(),
            store,
            CandidateRetriever::new(embedder, RetrieverConfig::default()),
            log,
            SessionConfig {
                num_words: 1,
                num_questions: 1,
            },
        );
        (session, provider)
    }

    #[tokio::test]
    async fn plans_and_scores_a_quiz() {
        let (mut session, _) = session(
            vec![INTENT, "apple", QUIZ, r#"{"apple": 0.9}"#],
            QueryLog::in_memory(),
        );

        let PlanOutcome::Quiz(planned) = session.plan("fruit words").await.unwrap() else {
            panic!("expected a quiz");
        };
        assert!(planned.candidates.contains("apple"));
        assert!(!planned.from_cache());
        assert_eq!(planned.selection.words, vec!["apple"]);
        assert_eq!(planned.quiz.len(), 1);

        let report = session
            .submit(&planned.quiz.items[0], "An apple please")
            .await
            .unwrap();
        assert_eq!(report.feedback("apple"), 0.9);

        let apple = session
            .store()
            .query_all()
            .unwrap()
            .into_iter()
            .find(|e| e.word == "apple")
            .unwrap();
        assert_eq!(apple.understanding_rating, 0.9);
    }

    #[tokio::test]
    async fn repeated_goal_skips_interpretation() {
        let (mut session, provider) = session(
            vec![INTENT, "apple", QUIZ, "apple", QUIZ],
            QueryLog::in_memory(),
        );
        session.plan("fruit words").await.unwrap();
        assert_eq!(provider.call_count(), 3);

        let PlanOutcome::Quiz(planned) = session.plan("fruit words").await.unwrap() else {
            panic!("expected a quiz");
        };
        assert!(planned.from_cache());
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn all_mastered_is_not_an_error() {
        let (mut session, provider) = session(vec![INTENT], QueryLog::in_memory());
        session
            .store()
            .update_understanding_rating("apple", 0.9)
            .unwrap();
        session
            .store()
            .update_understanding_rating("car", 0.9)
            .unwrap();

        let outcome = session.plan("fruit words").await.unwrap();
        assert_eq!(outcome, PlanOutcome::AllWordsMastered);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_keywords_mean_all_mastered() {
        let (mut session, provider) = session(
            vec![r#"{"exam": null, "topic": null, "keywords": []}"#],
            QueryLog::in_memory(),
        );
        let outcome = session.plan("nothing in particular").await.unwrap();
        assert_eq!(outcome, PlanOutcome::AllWordsMastered);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_intent_is_a_format_error() {
        let (mut session, _) = session(vec!["[\"apple\"]"], QueryLog::in_memory());
        let err = session.plan("fruit words").await.unwrap_err();
        assert!(err.is_upstream_format());
    }

    #[tokio::test]
    async fn scorer_missing_a_word_leaves_ratings_alone() {
        let (mut session, _) = session(
            vec![INTENT, "apple", QUIZ, r#"{"car": 0.4}"#],
            QueryLog::in_memory(),
        );
        let PlanOutcome::Quiz(planned) = session.plan("fruit words").await.unwrap() else {
            panic!("expected a quiz");
        };
        let err = session
            .submit(&planned.quiz.items[0], "no idea")
            .await
            .unwrap_err();
        assert!(err.is_upstream_format());
        assert_eq!(
            session.store().get("car").unwrap().unwrap().understanding_rating,
            0.0
        );
    }
}
