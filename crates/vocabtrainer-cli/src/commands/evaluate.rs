//! The `vocabtrainer evaluate` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use vocabtrainer_core::agents::{BaselineSelector, GoalInterpreter, WordSelector};
use vocabtrainer_core::embedding::{Embedder, EmbeddingTable};
use vocabtrainer_core::quality::{evaluate_selection, SelectionQuality};
use vocabtrainer_core::retriever::{CandidateRetriever, Retrieval};
use vocabtrainer_core::store::WordStore;
use vocabtrainer_core::traits::LlmProvider;

pub async fn execute(
    goal: String,
    words: Option<usize>,
    baseline: bool,
    provider_name: Option<String>,
    model: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = vocabtrainer_providers::config::load_config_from(config_path.as_deref())?;
    let k = words.unwrap_or(config.num_words);
    if k == 0 {
        anyhow::bail!("--words must be at least 1");
    }
    if goal.trim().is_empty() {
        anyhow::bail!("goal must not be empty");
    }

    let provider: Arc<dyn LlmProvider> = Arc::from(config.provider(provider_name.as_deref())?);
    let agent_config = config.agent_config(model.as_deref());

    let store = WordStore::open(&config.database_path)
        .with_context(|| format!("failed to open store: {}", config.database_path.display()))?;
    if store.is_empty()? {
        anyhow::bail!("the word store is empty; run `vocabtrainer import` first");
    }
    let table = EmbeddingTable::load(&config.embeddings_path).with_context(|| {
        format!("failed to load embeddings: {}", config.embeddings_path.display())
    })?;
    let embedder = Embedder::new(Arc::new(table));
    let retriever = CandidateRetriever::new(embedder.clone(), config.retriever_config());

    let intent = GoalInterpreter::new(provider.clone(), agent_config.clone())
        .interpret(&goal)
        .await?;
    println!(
        "Intent: exam {}, topic {}, keywords [{}]",
        intent.exam.as_deref().unwrap_or("-"),
        intent.topic.as_deref().unwrap_or("-"),
        intent.keywords.join(", ")
    );

    let mut rows: Vec<(&str, Vec<String>, SelectionQuality)> = Vec::new();

    match retriever.retrieve(&store, &intent)? {
        Retrieval::Candidates(candidates) => {
            let selection = WordSelector::new(provider.clone(), agent_config.clone())
                .select(&candidates, k, &store)
                .await?;
            let quality = evaluate_selection(&selection.words, &intent, &store, &embedder)?;
            rows.push(("pipeline", selection.words, quality));
        }
        Retrieval::AllWordsMastered => {
            println!("Pipeline: every word for this goal is already mastered.");
        }
    }

    if baseline {
        let words = BaselineSelector::new(provider, agent_config)
            .select(&goal, k, &store)
            .await?;
        let quality = evaluate_selection(&words, &intent, &store, &embedder)?;
        rows.push(("baseline", words, quality));
    }

    if rows.is_empty() {
        return Ok(());
    }
    println!("{}", quality_table(&rows));
    Ok(())
}

fn quality_table(rows: &[(&str, Vec<String>, SelectionQuality)]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Strategy",
        "Words",
        "Known",
        "Similarity",
        "CEFR",
        "Exam",
        "Memory",
        "Overall",
    ]);
    for (strategy, words, q) in rows {
        table.add_row(vec![
            Cell::new(strategy),
            Cell::new(words.join(", ")),
            Cell::new(format!("{:.2}", q.hallucination_scalar)),
            Cell::new(format!("{:.2}", q.similarity)),
            Cell::new(format!("{:.2}", q.cefr_balance)),
            Cell::new(format!("{:.2}", q.exam_hit_rate)),
            Cell::new(format!("{:.2}", q.memory)),
            Cell::new(format!("{:.2}", q.overall)),
        ]);
    }
    table
}
