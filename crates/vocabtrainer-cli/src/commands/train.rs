//! The `vocabtrainer train` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use vocabtrainer_core::boundary::quiz::QuizItem;
use vocabtrainer_core::embedding::{Embedder, EmbeddingTable};
use vocabtrainer_core::prompts::option_letter;
use vocabtrainer_core::query_log::QueryLog;
use vocabtrainer_core::retriever::CandidateRetriever;
use vocabtrainer_core::session::{PlanOutcome, Session};
use vocabtrainer_core::store::WordStore;
use vocabtrainer_core::traits::LlmProvider;

pub async fn execute(
    goal: String,
    words: Option<usize>,
    questions: Option<usize>,
    provider_name: Option<String>,
    model: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = vocabtrainer_providers::config::load_config_from(config_path.as_deref())?;
    if let Some(n) = words {
        config.num_words = n;
    }
    if let Some(n) = questions {
        config.num_questions = n;
    }
    if config.num_words == 0 || config.num_questions == 0 {
        anyhow::bail!("--words and --questions must be at least 1");
    }
    if goal.trim().is_empty() {
        anyhow::bail!("goal must not be empty");
    }

    let provider: Arc<dyn LlmProvider> = Arc::from(config.provider(provider_name.as_deref())?);

    let store = WordStore::open(&config.database_path)
        .with_context(|| format!("failed to open store: {}", config.database_path.display()))?;
    if store.is_empty()? {
        anyhow::bail!("the word store is empty; run `vocabtrainer import` first");
    }
    let table = EmbeddingTable::load(&config.embeddings_path).with_context(|| {
        format!("failed to load embeddings: {}", config.embeddings_path.display())
    })?;
    let embedder = Embedder::new(Arc::new(table));

    let mut session = Session::new(
        provider,
        config.agent_config(model.as_deref()),
        store,
        CandidateRetriever::new(embedder, config.retriever_config()),
        QueryLog::load(&config.query_log_path),
        config.session_config(),
    );

    let planned = match session.plan(&goal).await? {
        PlanOutcome::Quiz(planned) => planned,
        PlanOutcome::AllWordsMastered => {
            println!("Every word for this goal is already mastered. Try a different goal.");
            return Ok(());
        }
    };

    if planned.from_cache() {
        println!("Reusing candidates from an earlier session with this goal.");
    }
    println!("Words: {}", planned.selection.words.join(", "));
    println!("{} questions. Answer each one and press Enter.\n", planned.quiz.len());

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut answered = 0;
    let mut total_score = 0.0;

    for (idx, item) in planned.quiz.iter().enumerate() {
        println!("Question {} ({})", idx + 1, item.kind());
        println!("{}", render_item(item));
        print!("> ");
        std::io::stdout().flush()?;

        let Some(answer) = read_answer(&mut input)? else {
            println!("\nNo more input, ending the session.");
            break;
        };

        let report = match session.submit(item, &answer).await {
            Ok(report) => report,
            Err(e) if e.is_upstream_format() => {
                eprintln!("Could not score this answer: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let score = report.item_score(item);
        answered += 1;
        total_score += score;
        println!("Score: {score:.2}");
        if let Some(expected) = item.correct_answer() {
            println!("Expected: {expected}");
        }
        println!();
    }

    let mut table = Table::new();
    table.set_header(vec!["Word", "CEFR", "Rating"]);
    for word in &planned.selection.words {
        if let Some(entry) = session.store().get(word)? {
            table.add_row(vec![
                Cell::new(&entry.word),
                Cell::new(entry.cefr_level),
                Cell::new(format!("{:.2}", entry.understanding_rating)),
            ]);
        }
    }
    println!("{table}");

    if answered > 0 {
        println!(
            "Session {}: {answered} answered, mean score {:.2}",
            session.id(),
            total_score / answered as f64
        );
    }

    Ok(())
}

/// Next non-empty line, or `None` at end of input.
fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(Some(answer.to_string()));
        }
    }
}

fn render_item(item: &QuizItem) -> String {
    match item {
        QuizItem::MultipleChoice(q) => {
            let mut text = q.question.clone();
            for (i, choice) in q.choices.iter().enumerate() {
                text.push_str(&format!("\n  {}. {choice}", option_letter(i)));
            }
            text
        }
        QuizItem::Matching(q) => {
            let mut text = String::from("Match each word to its definition (e.g. 1-A, 2-B):");
            for (i, word) in q.words.iter().enumerate() {
                text.push_str(&format!("\n  {}. {word}", i + 1));
            }
            for (i, definition) in q.definitions.iter().enumerate() {
                text.push_str(&format!("\n  {}. {definition}", option_letter(i)));
            }
            text
        }
        QuizItem::ShortAnswer(q) => q.question.clone(),
        QuizItem::ScenarioBased(q) => format!("{}\n{}", q.scenario, q.question),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocabtrainer_core::boundary::quiz::{MultipleChoice, ScenarioBased};

    #[test]
    fn read_answer_skips_blank_lines() {
        let mut input = "\n  \n An apple \nsecond\n".as_bytes();
        assert_eq!(read_answer(&mut input).unwrap().as_deref(), Some("An apple"));
        assert_eq!(read_answer(&mut input).unwrap().as_deref(), Some("second"));
        assert_eq!(read_answer(&mut input).unwrap(), None);
    }

    #[test]
    fn multiple_choice_lists_lettered_options() {
        let item = QuizItem::MultipleChoice(MultipleChoice {
            word: "apple".into(),
            question: "Which word means a round fruit?".into(),
            choices: vec!["car".into(), "apple".into()],
            correct_option: "B".into(),
        });
        let text = render_item(&item);
        assert!(text.contains("  A. car"));
        assert!(text.contains("  B. apple"));
    }

    #[test]
    fn scenario_shows_scenario_then_question() {
        let item = QuizItem::ScenarioBased(ScenarioBased {
            word: "apple".into(),
            scenario: "At the market.".into(),
            question: "Ask for a fruit.".into(),
            answer: "An apple, please.".into(),
        });
        assert_eq!(render_item(&item), "At the market.\nAsk for a fruit.");
    }
}
