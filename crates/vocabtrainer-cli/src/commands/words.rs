//! The `vocabtrainer words` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use vocabtrainer_core::store::WordStore;

pub fn execute(
    exam: Option<String>,
    limit: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = vocabtrainer_providers::config::load_config_from(config_path.as_deref())?;
    let store = WordStore::open(&config.database_path)
        .with_context(|| format!("failed to open store: {}", config.database_path.display()))?;

    let entries = match &exam {
        Some(name) => store.query_by_exam(name)?,
        None => store.query_all()?,
    };
    if entries.is_empty() {
        println!("No words stored. Run `vocabtrainer import` first.");
        return Ok(());
    }

    let total = entries.len();
    let mastered = entries
        .iter()
        .filter(|e| e.understanding_rating >= config.mastery_threshold)
        .count();

    let mut table = Table::new();
    table.set_header(vec!["Word", "CEFR", "IELTS", "GRE", "Rating"]);
    for entry in entries.iter().take(limit.unwrap_or(total)) {
        table.add_row(vec![
            Cell::new(&entry.word),
            Cell::new(entry.cefr_level),
            Cell::new(yes_no(entry.in_exam.ielts)),
            Cell::new(yes_no(entry.in_exam.gre)),
            Cell::new(format!("{:.2}", entry.understanding_rating)),
        ]);
    }

    println!("{table}");
    println!("{total} words, {mastered} mastered");
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "-"
    }
}
