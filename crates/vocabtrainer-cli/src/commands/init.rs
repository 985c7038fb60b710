//! The `vocabtrainer init` command.

use std::path::Path;

use anyhow::{Context, Result};

use vocabtrainer_providers::config::CONFIG_FILE_NAME;

const DATA_DIR: &str = "vocabtrainer-data";
const SAMPLE_WORDS_PATH: &str = "vocabtrainer-data/words.csv";

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, SAMPLE_CONFIG)
            .with_context(|| format!("failed to write {CONFIG_FILE_NAME}"))?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    std::fs::create_dir_all(DATA_DIR)
        .with_context(|| format!("failed to create {DATA_DIR}"))?;
    if Path::new(SAMPLE_WORDS_PATH).exists() {
        println!("{SAMPLE_WORDS_PATH} already exists, skipping.");
    } else {
        std::fs::write(SAMPLE_WORDS_PATH, SAMPLE_WORDS)
            .with_context(|| format!("failed to write {SAMPLE_WORDS_PATH}"))?;
        println!("Created {SAMPLE_WORDS_PATH}");
    }

    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE_NAME} with your API keys");
    println!("  2. Download GloVe vectors to {DATA_DIR}/glove.6B.50d.txt");
    println!("  3. Run: vocabtrainer import --data {SAMPLE_WORDS_PATH}");
    println!("  4. Run: vocabtrainer train --goal \"IELTS words about travel\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# vocabtrainer configuration

default_provider = "openai"
default_model = "gpt-4o-mini"
temperature = 0.7
max_retries = 3
retry_delay_ms = 1000

database_path = "./vocabtrainer-data/words.db"
embeddings_path = "./vocabtrainer-data/glove.6B.50d.txt"
query_log_path = "./vocabtrainer-data/queries.json"

num_words = 7
num_questions = 5
per_keyword = 10
mastery_threshold = 0.5

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

# Offline provider for trying the pipeline without an API key.
[providers.mock]
type = "mock"
default_response = "{}"

[[providers.mock.responses]]
contains = "Learner's goal"
response = '{"exam": "IELTS", "topic": "travel", "keywords": ["journey", "airport"]}'

[[providers.mock.responses]]
contains = "Recommend"
response = "journey"

[[providers.mock.responses]]
contains = "Words tested"
response = '{"journey": 0.8}'

[[providers.mock.responses]]
contains = "Words:"
response = '{"scenario-based": [{"word": "journey", "scenario": "You are telling a friend about a long trip.", "question": "Describe it in one sentence.", "answer": "The journey took two days by train."}]}'
"#;

const SAMPLE_WORDS: &str = "word,level,ielts,gre
journey,A2,1,0
airport,A1,1,0
luggage,A2,1,0
itinerary,B2,1,1
destination,B1,1,0
commute,B1,1,0
voyage,B2,0,1
";
