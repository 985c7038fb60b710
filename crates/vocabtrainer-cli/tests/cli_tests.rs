//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vocabtrainer() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("vocabtrainer").unwrap()
}

const GLOVE: &str = "apple 1.0 0.0 0.0\n\
                     banana 0.9 0.1 0.0\n\
                     car 0.0 1.0 0.0\n\
                     journey 0.0 0.2 0.9\n";

const WORDS_CSV: &str = "word,level,ielts,gre\n\
                         apple,A1,0,0\n\
                         car,A1,1,0\n\
                         Apple,B2,1,1\n\
                         zzyzx,C2,0,1\n";

const MOCK_RULES: &str = r#"
[[providers.mock.responses]]
contains = "Learner's goal"
response = '{"exam": null, "topic": "fruit", "keywords": ["apple"]}'

[[providers.mock.responses]]
contains = "Recommend"
response = "apple"

[[providers.mock.responses]]
contains = "Words tested"
response = '{"apple": 0.9}'

[[providers.mock.responses]]
contains = "Vocabulary table"
response = '{"words": ["apple", "unicorn"]}'

[[providers.mock.responses]]
contains = "Words:"
response = '{"scenario-based": [{"word": "apple", "scenario": "At the market.", "question": "Ask for a fruit.", "answer": "An apple, please."}]}'
"#;

/// Write embeddings, a word table and a mock-provider config into `dir`.
fn setup(dir: &Path, mastery_threshold: f64) -> std::path::PathBuf {
    std::fs::write(dir.join("glove.txt"), GLOVE).unwrap();
    std::fs::write(dir.join("words.csv"), WORDS_CSV).unwrap();

    let config = format!(
        "default_provider = \"mock\"\n\
         database_path = '{db}'\n\
         embeddings_path = '{glove}'\n\
         query_log_path = '{log}'\n\
         num_words = 1\n\
         num_questions = 1\n\
         mastery_threshold = {mastery_threshold:?}\n\
         max_retries = 0\n\n\
         [providers.mock]\n\
         type = \"mock\"\n\
         {MOCK_RULES}",
        db = dir.join("words.db").display(),
        glove = dir.join("glove.txt").display(),
        log = dir.join("queries.json").display(),
    );
    let config_path = dir.join("vocabtrainer.toml");
    std::fs::write(&config_path, config).unwrap();
    config_path
}

fn import(dir: &Path, config: &Path) -> assert_cmd::assert::Assert {
    vocabtrainer()
        .current_dir(dir)
        .arg("import")
        .arg("--data")
        .arg(dir.join("words.csv"))
        .arg("--config")
        .arg(config)
        .assert()
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created vocabtrainer.toml"))
        .stdout(predicate::str::contains("Created vocabtrainer-data/words.csv"));

    assert!(dir.path().join("vocabtrainer.toml").exists());
    assert!(dir.path().join("vocabtrainer-data/words.csv").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_config_lists_mock_models() {
    let dir = TempDir::new().unwrap();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("list-models")
        .arg("--provider")
        .arg("mock")
        .arg("--config")
        .arg(dir.path().join("vocabtrainer.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: mock"))
        .stdout(predicate::str::contains("mock-model"));
}

#[test]
fn import_reports_duplicates_and_unknown_words() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);

    import(dir.path(), &config)
        .success()
        .stdout(predicate::str::contains("Imported 2 of 4 rows"))
        .stdout(predicate::str::contains("1 duplicate rows ignored"))
        .stdout(predicate::str::contains("1 words have no embedding"));

    // Second import finds everything already stored.
    import(dir.path(), &config)
        .success()
        .stdout(predicate::str::contains("Imported 0 of 4 rows"))
        .stdout(predicate::str::contains("Store now holds 2 words"));
}

#[test]
fn import_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);

    vocabtrainer()
        .current_dir(dir.path())
        .arg("import")
        .arg("--data")
        .arg("nonexistent.csv")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn import_rejects_bad_level() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    std::fs::write(dir.path().join("words.csv"), "word,level,ielts,gre\napple,Z9,0,0\n").unwrap();

    import(dir.path(), &config)
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn words_filters_by_exam() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("words")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("apple"))
        .stdout(predicate::str::contains("car"))
        .stdout(predicate::str::contains("2 words, 0 mastered"));

    vocabtrainer()
        .current_dir(dir.path())
        .arg("words")
        .arg("--exam")
        .arg("ielts")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("car"))
        .stdout(predicate::str::contains("apple").not());
}

#[test]
fn words_unknown_exam_fails() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("words")
        .arg("--exam")
        .arg("TOEFL")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown exam"));
}

#[test]
fn train_scores_answers_and_updates_ratings() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("train")
        .arg("--goal")
        .arg("fruit words")
        .arg("--config")
        .arg(&config)
        .write_stdin("An apple, please.\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Words: apple"))
        .stdout(predicate::str::contains("At the market."))
        .stdout(predicate::str::contains("Score: 0.90"))
        .stdout(predicate::str::contains("mean score 0.90"));

    assert!(dir.path().join("queries.json").exists());

    vocabtrainer()
        .current_dir(dir.path())
        .arg("words")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("0.90"))
        .stdout(predicate::str::contains("2 words, 1 mastered"));
}

#[test]
fn train_without_input_ends_early() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("train")
        .arg("--goal")
        .arg("fruit words")
        .arg("--config")
        .arg(&config)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("No more input"));
}

#[test]
fn train_reports_all_words_mastered() {
    let dir = TempDir::new().unwrap();
    // Every rating is >= 0.0, so nothing is left to practise.
    let config = setup(dir.path(), 0.0);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("train")
        .arg("--goal")
        .arg("fruit words")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("already mastered"));
}

#[test]
fn train_with_empty_store_fails() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);

    vocabtrainer()
        .current_dir(dir.path())
        .arg("train")
        .arg("--goal")
        .arg("fruit words")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("run `vocabtrainer import` first"));
}

#[test]
fn train_with_unknown_provider_fails() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("train")
        .arg("--goal")
        .arg("fruit words")
        .arg("--provider")
        .arg("ollama")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider 'ollama' is not configured"));
}

#[test]
fn evaluate_scores_pipeline_against_baseline() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    import(dir.path(), &config).success();

    // apple is known, on-topic and unrated, but A1; unicorn is not in the store.
    vocabtrainer()
        .current_dir(dir.path())
        .arg("evaluate")
        .arg("--goal")
        .arg("fruit words")
        .arg("--words")
        .arg("2")
        .arg("--baseline")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("keywords [apple]"))
        .stdout(predicate::str::contains("pipeline"))
        .stdout(predicate::str::contains("0.89"))
        .stdout(predicate::str::contains("baseline"))
        .stdout(predicate::str::contains("apple, unicorn"))
        .stdout(predicate::str::contains("0.44"));
}

#[test]
fn evaluate_without_baseline_skips_it() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.5);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("evaluate")
        .arg("--goal")
        .arg("fruit words")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("pipeline"))
        .stdout(predicate::str::contains("unicorn").not());
}

#[test]
fn evaluate_reports_all_words_mastered() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), 0.0);
    import(dir.path(), &config).success();

    vocabtrainer()
        .current_dir(dir.path())
        .arg("evaluate")
        .arg("--goal")
        .arg("fruit words")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("already mastered"))
        .stdout(predicate::str::contains("Overall").not());
}
