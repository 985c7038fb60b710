//! vocabtrainer CLI: import a word table, then practise it with LLM-built quizzes.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vocabtrainer", version, about = "LLM-assisted vocabulary trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV word table (word, level, ielts, gre) into the store
    Import {
        /// CSV file to import
        #[arg(long)]
        data: PathBuf,

        /// GloVe-format embeddings file (overrides config)
        #[arg(long)]
        embeddings: Option<PathBuf>,

        /// SQLite database path (overrides config)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a quiz session for a learning goal, reading answers from stdin
    Train {
        /// Free-text learning goal, e.g. "IELTS words about travel"
        #[arg(long)]
        goal: String,

        /// Number of words to practise
        #[arg(long)]
        words: Option<usize>,

        /// Number of quiz questions
        #[arg(long)]
        questions: Option<usize>,

        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,

        /// Model id (overrides config)
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score the words the pipeline picks for a goal, optionally against a baseline
    Evaluate {
        /// Free-text learning goal
        #[arg(long)]
        goal: String,

        /// Number of words to select
        #[arg(long)]
        words: Option<usize>,

        /// Also ask a single-call selector that sees the whole store
        #[arg(long)]
        baseline: bool,

        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,

        /// Model id (overrides config)
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show stored words and their understanding ratings
    Words {
        /// Only words on this exam list (IELTS, GRE)
        #[arg(long)]
        exam: Option<String>,

        /// Show at most this many words
        #[arg(long)]
        limit: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and sample word table
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "vocabtrainer=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            data,
            embeddings,
            database,
            config,
        } => commands::import::execute(data, embeddings, database, config),
        Commands::Train {
            goal,
            words,
            questions,
            provider,
            model,
            config,
        } => commands::train::execute(goal, words, questions, provider, model, config).await,
        Commands::Evaluate {
            goal,
            words,
            baseline,
            provider,
            model,
            config,
        } => commands::evaluate::execute(goal, words, baseline, provider, model, config).await,
        Commands::Words {
            exam,
            limit,
            config,
        } => commands::words::execute(exam, limit, config),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config)
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
