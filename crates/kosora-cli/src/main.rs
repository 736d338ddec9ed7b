//! Kosora CLI
//!
//! The `kosora` command runs the correction engine on a submission file and
//! inspects reference corpora.
//!
//! ## Commands
//!
//! - `evaluate`: Produce a correction report for a text file
//! - `corpus stats`: Count documents per exam scope
//! - `corpus search`: Rank reference passages for a query

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kosora_core::{
    cancellation, Category, CorrectionEngine, CorrectionReport, EngineConfig, EvaluationOptions,
    RetrievalProvider, Submission, METRICS,
};
use kosora_rag::{
    CorpusStats, NewDocument, PassageStore, RetrievalPassage, ScopedRetriever, StoreConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "kosora")]
#[command(author = "Kosora Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Correction orchestration for student submissions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a submission and print the correction report as JSON
    Evaluate(EvaluateArgs),

    /// Reference corpus operations
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },
}

#[derive(clap::Args, Debug, Default)]
struct EvaluateArgs {
    /// Path to the submission text (UTF-8)
    #[arg(short, long)]
    text: PathBuf,

    /// Exam topic used as the retrieval query
    #[arg(long)]
    topic: Option<String>,

    /// Submission locale (e.g. en-US)
    #[arg(long)]
    locale: Option<String>,

    /// Engine configuration file (TOML)
    #[arg(short, long, env = "KOSORA_CONFIG")]
    config: Option<PathBuf>,

    /// Reference corpus file (JSON)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Restrict retrieval to one exam scope of the corpus
    #[arg(long, requires = "corpus")]
    scope: Option<String>,

    /// Categories to evaluate (repeatable; default: from configuration)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Skip retrieval even when a corpus is given
    #[arg(long)]
    no_retrieval: bool,

    /// Per-agent deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Drop issues below this confidence
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Print flat issue records instead of the full report
    #[arg(long)]
    records: bool,
}

#[derive(Subcommand)]
enum CorpusAction {
    /// Show document counts per scope
    Stats {
        /// Reference corpus file (JSON)
        #[arg(long)]
        corpus: PathBuf,
    },

    /// Rank passages for a query
    Search {
        /// Reference corpus file (JSON)
        #[arg(long)]
        corpus: PathBuf,

        /// Query text
        #[arg(short, long)]
        query: String,

        /// Restrict the search to one exam scope
        #[arg(long)]
        scope: Option<String>,

        /// Number of passages to return
        #[arg(short, default_value = "5")]
        k: usize,
    },
}

/// One exam scope in a corpus file.
#[derive(Debug, Deserialize)]
struct CorpusScope {
    scope: String,
    documents: Vec<NewDocument>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    kosora_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Evaluate(args) => cmd_evaluate(&args).await,
        Commands::Corpus { action } => match action {
            CorpusAction::Stats { corpus } => cmd_corpus_stats(&corpus),
            CorpusAction::Search {
                corpus,
                query,
                scope,
                k,
            } => cmd_corpus_search(&corpus, &query, scope.as_deref(), k),
        },
    };

    METRICS.flush();
    result
}

// ========== Evaluate ==========

async fn cmd_evaluate(args: &EvaluateArgs) -> Result<()> {
    let (engine, submission, options) = prepare_evaluation(args)?;

    let (handle, signal) = cancellation();
    let evaluation = engine.evaluate_with_cancel(&submission, &options, signal);
    tokio::pin!(evaluation);

    let report = tokio::select! {
        result = &mut evaluation => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupt received, cancelling evaluation");
            handle.cancel();
            evaluation.await?
        }
    };

    println!("{}", render_report(&report, args.records)?);
    Ok(())
}

/// Build the engine, submission, and options described by `args`.
fn prepare_evaluation(
    args: &EvaluateArgs,
) -> Result<(CorrectionEngine, Submission, EvaluationOptions)> {
    let config = EngineConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    let text = std::fs::read_to_string(&args.text)
        .with_context(|| format!("Failed to read submission: {:?}", args.text))?;
    let mut submission = Submission::new(text);
    if let Some(topic) = &args.topic {
        submission = submission.with_topic(topic.clone());
    }
    if let Some(locale) = &args.locale {
        submission = submission.with_locale(locale.clone());
    }

    let retriever: Option<Arc<dyn RetrievalProvider>> = match &args.corpus {
        Some(path) => {
            let store = Arc::new(load_corpus(path, config.store_config())?);
            info!(documents = store.len(), "corpus loaded");
            let retriever: Arc<dyn RetrievalProvider> = match &args.scope {
                Some(scope) => Arc::new(ScopedRetriever::new(store, scope.clone())),
                None => store,
            };
            Some(retriever)
        }
        None => None,
    };

    let mut options = config.default_options();
    if !args.categories.is_empty() {
        options = options.with_categories(parse_categories(&args.categories)?);
    }
    if args.no_retrieval || retriever.is_none() {
        options = options.with_retrieval(false);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        options = options.with_timeout_ms(timeout_ms);
    }
    if let Some(min_confidence) = args.min_confidence {
        options = options.with_min_confidence(min_confidence);
    }

    let engine = CorrectionEngine::from_config(&config, retriever)
        .context("Failed to build agent registry")?;
    Ok((engine, submission, options))
}

fn parse_categories(raw: &[String]) -> Result<Vec<Category>> {
    raw.iter()
        .map(|name| {
            name.parse::<Category>()
                .with_context(|| format!("Invalid --category value: {name}"))
        })
        .collect()
}

fn render_report(report: &CorrectionReport, records: bool) -> Result<String> {
    let rendered = if records {
        serde_json::to_string_pretty(&report.to_records())?
    } else {
        serde_json::to_string_pretty(report)?
    };
    Ok(rendered)
}

// ========== Corpus ==========

/// Load a corpus file: a JSON array of `{"scope", "documents": [...]}`.
fn load_corpus(path: &Path, config: StoreConfig) -> Result<PassageStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {:?}", path))?;
    let scopes: Vec<CorpusScope> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid corpus JSON in {:?}", path))?;

    let store = PassageStore::new(config);
    for entry in scopes {
        if entry.scope.trim().is_empty() {
            bail!("Corpus scope names must not be empty ({:?})", path);
        }
        store
            .add_documents(&entry.scope, entry.documents)
            .with_context(|| format!("Failed to index scope {}", entry.scope))?;
    }
    Ok(store)
}

fn cmd_corpus_stats(path: &Path) -> Result<()> {
    let stats = corpus_stats(path)?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn corpus_stats(path: &Path) -> Result<CorpusStats> {
    Ok(load_corpus(path, StoreConfig::default())?.stats())
}

fn cmd_corpus_search(path: &Path, query: &str, scope: Option<&str>, k: usize) -> Result<()> {
    let passages = corpus_search(path, query, scope, k)?;
    if passages.is_empty() {
        info!("no passage above the relevance floor");
    }
    println!("{}", serde_json::to_string_pretty(&passages)?);
    Ok(())
}

fn corpus_search(
    path: &Path,
    query: &str,
    scope: Option<&str>,
    k: usize,
) -> Result<Vec<RetrievalPassage>> {
    let store = load_corpus(path, StoreConfig::default())?;
    store
        .retrieve_scoped(scope, query, k)
        .context("Corpus search failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIOLOGY_CORPUS: &str = r#"[
        {
            "scope": "bio-101",
            "documents": [
                {"kind": "question", "text": "Explain how photosynthesis converts light into chemical energy."},
                {"kind": "solution", "text": "Chlorophyll absorbs light; the plant stores energy as glucose."},
                {"kind": "rubric", "text": "Mention chlorophyll, light absorption, and glucose."}
            ]
        },
        {
            "scope": "hist-200",
            "documents": [
                {"kind": "question", "text": "Describe the causes of the French Revolution."}
            ]
        }
    ]"#;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn evaluate_args(text: PathBuf) -> EvaluateArgs {
        EvaluateArgs {
            text,
            ..EvaluateArgs::default()
        }
    }

    #[test]
    fn test_cli_parses_evaluate_flags() {
        let cli = Cli::try_parse_from([
            "kosora",
            "evaluate",
            "--text",
            "essay.txt",
            "--category",
            "grammar",
            "--category",
            "style",
            "--timeout-ms",
            "500",
            "--no-retrieval",
        ])
        .unwrap();

        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.text, PathBuf::from("essay.txt"));
                assert_eq!(args.categories, vec!["grammar", "style"]);
                assert_eq!(args.timeout_ms, Some(500));
                assert!(args.no_retrieval);
            }
            Commands::Corpus { .. } => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_scope_requires_corpus() {
        let result = Cli::try_parse_from([
            "kosora", "evaluate", "--text", "a.txt", "--scope", "bio-101",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_category_rejected() {
        let err = parse_categories(&["poetry".to_string()]).unwrap_err();
        assert!(format!("{err:#}").contains("poetry"));
    }

    #[test]
    fn test_corpus_stats_counts_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_file(&dir, "corpus.json", BIOLOGY_CORPUS);

        let stats = corpus_stats(&corpus).unwrap();
        assert_eq!(stats.total_documents, 4);
        assert_eq!(stats.scopes["bio-101"], 3);
        assert_eq!(stats.scopes["hist-200"], 1);
    }

    #[test]
    fn test_corpus_search_ranks_within_scope() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_file(&dir, "corpus.json", BIOLOGY_CORPUS);

        let passages = corpus_search(&corpus, "chlorophyll glucose", Some("bio-101"), 2).unwrap();
        assert!(!passages.is_empty());
        assert!(passages.len() <= 2);
        assert!(passages
            .iter()
            .all(|p| p.passage_id.starts_with("bio-101_")));
    }

    #[test]
    fn test_corpus_search_unknown_scope_fails() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_file(&dir, "corpus.json", BIOLOGY_CORPUS);

        let err = corpus_search(&corpus, "glucose", Some("chem-300"), 3).unwrap_err();
        assert!(format!("{err:#}").contains("chem-300"));
    }

    #[test]
    fn test_corpus_with_blank_document_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_file(
            &dir,
            "corpus.json",
            r#"[{"scope": "bio-101", "documents": [{"kind": "rubric", "text": "   "}]}]"#,
        );

        let err = corpus_stats(&corpus).unwrap_err();
        assert!(format!("{err:#}").contains("bio-101"));
    }

    #[test]
    fn test_missing_submission_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args = evaluate_args(dir.path().join("absent.txt"));

        let err = prepare_evaluation(&args).err().unwrap();
        assert!(format!("{err:#}").contains("Failed to read submission"));
    }

    #[tokio::test]
    async fn test_evaluate_reports_grammar_issue() {
        let dir = tempfile::tempdir().unwrap();
        let text = write_file(&dir, "essay.txt", "She go to school yesterday.");
        let mut args = evaluate_args(text);
        args.categories = vec!["grammar".to_string()];

        let (engine, submission, options) = prepare_evaluation(&args).unwrap();
        assert!(!options.use_retrieval);

        let report = engine.evaluate(&submission, &options).await.unwrap();
        let records = report.to_records();
        assert!(records
            .iter()
            .any(|r| r.start_offset == 4 && r.end_offset == 6 && r.category == "grammar"));

        let rendered: serde_json::Value =
            serde_json::from_str(&render_report(&report, true).unwrap()).unwrap();
        assert!(rendered.as_array().is_some_and(|a| !a.is_empty()));
    }

    #[tokio::test]
    async fn test_evaluate_with_scoped_corpus_uses_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_file(&dir, "corpus.json", BIOLOGY_CORPUS);
        let text = write_file(
            &dir,
            "essay.txt",
            "Chlorophyll absorbs light and the plant stores energy as glucose.",
        );
        let mut args = evaluate_args(text);
        args.corpus = Some(corpus);
        args.scope = Some("bio-101".to_string());
        args.topic = Some("photosynthesis chlorophyll glucose".to_string());

        let (engine, submission, options) = prepare_evaluation(&args).unwrap();
        assert!(options.use_retrieval);

        let report = engine.evaluate(&submission, &options).await.unwrap();
        assert!(report.retrieval.used);
        assert!(report
            .retrieval
            .passage_ids
            .iter()
            .all(|id| id.starts_with("bio-101_")));
    }
}
