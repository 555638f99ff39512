use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{input, report};
use sow_core::config::{self, AppConfig};
use sow_core::{pipeline, AnalyzerError};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { command } => match command {
            IndexCommand::Rebuild { examples } => run_rebuild(cfg, examples).await,
            IndexCommand::Stats { json } => run_stats(cfg, json).await,
        },
        Commands::Search { query, topk } => run_search(cfg, query, topk).await,
        Commands::Analyze {
            files,
            extracted,
            basic,
            json,
        } => run_analyze(cfg, files, extracted, basic, json).await,
        Commands::Overlap {
            file_a,
            file_b,
            extracted,
            json,
        } => run_overlap(cfg, file_a, file_b, extracted, json).await,
    }
}

#[derive(Parser)]
#[command(name = "sow-analyzer")]
#[command(about = "Flags risky Statement of Work language against known-bad contract patterns", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the pattern index
    Index {
        #[command(subcommand)]
        command: IndexCommand,
    },
    /// Query the pattern index directly
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        topk: usize,
    },
    /// Analyze one or more documents
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Inputs are extraction JSON records instead of plain text
        #[arg(long)]
        extracted: bool,
        /// Skip retrieval and run the basic analyzer only
        #[arg(long)]
        basic: bool,
        #[arg(long)]
        json: bool,
    },
    /// Estimate redundant scope between two documents
    Overlap {
        file_a: PathBuf,
        file_b: PathBuf,
        #[arg(long)]
        extracted: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IndexCommand {
    /// Re-embed the curated examples and replace the index
    Rebuild {
        /// Example collection; defaults to index.examples_path
        #[arg(long)]
        examples: Option<PathBuf>,
    },
    Stats {
        #[arg(long)]
        json: bool,
    },
}

async fn run_rebuild(cfg: AppConfig, examples: Option<PathBuf>) -> Result<()> {
    let path = examples.unwrap_or_else(|| PathBuf::from(&cfg.index.examples_path));
    let registry = pipeline::build_registry(&cfg);
    let index = pipeline::open_index(&cfg, &registry).await?;
    let count = index
        .rebuild_from_file(&path)
        .await
        .with_context(|| format!("rebuild from {}", path.display()))?;
    println!("indexed {count} examples from {}", path.display());
    Ok(())
}

async fn run_stats(cfg: AppConfig, json: bool) -> Result<()> {
    let registry = pipeline::build_registry(&cfg);
    let index = pipeline::open_index(&cfg, &registry).await?;
    let stats = index.stats().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "{}: {} examples ({} backend)",
            stats.collection_name, stats.total_examples, stats.backend
        );
    }
    Ok(())
}

async fn run_search(cfg: AppConfig, query: String, topk: usize) -> Result<()> {
    let registry = pipeline::build_registry(&cfg);
    let index = pipeline::open_index(&cfg, &registry).await?;
    if !index.is_available().await {
        return Err(AnalyzerError::IndexUnavailable).context("run `sow-analyzer index rebuild` first");
    }
    let matches = index.query(&query, topk).await?;
    if matches.is_empty() {
        println!("no matches");
    } else {
        print!("{}", report::render_matches(&matches));
    }
    Ok(())
}

async fn run_analyze(
    cfg: AppConfig,
    files: Vec<PathBuf>,
    extracted: bool,
    basic: bool,
    json: bool,
) -> Result<()> {
    let docs = input::load_documents(&files, extracted)?;
    let analyzer = pipeline::build_analyzer(&cfg).await?;
    info!(documents = docs.len(), "starting analysis");
    let batch = analyzer.analyze_batch(&docs, basic).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }
    for doc in &batch.documents {
        println!("{}", report::render_document(doc));
    }
    if let Some(overlap) = &batch.overlap {
        print!("{}", report::render_overlap(overlap));
    }
    Ok(())
}

async fn run_overlap(
    cfg: AppConfig,
    file_a: PathBuf,
    file_b: PathBuf,
    extracted: bool,
    json: bool,
) -> Result<()> {
    let a = input::load_document(&file_a, extracted)?;
    let b = input::load_document(&file_b, extracted)?;
    let estimator = pipeline::build_overlap_estimator(&cfg)?;
    let result = estimator.estimate_overlap(&a, &b).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", report::render_overlap(&result));
    }
    Ok(())
}
