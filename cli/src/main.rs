//! Diagnosis knowledge base self-test
//!
//! Seeds the NameNode and DataNode sample collections, runs one query
//! through the retrieval facade, and prints the rendered knowledge.

mod model_download;

use anyhow::Context;
use clap::Parser;
use diagnosis_kb::{seed_sample_knowledge, EmbedderKind, KbConfig, KnowledgeRetriever};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "diagnosis-kb")]
#[command(about = "Seed sample diagnosis knowledge and run one query")]
#[command(version)]
struct Args {
    /// Directory holding knowledge_base/ (overrides the config file)
    #[arg(long, short)]
    base_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Use zero-vector embeddings instead of Model2Vec
    #[arg(long)]
    zero_embedder: bool,

    /// Download the configured Model2Vec model into the cache first
    #[arg(long)]
    download_model: bool,

    /// Query to run after seeding
    #[arg(long, default_value = "NameNode fails to start")]
    query: String,

    /// Expert type / topic ("namenode", "datanode", "yarn", "all", ...)
    #[arg(long, default_value = "namenode")]
    expert: String,

    /// Maximum number of results
    #[arg(long)]
    top_k: Option<usize>,

    /// Minimum score in [0, 1]
    #[arg(long)]
    score_threshold: Option<f32>,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diagnosis_kb=info,diagnosis_kb_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(args) {
        tracing::error!("Self-test failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = KbConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(base_dir) = args.base_dir {
        config.base_dir = base_dir;
    }
    if args.zero_embedder {
        config.embedder.kind = EmbedderKind::ZeroVector;
    }
    if let Some(top_k) = args.top_k {
        config.search.top_k = top_k;
    }
    if let Some(threshold) = args.score_threshold {
        config.search.score_threshold = threshold;
    }
    config.validate().context("Invalid search options")?;

    if args.download_model && config.embedder.kind == EmbedderKind::Model2Vec {
        let path = model_download::ensure_model_downloaded(&config.embedder)?;
        tracing::info!("Model available at {}", path.display());
    }

    let install_root = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from));

    tracing::info!("Knowledge base root: {:?}", config.collections_root());
    let options = config.search;
    let retriever = KnowledgeRetriever::from_config(config, install_root.as_deref());

    seed_sample_knowledge(retriever.registry()).context("Failed to seed sample knowledge")?;
    tracing::debug!("Registry stats: {}", retriever.registry().stats());

    let result = retriever.search_diagnosis_knowledge(&args.query, &args.expert, &options);
    println!("{}", result);
    Ok(())
}
