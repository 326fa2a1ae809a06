use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use contractlens_pipeline::{
    AnthropicClient, ContentSource, DocumentPipeline, LlmClient, MemoryStore, PipelineConfig,
    PlainTextExtractor,
};

/// Analyze one contract file and print the stored analysis as JSON.
#[derive(Parser, Debug)]
#[command(name = "contractlens-analyze")]
#[command(about = "Run the contract analysis pipeline on a single file", long_about = None)]
struct Cli {
    /// Contract text file (form feeds separate pages)
    #[arg(required = true)]
    file: PathBuf,

    /// Document title; defaults to the file name
    #[arg(short, long)]
    title: Option<String>,

    /// Print the run report to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();

    let data = match tokio::fs::read(&cli.file).await {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(file = %cli.file.display(), error = %e, "failed to read contract file");
            std::process::exit(1);
        }
    };

    let file_name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "contract".to_string());
    let title = cli.title.unwrap_or_else(|| file_name.clone());

    let backend: Option<Arc<dyn LlmClient>> = match AnthropicClient::from_config(&config) {
        Ok(client) => client.map(|c| Arc::new(c) as Arc<dyn LlmClient>),
        Err(e) => {
            tracing::error!(error = %e, "failed to build model client");
            std::process::exit(1);
        }
    };
    if backend.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set, using keyword analysis only");
    }

    let store = Arc::new(MemoryStore::new());
    let pipeline = DocumentPipeline::new(
        config,
        backend,
        Arc::new(PlainTextExtractor),
        store.clone(),
        store.clone(),
    );

    let document_id = Uuid::new_v4();
    let source = ContentSource::Bytes { data, file_name };

    let report = match pipeline.run(document_id, source, &title).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "analysis failed");
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("{report:#?}");
    }

    let stored = match pipeline.analysis(document_id).await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            tracing::error!(%document_id, "analysis missing after completed run");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load analysis");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&stored.analysis) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize analysis");
            std::process::exit(1);
        }
    }
}
