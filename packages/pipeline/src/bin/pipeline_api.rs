use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::EnvFilter;

use contractlens_pipeline::api::{router, AppState};
use contractlens_pipeline::{
    AnthropicClient, DocumentPipeline, LlmClient, MemoryStore, PipelineConfig, PlainTextExtractor,
};

const DEFAULT_ADDR: &str = "0.0.0.0:8000";

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = PipelineConfig::from_env();
    tracing::info!(?config, "loaded configuration");

    let backend: Option<Arc<dyn LlmClient>> = match AnthropicClient::from_config(&config) {
        Ok(client) => client.map(|c| Arc::new(c) as Arc<dyn LlmClient>),
        Err(e) => {
            tracing::error!(error = %e, "failed to build model client");
            std::process::exit(1);
        }
    };
    if backend.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set, all documents use keyword analysis");
    }

    let store = Arc::new(MemoryStore::new());
    let pipeline = DocumentPipeline::new(
        config,
        backend,
        Arc::new(PlainTextExtractor),
        store.clone(),
        store,
    );
    let app = router(AppState {
        pipeline: Arc::new(pipeline),
    });

    let addr = std::env::var("PIPELINE_API_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind on {addr}");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
