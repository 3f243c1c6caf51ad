use std::{path::Path, sync::Arc};

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    corpus::{load_corpus, ChunkingOptions},
    utils::config::{get_config, AppConfig},
};
use generation_pipeline::{AnswerService, ProviderCatalog, ServiceSettings};
use retrieval_pipeline::CorpusStore;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let service = Arc::new(build_service(&config).await?);

    // Backends come up in the background; requests are answered meanwhile.
    tokio::spawn({
        let service = Arc::clone(&service);
        async move {
            service.initialize().await;
        }
    });

    let app = build_app(service);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_service(config: &AppConfig) -> Result<AnswerService, Box<dyn std::error::Error>> {
    let chunks = load_corpus(
        Path::new(&config.data_dir),
        ChunkingOptions {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        },
    )
    .await?;
    info!(chunks = chunks.len(), data_dir = %config.data_dir, "Corpus loaded");

    let providers = Arc::new(ProviderCatalog::from_config(config));
    if !providers.has_generation_credentials() {
        warn!("No generation credentials configured; answers will be extractive excerpts");
    }

    Ok(AnswerService::new(
        Arc::new(CorpusStore::new(chunks)),
        providers,
        ServiceSettings::from_config(config),
    ))
}

fn build_app(service: Arc<AnswerService>) -> Router {
    Router::new()
        .nest("/api/v1", api_routes_v1())
        .with_state(ApiState::new(service))
}
