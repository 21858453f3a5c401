use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod error;
mod extract;
mod pipeline;
mod storage;
mod store;
mod tts;

use api::routes::{create_router, AppState};
use auth::{CredentialService, PasswordHasher};
use config::Config;
use extract::{ImageExtractor, PdfExtractor, TesseractOcr};
use pipeline::ConversionPipeline;
use storage::AudioStorage;
use store::{AudioRecordStore, UserStore};
use tts::{GoogleTts, TtsService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let addr = config.bind_addr()?;

    tracing::info!("Textcast Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Audio directory: {}", config.audio_dir.display());

    let pool = store::connect(&config.database_url, config.database_max_connections).await?;
    let storage = AudioStorage::open(&config.audio_dir).await?;
    let records = AudioRecordStore::new(pool.clone());

    let tts = TtsService::new(Arc::new(GoogleTts::new(&config.tts)));
    let ocr = TesseractOcr::new(&config.ocr);
    let pipeline = ConversionPipeline::new(
        Arc::new(PdfExtractor),
        Arc::new(ImageExtractor::new(Arc::new(ocr))),
        tts,
        storage.clone(),
        records.clone(),
    );

    let hasher = PasswordHasher::new(config.hashing)?;
    let credentials = CredentialService::new(UserStore::new(pool.clone()), hasher)?;

    let state = Arc::new(AppState {
        pipeline,
        records,
        credentials,
    });
    let app = create_router(state, &storage, config.max_upload_bytes);

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
