//! Murmur Server - HTTP API for the chunked speech pipeline

use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod settings;
mod state;

use settings::MurmurConfig;
use murmur_core::{EnvCredentials, Pipeline};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "murmur_server=debug,murmur_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Murmur Server");

    // Load configuration
    let config = MurmurConfig::load()?;
    info!("Speech endpoint: {}", config.speech.endpoint);
    info!("Cache directory: {:?}", config.speech.cache_dir);

    // Create pipeline
    let pipeline = Pipeline::from_config(&config.speech, Arc::new(EnvCredentials))?;
    let state = AppState::new(pipeline);

    // Build router
    let mut app = api::create_router(state);
    if config.server.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
