use anyhow::{Context, Result};
use bloodlens::{analysis::AnalysisService, api, config::Config, logging};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = Config::load().context("Failed to load configuration")?;

    let service = AnalysisService::from_config(&config)
        .await
        .context("Failed to initialize analysis service")?;
    let app = api::create_router(Arc::new(service), config.max_upload_bytes);

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.server_port))?;
    tracing::info!("Listening on http://0.0.0.0:{}", config.server_port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
