use anyhow::Context;

use backoffice_api::app::build_app;
use backoffice_api::config::ApiConfig;
use backoffice_infra::directory::{load_seed, DirectorySeed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    backoffice_observability::init();

    let config = ApiConfig::from_env()?;
    let seed = match &config.seed_file {
        Some(path) => load_seed(path)?,
        None => {
            tracing::warn!("SEED_FILE not set; using built-in development directory");
            DirectorySeed::bootstrap()
        }
    };

    let app = build_app(&config, seed)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}
