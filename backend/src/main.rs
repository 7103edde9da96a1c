use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cattle_keeper_backend::{create_router, initialize_backend, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::parse();
    let addr = config.bind_addr()?;
    let development = config.is_development();

    let app_state = initialize_backend(config).await?;
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Cattle Keeper API listening on {} ({})",
        listener.local_addr()?,
        if development { "development" } else { "production" }
    );
    axum::serve(listener, app).await?;

    Ok(())
}
