use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use scrap::{
    config::Config,
    info_time,
    server::{create_router, AppContext},
    Result,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let start_time = Local::now();
    let config = Config::parse();
    let ctx = AppContext::from_config(&config)?;
    let app = create_router(Arc::new(ctx));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info_time!(start_time, "Listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info_time!(start_time, "Full program time:");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("couldn't listen for ctrl-c: {e}");
    }
}
