use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ingest_server::{build_router, telemetry, AppContext, AppSettings};
use tracing::info;

/// Command-line overrides for the ingestion server.
#[derive(Parser, Debug)]
#[command(name = "ingest-server")]
#[command(about = "Video ingestion pipeline: upload submission, management, and status endpoints")]
struct Args {
    /// Override the port `AppSettings` resolved from the environment.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();

    let mut settings = AppSettings::load().context("loading configuration")?;
    if let Some(port) = args.port {
        settings.port = port;
    }

    info!(host = %settings.host, port = settings.port, "starting ingestion server");

    let context = Arc::new(AppContext::build(&settings).context("wiring application context")?);
    context.initialize().await.context("running startup migrations and collection setup")?;

    let app = build_router(context);
    let address = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;

    info!(address = %address, "ingestion server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("ingestion server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    info!("shutdown signal received, draining in-flight requests");
}
