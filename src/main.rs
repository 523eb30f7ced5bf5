use anyhow::{Context, Result};
use clap::Parser;
use moshi_call::{create_router, AppState, Config, JsonFileStore, SessionRegistry, TranscriptStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Voice conversation backend: admin API for live call sessions
///
/// Calls are opened by the media transport embedding this crate, which builds
/// each `CallSession` with its adapters and registers it in the shared
/// `SessionRegistry`. This binary owns the registry, the transcript store and
/// the HTTP surface.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file, extension optional
    #[arg(short, long, default_value = "config/moshi-call")]
    config: String,

    /// Override the HTTP port from the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("Moshi Call v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    let store: Arc<dyn TranscriptStore> = Arc::new(
        JsonFileStore::new(&cfg.storage.transcripts_path)
            .context("Failed to open transcript store")?,
    );

    let registry = SessionRegistry::new();
    let reaper = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(30));
            loop {
                tick.tick().await;
                registry.reap().await;
            }
        })
    };

    let app = create_router(AppState::new(registry.clone()).with_store(store));
    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    reaper.abort();
    let stopped = registry.shutdown_all().await;
    info!("Stopped {} call sessions, exiting", stopped.len());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
