use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use openbook_server::{app, AppState, MergeOpts};

#[derive(Parser)]
struct Opts {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Binding address (env: OPENBOOK_BIND). Administrative endpoints
    /// must be protected by a reverse proxy.
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Allow access from all origins (env: OPENBOOK_CORS).
    #[arg(long)]
    cors: bool,
    /// Directory holding the per-variant databases (env:
    /// OPENBOOK_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Tab-separated opening table (env: OPENBOOK_OPENINGS).
    #[arg(long)]
    openings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();
    let config = openbook_server::load_config(MergeOpts {
        config_path: opts.config,
        cli_bind: opts.bind,
        cli_cors: opts.cors.then_some(true),
        cli_data_dir: opts.data_dir,
        cli_openings_path: opts.openings,
    })?;

    let state = AppState::open(&config)?;
    let shutdown_state = state.clone();

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(bind = %config.bind, "serving opening explorer");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    shutdown_state.flush()?;
    Ok(())
}
