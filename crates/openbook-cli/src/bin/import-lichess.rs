use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use openbook_cli::split_games;

/// Feed lichess PGN exports to a running explorer in batches.
#[derive(Parser)]
struct Opts {
    /// Base URL of the explorer.
    #[arg(long, default_value = "http://127.0.0.1:9002")]
    endpoint: String,
    /// Games per request.
    #[arg(long, default_value = "200")]
    batch_size: usize,
    /// PGN files to import.
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();
    let client = reqwest::blocking::Client::new();
    let url = format!("{}/lichess", opts.endpoint.trim_end_matches('/'));

    for path in &opts.files {
        tracing::info!(file = %path.display(), "importing lichess games");
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let games = split_games(file)?;
        for batch in games.chunks(opts.batch_size.max(1)) {
            let response = client
                .put(&url)
                .header("Content-Type", "application/vnd.chess-pgn; charset=utf-8")
                .body(batch.join("\n"))
                .send()
                .context("send batch")?;
            if !response.status().is_success() {
                tracing::warn!(
                    status = response.status().as_u16(),
                    reason = %response.text().unwrap_or_default(),
                    "batch failed"
                );
            } else {
                tracing::info!(games = batch.len(), "batch indexed");
            }
        }
    }
    Ok(())
}
