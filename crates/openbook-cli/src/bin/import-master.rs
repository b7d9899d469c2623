use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use openbook_cli::split_games;

/// Feed master PGN files to a running explorer, one game per request.
#[derive(Parser)]
struct Opts {
    /// Base URL of the explorer.
    #[arg(long, default_value = "http://127.0.0.1:9002")]
    endpoint: String,
    /// PGN files to import.
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();
    let client = reqwest::blocking::Client::new();
    let url = format!("{}/master", opts.endpoint.trim_end_matches('/'));

    for path in &opts.files {
        tracing::info!(file = %path.display(), "importing master games");
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let mut accepted = 0usize;
        let mut rejected = 0usize;
        for game in split_games(file)? {
            let response = client
                .put(&url)
                .header("Content-Type", "application/vnd.chess-pgn; charset=utf-8")
                .body(game)
                .send()
                .context("send game")?;
            if response.status().is_success() {
                accepted += 1;
            } else {
                rejected += 1;
                tracing::warn!(
                    status = response.status().as_u16(),
                    reason = %response.text().unwrap_or_default(),
                    "game not imported"
                );
            }
        }
        tracing::info!(accepted, rejected, "file done");
    }
    Ok(())
}
