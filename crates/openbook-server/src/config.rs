//! Layered configuration: defaults, then a TOML file, then environment
//! variables, then command-line flags, later layers winning.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use openbook_core::store::StoreConfig;
use openbook_core::Variant;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Emit `Access-Control-Allow-Origin: *` on every response.
    pub cors: bool,
    pub data_dir: PathBuf,
    /// Tab-separated opening table (`eco`, `name`, `epd` columns). The
    /// opening field of responses is omitted when unset.
    pub openings_path: Option<PathBuf>,
    pub master: MasterSection,
    pub lichess: LichessSection,
    pub cache: CacheSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MasterSection {
    pub max_plies: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LichessSection {
    pub max_plies: usize,
    /// Per-variant overrides, keyed by variant name.
    pub max_plies_by_variant: HashMap<String, usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_seconds: u64,
    pub max_entries: u64,
    /// Positions whose FEN fullmove number exceeds this bypass the cache.
    pub max_moves: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub cache_bytes: u64,
    pub flush_every_ms: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:9002".parse().expect("default bind address"),
            cors: false,
            data_dir: PathBuf::from("data"),
            openings_path: None,
            master: MasterSection::default(),
            lichess: LichessSection::default(),
            cache: CacheSection::default(),
            store: StoreSection::default(),
        }
    }
}

impl Default for MasterSection {
    fn default() -> MasterSection {
        MasterSection {
            max_plies: openbook_core::import::DEFAULT_MASTER_PLIES,
        }
    }
}

impl Default for LichessSection {
    fn default() -> LichessSection {
        LichessSection {
            max_plies: openbook_core::import::DEFAULT_LICHESS_PLIES,
            max_plies_by_variant: HashMap::new(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> CacheSection {
        CacheSection {
            ttl_seconds: 600,
            max_entries: 10_000,
            max_moves: 25,
        }
    }
}

impl Default for StoreSection {
    fn default() -> StoreSection {
        let defaults = StoreConfig::default();
        StoreSection {
            cache_bytes: defaults.cache_bytes,
            flush_every_ms: defaults.flush_every_ms,
        }
    }
}

impl ServerConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            cache_bytes: self.store.cache_bytes,
            flush_every_ms: self.store.flush_every_ms,
        }
    }

    /// Truncation depth per variant for the lichess importer.
    pub fn lichess_plies(&self) -> rustc_hash::FxHashMap<Variant, usize> {
        let mut plies = rustc_hash::FxHashMap::default();
        for variant in Variant::ALL {
            let depth = self
                .lichess
                .max_plies_by_variant
                .get(variant.as_str())
                .copied()
                .unwrap_or(self.lichess.max_plies);
            plies.insert(variant, depth);
        }
        plies
    }
}

/// CLI-level options that the server binary passes to [`load_config`].
#[derive(Debug, Clone, Default)]
pub struct MergeOpts {
    pub config_path: Option<PathBuf>,
    pub cli_bind: Option<SocketAddr>,
    pub cli_cors: Option<bool>,
    pub cli_data_dir: Option<PathBuf>,
    pub cli_openings_path: Option<PathBuf>,
}

pub fn load_config(opts: MergeOpts) -> Result<ServerConfig> {
    let mut config = ServerConfig::default();

    if let Some(path) = opts.config_path.as_ref() {
        if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            config = toml::from_str(&raw)
                .with_context(|| format!("parse config {}", path.display()))?;
        }
    }

    // env vars override the file
    if let Ok(bind) = std::env::var("OPENBOOK_BIND") {
        if let Ok(bind) = bind.parse() {
            config.bind = bind;
        }
    }
    if let Ok(cors) = std::env::var("OPENBOOK_CORS") {
        config.cors = matches!(cors.as_str(), "1" | "true" | "yes");
    }
    if let Ok(dir) = std::env::var("OPENBOOK_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(path) = std::env::var("OPENBOOK_OPENINGS") {
        config.openings_path = Some(PathBuf::from(path));
    }

    // CLI overrides everything
    if let Some(bind) = opts.cli_bind {
        config.bind = bind;
    }
    if let Some(cors) = opts.cli_cors {
        config.cors = cors;
    }
    if let Some(dir) = opts.cli_data_dir {
        config.data_dir = dir;
    }
    if let Some(path) = opts.cli_openings_path {
        config.openings_path = Some(path);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_env_cli_precedence() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        std::fs::write(
            tmp.path(),
            r#"
bind = "127.0.0.1:1111"
data_dir = "from-file"

[cache]
ttl_seconds = 30

[lichess]
max_plies = 44
max_plies_by_variant = { crazyhouse = 30 }
"#,
        )
        .unwrap();

        let got = load_config(MergeOpts {
            config_path: Some(tmp.path().to_path_buf()),
            cli_bind: Some("127.0.0.1:2222".parse().unwrap()),
            ..MergeOpts::default()
        })
        .expect("load");

        // CLI beats the file; untouched keys come from the file or the
        // defaults.
        assert_eq!(got.bind.port(), 2222);
        assert_eq!(got.data_dir, PathBuf::from("from-file"));
        assert_eq!(got.cache.ttl_seconds, 30);
        assert_eq!(got.cache.max_entries, 10_000);

        let plies = got.lichess_plies();
        assert_eq!(plies[&Variant::Crazyhouse], 30);
        assert_eq!(plies[&Variant::Atomic], 44);
    }

    #[test]
    fn defaults_without_any_source() {
        let got = load_config(MergeOpts::default()).expect("load");
        assert_eq!(got.bind.port(), 9002);
        assert!(!got.cors);
        assert_eq!(got.master.max_plies, 40);
        assert_eq!(got.cache.max_moves, 25);
    }
}
