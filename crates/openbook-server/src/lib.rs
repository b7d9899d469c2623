//! HTTP surface of the opening explorer.
//!
//! Routing, JSON shaping, configuration, the bounded response cache and
//! the opening-name table live here; everything position- and
//! store-related comes from `openbook-core`.

pub mod api;
pub mod config;
pub mod http;
pub mod openings;

pub use config::{load_config, MergeOpts, ServerConfig};
pub use http::{app, AppState};
