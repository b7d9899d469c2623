//! Opening-name lookup keyed by position hash.
//!
//! The table is loaded once at startup from a tab-separated file with
//! `eco`, `name` and `epd` columns (extra columns are ignored). Openings
//! only make sense for variants that start from the standard position.

use std::path::Path;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use shakmaty::{fen::Epd, variant::VariantPosition, CastlingMode};

use openbook_core::query::position_hash;
use openbook_core::Variant;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Opening {
    pub eco: String,
    pub name: String,
}

#[derive(Deserialize)]
struct OpeningRecord {
    eco: String,
    name: String,
    epd: String,
}

#[derive(Default)]
pub struct Openings {
    data: FxHashMap<u128, Opening>,
}

impl Openings {
    /// An empty table: every lookup misses.
    pub fn empty() -> Openings {
        Openings::default()
    }

    pub fn load(path: &Path) -> Result<Openings> {
        let mut data = FxHashMap::default();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .with_context(|| format!("open opening table {}", path.display()))?;
        for record in reader.deserialize() {
            let record: OpeningRecord = record.context("opening table row")?;
            let epd: Epd = record
                .epd
                .parse()
                .with_context(|| format!("bad epd for {}", record.name))?;
            let pos = VariantPosition::from_setup(
                shakmaty::variant::Variant::Chess,
                epd.into_setup(),
                CastlingMode::Chess960,
            )
            .with_context(|| format!("illegal opening position for {}", record.name))?;
            data.insert(
                position_hash(&pos),
                Opening {
                    eco: record.eco,
                    name: record.name,
                },
            );
        }
        data.shrink_to_fit();
        Ok(Openings { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn classify(&self, variant: Variant, pos: &VariantPosition) -> Option<&Opening> {
        if !opening_sensible(variant) {
            return None;
        }
        self.data.get(&position_hash(pos))
    }
}

fn opening_sensible(variant: Variant) -> bool {
    matches!(
        variant,
        Variant::Standard
            | Variant::Crazyhouse
            | Variant::ThreeCheck
            | Variant::KingOfTheHill
    )
}
