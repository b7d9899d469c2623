// Copyright 2025 Openbook Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Position-indexed stores on an embedded ordered database.
//!
//! Keys are the 16 big-endian bytes of the position's 128-bit Zobrist
//! hash, one database directory per (variant, purpose). The only
//! serialization point is the database's per-key compare-and-swap loop:
//! merges run a decode/update/encode closure inside
//! [`sled::Tree::update_and_fetch`], so concurrent writers to the same
//! position are linearized without any lock above the storage layer.

use std::marker::PhantomData;
use std::path::Path;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::codec::{CodecError, MoveToken};
use crate::model::{GameRef, LichessPack, MasterPack, PositionRecord, RecordPack, Variant};

/// Store tuning. Affects performance only, never semantics.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub cache_bytes: u64,
    pub flush_every_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> StoreConfig {
        StoreConfig {
            cache_bytes: 64 * 1024 * 1024,
            flush_every_ms: Some(1000),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage: {0}")]
    Io(#[from] sled::Error),
    #[error("compression: {0}")]
    Compress(#[from] std::io::Error),
    #[error("corrupt record {key}: {source}")]
    Corrupt { key: String, source: CodecError },
}

impl StoreError {
    fn corrupt(key: u128, source: CodecError) -> StoreError {
        tracing::error!(key = %format!("{key:032x}"), %source, "corrupt position record");
        StoreError::Corrupt {
            key: format!("{key:032x}"),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

fn open_db(path: &Path, config: &StoreConfig) -> StoreResult<sled::Db> {
    Ok(sled::Config::new()
        .path(path)
        .cache_capacity(config.cache_bytes)
        .flush_every_ms(config.flush_every_ms)
        .open()?)
}

/// Position-hash keyed store of packed records. The packer decides the
/// record type: [`LichessPack`] for the partitioned entries,
/// [`MasterPack`] for the single-cell master records.
pub struct PositionStore<P: RecordPack> {
    db: sled::Db,
    _pack: PhantomData<P>,
}

pub type LichessStore = PositionStore<LichessPack>;
pub type MasterStore = PositionStore<MasterPack>;

impl<P: RecordPack> PositionStore<P> {
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<Self> {
        Ok(PositionStore {
            db: open_db(path.as_ref(), config)?,
            _pack: PhantomData,
        })
    }

    pub fn get(&self, key: u128) -> StoreResult<Option<P::Record>> {
        match self.db.get(key.to_be_bytes())? {
            Some(bytes) => P::unpack(&bytes)
                .map(Some)
                .map_err(|err| StoreError::corrupt(key, err)),
            None => Ok(None),
        }
    }

    /// Atomic read-modify-write: decode the current record (absent reads
    /// as empty), add the game, encode and write back. Either fully
    /// applies or leaves the stored value untouched.
    pub fn merge(&self, key: u128, game: GameRef, token: MoveToken) -> StoreResult<()> {
        let mut decode_err = None;
        self.db.update_and_fetch(key.to_be_bytes(), |old| {
            let mut record = match old {
                Some(bytes) => match P::unpack(bytes) {
                    Ok(record) => record,
                    Err(err) => {
                        // Leave the value as is; the error surfaces below.
                        decode_err = Some(err);
                        return Some(bytes.to_vec());
                    }
                },
                None => P::Record::default(),
            };
            record.insert_ref(game, token);
            Some(P::pack_to_vec(&record))
        })?;
        match decode_err {
            Some(err) => Err(StoreError::corrupt(key, err)),
            None => Ok(()),
        }
    }

    pub fn exists(&self, key: u128) -> StoreResult<bool> {
        Ok(self.db.contains_key(key.to_be_bytes())?)
    }

    pub fn record_count(&self) -> u64 {
        self.db.len() as u64
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl MasterStore {
    /// Inverse of [`PositionStore::merge`]. A record whose game count
    /// reaches zero is removed rather than written back empty.
    pub fn subtract(&self, key: u128, game: &GameRef, token: MoveToken) -> StoreResult<()> {
        let mut decode_err = None;
        self.db.update_and_fetch(key.to_be_bytes(), |old| {
            let bytes = old?;
            let mut record = match MasterPack::unpack(bytes) {
                Ok(record) => record,
                Err(err) => {
                    decode_err = Some(err);
                    return Some(bytes.to_vec());
                }
            };
            record.remove(game, token);
            if record.total_games() == 0 && record.games.is_empty() {
                None
            } else {
                Some(MasterPack::pack_to_vec(&record))
            }
        })?;
        match decode_err {
            Some(err) => Err(StoreError::corrupt(key, err)),
            None => Ok(()),
        }
    }
}

/// One lichess position store per variant, opened side by side under the
/// data root.
pub struct VariantStores {
    stores: FxHashMap<Variant, LichessStore>,
}

impl VariantStores {
    pub fn open(root: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<VariantStores> {
        let root = root.as_ref();
        let mut stores = FxHashMap::default();
        for variant in Variant::ALL {
            stores.insert(
                variant,
                LichessStore::open(root.join(variant.as_str()), config)?,
            );
        }
        Ok(VariantStores { stores })
    }

    pub fn get(&self, variant: Variant) -> &LichessStore {
        &self.stores[&variant]
    }

    pub fn record_counts(&self) -> Vec<(Variant, u64)> {
        let mut counts: Vec<_> = self
            .stores
            .iter()
            .map(|(variant, store)| (*variant, store.record_count()))
            .collect();
        counts.sort_by_key(|(variant, _)| *variant);
        counts
    }

    pub fn flush(&self) -> StoreResult<()> {
        for store in self.stores.values() {
            store.flush()?;
        }
        Ok(())
    }
}

const ZSTD_LEVEL: i32 = 3;

/// Game-id keyed store with compressed values, used for master PGN text
/// and lichess game metadata.
pub struct BlobStore {
    db: sled::Db,
}

pub type PgnStore = BlobStore;
pub type GameInfoStore = BlobStore;

impl BlobStore {
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<BlobStore> {
        Ok(BlobStore {
            db: open_db(path.as_ref(), config)?,
        })
    }

    /// First write wins: returns true when this call created the record,
    /// false when the key was already present.
    pub fn put_new(&self, key: &str, value: &str) -> StoreResult<bool> {
        let compressed = zstd::encode_all(value.as_bytes(), ZSTD_LEVEL)?;
        Ok(self
            .db
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(compressed))?
            .is_ok())
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let raw = zstd::decode_all(&bytes[..])?;
                Ok(Some(String::from_utf8(raw).map_err(|_| {
                    StoreError::Corrupt {
                        key: key.to_owned(),
                        source: CodecError::Malformed("value not utf-8"),
                    }
                })?))
            }
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.db.remove(key.as_bytes())?.is_some())
    }

    pub fn record_count(&self) -> u64 {
        self.db.len() as u64
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
