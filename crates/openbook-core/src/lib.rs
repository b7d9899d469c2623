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

//! Opening explorer core.
//!
//! Games are incrementally indexed from PGN streams into per-variant
//! position stores; queries aggregate per-position records filtered by
//! rating band and speed bucket. The crate is organized around three
//! subsystems:
//!
//! * [`codec`] and [`model`]: the compact binary record format,
//! * [`store`]: position-indexed stores with per-key atomic merges,
//! * [`import`] and [`query`]: the PGN pipeline and the read side.

#![forbid(unsafe_code)]

pub mod codec;
pub mod import;
pub mod model;
pub mod query;
pub mod store;

pub use codec::{CodecError, MoveToken};
pub use import::{ImportError, LichessImporter, MasterImporter};
pub use model::{
    Entry, GameId, GameInfo, GameRef, MoveStats, RatingBand, SpeedBucket, SubEntry, Variant,
    Winner,
};
pub use query::{probe_entry, probe_master, QueryFilter, QueryResult};
pub use store::{
    BlobStore, GameInfoStore, LichessStore, MasterStore, PgnStore, StoreConfig, StoreError,
    VariantStores,
};
