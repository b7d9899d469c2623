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

//! Data model for per-position aggregates.

mod band;
mod entry;
mod game_info;
mod game_ref;
mod pack;
mod speed;
mod stats;
mod sub_entry;
mod variant;

pub use band::RatingBand;
pub use entry::{Cell, Entry};
pub use game_info::{GameInfo, GamePlayer};
pub use game_ref::{GameId, GameRef, InvalidGameId, Winner};
pub use pack::{LichessPack, MasterPack, PositionRecord, RecordPack};
pub use speed::SpeedBucket;
pub use stats::MoveStats;
pub use sub_entry::SubEntry;
pub use variant::Variant;
