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

//! The speed/rating partitioned position record.
//!
//! An entry serializes as a sequence of blocks, one per non-empty
//! (rating band, speed) cell:
//!
//! ```text
//! [varuint N >= 1][N x 8-byte game ref][move table]
//! ```
//!
//! The cell of a block is inferred from its first game ref. Per cell the
//! writer keeps the two most recent games; per speed bucket it keeps the
//! four highest-rated games, threaded into the block of the cell they
//! belong to and de-duplicated.

use rustc_hash::FxHashMap;

use crate::codec::{write_uint, ByteReader, CodecError, MoveToken};
use crate::model::sub_entry::{MAX_RECENT_GAMES, MAX_TOP_GAMES};
use crate::model::{GameRef, MoveStats, RatingBand, SpeedBucket, SubEntry};

pub type Cell = (RatingBand, SpeedBucket);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Entry {
    sub: FxHashMap<Cell, SubEntry>,
}

impl Entry {
    pub fn cell_of(game: &GameRef) -> Cell {
        (RatingBand::of(game.rating), game.speed)
    }

    pub fn insert_ref(&mut self, game: GameRef, token: MoveToken) {
        self.sub.entry(Self::cell_of(&game)).or_default().insert(game, token);
    }

    /// Record a game without move statistics (legacy single-game values).
    pub fn insert_game_only(&mut self, game: GameRef) {
        self.sub
            .entry(Self::cell_of(&game))
            .or_default()
            .games
            .insert(0, game);
    }

    pub fn get(&self, cell: Cell) -> Option<&SubEntry> {
        self.sub.get(&cell)
    }

    /// Non-empty cells in deterministic order.
    pub fn cells(&self) -> Vec<(Cell, &SubEntry)> {
        let mut cells: Vec<_> = self.sub.iter().map(|(cell, sub)| (*cell, sub)).collect();
        cells.sort_by_key(|(cell, _)| *cell);
        cells
    }

    pub fn total(&self) -> MoveStats {
        let mut total = MoveStats::default();
        for sub in self.sub.values() {
            total += sub.total();
        }
        total
    }

    pub fn total_games(&self) -> u64 {
        self.total().total()
    }

    pub fn is_empty(&self) -> bool {
        self.sub.is_empty()
    }

    /// When the entry holds exactly one game played with one move, it can
    /// use the compact single-game layout.
    pub(crate) fn as_single(&self) -> Option<(MoveToken, GameRef)> {
        if self.sub.len() != 1 {
            return None;
        }
        let sub = self.sub.values().next()?;
        if sub.total_games() != 1 || sub.moves.len() != 1 || sub.games.len() != 1 {
            return None;
        }
        Some((*sub.moves.keys().next()?, sub.games[0]))
    }

    /// The game refs persisted for one cell: the most recent ones plus the
    /// per-speed top games that live in this cell, newest-recency order
    /// first, without duplicates.
    fn persisted_refs(&self, cell: Cell, sub: &SubEntry) -> Vec<GameRef> {
        let mut refs: Vec<GameRef> = sub
            .games
            .iter()
            .take(MAX_RECENT_GAMES)
            .copied()
            .collect();
        for game in self.top_by_speed(cell.1) {
            if Self::cell_of(&game) == cell && !refs.iter().any(|g| g.id == game.id) {
                refs.push(game);
            }
        }
        refs
    }

    /// Top games of one speed bucket across all rating bands, highest
    /// average rating first, later insertion winning ties.
    pub fn top_by_speed(&self, speed: SpeedBucket) -> Vec<GameRef> {
        let mut games = Vec::new();
        for (cell, sub) in self.cells() {
            if cell.1 == speed {
                games.extend(sub.games.iter().copied());
            }
        }
        games.sort_by_key(|g| std::cmp::Reverse(g.rating));
        games.truncate(MAX_TOP_GAMES);
        games
    }

    pub fn write_blocks(&self, buf: &mut Vec<u8>) {
        for (cell, sub) in self.cells() {
            let refs = self.persisted_refs(cell, sub);
            if refs.is_empty() {
                // A cell only exists once a game was recorded in it, so
                // its persisted list is never empty.
                debug_assert!(sub.games.is_empty());
                continue;
            }
            write_uint(buf, refs.len() as u64);
            for game in &refs {
                game.write(buf);
            }
            sub.write_moves(buf);
        }
    }

    pub fn read_blocks(reader: &mut ByteReader<'_>) -> Result<Entry, CodecError> {
        let mut entry = Entry::default();
        while !reader.is_empty() {
            let count = reader.read_uint()?;
            if count == 0 {
                return Err(CodecError::Malformed("empty game block"));
            }
            let first = GameRef::read(reader)?;
            let cell = Self::cell_of(&first);
            let sub = entry.sub.entry(cell).or_default();
            sub.games.push(first);
            for _ in 1..count {
                sub.games.push(GameRef::read(reader)?);
            }
            sub.read_moves(reader)?;
        }
        Ok(entry)
    }
}
