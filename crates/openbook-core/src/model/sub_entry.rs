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

use rustc_hash::FxHashMap;

use crate::codec::{read_move, write_move, write_uint, ByteReader, CodecError, MoveToken};
use crate::model::{GameRef, MoveStats};

/// Most top-rated games persisted per master record or per speed bucket.
pub const MAX_TOP_GAMES: usize = 4;

/// Most recent games persisted per (rating band, speed) cell.
pub const MAX_RECENT_GAMES: usize = 2;

/// Per-move statistics and the game list for one cell of an entry (or the
/// single cell of a master record). The game list is ordered newest first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubEntry {
    pub moves: FxHashMap<MoveToken, MoveStats>,
    pub games: Vec<GameRef>,
}

impl SubEntry {
    pub fn insert(&mut self, game: GameRef, token: MoveToken) {
        self.moves.entry(token).or_default().with_game(&game);
        self.games.insert(0, game);
    }

    /// Undo a previous insert. Move rows whose counters reach zero are
    /// dropped, as is the game's entry in the list.
    pub fn remove(&mut self, game: &GameRef, token: MoveToken) {
        if let Some(stats) = self.moves.get_mut(&token) {
            stats.without_game(game);
            if stats.is_empty() {
                self.moves.remove(&token);
            }
        }
        if let Some(idx) = self.games.iter().position(|g| g.id == game.id) {
            self.games.remove(idx);
        }
    }

    pub fn total(&self) -> MoveStats {
        let mut total = MoveStats::default();
        for stats in self.moves.values() {
            total += *stats;
        }
        total
    }

    pub fn total_games(&self) -> u64 {
        self.total().total()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// The recency-ordered prefix of the game list. Entries past
    /// `MAX_RECENT_GAMES` survive persistence only through the top-games
    /// selection and carry no recency information.
    pub fn recent_games(&self) -> &[GameRef] {
        &self.games[..self.games.len().min(MAX_RECENT_GAMES)]
    }

    /// The stored top-games selection: highest average rating first, later
    /// insertion winning ties.
    pub fn top_games(&self, limit: usize) -> Vec<GameRef> {
        // The list is newest first, so a stable sort keeps the later
        // insertion ahead of an equally rated earlier one.
        let mut games = self.games.clone();
        games.sort_by_key(|g| std::cmp::Reverse(g.rating));
        games.truncate(limit);
        games
    }

    /// Write the move table: `[varuint m]` followed by `m` rows of
    /// `[move][white][draws][black][rating sum]`.
    pub fn write_moves(&self, buf: &mut Vec<u8>) {
        write_uint(buf, self.moves.len() as u64);
        let mut rows: Vec<_> = self.moves.iter().collect();
        rows.sort_by_key(|(token, _)| **token);
        for (token, stats) in rows {
            write_move(buf, *token);
            stats.write(buf);
        }
    }

    /// Read a move table into this sub-entry, merging counters for moves
    /// already present.
    pub fn read_moves(&mut self, reader: &mut ByteReader<'_>) -> Result<(), CodecError> {
        let count = reader.read_uint()?;
        for _ in 0..count {
            let token = read_move(reader)?;
            let stats = MoveStats::read(reader)?;
            *self.moves.entry(token).or_default() += stats;
        }
        Ok(())
    }
}
