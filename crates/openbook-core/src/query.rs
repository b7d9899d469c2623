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

//! Pure query engine over decoded position records.
//!
//! Probing never fails on absent positions: an unknown hash aggregates to
//! an empty result. Cross-position reads (child enumeration) are
//! best-effort consistent, since imports touch each position with an
//! independent merge.

use rustc_hash::FxHashSet;
use shakmaty::{uci::UciMove, variant::VariantPosition, zobrist::Zobrist128};
use shakmaty::{zobrist::ZobristHash, EnPassantMode, Move, Position};

use crate::codec::{encode_move, MoveToken};
use crate::model::{Entry, GameRef, MoveStats, RatingBand, SpeedBucket, SubEntry};
use crate::store::{LichessStore, StoreError};

pub const MAX_TOP_GAMES: usize = 4;
pub const MAX_RECENT_GAMES: usize = 10;
pub const MAX_MOVES: usize = 20;
pub const DEFAULT_MOVES: usize = 12;

/// Which slices of an entry a query aggregates, and how much detail the
/// caller wants back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFilter {
    pub bands: Vec<RatingBand>,
    pub speeds: Vec<SpeedBucket>,
    pub top_games: usize,
    pub recent_games: usize,
    pub max_moves: usize,
}

impl Default for QueryFilter {
    fn default() -> QueryFilter {
        QueryFilter {
            bands: RatingBand::ALL.to_vec(),
            speeds: SpeedBucket::ALL.to_vec(),
            top_games: MAX_TOP_GAMES,
            recent_games: 4,
            max_moves: DEFAULT_MOVES,
        }
    }
}

impl QueryFilter {
    fn wants(&self, band: RatingBand, speed: SpeedBucket) -> bool {
        self.bands.contains(&band) && self.speeds.contains(&speed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRow {
    pub token: MoveToken,
    pub stats: MoveStats,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Totals over the requested cells.
    pub stats: MoveStats,
    /// Moves ranked by games played, descending.
    pub moves: Vec<MoveRow>,
    /// Highest-rated games of the requested speeds, gated on the
    /// requested bands.
    pub top_games: Vec<GameRef>,
    /// Most recent games of the requested cells.
    pub recent_games: Vec<GameRef>,
}

/// Aggregate an entry under a filter.
pub fn probe_entry(entry: &Entry, filter: &QueryFilter) -> QueryResult {
    let cells: Vec<_> = entry
        .cells()
        .into_iter()
        .filter(|((band, speed), _)| filter.wants(*band, *speed))
        .collect();

    let mut stats = MoveStats::default();
    let mut moves: rustc_hash::FxHashMap<MoveToken, MoveStats> = Default::default();
    for (_, sub) in &cells {
        for (token, move_stats) in &sub.moves {
            *moves.entry(*token).or_default() += *move_stats;
        }
        stats += sub.total();
    }

    let mut moves: Vec<MoveRow> = moves
        .into_iter()
        .filter(|(_, stats)| !stats.is_empty())
        .map(|(token, stats)| MoveRow { token, stats })
        .collect();
    moves.sort_by_key(|row| (std::cmp::Reverse(row.stats.total()), row.token));
    moves.truncate(filter.max_moves.clamp(1, MAX_MOVES));

    QueryResult {
        stats,
        moves,
        top_games: top_games(entry, filter),
        recent_games: recent_games(&cells, filter),
    }
}

/// Top games are selected per requested speed slice across all bands,
/// then gated on the requested bands: if the strongest candidate's band
/// was excluded, no top games are returned at all.
fn top_games(entry: &Entry, filter: &QueryFilter) -> Vec<GameRef> {
    let mut candidates = Vec::new();
    for ((_, speed), sub) in entry.cells() {
        if filter.speeds.contains(&speed) {
            candidates.extend(sub.games.iter().copied());
        }
    }
    candidates.sort_by_key(|g| std::cmp::Reverse(g.rating));
    candidates.truncate(filter.top_games.min(MAX_TOP_GAMES));

    match candidates.first() {
        Some(best) if filter.bands.contains(&RatingBand::of(best.rating)) => {
            candidates.retain(|g| filter.bands.contains(&RatingBand::of(g.rating)));
            candidates
        }
        _ => Vec::new(),
    }
}

/// Interleave the newest-first game lists of the requested cells by rank,
/// so the k-th most recent game of every cell precedes any (k+1)-th.
fn recent_games(
    cells: &[((RatingBand, SpeedBucket), &SubEntry)],
    filter: &QueryFilter,
) -> Vec<GameRef> {
    let limit = filter.recent_games.min(MAX_RECENT_GAMES);
    let mut recent = Vec::new();
    let mut rank = 0;
    while recent.len() < limit {
        let before = recent.len();
        for (_, sub) in cells {
            if let Some(game) = sub.recent_games().get(rank) {
                recent.push(*game);
                if recent.len() == limit {
                    break;
                }
            }
        }
        if recent.len() == before {
            break;
        }
        rank += 1;
    }
    recent
}

/// Aggregate a master record: one cell, top games only.
pub fn probe_master(sub: &SubEntry, top_games: usize, max_moves: usize) -> QueryResult {
    let mut moves: Vec<MoveRow> = sub
        .moves
        .iter()
        .filter(|(_, stats)| !stats.is_empty())
        .map(|(token, stats)| MoveRow {
            token: *token,
            stats: *stats,
        })
        .collect();
    moves.sort_by_key(|row| (std::cmp::Reverse(row.stats.total()), row.token));
    moves.truncate(max_moves.clamp(1, MAX_MOVES));

    QueryResult {
        stats: sub.total(),
        moves,
        top_games: sub.top_games(top_games.min(MAX_TOP_GAMES)),
        recent_games: Vec::new(),
    }
}

/// Lazy enumeration of the legal moves of a position as owned move
/// tokens. Castling moves that share a rook target collapse into one
/// token.
pub struct LegalTokens {
    moves: std::vec::IntoIter<Move>,
    seen: FxHashSet<MoveToken>,
}

impl LegalTokens {
    pub fn new(pos: &VariantPosition) -> LegalTokens {
        LegalTokens {
            moves: pos.legal_moves().to_vec().into_iter(),
            seen: FxHashSet::default(),
        }
    }
}

impl Iterator for LegalTokens {
    type Item = (MoveToken, Move);

    fn next(&mut self) -> Option<(MoveToken, Move)> {
        loop {
            let m = self.moves.next()?;
            if let Ok(token) = encode_move(&UciMove::from_chess960(&m)) {
                if self.seen.insert(token) {
                    return Some((token, m));
                }
            }
        }
    }
}

/// Totals for every position reachable in one legal move. Step 2 of the
/// query algorithm per child, without game lists.
pub fn children(
    pos: &VariantPosition,
    store: &LichessStore,
    filter: &QueryFilter,
) -> Result<Vec<(MoveToken, MoveStats)>, StoreError> {
    let mut rows = Vec::new();
    for (token, m) in LegalTokens::new(pos) {
        let mut child = pos.clone();
        child.play_unchecked(&m);
        let hash: Zobrist128 = child.zobrist_hash(EnPassantMode::Legal);
        let stats = match store.get(u128::from(hash))? {
            Some(entry) => probe_entry(&entry, filter).stats,
            None => MoveStats::default(),
        };
        rows.push((token, stats));
    }
    Ok(rows)
}

pub fn position_hash(pos: &VariantPosition) -> u128 {
    let hash: Zobrist128 = pos.zobrist_hash(EnPassantMode::Legal);
    u128::from(hash)
}
