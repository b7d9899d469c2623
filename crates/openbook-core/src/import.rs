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

//! PGN ingestion.
//!
//! Each game becomes one [`GameRef`] and a sequence of per-ply
//! `(position hash, move token)` pairs that are merged into the position
//! stores. Positions repeated within a game are merged once, the last
//! move played from them winning. The dedup record (game info for
//! lichess, PGN text for master) is always written last, so its presence
//! implies every ply of the game is indexed.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};
use rand::Rng;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use shakmaty::{
    fen::Fen,
    san::San,
    uci::UciMove,
    variant::VariantPosition,
    zobrist::{Zobrist128, ZobristHash},
    CastlingMode, EnPassantMode, Position,
};
use thiserror::Error;

use crate::codec::{encode_move, MoveToken};
use crate::model::{GameId, GameInfo, GamePlayer, GameRef, SpeedBucket, Variant, Winner};
use crate::store::{GameInfoStore, MasterStore, PgnStore, StoreError, VariantStores};

/// Master games below this average rating are not indexed.
pub const MASTER_RATING_THRESHOLD: u16 = 2200;

pub const DEFAULT_MASTER_PLIES: usize = 40;
pub const DEFAULT_LICHESS_PLIES: usize = 50;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Business-rule rejection. The batch continues.
    #[error("rejected: {0}")]
    Reject(String),
    /// Disk failure. The batch aborts.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The PGN stream itself could not be read.
    #[error("pgn read: {0}")]
    Read(#[from] io::Error),
}

impl ImportError {
    pub fn is_reject(&self) -> bool {
        matches!(self, ImportError::Reject(_))
    }
}

fn reject(reason: impl Into<String>) -> ImportError {
    ImportError::Reject(reason.into())
}

/// Header tags and movetext of one scanned PGN game.
#[derive(Debug, Default, Clone)]
pub struct RawGame {
    pub white: Option<String>,
    pub black: Option<String>,
    pub white_elo: Option<u16>,
    pub black_elo: Option<u16>,
    pub result: Option<String>,
    pub time_control: Option<String>,
    pub variant_tag: Option<String>,
    pub fen: Option<String>,
    pub game_id_tag: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub sans: Vec<San>,
}

impl RawGame {
    fn is_blank(&self) -> bool {
        self.sans.is_empty() && self.result.is_none() && self.white.is_none()
    }

    pub fn average_rating(&self) -> Option<u16> {
        match (self.white_elo, self.black_elo) {
            (Some(w), Some(b)) => Some(((u32::from(w) + u32::from(b)) / 2) as u16),
            _ => None,
        }
    }

    pub fn winner(&self) -> Option<Winner> {
        match self.result.as_deref() {
            Some("1-0") => Some(Winner::White),
            Some("0-1") => Some(Winner::Black),
            Some("1/2-1/2") => Some(Winner::Draw),
            _ => None,
        }
    }

    pub fn speed(&self) -> SpeedBucket {
        self.time_control
            .as_deref()
            .map_or(SpeedBucket::Classical, SpeedBucket::from_time_control)
    }

    /// Explicit `GameId` tag, or the 8-character tail of a lichess-style
    /// `Site` URL.
    pub fn game_id(&self) -> Option<GameId> {
        if let Some(tag) = self.game_id_tag.as_deref() {
            return tag.parse().ok();
        }
        let site = self.site.as_deref()?;
        site.rsplit('/').next()?.parse().ok()
    }

    pub fn year(&self) -> Option<u16> {
        let date = self.date.as_deref()?;
        date.split('.').next()?.parse().ok()
    }

    pub fn variant(&self) -> Result<Variant, ImportError> {
        let variant = match self.variant_tag.as_deref() {
            Some(tag) => Variant::from_pgn_tag(tag)
                .ok_or_else(|| reject(format!("unknown variant {tag:?}")))?,
            None => Variant::Standard,
        };
        Ok(if variant == Variant::Standard && self.fen.is_some() {
            Variant::FromPosition
        } else {
            variant
        })
    }
}

#[derive(Default)]
struct GameScan {
    game: RawGame,
}

impl Visitor for GameScan {
    type Result = RawGame;

    fn begin_game(&mut self) {
        self.game = RawGame::default();
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        let value = || Some(value.decode_utf8_lossy().into_owned());
        match key {
            b"White" => self.game.white = value(),
            b"Black" => self.game.black = value(),
            b"WhiteElo" => self.game.white_elo = value().and_then(|v| v.parse().ok()),
            b"BlackElo" => self.game.black_elo = value().and_then(|v| v.parse().ok()),
            b"Result" => self.game.result = value(),
            b"TimeControl" => self.game.time_control = value(),
            b"Variant" => self.game.variant_tag = value(),
            b"FEN" => self.game.fen = value(),
            b"GameId" => self.game.game_id_tag = value(),
            b"Site" => self.game.site = value(),
            b"Date" | b"UTCDate" => {
                if self.game.date.is_none() {
                    self.game.date = value();
                }
            }
            _ => {}
        }
    }

    fn san(&mut self, san_plus: SanPlus) {
        self.game.sans.push(san_plus.san);
    }

    fn begin_variation(&mut self) -> Skip {
        Skip(true)
    }

    fn end_game(&mut self) -> RawGame {
        std::mem::take(&mut self.game)
    }
}

/// Scan every game in a PGN stream (games are separated by blank lines).
pub fn scan_games(pgn: &str) -> io::Result<Vec<RawGame>> {
    let mut reader = BufferedReader::new(pgn.as_bytes());
    let mut scan = GameScan::default();
    let mut games = Vec::new();
    while let Some(game) = reader.read_game(&mut scan)? {
        if !game.is_blank() {
            games.push(game);
        }
    }
    Ok(games)
}

fn scan_one(pgn: &str) -> Result<RawGame, ImportError> {
    scan_games(pgn)?
        .into_iter()
        .next()
        .ok_or_else(|| reject("no game in request body"))
}

/// Replay the game and collect `(hash, move token)` per distinct position
/// reached, truncated to `max_plies`.
fn replay(
    variant: Variant,
    fen: Option<&str>,
    sans: &[San],
    max_plies: usize,
) -> Result<FxHashMap<u128, MoveToken>, ImportError> {
    let mut pos = match fen {
        Some(fen) => {
            let fen: Fen = fen
                .parse()
                .map_err(|_| reject(format!("unparsable FEN {fen:?}")))?;
            VariantPosition::from_setup(variant.rules(), fen.into_setup(), CastlingMode::Chess960)
                .map_err(|err| reject(format!("illegal initial position: {err}")))?
        }
        None => VariantPosition::new(variant.rules()),
    };

    let mut keyed: FxHashMap<u128, MoveToken> =
        FxHashMap::with_capacity_and_hasher(sans.len(), Default::default());
    for san in sans.iter().take(max_plies) {
        let hash: Zobrist128 = pos.zobrist_hash(EnPassantMode::Legal);
        let m = san
            .to_move(&pos)
            .map_err(|err| reject(format!("illegal move {san}: {err}")))?;
        let token = encode_move(&UciMove::from_chess960(&m))
            .map_err(|err| reject(format!("unencodable move {san}: {err}")))?;
        keyed.insert(u128::from(hash), token);
        pos.play_unchecked(&m);
    }
    Ok(keyed)
}

fn random_game_id() -> GameId {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    let id: String = (0..8)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    id.parse().expect("generated id is valid")
}

/// Importer for the master database: single games, standard chess only,
/// strong players only, PGN text retained.
pub struct MasterImporter {
    store: Arc<MasterStore>,
    pgn: Arc<PgnStore>,
    max_plies: usize,
    lock: Mutex<()>,
}

impl MasterImporter {
    pub fn new(store: Arc<MasterStore>, pgn: Arc<PgnStore>, max_plies: usize) -> MasterImporter {
        MasterImporter {
            store,
            pgn,
            max_plies,
            lock: Mutex::new(()),
        }
    }

    pub fn import(&self, pgn_text: &str) -> Result<GameId, ImportError> {
        let raw = scan_one(pgn_text)?;
        match raw.variant()? {
            Variant::Standard => {}
            // A FEN tag upgrades standard games to from-position.
            Variant::FromPosition => {
                return Err(reject("master games must start from the initial position"));
            }
            _ => return Err(reject("master database only indexes standard chess")),
        }
        let rating = raw
            .average_rating()
            .ok_or_else(|| reject("missing WhiteElo/BlackElo"))?;
        if rating < MASTER_RATING_THRESHOLD {
            return Err(reject(format!(
                "average rating {rating} below the master threshold"
            )));
        }
        let winner = raw.winner().ok_or_else(|| reject("unterminated game"))?;
        let id = raw.game_id().unwrap_or_else(random_game_id);
        let game = GameRef {
            id,
            winner,
            speed: raw.speed(),
            rating,
        };

        let _guard = self.lock.lock();
        if self.pgn.contains(&id.to_string())? {
            return Err(reject(format!("duplicate game {id}")));
        }
        let plies = replay(Variant::Standard, None, &raw.sans, self.max_plies)?;
        for (key, token) in plies {
            self.store.merge(key, game, token)?;
        }
        // Written last: the stored text marks the game as fully indexed.
        self.pgn.put_new(&id.to_string(), pgn_text.trim())?;
        Ok(id)
    }

    /// Correct a single previously imported game by subtracting its plies
    /// and dropping its PGN. Returns false for an unknown id.
    pub fn delete(&self, id: GameId) -> Result<bool, ImportError> {
        let _guard = self.lock.lock();
        let Some(text) = self.pgn.get(&id.to_string())? else {
            return Ok(false);
        };
        let raw = scan_one(&text)?;
        let game = GameRef {
            id,
            winner: raw.winner().ok_or_else(|| reject("unterminated game"))?,
            speed: raw.speed(),
            rating: raw
                .average_rating()
                .ok_or_else(|| reject("missing ratings"))?,
        };
        for (key, token) in replay(Variant::Standard, None, &raw.sans, self.max_plies)? {
            self.store.subtract(key, &game, token)?;
        }
        self.pgn.remove(&id.to_string())?;
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub indexed: Vec<GameId>,
    pub rejected: Vec<String>,
}

/// Importer for the lichess databases. Independent games from one batch
/// decode and replay in parallel; the stores serialize merges per key.
pub struct LichessImporter {
    stores: Arc<VariantStores>,
    info: Arc<GameInfoStore>,
    max_plies: FxHashMap<Variant, usize>,
    claims: Mutex<FxHashSet<u64>>,
}

impl LichessImporter {
    pub fn new(
        stores: Arc<VariantStores>,
        info: Arc<GameInfoStore>,
        max_plies: FxHashMap<Variant, usize>,
    ) -> LichessImporter {
        LichessImporter {
            stores,
            info,
            max_plies,
            claims: Mutex::new(FxHashSet::default()),
        }
    }

    fn max_plies(&self, variant: Variant) -> usize {
        self.max_plies
            .get(&variant)
            .copied()
            .unwrap_or(DEFAULT_LICHESS_PLIES)
    }

    pub fn import_batch(&self, pgn: &str) -> Result<BatchOutcome, ImportError> {
        let games = scan_games(pgn)?;
        let aborted = AtomicBool::new(false);
        let results: Vec<Option<Result<GameId, ImportError>>> = games
            .par_iter()
            .map(|raw| {
                if aborted.load(Ordering::Relaxed) {
                    return None;
                }
                let result = self.import_one(raw);
                if matches!(result, Err(ImportError::Store(_))) {
                    aborted.store(true, Ordering::Relaxed);
                }
                Some(result)
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        for result in results.into_iter().flatten() {
            match result {
                Ok(id) => outcome.indexed.push(id),
                Err(ImportError::Reject(reason)) => {
                    tracing::warn!(%reason, "skipping game");
                    outcome.rejected.push(reason);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outcome)
    }

    fn import_one(&self, raw: &RawGame) -> Result<GameId, ImportError> {
        let id = raw.game_id().ok_or_else(|| reject("missing game id"))?;
        let _claim = ClaimGuard::acquire(&self.claims, id)
            .ok_or_else(|| reject(format!("game {id} already importing")))?;
        if self.info.contains(&id.to_string())? {
            return Err(reject(format!("duplicate game {id}")));
        }

        let variant = raw.variant()?;
        let rating = raw
            .average_rating()
            .ok_or_else(|| reject(format!("game {id} missing ratings")))?;
        let winner = raw
            .winner()
            .ok_or_else(|| reject(format!("game {id} unterminated")))?;
        let game = GameRef {
            id,
            winner,
            speed: raw.speed(),
            rating,
        };

        let plies = replay(variant, raw.fen.as_deref(), &raw.sans, self.max_plies(variant))?;
        let store = self.stores.get(variant);
        for (key, token) in plies {
            store.merge(key, game, token)?;
        }

        let info = GameInfo {
            white: GamePlayer {
                name: raw.white.clone().unwrap_or_else(|| "?".to_owned()),
                rating: raw.white_elo.unwrap_or(rating),
            },
            black: GamePlayer {
                name: raw.black.clone().unwrap_or_else(|| "?".to_owned()),
                rating: raw.black_elo.unwrap_or(rating),
            },
            year: raw.year(),
        };
        // Written last; with the in-process claim this cannot lose.
        if !self.info.put_new(&id.to_string(), &info.to_string())? {
            tracing::warn!(%id, "game info appeared concurrently");
        }
        Ok(id)
    }
}

struct ClaimGuard<'a> {
    claims: &'a Mutex<FxHashSet<u64>>,
    id: u64,
}

impl<'a> ClaimGuard<'a> {
    fn acquire(claims: &'a Mutex<FxHashSet<u64>>, id: GameId) -> Option<ClaimGuard<'a>> {
        claims
            .lock()
            .insert(id.to_u48())
            .then_some(ClaimGuard {
                claims,
                id: id.to_u48(),
            })
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.claims.lock().remove(&self.id);
    }
}
