//! Route handlers and application state.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get};
use axum::{http::header, http::HeaderValue, Json, Router};
use moka::sync::Cache;
use serde::Serialize;
use shakmaty::{
    fen::Fen, san::SanPlus, variant::VariantPosition, CastlingMode, Position, Setup,
};

use openbook_core::codec::decode_move;
use openbook_core::import::scan_games;
use openbook_core::query::{
    self, probe_entry, probe_master, position_hash, QueryFilter, QueryResult,
};
use openbook_core::store::{GameInfoStore, MasterStore, PgnStore, VariantStores};
use openbook_core::{
    GameId, GameInfo, GameRef, LichessImporter, MasterImporter, Variant, Winner,
};

use crate::api::{
    bad_request, ApiError, ExplorerGame, ExplorerMove, ExplorerResponse, ImportSummary,
    LichessParams, MasterParams, PlayerJson,
};
use crate::config::ServerConfig;
use crate::openings::Openings;

#[derive(Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    variant: Variant,
    fen: String,
    filter: QueryFilter,
}

#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<VariantStores>,
    pub master: Arc<MasterStore>,
    pub pgn: Arc<PgnStore>,
    pub info: Arc<GameInfoStore>,
    pub master_importer: Arc<MasterImporter>,
    pub lichess_importer: Arc<LichessImporter>,
    pub openings: Arc<Openings>,
    cache: Cache<CacheKey, ExplorerResponse>,
    cache_max_moves: u32,
    cors: bool,
}

impl AppState {
    pub fn open(config: &ServerConfig) -> anyhow::Result<AppState> {
        let store_config = config.store_config();
        let root = &config.data_dir;
        let stores = Arc::new(VariantStores::open(root.join("lichess"), &store_config)?);
        let master = Arc::new(MasterStore::open(root.join("master"), &store_config)?);
        let pgn = Arc::new(PgnStore::open(root.join("master-pgn"), &store_config)?);
        let info = Arc::new(GameInfoStore::open(root.join("game-info"), &store_config)?);

        let openings = match config.openings_path.as_ref() {
            Some(path) => {
                let openings = Openings::load(path)?;
                tracing::info!(count = openings.len(), "loaded opening table");
                openings
            }
            None => Openings::empty(),
        };

        Ok(AppState {
            master_importer: Arc::new(MasterImporter::new(
                Arc::clone(&master),
                Arc::clone(&pgn),
                config.master.max_plies,
            )),
            lichess_importer: Arc::new(LichessImporter::new(
                Arc::clone(&stores),
                Arc::clone(&info),
                config.lichess_plies(),
            )),
            stores,
            master,
            pgn,
            info,
            openings: Arc::new(openings),
            cache: Cache::builder()
                .max_capacity(config.cache.max_entries)
                .time_to_live(config.cache_ttl())
                .build(),
            cache_max_moves: config.cache.max_moves,
            cors: config.cors,
        })
    }

    /// Flush every store; run on all shutdown paths.
    pub fn flush(&self) -> anyhow::Result<()> {
        self.stores.flush()?;
        self.master.flush()?;
        self.pgn.flush()?;
        self.info.flush()?;
        Ok(())
    }
}

pub fn app(state: AppState) -> Router {
    let cors = state.cors;
    let router = Router::new()
        .route("/master", get(master_query).put(master_import))
        .route("/master/pgn/:id", get(master_pgn))
        .route("/master/:id", delete(master_delete))
        .route("/lichess", get(lichess_query).put(lichess_import))
        .route("/stats", get(stats))
        .with_state(state);
    if cors {
        router.layer(middleware::from_fn(add_cors_header))
    } else {
        router
    }
}

async fn add_cors_header(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    res.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    res
}

fn parse_fen(fen: &str) -> Result<Setup, ApiError> {
    let fen: Fen = fen
        .parse()
        .map_err(|_| bad_request(format!("unparsable fen {fen:?}")))?;
    Ok(fen.into_setup())
}

fn setup_position(variant: Variant, setup: Setup) -> Result<VariantPosition, ApiError> {
    VariantPosition::from_setup(variant.rules(), setup, CastlingMode::Chess960)
        .map_err(|err| bad_request(format!("illegal position: {err}")))
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
}

async fn lichess_query(
    State(state): State<AppState>,
    Query(params): Query<LichessParams>,
) -> Result<Json<ExplorerResponse>, ApiError> {
    let variant = params.variant()?;
    let filter = params.filter()?;
    let setup = parse_fen(&params.fen)?;

    // Deep positions are rarely shared between users; skip the cache.
    let cacheable = setup.fullmoves.get() <= state.cache_max_moves;
    let key = CacheKey {
        variant,
        fen: params.fen.clone(),
        filter: filter.clone(),
    };
    if cacheable {
        if let Some(hit) = state.cache.get(&key) {
            return Ok(Json(hit));
        }
    }

    let blocking_state = state.clone();
    let response = run_blocking(move || {
        let pos = setup_position(variant, setup)?;
        let entry = blocking_state.stores.get(variant).get(position_hash(&pos))?;
        let result = match &entry {
            Some(entry) => probe_entry(entry, &filter),
            None => QueryResult::default(),
        };
        let games = |refs: &[GameRef]| lichess_games(&blocking_state.info, refs);
        Ok(ExplorerResponse {
            white: result.stats.white,
            draws: result.stats.draws,
            black: result.stats.black,
            average_rating: result.stats.average_rating(),
            moves: shape_moves(&pos, &result),
            top_games: games(&result.top_games)?,
            recent_games: games(&result.recent_games)?,
            opening: blocking_state.openings.classify(variant, &pos).cloned(),
        })
    })
    .await?;

    if cacheable {
        state.cache.insert(key, response.clone());
    }
    Ok(Json(response))
}

async fn master_query(
    State(state): State<AppState>,
    Query(params): Query<MasterParams>,
) -> Result<Json<ExplorerResponse>, ApiError> {
    let top_games =
        crate::api::validated(params.top_games, 0..=query::MAX_TOP_GAMES, "topGames", 4)?;
    let max_moves = crate::api::validated(
        params.moves,
        1..=query::MAX_MOVES,
        "moves",
        query::DEFAULT_MOVES,
    )?;
    let setup = parse_fen(&params.fen)?;

    let blocking_state = state.clone();
    let response = run_blocking(move || {
        let pos = setup_position(Variant::Standard, setup)?;
        let record = blocking_state.master.get(position_hash(&pos))?;
        let result = match &record {
            Some(record) => probe_master(record, top_games, max_moves),
            None => QueryResult::default(),
        };
        Ok(ExplorerResponse {
            white: result.stats.white,
            draws: result.stats.draws,
            black: result.stats.black,
            average_rating: result.stats.average_rating(),
            moves: shape_moves(&pos, &result),
            top_games: master_games(&blocking_state.pgn, &result.top_games)?,
            recent_games: Vec::new(),
            opening: blocking_state
                .openings
                .classify(Variant::Standard, &pos)
                .cloned(),
        })
    })
    .await?;
    Ok(Json(response))
}

async fn master_import(
    State(state): State<AppState>,
    body: String,
) -> Result<String, ApiError> {
    let importer = Arc::clone(&state.master_importer);
    let id = run_blocking(move || Ok(importer.import(&body)?)).await?;
    Ok(id.to_string())
}

async fn lichess_import(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportSummary>, ApiError> {
    let importer = Arc::clone(&state.lichess_importer);
    let outcome = run_blocking(move || Ok(importer.import_batch(&body)?)).await?;
    Ok(Json(ImportSummary {
        indexed: outcome.indexed.len(),
        rejected: outcome.rejected,
    }))
}

async fn master_pgn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let id: GameId = id
        .parse()
        .map_err(|_| bad_request(format!("invalid game id {id:?}")))?;
    let pgn = Arc::clone(&state.pgn);
    run_blocking(move || pgn.get(&id.to_string())?.ok_or(ApiError::NotFound)).await
}

async fn master_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let id: GameId = id
        .parse()
        .map_err(|_| bad_request(format!("invalid game id {id:?}")))?;
    let importer = Arc::clone(&state.master_importer);
    let deleted = run_blocking(move || Ok(importer.delete(id)?)).await?;
    if deleted {
        Ok(format!("deleted {id}"))
    } else {
        Err(ApiError::NotFound)
    }
}

#[derive(Serialize)]
struct MasterStats {
    positions: u64,
    games: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    master: MasterStats,
    lichess: BTreeMap<&'static str, u64>,
    game_info: u64,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let state = state.clone();
    run_blocking(move || {
        Ok(Json(StatsResponse {
            master: MasterStats {
                positions: state.master.record_count(),
                games: state.pgn.record_count(),
            },
            lichess: state
                .stores
                .record_counts()
                .into_iter()
                .map(|(variant, count)| (variant.as_str(), count))
                .collect(),
            game_info: state.info.record_count(),
        }))
    })
    .await
}

fn shape_moves(pos: &VariantPosition, result: &QueryResult) -> Vec<ExplorerMove> {
    result
        .moves
        .iter()
        .filter_map(|row| {
            let uci = decode_move(row.token).ok()?;
            let m = match uci.to_move(pos) {
                Ok(m) => m,
                Err(err) => {
                    tracing::warn!(token = row.token, %err, "stored move not legal here");
                    return None;
                }
            };
            Some(ExplorerMove {
                uci: m.to_uci(pos.castles().mode()).to_string(),
                san: SanPlus::from_move(pos.clone(), &m).to_string(),
                white: row.stats.white,
                draws: row.stats.draws,
                black: row.stats.black,
                average_rating: row.stats.average_rating(),
            })
        })
        .collect()
}

fn winner_json(winner: Winner) -> Option<String> {
    match winner {
        Winner::White => Some("white".to_owned()),
        Winner::Black => Some("black".to_owned()),
        Winner::Draw => None,
    }
}

fn lichess_games(
    info: &GameInfoStore,
    refs: &[GameRef],
) -> Result<Vec<ExplorerGame>, ApiError> {
    refs.iter()
        .map(|game| {
            let detail = info
                .get(&game.id.to_string())?
                .and_then(|raw| raw.parse::<GameInfo>().ok());
            Ok(match detail {
                Some(detail) => ExplorerGame {
                    id: game.id.to_string(),
                    winner: winner_json(game.winner),
                    white: PlayerJson {
                        name: detail.white.name,
                        rating: detail.white.rating,
                    },
                    black: PlayerJson {
                        name: detail.black.name,
                        rating: detail.black.rating,
                    },
                    year: detail.year,
                },
                None => placeholder_game(game),
            })
        })
        .collect()
}

fn master_games(pgn: &PgnStore, refs: &[GameRef]) -> Result<Vec<ExplorerGame>, ApiError> {
    refs.iter()
        .map(|game| {
            let raw = match pgn.get(&game.id.to_string())? {
                Some(text) => scan_games(&text)
                    .ok()
                    .and_then(|mut games| games.drain(..).next()),
                None => None,
            };
            Ok(match raw {
                Some(raw) => ExplorerGame {
                    id: game.id.to_string(),
                    winner: winner_json(game.winner),
                    white: PlayerJson {
                        name: raw.white.clone().unwrap_or_else(|| "?".to_owned()),
                        rating: raw.white_elo.unwrap_or(game.rating),
                    },
                    black: PlayerJson {
                        name: raw.black.clone().unwrap_or_else(|| "?".to_owned()),
                        rating: raw.black_elo.unwrap_or(game.rating),
                    },
                    year: raw.year(),
                },
                None => placeholder_game(game),
            })
        })
        .collect()
}

fn placeholder_game(game: &GameRef) -> ExplorerGame {
    ExplorerGame {
        id: game.id.to_string(),
        winner: winner_json(game.winner),
        white: PlayerJson {
            name: "?".to_owned(),
            rating: game.rating,
        },
        black: PlayerJson {
            name: "?".to_owned(),
            rating: game.rating,
        },
        year: None,
    }
}
