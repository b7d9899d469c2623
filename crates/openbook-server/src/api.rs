//! Request and response shapes of the HTTP surface, and the mapping of
//! core errors onto status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_with::{formats::CommaSeparator, serde_as, StringWithSeparator};
use thiserror::Error;

use openbook_core::query::{self, QueryFilter};
use openbook_core::{ImportError, RatingBand, SpeedBucket, StoreError, Variant};

use crate::openings::Opening;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Import(ImportError::Reject(_)) => StatusCode::BAD_REQUEST,
            ApiError::Import(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    ApiError::BadRequest(msg.into())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterParams {
    pub fen: String,
    pub moves: Option<usize>,
    pub top_games: Option<usize>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LichessParams {
    pub fen: String,
    pub variant: Option<String>,
    #[serde_as(as = "Option<StringWithSeparator<CommaSeparator, SpeedBucket>>")]
    pub speeds: Option<Vec<SpeedBucket>>,
    #[serde_as(as = "Option<StringWithSeparator<CommaSeparator, u16>>")]
    pub ratings: Option<Vec<u16>>,
    pub moves: Option<usize>,
    pub top_games: Option<usize>,
    pub recent_games: Option<usize>,
}

impl LichessParams {
    pub fn variant(&self) -> Result<Variant, ApiError> {
        match self.variant.as_deref() {
            None => Ok(Variant::Standard),
            Some(name) => name
                .parse()
                .map_err(|_| bad_request(format!("unknown variant {name:?}"))),
        }
    }

    pub fn filter(&self) -> Result<QueryFilter, ApiError> {
        let bands = match &self.ratings {
            None => RatingBand::ALL.to_vec(),
            Some(minima) => minima
                .iter()
                .map(|min| {
                    RatingBand::from_lower_bound(*min)
                        .ok_or_else(|| bad_request(format!("unknown rating band {min}")))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        let speeds = self
            .speeds
            .clone()
            .unwrap_or_else(|| SpeedBucket::ALL.to_vec());
        Ok(QueryFilter {
            bands,
            speeds,
            top_games: validated(self.top_games, 0..=query::MAX_TOP_GAMES, "topGames", 4)?,
            recent_games: validated(
                self.recent_games,
                0..=query::MAX_RECENT_GAMES,
                "recentGames",
                4,
            )?,
            max_moves: validated(self.moves, 1..=query::MAX_MOVES, "moves", query::DEFAULT_MOVES)?,
        })
    }
}

pub fn validated(
    value: Option<usize>,
    range: std::ops::RangeInclusive<usize>,
    name: &str,
    default: usize,
) -> Result<usize, ApiError> {
    match value {
        None => Ok(default),
        Some(value) if range.contains(&value) => Ok(value),
        Some(value) => Err(bad_request(format!("{name} {value} out of range"))),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlayerJson {
    pub name: String,
    pub rating: u16,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExplorerGame {
    pub id: String,
    /// `"white"`, `"black"`, or null for a draw.
    pub winner: Option<String>,
    pub white: PlayerJson,
    pub black: PlayerJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerMove {
    pub uci: String,
    pub san: String,
    pub white: u64,
    pub draws: u64,
    pub black: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerResponse {
    pub white: u64,
    pub draws: u64,
    pub black: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<u16>,
    pub moves: Vec<ExplorerMove>,
    pub top_games: Vec<ExplorerGame>,
    pub recent_games: Vec<ExplorerGame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening: Option<Opening>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub indexed: usize,
    pub rejected: Vec<String>,
}
