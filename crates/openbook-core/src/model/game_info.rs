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

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePlayer {
    pub name: String,
    pub rating: u16,
}

/// Compact game metadata persisted for indexed lichess games, stored as
/// the pipe-separated record
/// `"{whiteName}|{whiteRating}|{blackName}|{blackRating}|{year|?}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub white: GamePlayer,
    pub black: GamePlayer,
    pub year: Option<u16>,
}

#[derive(Debug)]
pub struct InvalidGameInfo;

impl fmt::Display for InvalidGameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid game info record")
    }
}

impl std::error::Error for InvalidGameInfo {}

impl fmt::Display for GameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|",
            self.white.name, self.white.rating, self.black.name, self.black.rating
        )?;
        match self.year {
            Some(year) => write!(f, "{year}"),
            None => f.write_str("?"),
        }
    }
}

impl FromStr for GameInfo {
    type Err = InvalidGameInfo;

    fn from_str(s: &str) -> Result<GameInfo, InvalidGameInfo> {
        // Player names may not contain pipes; lichess user names cannot.
        let mut fields = s.split('|');
        let white_name = fields.next().ok_or(InvalidGameInfo)?;
        let white_rating = fields.next().ok_or(InvalidGameInfo)?;
        let black_name = fields.next().ok_or(InvalidGameInfo)?;
        let black_rating = fields.next().ok_or(InvalidGameInfo)?;
        let year = fields.next().ok_or(InvalidGameInfo)?;
        if fields.next().is_some() {
            return Err(InvalidGameInfo);
        }
        Ok(GameInfo {
            white: GamePlayer {
                name: white_name.to_owned(),
                rating: white_rating.parse().map_err(|_| InvalidGameInfo)?,
            },
            black: GamePlayer {
                name: black_name.to_owned(),
                rating: black_rating.parse().map_err(|_| InvalidGameInfo)?,
            },
            year: match year {
                "?" => None,
                year => Some(year.parse().map_err(|_| InvalidGameInfo)?),
            },
        })
    }
}
