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

use std::fmt::{self, Write as _};
use std::str::FromStr;

use shakmaty::{Color, Outcome};

use crate::codec::{write_u16, write_u48, ByteReader, CodecError};
use crate::model::SpeedBucket;

/// Highest rating representable in a packed [`GameRef`] (12 bits).
pub const MAX_RATING: u16 = 4095;

#[derive(Debug)]
pub struct InvalidGameId;

impl fmt::Display for InvalidGameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid game id")
    }
}

impl std::error::Error for InvalidGameId {}

/// An 8-character base-62 game identifier over the alphabet `0-9a-zA-Z`,
/// leftmost character most significant, packed into 48 bits.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GameId(u64);

impl GameId {
    pub fn to_u48(self) -> u64 {
        self.0
    }

    pub fn from_u48(n: u64) -> Result<GameId, CodecError> {
        if n < 62u64.pow(8) {
            Ok(GameId(n))
        } else {
            Err(CodecError::Malformed("game id out of range"))
        }
    }
}

impl FromStr for GameId {
    type Err = InvalidGameId;

    fn from_str(s: &str) -> Result<GameId, InvalidGameId> {
        if s.len() != 8 {
            return Err(InvalidGameId);
        }
        let mut n = 0u64;
        for c in s.bytes() {
            n = n * 62
                + u64::from(match c {
                    b'0'..=b'9' => c - b'0',
                    b'a'..=b'z' => c - b'a' + 10,
                    b'A'..=b'Z' => c - b'A' + 10 + 26,
                    _ => return Err(InvalidGameId),
                });
        }
        Ok(GameId(n))
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = ['0'; 8];
        let mut n = self.0;
        for slot in chars.iter_mut().rev() {
            let rem = (n % 62) as u8;
            *slot = char::from(if rem >= 10 + 26 {
                rem - (10 + 26) + b'A'
            } else if rem >= 10 {
                rem - 10 + b'a'
            } else {
                rem + b'0'
            });
            n /= 62;
        }
        for c in chars {
            f.write_char(c)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn from_outcome(outcome: Outcome) -> Winner {
        match outcome.winner() {
            Some(Color::White) => Winner::White,
            Some(Color::Black) => Winner::Black,
            None => Winner::Draw,
        }
    }

    fn code(self) -> u16 {
        match self {
            Winner::Draw => 0,
            Winner::Black => 1,
            Winner::White => 2,
        }
    }

    fn from_code(code: u16) -> Winner {
        match code {
            1 => Winner::Black,
            2 => Winner::White,
            // 3 is reserved and reads as a draw.
            _ => Winner::Draw,
        }
    }
}

/// Packed identity of a single indexed game, exactly 8 bytes on disk:
///
/// ```text
/// bits 63..62  speed
/// bits 61..60  winner
/// bits 59..48  average rating, clamped to [0, 4095]
/// bits 47..0   game id (base-62 over "0-9a-zA-Z")
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct GameRef {
    pub id: GameId,
    pub winner: Winner,
    pub speed: SpeedBucket,
    pub rating: u16,
}

impl GameRef {
    pub const SIZE: usize = 8;

    pub fn write(&self, buf: &mut Vec<u8>) {
        let header = u16::from(self.speed.code()) << 14
            | self.winner.code() << 12
            | self.rating.min(MAX_RATING);
        write_u16(buf, header);
        write_u48(buf, self.id.to_u48());
    }

    pub fn read(reader: &mut ByteReader<'_>) -> Result<GameRef, CodecError> {
        let header = reader.read_u16()?;
        let id = GameId::from_u48(reader.read_u48()?)?;
        Ok(GameRef {
            id,
            winner: Winner::from_code(header >> 12 & 3),
            speed: SpeedBucket::from_code((header >> 14 & 3) as u8),
            rating: header & 4095,
        })
    }
}
