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

/// Explorer variants. Each variant has its own position store; chess960
/// and from-position games share standard rules but are partitioned into
/// their own databases.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Standard,
    Chess960,
    FromPosition,
    KingOfTheHill,
    ThreeCheck,
    Antichess,
    Atomic,
    Horde,
    RacingKings,
    Crazyhouse,
}

impl Variant {
    pub const ALL: [Variant; 10] = [
        Variant::Standard,
        Variant::Chess960,
        Variant::FromPosition,
        Variant::KingOfTheHill,
        Variant::ThreeCheck,
        Variant::Antichess,
        Variant::Atomic,
        Variant::Horde,
        Variant::RacingKings,
        Variant::Crazyhouse,
    ];

    /// Name used for query parameters and store directories.
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Standard => "standard",
            Variant::Chess960 => "chess960",
            Variant::FromPosition => "fromPosition",
            Variant::KingOfTheHill => "kingOfTheHill",
            Variant::ThreeCheck => "threeCheck",
            Variant::Antichess => "antichess",
            Variant::Atomic => "atomic",
            Variant::Horde => "horde",
            Variant::RacingKings => "racingKings",
            Variant::Crazyhouse => "crazyhouse",
        }
    }

    /// The rule set governing move generation and hashing.
    pub fn rules(self) -> shakmaty::variant::Variant {
        match self {
            Variant::Standard | Variant::Chess960 | Variant::FromPosition => {
                shakmaty::variant::Variant::Chess
            }
            Variant::KingOfTheHill => shakmaty::variant::Variant::KingOfTheHill,
            Variant::ThreeCheck => shakmaty::variant::Variant::ThreeCheck,
            Variant::Antichess => shakmaty::variant::Variant::Antichess,
            Variant::Atomic => shakmaty::variant::Variant::Atomic,
            Variant::Horde => shakmaty::variant::Variant::Horde,
            Variant::RacingKings => shakmaty::variant::Variant::RacingKings,
            Variant::Crazyhouse => shakmaty::variant::Variant::Crazyhouse,
        }
    }

    /// Resolve the PGN `Variant` tag as written by lichess exports.
    pub fn from_pgn_tag(tag: &str) -> Option<Variant> {
        Some(match tag {
            "Standard" => Variant::Standard,
            "Chess960" | "Fischerandom" | "Fischer Random" => Variant::Chess960,
            "From Position" => Variant::FromPosition,
            "King of the Hill" => Variant::KingOfTheHill,
            "Three-check" | "Three Check" => Variant::ThreeCheck,
            "Antichess" => Variant::Antichess,
            "Atomic" => Variant::Atomic,
            "Horde" => Variant::Horde,
            "Racing Kings" => Variant::RacingKings,
            "Crazyhouse" => Variant::Crazyhouse,
            _ => return None,
        })
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct InvalidVariant;

impl fmt::Display for InvalidVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown variant")
    }
}

impl std::error::Error for InvalidVariant {}

impl FromStr for Variant {
    type Err = InvalidVariant;

    fn from_str(s: &str) -> Result<Variant, InvalidVariant> {
        Ok(match s {
            "chess" | "standard" => Variant::Standard,
            "chess960" => Variant::Chess960,
            "fromPosition" => Variant::FromPosition,
            "kingOfTheHill" => Variant::KingOfTheHill,
            "threeCheck" => Variant::ThreeCheck,
            "antichess" => Variant::Antichess,
            "atomic" => Variant::Atomic,
            "horde" => Variant::Horde,
            "racingKings" => Variant::RacingKings,
            "crazyhouse" => Variant::Crazyhouse,
            _ => return Err(InvalidVariant),
        })
    }
}
