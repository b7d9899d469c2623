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

use std::ops::AddAssign;

use crate::codec::{write_uint, ByteReader, CodecError};
use crate::model::{GameRef, Winner};

/// Outcome counters for a single move (or an aggregate of moves), plus the
/// sum of average ratings used to derive the mean rating.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct MoveStats {
    pub white: u64,
    pub draws: u64,
    pub black: u64,
    pub rating_sum: u64,
}

impl MoveStats {
    pub fn total(&self) -> u64 {
        self.white + self.draws + self.black
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn with_game(&mut self, game: &GameRef) {
        match game.winner {
            Winner::White => self.white += 1,
            Winner::Draw => self.draws += 1,
            Winner::Black => self.black += 1,
        }
        self.rating_sum += u64::from(game.rating);
    }

    pub fn without_game(&mut self, game: &GameRef) {
        match game.winner {
            Winner::White => self.white = self.white.saturating_sub(1),
            Winner::Draw => self.draws = self.draws.saturating_sub(1),
            Winner::Black => self.black = self.black.saturating_sub(1),
        }
        self.rating_sum = self.rating_sum.saturating_sub(u64::from(game.rating));
    }

    pub fn average_rating(&self) -> Option<u16> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some((self.rating_sum / total) as u16)
        }
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        write_uint(buf, self.white);
        write_uint(buf, self.draws);
        write_uint(buf, self.black);
        write_uint(buf, self.rating_sum);
    }

    pub fn read(reader: &mut ByteReader<'_>) -> Result<MoveStats, CodecError> {
        Ok(MoveStats {
            white: reader.read_uint()?,
            draws: reader.read_uint()?,
            black: reader.read_uint()?,
            rating_sum: reader.read_uint()?,
        })
    }
}

impl AddAssign for MoveStats {
    fn add_assign(&mut self, rhs: MoveStats) {
        self.white += rhs.white;
        self.draws += rhs.draws;
        self.black += rhs.black;
        self.rating_sum += rhs.rating_sum;
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::{quickcheck, Arbitrary, Gen};

    use super::*;
    use crate::model::SpeedBucket;

    impl Arbitrary for MoveStats {
        fn arbitrary(g: &mut Gen) -> MoveStats {
            MoveStats {
                white: u64::arbitrary(g) >> 16,
                draws: u64::arbitrary(g) >> 16,
                black: u64::arbitrary(g) >> 16,
                rating_sum: u64::arbitrary(g) >> 16,
            }
        }
    }

    #[test]
    fn counts_by_winner() {
        let mut stats = MoveStats::default();
        let game = GameRef {
            id: "ref00000".parse().unwrap(),
            winner: Winner::White,
            speed: SpeedBucket::Bullet,
            rating: 1999,
        };
        stats.with_game(&game);
        assert_eq!((stats.white, stats.draws, stats.black), (1, 0, 0));
        assert_eq!(stats.average_rating(), Some(1999));
        stats.without_game(&game);
        assert!(stats.is_empty());
        assert_eq!(stats.average_rating(), None);
    }

    quickcheck! {
        fn stats_roundtrip(stats: MoveStats) -> bool {
            let mut buf = Vec::new();
            stats.write(&mut buf);
            MoveStats::read(&mut ByteReader::new(&buf)) == Ok(stats)
        }
    }
}
