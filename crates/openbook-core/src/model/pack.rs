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

//! Stored-value layouts.
//!
//! A packed position value starts with a format tag:
//!
//! * `0x01` single game: `[u16 move][8-byte game ref]`
//! * `0x02` variable: block sequence (lichess) or move table plus top
//!   games (master)
//!
//! A bare 8-byte value is accepted as a legacy single game ref without a
//! move table. The two packers share the primitive helpers of
//! [`crate::codec`] and the move-table codec of [`SubEntry`].

use crate::codec::{read_move, write_move, write_u8, ByteReader, CodecError, MoveToken};
use crate::model::sub_entry::MAX_TOP_GAMES;
use crate::model::{Entry, GameRef, SubEntry};

pub const PACK_SINGLE: u8 = 0x01;
pub const PACK_VARIABLE: u8 = 0x02;

/// A record a position store can hold and merge games into.
pub trait PositionRecord: Default {
    fn insert_ref(&mut self, game: GameRef, token: MoveToken);
    fn total_games(&self) -> u64;
}

impl PositionRecord for Entry {
    fn insert_ref(&mut self, game: GameRef, token: MoveToken) {
        Entry::insert_ref(self, game, token)
    }

    fn total_games(&self) -> u64 {
        Entry::total_games(self)
    }
}

impl PositionRecord for SubEntry {
    fn insert_ref(&mut self, game: GameRef, token: MoveToken) {
        SubEntry::insert(self, game, token)
    }

    fn total_games(&self) -> u64 {
        SubEntry::total_games(self)
    }
}

/// The pack/unpack contract shared by the lichess and master packers.
pub trait RecordPack {
    type Record: PositionRecord;

    fn pack(record: &Self::Record, buf: &mut Vec<u8>);
    fn unpack(bytes: &[u8]) -> Result<Self::Record, CodecError>;

    fn pack_to_vec(record: &Self::Record) -> Vec<u8> {
        let mut buf = Vec::new();
        Self::pack(record, &mut buf);
        buf
    }
}

/// Packer for the speed/rating partitioned store.
pub struct LichessPack;

impl RecordPack for LichessPack {
    type Record = Entry;

    fn pack(entry: &Entry, buf: &mut Vec<u8>) {
        match entry.as_single() {
            Some((token, game)) => {
                write_u8(buf, PACK_SINGLE);
                write_move(buf, token);
                game.write(buf);
            }
            None => {
                write_u8(buf, PACK_VARIABLE);
                entry.write_blocks(buf);
            }
        }
    }

    fn unpack(bytes: &[u8]) -> Result<Entry, CodecError> {
        let mut reader = ByteReader::new(bytes);
        if bytes.len() == GameRef::SIZE {
            let mut entry = Entry::default();
            entry.insert_game_only(GameRef::read(&mut reader)?);
            return Ok(entry);
        }
        match reader.read_u8()? {
            PACK_SINGLE => {
                let token = read_move(&mut reader)?;
                let game = GameRef::read(&mut reader)?;
                let mut entry = Entry::default();
                entry.insert_ref(game, token);
                Ok(entry)
            }
            PACK_VARIABLE => Entry::read_blocks(&mut reader),
            _ => Err(CodecError::Malformed("unknown pack format")),
        }
    }
}

/// Packer for the master store: one cell, move table first, then up to
/// four top-rated game refs running to the end of the value.
pub struct MasterPack;

impl RecordPack for MasterPack {
    type Record = SubEntry;

    fn pack(sub: &SubEntry, buf: &mut Vec<u8>) {
        if sub.total_games() == 1 && sub.moves.len() == 1 && sub.games.len() == 1 {
            write_u8(buf, PACK_SINGLE);
            write_move(buf, *sub.moves.keys().next().expect("one move"));
            sub.games[0].write(buf);
        } else {
            write_u8(buf, PACK_VARIABLE);
            sub.write_moves(buf);
            for game in sub.top_games(MAX_TOP_GAMES) {
                game.write(buf);
            }
        }
    }

    fn unpack(bytes: &[u8]) -> Result<SubEntry, CodecError> {
        let mut reader = ByteReader::new(bytes);
        if bytes.len() == GameRef::SIZE {
            let mut sub = SubEntry::default();
            sub.games.push(GameRef::read(&mut reader)?);
            return Ok(sub);
        }
        match reader.read_u8()? {
            PACK_SINGLE => {
                let token = read_move(&mut reader)?;
                let game = GameRef::read(&mut reader)?;
                let mut sub = SubEntry::default();
                sub.insert(game, token);
                Ok(sub)
            }
            PACK_VARIABLE => {
                let mut sub = SubEntry::default();
                sub.read_moves(&mut reader)?;
                while !reader.is_empty() {
                    sub.games.push(GameRef::read(&mut reader)?);
                }
                Ok(sub)
            }
            _ => Err(CodecError::Malformed("unknown pack format")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SpeedBucket, Winner};

    fn game(id: &str, rating: u16) -> GameRef {
        GameRef {
            id: id.parse().unwrap(),
            winner: Winner::White,
            speed: SpeedBucket::Bullet,
            rating,
        }
    }

    #[test]
    fn single_game_uses_compact_layout() {
        let mut entry = Entry::default();
        entry.insert_ref(game("ref00000", 1999), 21 << 6 | 6);
        let buf = LichessPack::pack_to_vec(&entry);
        assert_eq!(buf[0], PACK_SINGLE);
        assert_eq!(buf.len(), 1 + 2 + GameRef::SIZE);
        assert_eq!(LichessPack::unpack(&buf).unwrap(), entry);
    }

    #[test]
    fn second_game_switches_to_variable_layout() {
        let mut entry = Entry::default();
        entry.insert_ref(game("ref00000", 1999), 21 << 6 | 6);
        entry.insert_ref(game("ref00001", 2001), 21 << 6 | 6);
        let buf = LichessPack::pack_to_vec(&entry);
        assert_eq!(buf[0], PACK_VARIABLE);
        assert_eq!(LichessPack::unpack(&buf).unwrap(), entry);
    }

    #[test]
    fn bare_ref_reads_as_legacy_single() {
        let mut buf = Vec::new();
        game("ref00000", 1903).write(&mut buf);
        let entry = LichessPack::unpack(&buf).unwrap();
        assert_eq!(entry.cells().len(), 1);
        let sub = entry.cells()[0].1;
        assert_eq!(sub.games.len(), 1);
        assert!(sub.moves.is_empty());

        let master = MasterPack::unpack(&buf).unwrap();
        assert_eq!(master.games.len(), 1);
        assert!(master.moves.is_empty());
    }

    #[test]
    fn unknown_tag_is_malformed() {
        assert_eq!(
            LichessPack::unpack(&[9, 0, 0]),
            Err(CodecError::Malformed("unknown pack format"))
        );
        assert!(MasterPack::unpack(&[0x7f, 1, 2, 3]).is_err());
    }

    #[test]
    fn master_roundtrip_keeps_top_four_by_rating() {
        let mut sub = SubEntry::default();
        for (i, rating) in [(1u16, 2500u16), (2, 2880), (3, 2450), (4, 2600), (5, 2700), (6, 2650)]
        {
            sub.insert(game(&format!("0000000{i}"), rating), i);
        }
        let buf = MasterPack::pack_to_vec(&sub);
        let decoded = MasterPack::unpack(&buf).unwrap();
        assert_eq!(decoded.total_games(), 6);
        let ids: Vec<String> = decoded.games.iter().map(|g| g.id.to_string()).collect();
        assert_eq!(ids, ["00000002", "00000005", "00000006", "00000004"]);
    }

    #[test]
    fn truncated_value_is_rejected() {
        let mut entry = Entry::default();
        entry.insert_ref(game("ref00000", 1999), 21 << 6 | 6);
        entry.insert_ref(game("ref00001", 2001), 99);
        let buf = LichessPack::pack_to_vec(&entry);
        assert_eq!(
            LichessPack::unpack(&buf[..buf.len() - 3]),
            Err(CodecError::Truncated)
        );
    }
}
