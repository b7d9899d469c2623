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

//! Primitive codecs shared by all on-disk record layouts.
//!
//! All multi-byte integers are big-endian. The variable-length unsigned
//! integer carries 7 payload bits per byte with the high bit set on every
//! byte except the last; encodings are minimal and decoding tolerates
//! values up to 64 bits.

use shakmaty::{uci::UciMove, Role, Square};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("record truncated")]
    Truncated,
    #[error("malformed record: {0}")]
    Malformed(&'static str),
}

/// Cursor over an encoded record.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> ByteReader<'a> {
        ByteReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u24(&mut self) -> Result<u32, CodecError> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u48(&mut self) -> Result<u64, CodecError> {
        let b = self.take(6)?;
        Ok(u64::from_be_bytes([0, 0, b[0], b[1], b[2], b[3], b[4], b[5]]))
    }

    pub fn read_uint(&mut self) -> Result<u64, CodecError> {
        let mut n = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.read_u8()?;
            n |= u64::from(byte & 127) << shift;
            if byte & 128 == 0 {
                return Ok(n);
            }
        }
        Err(CodecError::Malformed("varuint longer than 64 bits"))
    }
}

pub fn write_u8(buf: &mut Vec<u8>, n: u8) {
    buf.push(n);
}

pub fn write_u16(buf: &mut Vec<u8>, n: u16) {
    buf.extend_from_slice(&n.to_be_bytes());
}

pub fn write_u24(buf: &mut Vec<u8>, n: u32) {
    debug_assert!(n < 1 << 24);
    buf.extend_from_slice(&n.to_be_bytes()[1..]);
}

pub fn write_u32(buf: &mut Vec<u8>, n: u32) {
    buf.extend_from_slice(&n.to_be_bytes());
}

pub fn write_u48(buf: &mut Vec<u8>, n: u64) {
    debug_assert!(n < 1 << 48);
    buf.extend_from_slice(&n.to_be_bytes()[2..]);
}

pub fn write_uint(buf: &mut Vec<u8>, mut n: u64) {
    while n > 127 {
        buf.push((n as u8 & 127) | 128);
        n >>= 7;
    }
    buf.push(n as u8);
}

/// A board move or crazyhouse drop packed into 16 bits:
/// `[role (4) | dest (6) | orig (6)]`.
///
/// Promotions carry `role in 1..=4` (knight..queen) with `orig != dest`.
/// Drops are distinguished by `orig == dest` and carry `role in 1..=6`
/// (pawn..king). Castling moves are tokenized king-square to rook-square
/// so they never collide with ordinary king moves.
pub type MoveToken = u16;

pub fn encode_move(uci: &UciMove) -> Result<MoveToken, CodecError> {
    match *uci {
        UciMove::Normal {
            from,
            to,
            promotion,
        } => {
            if from == to {
                return Err(CodecError::Malformed("null move not encodable"));
            }
            let role = match promotion {
                None => 0,
                Some(Role::Knight) => 1,
                Some(Role::Bishop) => 2,
                Some(Role::Rook) => 3,
                Some(Role::Queen) => 4,
                Some(_) => return Err(CodecError::Malformed("invalid promotion role")),
            };
            Ok(role << 12 | u16::from(to) << 6 | u16::from(from))
        }
        UciMove::Put { role, to } => {
            let role = match role {
                Role::Pawn => 1,
                Role::Knight => 2,
                Role::Bishop => 3,
                Role::Rook => 4,
                Role::Queen => 5,
                Role::King => 6,
            };
            Ok(role << 12 | u16::from(to) << 6 | u16::from(to))
        }
        UciMove::Null => Err(CodecError::Malformed("null move not encodable")),
    }
}

pub fn decode_move(token: MoveToken) -> Result<UciMove, CodecError> {
    let orig = Square::new(u32::from(token & 63));
    let dest = Square::new(u32::from(token >> 6 & 63));
    let role = token >> 12 & 15;
    if orig == dest {
        Ok(UciMove::Put {
            role: match role {
                1 => Role::Pawn,
                2 => Role::Knight,
                3 => Role::Bishop,
                4 => Role::Rook,
                5 => Role::Queen,
                6 => Role::King,
                _ => return Err(CodecError::Malformed("invalid drop role")),
            },
            to: dest,
        })
    } else {
        Ok(UciMove::Normal {
            from: orig,
            to: dest,
            promotion: match role {
                0 => None,
                1 => Some(Role::Knight),
                2 => Some(Role::Bishop),
                3 => Some(Role::Rook),
                4 => Some(Role::Queen),
                _ => return Err(CodecError::Malformed("invalid promotion role")),
            },
        })
    }
}

pub fn write_move(buf: &mut Vec<u8>, token: MoveToken) {
    write_u16(buf, token);
}

pub fn read_move(reader: &mut ByteReader<'_>) -> Result<MoveToken, CodecError> {
    let token = reader.read_u16()?;
    decode_move(token)?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;
    use shakmaty::{uci::UciMove, Role, Square};

    use super::*;

    #[test]
    fn uint_minimal_encoding() {
        let mut buf = Vec::new();
        write_uint(&mut buf, 0);
        assert_eq!(buf, [0]);

        buf.clear();
        write_uint(&mut buf, 127);
        assert_eq!(buf, [127]);

        buf.clear();
        write_uint(&mut buf, 128);
        assert_eq!(buf, [128 | 0, 1]);
        assert_eq!(ByteReader::new(&buf).read_uint(), Ok(128));
    }

    #[test]
    fn uint_boundary_value() {
        // 40-bit value from the historical pack tests.
        let mut buf = Vec::new();
        write_uint(&mut buf, 864_197_252_500);
        assert!(buf[..buf.len() - 1].iter().all(|b| b & 128 != 0));
        assert_eq!(buf.last().unwrap() & 128, 0);
        assert_eq!(ByteReader::new(&buf).read_uint(), Ok(864_197_252_500));
    }

    #[test]
    fn uint_truncated() {
        let mut buf = Vec::new();
        write_uint(&mut buf, u64::MAX);
        assert_eq!(
            ByteReader::new(&buf[..buf.len() - 1]).read_uint(),
            Err(CodecError::Truncated)
        );
    }

    #[test]
    fn fixed_width_roundtrip() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 0xAB);
        write_u16(&mut buf, 0xBEEF);
        write_u24(&mut buf, 0xC0FFEE);
        write_u32(&mut buf, 0xDEAD_BEEF);
        write_u48(&mut buf, 0xDEAD_BEEF_CAFE);
        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_u8(), Ok(0xAB));
        assert_eq!(reader.read_u16(), Ok(0xBEEF));
        assert_eq!(reader.read_u24(), Ok(0xC0FFEE));
        assert_eq!(reader.read_u32(), Ok(0xDEAD_BEEF));
        assert_eq!(reader.read_u48(), Ok(0xDEAD_BEEF_CAFE));
        assert!(reader.is_empty());
        assert_eq!(reader.read_u8(), Err(CodecError::Truncated));
    }

    #[test]
    fn move_token_layout() {
        // g1f3: orig 6, dest 21, no promotion.
        let uci = UciMove::Normal {
            from: Square::G1,
            to: Square::F3,
            promotion: None,
        };
        let token = encode_move(&uci).unwrap();
        assert_eq!(token, 21 << 6 | 6);
        assert_eq!(decode_move(token).unwrap(), uci);
    }

    #[test]
    fn promotion_and_drop_roundtrip() {
        let promotion = UciMove::Normal {
            from: Square::A7,
            to: Square::A8,
            promotion: Some(Role::Queen),
        };
        let token = encode_move(&promotion).unwrap();
        assert_eq!(decode_move(token).unwrap(), promotion);

        let drop = UciMove::Put {
            role: Role::Knight,
            to: Square::E5,
        };
        let token = encode_move(&drop).unwrap();
        assert_eq!(decode_move(token).unwrap(), drop);
    }

    #[test]
    fn invalid_roles_rejected() {
        // Drop role 0 and promotion roles above queen are malformed.
        assert!(decode_move(0).is_err());
        assert!(decode_move(5 << 12 | 21 << 6 | 6).is_err());
        assert!(decode_move(15 << 12 | 21 << 6 | 6).is_err());
    }

    quickcheck! {
        fn uint_roundtrip(n: u64) -> bool {
            let mut buf = Vec::new();
            write_uint(&mut buf, n);
            ByteReader::new(&buf).read_uint() == Ok(n)
        }

        fn move_roundtrip(orig: u8, dest: u8, role: u8) -> quickcheck::TestResult {
            let token =
                u16::from(role % 5) << 12 | u16::from(dest & 63) << 6 | u16::from(orig & 63);
            match decode_move(token) {
                Ok(uci) => quickcheck::TestResult::from_bool(
                    encode_move(&uci) == Ok(token),
                ),
                Err(_) => quickcheck::TestResult::discard(),
            }
        }
    }
}
