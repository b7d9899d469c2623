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

/// Time-control bucket. Estimated game duration is `base + 40 * increment`
/// seconds; correspondence and unknown time controls fold into classical.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SpeedBucket {
    Bullet,
    Blitz,
    Rapid,
    Classical,
}

impl SpeedBucket {
    pub const ALL: [SpeedBucket; 4] = [
        SpeedBucket::Bullet,
        SpeedBucket::Blitz,
        SpeedBucket::Rapid,
        SpeedBucket::Classical,
    ];

    /// Classify a PGN `TimeControl` tag of the form `"base+inc"`.
    pub fn from_time_control(tc: &str) -> SpeedBucket {
        let mut parts = tc.splitn(2, '+');
        let base = parts.next().and_then(|s| s.parse::<u32>().ok());
        let inc = parts
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);
        match base {
            Some(base) => SpeedBucket::from_estimate(base + 40 * inc),
            None => SpeedBucket::Classical,
        }
    }

    fn from_estimate(seconds: u32) -> SpeedBucket {
        if seconds < 180 {
            SpeedBucket::Bullet
        } else if seconds < 480 {
            SpeedBucket::Blitz
        } else if seconds < 1500 {
            SpeedBucket::Rapid
        } else {
            SpeedBucket::Classical
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SpeedBucket::Bullet => 0,
            SpeedBucket::Blitz => 1,
            SpeedBucket::Rapid => 2,
            SpeedBucket::Classical => 3,
        }
    }

    pub fn from_code(code: u8) -> SpeedBucket {
        match code & 3 {
            0 => SpeedBucket::Bullet,
            1 => SpeedBucket::Blitz,
            2 => SpeedBucket::Rapid,
            _ => SpeedBucket::Classical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedBucket::Bullet => "bullet",
            SpeedBucket::Blitz => "blitz",
            SpeedBucket::Rapid => "rapid",
            SpeedBucket::Classical => "classical",
        }
    }
}

impl fmt::Display for SpeedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct InvalidSpeed;

impl fmt::Display for InvalidSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown speed bucket")
    }
}

impl std::error::Error for InvalidSpeed {}

impl FromStr for SpeedBucket {
    type Err = InvalidSpeed;

    fn from_str(s: &str) -> Result<SpeedBucket, InvalidSpeed> {
        Ok(match s {
            "bullet" => SpeedBucket::Bullet,
            "blitz" => SpeedBucket::Blitz,
            "rapid" => SpeedBucket::Rapid,
            // Correspondence folds into classical.
            "classical" | "correspondence" => SpeedBucket::Classical,
            _ => return Err(InvalidSpeed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_control_classification() {
        assert_eq!(SpeedBucket::from_time_control("60+1"), SpeedBucket::Bullet);
        assert_eq!(SpeedBucket::from_time_control("180+0"), SpeedBucket::Blitz);
        assert_eq!(SpeedBucket::from_time_control("600+0"), SpeedBucket::Rapid);
        assert_eq!(
            SpeedBucket::from_time_control("1500+0"),
            SpeedBucket::Classical
        );
        assert_eq!(SpeedBucket::from_time_control("-"), SpeedBucket::Classical);
        assert_eq!(SpeedBucket::from_time_control(""), SpeedBucket::Classical);
        assert_eq!(SpeedBucket::from_time_control("480+0"), SpeedBucket::Rapid);
        assert_eq!(SpeedBucket::from_time_control("300+5"), SpeedBucket::Rapid);
    }
}
