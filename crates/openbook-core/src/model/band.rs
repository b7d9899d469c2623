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

/// Fixed partition of the rating axis into half-open bands. The band list
/// is a format constant: it must stay stable for the lifetime of a
/// database file.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RatingBand {
    Low,
    B1000,
    B1200,
    B1400,
    B1600,
    B1800,
    B2000,
    B2200,
    B2400,
    B2600,
    B2800,
}

impl RatingBand {
    pub const ALL: [RatingBand; 11] = [
        RatingBand::Low,
        RatingBand::B1000,
        RatingBand::B1200,
        RatingBand::B1400,
        RatingBand::B1600,
        RatingBand::B1800,
        RatingBand::B2000,
        RatingBand::B2200,
        RatingBand::B2400,
        RatingBand::B2600,
        RatingBand::B2800,
    ];

    /// The band containing `rating`.
    pub fn of(rating: u16) -> RatingBand {
        match Self::ALL
            .iter()
            .rev()
            .find(|band| rating >= band.lower_bound())
        {
            Some(band) => *band,
            None => RatingBand::Low,
        }
    }

    /// Inclusive lower bound of the band.
    pub fn lower_bound(self) -> u16 {
        match self {
            RatingBand::Low => 0,
            RatingBand::B1000 => 1000,
            RatingBand::B1200 => 1200,
            RatingBand::B1400 => 1400,
            RatingBand::B1600 => 1600,
            RatingBand::B1800 => 1800,
            RatingBand::B2000 => 2000,
            RatingBand::B2200 => 2200,
            RatingBand::B2400 => 2400,
            RatingBand::B2600 => 2600,
            RatingBand::B2800 => 2800,
        }
    }

    /// Resolve a query parameter naming the band by its lower bound.
    pub fn from_lower_bound(min: u16) -> Option<RatingBand> {
        Self::ALL.iter().copied().find(|b| b.lower_bound() == min)
    }
}

impl fmt::Display for RatingBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lower_bound())
    }
}
