// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel positions and channel maps.
//!
//! Unlike a simple channel *count*, a channel *map* assigns a named position to every channel
//! slot. The remix matrix builder in [`crate::matrix`] drives entirely off these positions: two
//! streams with the same channel count but different maps (e.g. quad vs. 4.0 with different
//! front/rear assignment) still need a real mixing matrix, not a straight copy.

use std::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;

/// A single channel's named position.
///
/// `Mono` is a pseudo-position: it never appears alongside other positions in a real map (a mono
/// stream has exactly one channel, positioned `Mono`), but it is special-cased by the matrix
/// builder's direct-connect rule (every input connects to it, and it connects to every output with
/// equal weight).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Position {
    Mono,
    FrontLeft,
    FrontRight,
    FrontCenter,
    Lfe,
    RearLeft,
    RearRight,
    FrontLeftOfCenter,
    FrontRightOfCenter,
    RearCenter,
    SideLeft,
    SideRight,
    TopCenter,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopRearLeft,
    TopRearCenter,
    TopRearRight,
}

/// The "side" classification used by the per-region fallback and fan-in steps of the matrix
/// builder (§4.2). Every recognized position other than LFE falls into `Left`, `Right`, or
/// `Center`; LFE is its own side; anything not named in the classification tables is `Other`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Center,
    Lfe,
    Other,
}

/// The front/rear/side classification used by the center-rescue step of the matrix builder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Region {
    Front,
    Rear,
    Side,
    Other,
}

impl Position {
    /// Classify this position by side, per the exhaustive table in the external interfaces
    /// section.
    pub fn side(self) -> Side {
        use Position::*;
        match self {
            FrontLeft | RearLeft | FrontLeftOfCenter | SideLeft | TopFrontLeft | TopRearLeft => {
                Side::Left
            }
            FrontRight | RearRight | FrontRightOfCenter | SideRight | TopFrontRight
            | TopRearRight => Side::Right,
            FrontCenter | RearCenter | TopCenter | TopFrontCenter | TopRearCenter => Side::Center,
            Lfe => Side::Lfe,
            Mono => Side::Other,
        }
    }

    /// Classify this position by region, per the exhaustive table in the external interfaces
    /// section.
    pub fn region(self) -> Region {
        use Position::*;
        match self {
            FrontLeft | FrontRight | FrontCenter | TopFrontLeft | TopFrontRight
            | TopFrontCenter | FrontLeftOfCenter | FrontRightOfCenter => Region::Front,
            RearLeft | RearRight | RearCenter | TopRearLeft | TopRearRight | TopRearCenter => {
                Region::Rear
            }
            SideLeft | SideRight | TopCenter => Region::Side,
            Lfe | Mono => Region::Other,
        }
    }

    /// A stable bit for this position, used to build the [`Channels`] presence mask for a map.
    fn bit(self) -> u64 {
        use Position::*;
        1u64
            << match self {
                Mono => 0,
                FrontLeft => 1,
                FrontRight => 2,
                FrontCenter => 3,
                Lfe => 4,
                RearLeft => 5,
                RearRight => 6,
                FrontLeftOfCenter => 7,
                FrontRightOfCenter => 8,
                RearCenter => 9,
                SideLeft => 10,
                SideRight => 11,
                TopCenter => 12,
                TopFrontLeft => 13,
                TopFrontCenter => 14,
                TopFrontRight => 15,
                TopRearLeft => 16,
                TopRearCenter => 17,
                TopRearRight => 18,
            }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Position::*;
        let name = match *self {
            Mono => "mono",
            FrontLeft => "front-left",
            FrontRight => "front-right",
            FrontCenter => "front-center",
            Lfe => "lfe",
            RearLeft => "rear-left",
            RearRight => "rear-right",
            FrontLeftOfCenter => "front-left-of-center",
            FrontRightOfCenter => "front-right-of-center",
            RearCenter => "rear-center",
            SideLeft => "side-left",
            SideRight => "side-right",
            TopCenter => "top-center",
            TopFrontLeft => "top-front-left",
            TopFrontCenter => "top-front-center",
            TopFrontRight => "top-front-right",
            TopRearLeft => "top-rear-left",
            TopRearCenter => "top-rear-center",
            TopRearRight => "top-rear-right",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// A presence bitmask over the positions a [`ChannelMap`] contains. Used for cheap
    /// `NO_REMAP`/`NO_REMIX` equality-style checks without re-scanning the whole map.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Channels: u64 {
        const MONO                  = 1 << 0;
        const FRONT_LEFT            = 1 << 1;
        const FRONT_RIGHT           = 1 << 2;
        const FRONT_CENTER          = 1 << 3;
        const LFE                   = 1 << 4;
        const REAR_LEFT             = 1 << 5;
        const REAR_RIGHT            = 1 << 6;
        const FRONT_LEFT_OF_CENTER  = 1 << 7;
        const FRONT_RIGHT_OF_CENTER = 1 << 8;
        const REAR_CENTER           = 1 << 9;
        const SIDE_LEFT             = 1 << 10;
        const SIDE_RIGHT            = 1 << 11;
        const TOP_CENTER            = 1 << 12;
        const TOP_FRONT_LEFT        = 1 << 13;
        const TOP_FRONT_CENTER      = 1 << 14;
        const TOP_FRONT_RIGHT       = 1 << 15;
        const TOP_REAR_LEFT         = 1 << 16;
        const TOP_REAR_CENTER       = 1 << 17;
        const TOP_REAR_RIGHT        = 1 << 18;
    }
}

/// A channel map: one named [`Position`] per channel slot, in channel order.
///
/// Inline-stores up to 8 channels (covers every layout this engine names explicitly, 7.1 and
/// below) before spilling to the heap.
pub type ChannelMap = SmallVec<[Position; 8]>;

/// Build the presence bitmask of a channel map.
pub fn channels_mask(map: &[Position]) -> Channels {
    let mut bits = 0u64;
    for &pos in map {
        bits |= pos.bit();
    }
    Channels::from_bits_truncate(bits)
}

/// The default channel map assigned when a caller specifies a channel count but no explicit map,
/// for channel counts with an unambiguous conventional layout. Returns `None` for counts with no
/// single obvious convention (the caller must then supply an explicit map).
pub fn default_map_for_count(count: u32) -> Option<ChannelMap> {
    use Position::*;
    let positions: &[Position] = match count {
        1 => &[Mono],
        2 => &[FrontLeft, FrontRight],
        3 => &[FrontLeft, FrontRight, FrontCenter],
        4 => &[FrontLeft, FrontRight, RearLeft, RearRight],
        5 => &[FrontLeft, FrontRight, FrontCenter, RearLeft, RearRight],
        6 => &[FrontLeft, FrontRight, FrontCenter, Lfe, RearLeft, RearRight],
        8 => &[
            FrontLeft, FrontRight, FrontCenter, Lfe, RearLeft, RearRight, SideLeft, SideRight,
        ],
        _ => return None,
    };
    Some(positions.iter().copied().collect())
}
