//! Chunk coordinates, dimension ids and the fixed geometry of stored chunks.

use std::fmt;

/// Columns per chunk side.
pub const CHUNK_WIDTH: usize = 16;
/// Blocks per cubic subchunk side.
pub const SUBCHUNK_HEIGHT: usize = 16;
/// Number of cubic subchunks stacked in one chunk column.
pub const SUBCHUNK_COUNT: u8 = 16;
/// Height of a legacy (flat) chunk record.
pub const LEGACY_HEIGHT: usize = 128;
/// Block ids are valid in `0..BLOCK_ID_LIMIT`.
pub const BLOCK_ID_LIMIT: usize = 1024;
/// Block id of air.
pub const AIR: u16 = 0;

/// A chunk column position in chunk units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    /// Coordinate value written by the game into records it knows are corrupt.
    pub const CORRUPT_SENTINEL: i32 = i32::MIN;

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing the given world block coordinate.
    pub fn containing(world_x: i32, world_z: i32) -> Self {
        Self {
            x: world_x.div_euclid(CHUNK_WIDTH as i32),
            z: world_z.div_euclid(CHUNK_WIDTH as i32),
        }
    }

    /// Returns `true` for the `(0x80000000, 0x80000000)` corrupt marker.
    pub fn is_corrupt_sentinel(self) -> bool {
        self.x == Self::CORRUPT_SENTINEL && self.z == Self::CORRUPT_SENTINEL
    }

    /// World block coordinate of local column (0, 0).
    pub fn world_origin(self) -> (i64, i64) {
        (
            i64::from(self.x) * CHUNK_WIDTH as i64,
            i64::from(self.z) * CHUNK_WIDTH as i64,
        )
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// One of the three dimensions a world stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DimensionId {
    Overworld = 0,
    Nether = 1,
    TheEnd = 2,
}

impl DimensionId {
    pub const ALL: [DimensionId; 3] = [Self::Overworld, Self::Nether, Self::TheEnd];

    /// Alternate on-disk id some worlds use for the end.
    pub const ALT_THE_END: i32 = 0x3237_3639;
    /// Alternate on-disk id some worlds use for the nether.
    pub const ALT_NETHER: i32 = 0x3337_3639;

    /// Maps a stored dimension id (including the alternates) to a dimension.
    pub fn from_stored(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Overworld),
            1 | Self::ALT_NETHER => Some(Self::Nether),
            2 | Self::ALT_THE_END => Some(Self::TheEnd),
            _ => None,
        }
    }

    /// Maps the explicit dimension field of a 13 or 14 byte key.
    ///
    /// The overworld never stores its id, so 0 here is rejected.
    pub fn from_keyed(raw: i32) -> Option<Self> {
        match raw {
            0 => None,
            other => Self::from_stored(other),
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::from_stored(i32::from(id))
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Name used in output file names and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Overworld => "overworld",
            Self::Nether => "nether",
            Self::TheEnd => "the-end",
        }
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containing_negative_coords() {
        assert_eq!(ChunkPos::containing(-1, -16), ChunkPos::new(-1, -1));
        assert_eq!(ChunkPos::containing(-17, 15), ChunkPos::new(-2, 0));
        assert_eq!(ChunkPos::containing(31, 32), ChunkPos::new(1, 2));
    }

    #[test]
    fn test_corrupt_sentinel() {
        assert!(ChunkPos::new(i32::MIN, i32::MIN).is_corrupt_sentinel());
        assert!(!ChunkPos::new(i32::MIN, 0).is_corrupt_sentinel());
    }

    #[test]
    fn test_alternate_dimension_ids() {
        assert_eq!(
            DimensionId::from_stored(0x3237_3639),
            Some(DimensionId::TheEnd)
        );
        assert_eq!(
            DimensionId::from_stored(0x3337_3639),
            Some(DimensionId::Nether)
        );
        assert_eq!(DimensionId::from_stored(7), None);
        assert_eq!(DimensionId::from_keyed(0), None);
        assert_eq!(DimensionId::from_keyed(1), Some(DimensionId::Nether));
        assert_eq!(DimensionId::TheEnd.name(), "the-end");
    }
}
