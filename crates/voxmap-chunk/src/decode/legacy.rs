//! Flat legacy chunk records (tag 0x30).
//!
//! | Offset | Size  | Plane |
//! |--------|-------|-------|
//! | 0      | 32768 | block ids, index `cx*2048 + cz*128 + cy` |
//! | 32768  | 16384 | data nibbles |
//! | 49152  | 16384 | sky light nibbles |
//! | 65536  | 16384 | block light nibbles |
//! | 81920  | 256   | height column, index `cz*16 + cx` |
//! | 82176  | 1024  | grass/biome LE u32, index `cz*16 + cx` |

use super::{BlockSource, Light, nibble};
use crate::coords::LEGACY_HEIGHT;
use crate::error::DecodeError;

const VOLUME: usize = 16 * 16 * LEGACY_HEIGHT;
const DATA_OFFSET: usize = VOLUME;
const SKY_OFFSET: usize = DATA_OFFSET + VOLUME / 2;
const BLOCK_LIGHT_OFFSET: usize = SKY_OFFSET + VOLUME / 2;
const HEIGHT_OFFSET: usize = BLOCK_LIGHT_OFFSET + VOLUME / 2;
const BIOME_OFFSET: usize = HEIGHT_OFFSET + 256;

/// Shortest accepted record: ids and data nibbles.
pub const LEGACY_LEN_MIN: usize = SKY_OFFSET;
/// Length of a record with every plane.
pub const LEGACY_LEN_FULL: usize = BIOME_OFFSET + 256 * 4;

/// Borrowed view of a legacy record.
#[derive(Clone, Copy, Debug)]
pub struct LegacyChunk<'a> {
    bytes: &'a [u8],
}

impl<'a> LegacyChunk<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        if bytes.len() < LEGACY_LEN_MIN {
            return Err(DecodeError::Truncated {
                expected: LEGACY_LEN_MIN,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    fn index(cx: usize, cz: usize, cy: usize) -> usize {
        // Tall worlds read the top stored layer for everything above it.
        cx * 2048 + cz * 128 + cy.min(LEGACY_HEIGHT - 1)
    }

    /// Precomputed height of the column, if the record carries it.
    pub fn height_column(&self, cx: usize, cz: usize) -> Option<u8> {
        if self.bytes.len() < BIOME_OFFSET {
            return None;
        }
        Some(self.bytes[HEIGHT_OFFSET + cz * 16 + cx])
    }

    /// Packed grass color (high 24 bits) and biome id (low byte).
    pub fn grass_and_biome(&self, cx: usize, cz: usize) -> Option<u32> {
        if self.bytes.len() < LEGACY_LEN_FULL {
            return None;
        }
        let at = BIOME_OFFSET + (cz * 16 + cx) * 4;
        Some(u32::from_le_bytes([
            self.bytes[at],
            self.bytes[at + 1],
            self.bytes[at + 2],
            self.bytes[at + 3],
        ]))
    }
}

impl BlockSource for LegacyChunk<'_> {
    fn height(&self) -> usize {
        LEGACY_HEIGHT
    }

    fn block_at(&self, cx: usize, cz: usize, cy: usize) -> u16 {
        u16::from(self.bytes[Self::index(cx, cz, cy)])
    }

    fn data_at(&self, cx: usize, cz: usize, cy: usize) -> u8 {
        nibble(self.bytes, DATA_OFFSET, Self::index(cx, cz, cy))
    }

    fn light_at(&self, cx: usize, cz: usize, cy: usize) -> Option<Light> {
        if self.bytes.len() < HEIGHT_OFFSET {
            return None;
        }
        let i = Self::index(cx, cz, cy);
        Some(Light {
            sky: nibble(self.bytes, SKY_OFFSET, i),
            block: nibble(self.bytes, BLOCK_LIGHT_OFFSET, i),
        })
    }
}
