//! Decoders for the three stored block formats and the 2D column record.
//!
//! Every decoder is a view or a small owned value built with explicit
//! little-endian reads. Block addressing is uniform across formats: local
//! column `(cx, cz)` in `0..16` and a height `cy` relative to the record's base.

mod column;
mod cubic;
mod legacy;
mod packed;
mod palette;

pub use column::{COLUMN_DATA_LEN, ColumnData};
pub use cubic::{CUBIC_LEN_NO_LIGHT, CUBIC_LEN_WITH_LIGHT, CubicChunk, CubicWordChunk};
pub use legacy::{LEGACY_LEN_FULL, LEGACY_LEN_MIN, LegacyChunk};
pub use packed::PackedIndices;
pub use palette::{PaletteEntry, PaletteSubchunk, encode_palette_subchunk};

use crate::error::DecodeError;

/// Block id written for palette names no resolver knows.
pub const UNRESOLVED_BLOCK: u16 = u16::MAX;

/// Storage format of a chunk block record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkFormat {
    /// Flat 16x16x128 record (tag 0x30).
    Legacy,
    /// Cubic 16x16x16 byte-id subchunk.
    CubicByte,
    /// Cubic subchunk with a palette of named blocks.
    Palette,
}

impl ChunkFormat {
    /// Format of a subchunk payload, chosen by its first byte.
    pub fn of_subchunk(bytes: &[u8]) -> Option<Self> {
        match bytes.first()? {
            0 => Some(Self::CubicByte),
            _ => Some(Self::Palette),
        }
    }
}

/// Sky and block light at one position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Light {
    pub sky: u8,
    pub block: u8,
}

impl Light {
    /// Packs as `sky << 4 | block`.
    pub fn packed(self) -> u8 {
        (self.sky << 4) | (self.block & 0x0f)
    }
}

/// Read access to decoded blocks.
pub trait BlockSource {
    /// Number of block layers in this source.
    fn height(&self) -> usize;
    fn block_at(&self, cx: usize, cz: usize, cy: usize) -> u16;
    fn data_at(&self, cx: usize, cz: usize, cy: usize) -> u8;
    /// `None` when the record carries no light planes.
    fn light_at(&self, cx: usize, cz: usize, cy: usize) -> Option<Light>;
}

/// Maps palette block names to numeric `(id, data)` pairs.
pub trait BlockResolver {
    fn resolve(&self, name: &str, val: i16) -> Option<(u16, u8)>;
}

/// A decoded cubic subchunk in either representation.
pub enum Subchunk<'a> {
    Byte(CubicChunk<'a>),
    Word(CubicWordChunk),
}

impl Subchunk<'_> {
    /// Palette names the resolver could not map.
    pub fn unresolved_names(&self) -> &[String] {
        match self {
            Subchunk::Byte(_) => &[],
            Subchunk::Word(word) => word.unresolved_names(),
        }
    }
}

impl BlockSource for Subchunk<'_> {
    fn height(&self) -> usize {
        match self {
            Subchunk::Byte(c) => c.height(),
            Subchunk::Word(c) => c.height(),
        }
    }

    fn block_at(&self, cx: usize, cz: usize, cy: usize) -> u16 {
        match self {
            Subchunk::Byte(c) => c.block_at(cx, cz, cy),
            Subchunk::Word(c) => c.block_at(cx, cz, cy),
        }
    }

    fn data_at(&self, cx: usize, cz: usize, cy: usize) -> u8 {
        match self {
            Subchunk::Byte(c) => c.data_at(cx, cz, cy),
            Subchunk::Word(c) => c.data_at(cx, cz, cy),
        }
    }

    fn light_at(&self, cx: usize, cz: usize, cy: usize) -> Option<Light> {
        match self {
            Subchunk::Byte(c) => c.light_at(cx, cz, cy),
            Subchunk::Word(c) => c.light_at(cx, cz, cy),
        }
    }
}

/// Raw bytes of a subchunk record (tag 0x2f).
#[derive(Clone, Copy, Debug)]
pub struct SubchunkPayload<'a> {
    bytes: &'a [u8],
}

impl<'a> SubchunkPayload<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn format(&self) -> Option<ChunkFormat> {
        ChunkFormat::of_subchunk(self.bytes)
    }

    /// Decodes the payload. Palette payloads are transcoded to word form.
    pub fn decode(self, resolver: &dyn BlockResolver) -> Result<Subchunk<'a>, DecodeError> {
        match self.format() {
            None => Err(DecodeError::Truncated {
                expected: 1,
                actual: 0,
            }),
            Some(ChunkFormat::CubicByte) => Ok(Subchunk::Byte(CubicChunk::new(self.bytes)?)),
            Some(_) => {
                let palette = PaletteSubchunk::parse(self.bytes)?;
                Ok(Subchunk::Word(palette.transcode(resolver)))
            }
        }
    }
}

/// Reads a 4-bit value from a nibble plane starting at `base`.
///
/// Even indices use the low nibble.
pub(crate) fn nibble(bytes: &[u8], base: usize, index: usize) -> u8 {
    let b = bytes[base + index / 2];
    if index & 1 == 0 { b & 0x0f } else { b >> 4 }
}
