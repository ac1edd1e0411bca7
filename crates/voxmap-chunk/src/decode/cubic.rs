//! Cubic 16x16x16 subchunks: the byte form stored on disk and the word form
//! produced by transcoding palette subchunks.

use super::{BlockSource, Light, nibble};
use crate::coords::SUBCHUNK_HEIGHT;
use crate::error::DecodeError;

const VOLUME: usize = 16 * 16 * SUBCHUNK_HEIGHT;
const IDS_OFFSET: usize = 1;
const DATA_OFFSET: usize = IDS_OFFSET + VOLUME;
const SKY_OFFSET: usize = DATA_OFFSET + VOLUME / 2;
const BLOCK_LIGHT_OFFSET: usize = SKY_OFFSET + VOLUME / 2;

/// Length of a byte subchunk without light planes.
pub const CUBIC_LEN_NO_LIGHT: usize = SKY_OFFSET;
/// Length of a byte subchunk with both light planes.
pub const CUBIC_LEN_WITH_LIGHT: usize = BLOCK_LIGHT_OFFSET + VOLUME / 2;

fn index(cx: usize, cz: usize, cy: usize) -> usize {
    (cx * 16 + cz) * 16 + cy
}

/// Borrowed view of a byte-id subchunk (first byte 0).
#[derive(Clone, Copy, Debug)]
pub struct CubicChunk<'a> {
    bytes: &'a [u8],
}

impl<'a> CubicChunk<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        if bytes.len() < CUBIC_LEN_NO_LIGHT {
            return Err(DecodeError::Truncated {
                expected: CUBIC_LEN_NO_LIGHT,
                actual: bytes.len(),
            });
        }
        if bytes[0] != 0 {
            return Err(DecodeError::UnsupportedVersion(bytes[0]));
        }
        if bytes.len() != CUBIC_LEN_NO_LIGHT && bytes.len() != CUBIC_LEN_WITH_LIGHT {
            tracing::debug!(len = bytes.len(), "Unexpected cubic subchunk length");
        }
        Ok(Self { bytes })
    }

    pub fn has_light(&self) -> bool {
        self.bytes.len() >= CUBIC_LEN_WITH_LIGHT
    }
}

impl BlockSource for CubicChunk<'_> {
    fn height(&self) -> usize {
        SUBCHUNK_HEIGHT
    }

    fn block_at(&self, cx: usize, cz: usize, cy: usize) -> u16 {
        u16::from(self.bytes[IDS_OFFSET + index(cx, cz, cy)])
    }

    fn data_at(&self, cx: usize, cz: usize, cy: usize) -> u8 {
        nibble(self.bytes, DATA_OFFSET, index(cx, cz, cy))
    }

    fn light_at(&self, cx: usize, cz: usize, cy: usize) -> Option<Light> {
        if !self.has_light() {
            return None;
        }
        let i = index(cx, cz, cy);
        Some(Light {
            sky: nibble(self.bytes, SKY_OFFSET, i),
            block: nibble(self.bytes, BLOCK_LIGHT_OFFSET, i),
        })
    }
}

/// Owned subchunk with 16-bit ids, addressed like [`CubicChunk`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubicWordChunk {
    ids: Vec<u16>,
    data: Vec<u8>,
    unresolved: Vec<String>,
}

impl CubicWordChunk {
    /// Builds a word chunk from full id and data grids.
    ///
    /// Both slices must hold exactly 4096 entries.
    pub(crate) fn from_parts(ids: Vec<u16>, data: Vec<u8>, unresolved: Vec<String>) -> Self {
        debug_assert_eq!(ids.len(), VOLUME);
        debug_assert_eq!(data.len(), VOLUME);
        Self {
            ids,
            data,
            unresolved,
        }
    }

    /// All-air subchunk.
    pub fn empty() -> Self {
        Self::from_parts(vec![0; VOLUME], vec![0; VOLUME], Vec::new())
    }

    /// Palette names that did not resolve to an id while transcoding.
    pub fn unresolved_names(&self) -> &[String] {
        &self.unresolved
    }
}

impl BlockSource for CubicWordChunk {
    fn height(&self) -> usize {
        SUBCHUNK_HEIGHT
    }

    fn block_at(&self, cx: usize, cz: usize, cy: usize) -> u16 {
        self.ids[index(cx, cz, cy)]
    }

    fn data_at(&self, cx: usize, cz: usize, cy: usize) -> u8 {
        self.data[index(cx, cz, cy)]
    }

    fn light_at(&self, _cx: usize, _cz: usize, _cy: usize) -> Option<Light> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        for i in 0..VOLUME {
            bytes[IDS_OFFSET + i] = (i % 251) as u8;
        }
        for i in 0..VOLUME / 2 {
            bytes[DATA_OFFSET + i] = (i % 256) as u8;
        }
        bytes
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(CUBIC_LEN_NO_LIGHT, 6145);
        assert_eq!(CUBIC_LEN_WITH_LIGHT, 10241);
    }

    #[test]
    fn test_with_and_without_light_agree_on_blocks() {
        let long = grid_bytes(CUBIC_LEN_WITH_LIGHT);
        let short = grid_bytes(CUBIC_LEN_NO_LIGHT);
        let a = CubicChunk::new(&long).unwrap();
        let b = CubicChunk::new(&short).unwrap();
        for cx in 0..16 {
            for cz in 0..16 {
                for cy in 0..16 {
                    assert_eq!(a.block_at(cx, cz, cy), b.block_at(cx, cz, cy));
                    assert_eq!(a.data_at(cx, cz, cy), b.data_at(cx, cz, cy));
                }
            }
        }
        assert!(a.light_at(0, 0, 0).is_some());
        assert_eq!(b.light_at(0, 0, 0), None);
    }

    #[test]
    fn test_block_index_order() {
        let mut bytes = vec![0u8; CUBIC_LEN_NO_LIGHT];
        bytes[1 + (2 * 16 + 3) * 16 + 4] = 56;
        let chunk = CubicChunk::new(&bytes).unwrap();
        assert_eq!(chunk.block_at(2, 3, 4), 56);
        assert_eq!(chunk.block_at(3, 2, 4), 0);
    }

    #[test]
    fn test_nonzero_version_rejected() {
        let mut bytes = vec![0u8; CUBIC_LEN_NO_LIGHT];
        bytes[0] = 1;
        assert!(matches!(
            CubicChunk::new(&bytes),
            Err(DecodeError::UnsupportedVersion(1))
        ));
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = vec![0u8; 100];
        assert!(matches!(
            CubicChunk::new(&bytes),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_empty_word_chunk_is_air() {
        let chunk = CubicWordChunk::empty();
        assert_eq!(chunk.block_at(15, 15, 15), 0);
        assert_eq!(chunk.light_at(0, 0, 0), None);
    }
}
