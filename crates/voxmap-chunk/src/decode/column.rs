//! Per-column 2D records (tag 0x2d).
//!
//! 256 LE `i16` heights indexed `cz*16 + cx`, then an 8x8 grid of LE `u32`
//! grass/biome words indexed `(cz/2)*8 + cx/2`. Each word covers a 2x2 block
//! of columns.

use crate::error::DecodeError;

const HEIGHTS_LEN: usize = 256 * 2;
const WORDS_LEN: usize = 64 * 4;

/// Length of a complete column record.
pub const COLUMN_DATA_LEN: usize = HEIGHTS_LEN + WORDS_LEN;

/// Decoded column record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnData {
    heights: [i16; 256],
    words: Option<[u32; 64]>,
}

impl ColumnData {
    /// Parses a column record. Records that stop after the heights carry no
    /// grass/biome words.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEIGHTS_LEN {
            return Err(DecodeError::Truncated {
                expected: HEIGHTS_LEN,
                actual: bytes.len(),
            });
        }
        let mut heights = [0i16; 256];
        for (h, b) in heights.iter_mut().zip(bytes.chunks_exact(2)) {
            *h = i16::from_le_bytes([b[0], b[1]]);
        }

        let words = (bytes.len() >= COLUMN_DATA_LEN).then(|| {
            let mut words = [0u32; 64];
            for (w, b) in words
                .iter_mut()
                .zip(bytes[HEIGHTS_LEN..COLUMN_DATA_LEN].chunks_exact(4))
            {
                *w = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            }
            words
        });

        Ok(Self { heights, words })
    }

    pub fn height(&self, cx: usize, cz: usize) -> i16 {
        self.heights[cz * 16 + cx]
    }

    /// Grass/biome word covering the column.
    pub fn grass_and_biome(&self, cx: usize, cz: usize) -> Option<u32> {
        self.words.map(|w| w[(cz / 2) * 8 + cx / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_heights_and_broadcast_words() {
        let mut bytes = vec![0u8; COLUMN_DATA_LEN];
        // Column (cx=5, cz=2) height 70.
        let at = (2 * 16 + 5) * 2;
        bytes[at..at + 2].copy_from_slice(&70i16.to_le_bytes());
        // Word for cell (cx/2=2, cz/2=1).
        let word = (0x0011_2233u32 << 8) | 4;
        let at = HEIGHTS_LEN + (8 + 2) * 4;
        bytes[at..at + 4].copy_from_slice(&word.to_le_bytes());

        let column = ColumnData::parse(&bytes).unwrap();
        assert_eq!(column.height(5, 2), 70);
        assert_eq!(column.height(2, 5), 0);
        for (cx, cz) in [(4, 2), (5, 2), (4, 3), (5, 3)] {
            assert_eq!(column.grass_and_biome(cx, cz), Some(word));
        }
        assert_eq!(column.grass_and_biome(6, 2), Some(0));
    }

    #[test]
    fn test_heights_only_record() {
        let bytes = vec![0u8; HEIGHTS_LEN];
        let column = ColumnData::parse(&bytes).unwrap();
        assert_eq!(column.grass_and_biome(0, 0), None);
    }

    #[test]
    fn test_truncated_rejected() {
        assert!(matches!(
            ColumnData::parse(&[0u8; 10]),
            Err(DecodeError::Truncated { .. })
        ));
    }
}
