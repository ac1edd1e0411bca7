//! Palette index storage as written in palette subchunks.
//!
//! Indices are packed little-endian into `u32` words, `32 / bits` per word,
//! starting at the low bits. Indices never span a word boundary, so widths
//! like 3, 5 and 6 leave unused high bits in each word.

/// Bit widths that appear on disk.
pub const VALID_BITS: [u8; 9] = [0, 1, 2, 3, 4, 5, 6, 8, 16];

/// A fixed-length array of palette indices in word-aligned packing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedIndices {
    /// Raw storage words.
    words: Vec<u32>,
    /// Bits per index.
    bits: u8,
    /// Total number of logical indices.
    len: usize,
}

impl PackedIndices {
    /// Number of words needed to hold `len` indices of `bits` bits.
    pub fn word_count(bits: u8, len: usize) -> usize {
        if bits == 0 {
            0
        } else {
            len.div_ceil(32 / usize::from(bits))
        }
    }

    /// Creates an all-zero array.
    pub fn new(bits: u8, len: usize) -> Self {
        debug_assert!(VALID_BITS.contains(&bits), "invalid bit width {bits}");
        Self {
            words: vec![0; Self::word_count(bits, len)],
            bits,
            len,
        }
    }

    /// Wraps words read from disk.
    ///
    /// The caller supplies exactly [`Self::word_count`] words.
    pub fn from_words(bits: u8, len: usize, words: Vec<u32>) -> Self {
        debug_assert_eq!(words.len(), Self::word_count(bits, len));
        Self { words, bits, len }
    }

    fn locate(&self, index: usize) -> (usize, u32) {
        let per_word = 32 / usize::from(self.bits);
        let word = index / per_word;
        let shift = ((index % per_word) * usize::from(self.bits)) as u32;
        (word, shift)
    }

    fn mask(&self) -> u32 {
        if self.bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bits) - 1
        }
    }

    /// Returns the index stored at `index`.
    pub fn get(&self, index: usize) -> u16 {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            return 0;
        }
        let (word, shift) = self.locate(index);
        ((self.words[word] >> shift) & self.mask()) as u16
    }

    /// Stores `value` at `index`.
    pub fn set(&mut self, index: usize, value: u16) {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            return;
        }
        let (word, shift) = self.locate(index);
        let mask = self.mask();
        self.words[word] &= !(mask << shift);
        self.words[word] |= (u32::from(value) & mask) << shift;
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw storage words in disk order.
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bit_array() {
        let arr = PackedIndices::new(0, 4096);
        assert_eq!(arr.get(0), 0);
        assert_eq!(arr.get(4095), 0);
        assert!(arr.words().is_empty());
    }

    #[test]
    fn test_word_counts_for_disk_widths() {
        assert_eq!(PackedIndices::word_count(1, 4096), 128);
        assert_eq!(PackedIndices::word_count(3, 4096), 410);
        assert_eq!(PackedIndices::word_count(5, 4096), 683);
        assert_eq!(PackedIndices::word_count(6, 4096), 820);
        assert_eq!(PackedIndices::word_count(16, 4096), 2048);
    }

    #[test]
    fn test_every_width_round_trips() {
        for &bits in &VALID_BITS[1..] {
            let mut arr = PackedIndices::new(bits, 4096);
            let modulus = 1usize << bits.min(15);
            for i in 0..4096 {
                arr.set(i, (i % modulus) as u16);
            }
            for i in 0..4096 {
                assert_eq!(arr.get(i), (i % modulus) as u16, "bits {bits} index {i}");
            }
        }
    }

    #[test]
    fn test_three_bit_indices_do_not_span_words() {
        // Ten 3-bit indices per word; the eleventh starts the next word.
        let mut arr = PackedIndices::new(3, 11);
        arr.set(10, 7);
        assert_eq!(arr.words()[0], 0);
        assert_eq!(arr.words()[1], 7);
    }

    #[test]
    fn test_from_words_reads_low_bits_first() {
        let arr = PackedIndices::from_words(4, 8, vec![0x8765_4321]);
        let values: Vec<u16> = (0..8).map(|i| arr.get(i)).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
