//! Palette subchunks (first byte non-zero).
//!
//! ## Binary Layout
//!
//! | Field | Notes |
//! |-------|-------|
//! | version `u8` | 1: one storage; 8: storage count follows; 9: count and a y index follow |
//! | storage count `u8` | versions 8 and 9 |
//! | y index `i8` | version 9 only |
//! | header `u8` | `bits_per_block << 1 \| runtime_flag`, per storage |
//! | words | `ceil(4096 / (32 / bits))` LE `u32` |
//! | palette size `i32` LE | |
//! | entries | LE NBT compounds `{ name: String, val: Short }` |
//!
//! Only the first storage holds blocks. Later storages (water logging) are
//! not parsed.

use std::io::Cursor;

use super::packed::{PackedIndices, VALID_BITS};
use super::{BlockResolver, CubicWordChunk, UNRESOLVED_BLOCK};
use crate::error::DecodeError;
use crate::nbt::{self, Tag};

const VOLUME: usize = 4096;

/// Refuse palettes larger than the number of blocks they index.
const MAX_PALETTE: i32 = VOLUME as i32;

/// One named block of a palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: String,
    pub val: i16,
}

/// A parsed palette subchunk, before name resolution.
#[derive(Clone, Debug)]
pub struct PaletteSubchunk {
    version: u8,
    indices: PackedIndices,
    palette: Vec<PaletteEntry>,
}

impl PaletteSubchunk {
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let version = *bytes.first().ok_or(DecodeError::Truncated {
            expected: 1,
            actual: 0,
        })?;
        let (storages, header_at) = match version {
            1 => (1, 1),
            8 => (byte_at(bytes, 1)?, 2),
            9 => (byte_at(bytes, 1)?, 3),
            other => return Err(DecodeError::UnsupportedVersion(other)),
        };
        if storages == 0 {
            return Ok(Self {
                version,
                indices: PackedIndices::new(0, VOLUME),
                palette: Vec::new(),
            });
        }

        let header = byte_at(bytes, header_at)?;
        if header & 1 != 0 {
            return Err(DecodeError::RuntimePalette);
        }
        let bits = header >> 1;
        if !VALID_BITS.contains(&bits) {
            return Err(DecodeError::BadBitsPerBlock(bits));
        }

        let words_at = header_at + 1;
        let word_count = PackedIndices::word_count(bits, VOLUME);
        let words_end = words_at + word_count * 4;
        if bytes.len() < words_end {
            return Err(DecodeError::Truncated {
                expected: words_end,
                actual: bytes.len(),
            });
        }
        let words = bytes[words_at..words_end]
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        let indices = PackedIndices::from_words(bits, VOLUME, words);

        let (size, entries_at) = if bits == 0 {
            (1, words_end)
        } else {
            let end = words_end + 4;
            if bytes.len() < end {
                return Err(DecodeError::Truncated {
                    expected: end,
                    actual: bytes.len(),
                });
            }
            let b = &bytes[words_end..end];
            (i32::from_le_bytes([b[0], b[1], b[2], b[3]]), end)
        };
        if !(0..=MAX_PALETTE).contains(&size) {
            return Err(DecodeError::BadPaletteSize(size));
        }

        let mut cursor = Cursor::new(bytes);
        cursor.set_position(entries_at as u64);
        let mut palette = Vec::with_capacity(size as usize);
        for _ in 0..size {
            let (_, entry) = nbt::read_le_compound(&mut cursor)?;
            palette.push(PaletteEntry {
                name: entry
                    .get("name")
                    .and_then(Tag::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                val: entry
                    .get("val")
                    .and_then(Tag::as_i64)
                    .and_then(|v| i16::try_from(v).ok())
                    .unwrap_or(0),
            });
        }

        for i in 0..VOLUME {
            let index = indices.get(i);
            if usize::from(index) >= palette.len() {
                return Err(DecodeError::PaletteIndexOutOfRange {
                    index,
                    len: palette.len(),
                });
            }
        }

        Ok(Self {
            version,
            indices,
            palette,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn palette(&self) -> &[PaletteEntry] {
        &self.palette
    }

    /// Palette entry of a block, or `None` for a storage-less (all air) subchunk.
    pub fn entry_at(&self, cx: usize, cz: usize, cy: usize) -> Option<&PaletteEntry> {
        let i = (cx * 16 + cz) * 16 + cy;
        self.palette.get(usize::from(self.indices.get(i)))
    }

    /// Expands every index to an `(id, data)` pair.
    ///
    /// Each palette entry is resolved once. Unknown names become
    /// [`UNRESOLVED_BLOCK`] and are listed on the result.
    pub fn transcode(&self, resolver: &dyn BlockResolver) -> CubicWordChunk {
        if self.palette.is_empty() {
            return CubicWordChunk::empty();
        }
        let mut unresolved = Vec::new();
        let resolved: Vec<(u16, u8)> = self
            .palette
            .iter()
            .map(|entry| {
                resolver.resolve(&entry.name, entry.val).unwrap_or_else(|| {
                    if !unresolved.contains(&entry.name) {
                        unresolved.push(entry.name.clone());
                    }
                    (UNRESOLVED_BLOCK, 0)
                })
            })
            .collect();

        let mut ids = vec![0u16; VOLUME];
        let mut data = vec![0u8; VOLUME];
        for i in 0..VOLUME {
            let (id, d) = resolved[usize::from(self.indices.get(i))];
            ids[i] = id;
            data[i] = d;
        }
        CubicWordChunk::from_parts(ids, data, unresolved)
    }
}

fn byte_at(bytes: &[u8], at: usize) -> Result<u8, DecodeError> {
    bytes.get(at).copied().ok_or(DecodeError::Truncated {
        expected: at + 1,
        actual: bytes.len(),
    })
}

/// Encodes a version 8 palette subchunk. Test fixture for this crate and
/// downstream crates' tests.
pub fn encode_palette_subchunk(
    palette: &[PaletteEntry],
    indices: &PackedIndices,
) -> Result<Vec<u8>, crate::error::NbtError> {
    let mut out = vec![8u8, 1, indices.bits() << 1];
    for word in indices.words() {
        out.extend_from_slice(&word.to_le_bytes());
    }
    if indices.bits() != 0 {
        out.extend_from_slice(&(palette.len() as i32).to_le_bytes());
    }
    for entry in palette {
        let mut map = nbt::Compound::new();
        map.insert("name".into(), Tag::String(entry.name.clone()));
        map.insert("val".into(), Tag::Short(entry.val));
        out.extend(nbt::write_le("", &map)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::BlockSource;

    struct Names;

    impl BlockResolver for Names {
        fn resolve(&self, name: &str, val: i16) -> Option<(u16, u8)> {
            match name {
                "minecraft:air" => Some((0, 0)),
                "minecraft:stone" => Some((1, val as u8)),
                "minecraft:dirt" => Some((3, 0)),
                "minecraft:log" => Some((17, val as u8)),
                _ => None,
            }
        }
    }

    fn entry(name: &str, val: i16) -> PaletteEntry {
        PaletteEntry {
            name: name.into(),
            val,
        }
    }

    fn sample(bits: u8) -> (Vec<PaletteEntry>, PackedIndices) {
        let palette = vec![
            entry("minecraft:air", 0),
            entry("minecraft:stone", 2),
            entry("minecraft:dirt", 0),
            entry("minecraft:log", 1),
            entry("mod:mystery", 0),
        ];
        let mut indices = PackedIndices::new(bits, VOLUME);
        for i in 0..VOLUME {
            indices.set(i, ((i * 7 + i / 16) % palette.len()) as u16);
        }
        (palette, indices)
    }

    #[test]
    fn test_transcode_matches_direct_lookup_everywhere() {
        for bits in [3u8, 4, 5, 8, 16] {
            let (palette, indices) = sample(bits);
            let bytes = encode_palette_subchunk(&palette, &indices).unwrap();
            let parsed = PaletteSubchunk::parse(&bytes).unwrap();
            let word = parsed.transcode(&Names);
            for cx in 0..16 {
                for cz in 0..16 {
                    for cy in 0..16 {
                        let e = parsed.entry_at(cx, cz, cy).unwrap();
                        let (id, data) = Names.resolve(&e.name, e.val).unwrap_or((UNRESOLVED_BLOCK, 0));
                        assert_eq!(word.block_at(cx, cz, cy), id);
                        assert_eq!(word.data_at(cx, cz, cy), data);
                    }
                }
            }
            assert_eq!(word.unresolved_names(), &["mod:mystery".to_string()]);
        }
    }

    #[test]
    fn test_palette_entries_parsed() {
        let (palette, indices) = sample(4);
        let bytes = encode_palette_subchunk(&palette, &indices).unwrap();
        let parsed = PaletteSubchunk::parse(&bytes).unwrap();
        assert_eq!(parsed.version(), 8);
        assert_eq!(parsed.palette(), palette.as_slice());
    }

    #[test]
    fn test_index_out_of_range_rejected() {
        let (palette, mut indices) = sample(4);
        indices.set(100, 9);
        let bytes = encode_palette_subchunk(&palette, &indices).unwrap();
        assert!(matches!(
            PaletteSubchunk::parse(&bytes),
            Err(DecodeError::PaletteIndexOutOfRange { index: 9, len: 5 })
        ));
    }

    #[test]
    fn test_bad_bits_and_runtime_flag() {
        let bytes = [8u8, 1, 7 << 1];
        assert!(matches!(
            PaletteSubchunk::parse(&bytes),
            Err(DecodeError::BadBitsPerBlock(7))
        ));
        let bytes = [8u8, 1, (4 << 1) | 1];
        assert!(matches!(
            PaletteSubchunk::parse(&bytes),
            Err(DecodeError::RuntimePalette)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        assert!(matches!(
            PaletteSubchunk::parse(&[3u8, 0, 0]),
            Err(DecodeError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn test_truncated_words() {
        let bytes = [8u8, 1, 4 << 1, 0, 0];
        assert!(matches!(
            PaletteSubchunk::parse(&bytes),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_single_entry_zero_bit_storage() {
        let indices = PackedIndices::new(0, VOLUME);
        let bytes = encode_palette_subchunk(&[entry("minecraft:stone", 0)], &indices).unwrap();
        let word = PaletteSubchunk::parse(&bytes).unwrap().transcode(&Names);
        assert_eq!(word.block_at(9, 9, 9), 1);
    }

    #[test]
    fn test_zero_storages_is_air() {
        let parsed = PaletteSubchunk::parse(&[8u8, 0]).unwrap();
        assert_eq!(parsed.entry_at(0, 0, 0), None);
        assert_eq!(parsed.transcode(&Names).block_at(0, 0, 0), 0);
    }
}
