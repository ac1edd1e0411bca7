//! Full-height block access for one chunk column, read straight from a store.
//!
//! A column is either one legacy record or up to sixteen cubic subchunks.
//! Missing subchunks and records that fail to decode read as air.

use crate::coords::{AIR, ChunkPos, DimensionId, LEGACY_HEIGHT, SUBCHUNK_COUNT, SUBCHUNK_HEIGHT};
use crate::decode::{BlockResolver, BlockSource, LegacyChunk, Subchunk, SubchunkPayload};
use crate::error::{DecodeError, StoreError};
use crate::record::{ChunkRecordKind, chunk_key, subchunk_key};
use crate::store::ChunkStore;

/// Block records of one chunk column as stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawChunk {
    Legacy(Vec<u8>),
    /// Indexed by subchunk; `None` where the store has no record.
    Cubic(Vec<Option<Vec<u8>>>),
}

impl RawChunk {
    /// Reads the legacy record if present, otherwise every subchunk.
    ///
    /// Returns `None` when the store holds no block record for the column.
    pub fn load(
        store: &mut dyn ChunkStore,
        dimension: DimensionId,
        pos: ChunkPos,
    ) -> Result<Option<Self>, StoreError> {
        if let Some(bytes) = store.get(&chunk_key(dimension, pos, ChunkRecordKind::LegacyTerrain))? {
            return Ok(Some(Self::Legacy(bytes)));
        }
        let mut subchunks = Vec::with_capacity(usize::from(SUBCHUNK_COUNT));
        for index in 0..SUBCHUNK_COUNT {
            subchunks.push(store.get(&subchunk_key(dimension, pos, index))?);
        }
        if subchunks.iter().all(Option::is_none) {
            return Ok(None);
        }
        Ok(Some(Self::Cubic(subchunks)))
    }

    /// Whether the 16-block slab `index` is backed by stored data.
    pub fn has_subchunk(&self, index: u8) -> bool {
        match self {
            RawChunk::Legacy(_) => usize::from(index) * SUBCHUNK_HEIGHT < LEGACY_HEIGHT,
            RawChunk::Cubic(subchunks) => {
                subchunks.get(usize::from(index)).is_some_and(Option::is_some)
            }
        }
    }

    /// Decodes every record. `on_error` sees the subchunk index (`None` for
    /// a legacy record) of each record that fails; those read as air.
    pub fn decode<'a>(
        &'a self,
        resolver: &dyn BlockResolver,
        on_error: &mut dyn FnMut(Option<u8>, DecodeError),
    ) -> ChunkBlocks<'a> {
        match self {
            RawChunk::Legacy(bytes) => match LegacyChunk::new(bytes) {
                Ok(chunk) => ChunkBlocks::Legacy(chunk),
                Err(e) => {
                    on_error(None, e);
                    ChunkBlocks::Empty
                }
            },
            RawChunk::Cubic(subchunks) => ChunkBlocks::Cubic(
                subchunks
                    .iter()
                    .enumerate()
                    .map(|(index, bytes)| {
                        match SubchunkPayload::new(bytes.as_deref()?).decode(resolver) {
                            Ok(sub) => Some(sub),
                            Err(e) => {
                                on_error(Some(index as u8), e);
                                None
                            }
                        }
                    })
                    .collect(),
            ),
        }
    }
}

/// Decoded view of a column, addressed by absolute height.
pub enum ChunkBlocks<'a> {
    Legacy(LegacyChunk<'a>),
    Cubic(Vec<Option<Subchunk<'a>>>),
    /// Nothing readable; every block is air.
    Empty,
}

impl ChunkBlocks<'_> {
    /// `(id, data)` at local column `(cx, cz)` and height `y`.
    ///
    /// Legacy records repeat their top layer above their stored height.
    pub fn block(&self, cx: usize, cz: usize, y: usize) -> (u16, u8) {
        match self {
            ChunkBlocks::Legacy(chunk) => (chunk.block_at(cx, cz, y), chunk.data_at(cx, cz, y)),
            ChunkBlocks::Cubic(subchunks) => {
                match subchunks.get(y / SUBCHUNK_HEIGHT).and_then(Option::as_ref) {
                    Some(sub) => {
                        let cy = y % SUBCHUNK_HEIGHT;
                        (sub.block_at(cx, cz, cy), sub.data_at(cx, cz, cy))
                    }
                    None => (AIR, 0),
                }
            }
            ChunkBlocks::Empty => (AIR, 0),
        }
    }
}
