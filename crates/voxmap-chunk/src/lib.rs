//! Chunk record classification and decoding for LevelDB-backed voxel worlds.

pub mod blocks;
pub mod coords;
pub mod decode;
pub mod error;
pub mod nbt;
pub mod record;
pub mod slime;
pub mod store;

pub use blocks::{ChunkBlocks, RawChunk};
pub use coords::{
    AIR, BLOCK_ID_LIMIT, CHUNK_WIDTH, ChunkPos, DimensionId, LEGACY_HEIGHT, SUBCHUNK_COUNT,
    SUBCHUNK_HEIGHT,
};
pub use decode::{
    BlockResolver, BlockSource, ChunkFormat, ColumnData, CubicChunk, CubicWordChunk, LegacyChunk,
    Light, PaletteSubchunk, Subchunk, SubchunkPayload, UNRESOLVED_BLOCK,
};
pub use error::{ClassifyError, DecodeError, NbtError, StoreError};
pub use record::{
    ChunkKey, ChunkRecordKind, NamedRecord, RecordKey, chunk_key, classify, hex_dump,
    subchunk_key,
};
pub use slime::is_slime_chunk;
pub use store::{ChunkStore, MemoryStore};
