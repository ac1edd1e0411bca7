//! Store key classification and key construction.
//!
//! Chunk keys come in four physical layouts:
//!
//! | Length | Layout |
//! |--------|--------|
//! | 9  | `x:i32le z:i32le tag` (overworld) |
//! | 10 | `x:i32le z:i32le tag subchunk` (overworld) |
//! | 13 | `x:i32le z:i32le dim:i32le tag` |
//! | 14 | `x:i32le z:i32le dim:i32le tag subchunk` |
//!
//! A handful of fixed ASCII names hold world-level records. Those are checked
//! first since some of them share a length with chunk keys.

use std::fmt::Write as _;

use crate::coords::{ChunkPos, DimensionId};
use crate::error::ClassifyError;

/// Record type tag stored in a chunk key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkRecordKind {
    LegacyVersion,
    Data2D,
    SubchunkPrefix,
    LegacyTerrain,
    BlockEntity,
    Entity,
    PendingTicks,
    BlockExtraData,
    BiomeState,
    FinalizedState,
    HardcodedSpawnAreas,
    Checksums,
    Version,
    /// A tag we have not identified. Surfaced for diagnostics only.
    Undocumented(u8),
}

impl ChunkRecordKind {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0x2c => Self::LegacyVersion,
            0x2d => Self::Data2D,
            0x2f => Self::SubchunkPrefix,
            0x30 => Self::LegacyTerrain,
            0x31 => Self::BlockEntity,
            0x32 => Self::Entity,
            0x33 => Self::PendingTicks,
            0x34 => Self::BlockExtraData,
            0x35 => Self::BiomeState,
            0x36 => Self::FinalizedState,
            0x39 => Self::HardcodedSpawnAreas,
            0x3b => Self::Checksums,
            0x76 => Self::Version,
            other => Self::Undocumented(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::LegacyVersion => 0x2c,
            Self::Data2D => 0x2d,
            Self::SubchunkPrefix => 0x2f,
            Self::LegacyTerrain => 0x30,
            Self::BlockEntity => 0x31,
            Self::Entity => 0x32,
            Self::PendingTicks => 0x33,
            Self::BlockExtraData => 0x34,
            Self::BiomeState => 0x35,
            Self::FinalizedState => 0x36,
            Self::HardcodedSpawnAreas => 0x39,
            Self::Checksums => 0x3b,
            Self::Version => 0x76,
            Self::Undocumented(tag) => tag,
        }
    }

    /// Short label for logs and the run summary.
    pub fn label(self) -> &'static str {
        match self {
            Self::LegacyVersion => "legacy-version",
            Self::Data2D => "data-2d",
            Self::SubchunkPrefix => "subchunk",
            Self::LegacyTerrain => "legacy-terrain",
            Self::BlockEntity => "block-entity",
            Self::Entity => "entity",
            Self::PendingTicks => "pending-ticks",
            Self::BlockExtraData => "block-extra-data",
            Self::BiomeState => "biome-state",
            Self::FinalizedState => "finalized-state",
            Self::HardcodedSpawnAreas => "hardcoded-spawn-areas",
            Self::Checksums => "checksums",
            Self::Version => "version",
            Self::Undocumented(_) => "undocumented",
        }
    }
}

/// World-level records stored under fixed ASCII names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NamedRecord {
    BiomeData,
    Overworld,
    Nether,
    LocalPlayer,
    /// `player_<id>`.
    RemotePlayer(String),
    Villages,
    MVillages,
    Portals,
    AutonomousEntities,
    IdCounts,
    FlatWorldLayers,
    /// `dimension<N>`.
    Dimension(String),
}

impl NamedRecord {
    fn from_key(key: &[u8]) -> Option<Self> {
        let named = match key {
            b"BiomeData" => Self::BiomeData,
            b"Overworld" => Self::Overworld,
            b"Nether" => Self::Nether,
            b"~local_player" => Self::LocalPlayer,
            b"villages" => Self::Villages,
            b"mVillages" => Self::MVillages,
            b"portals" => Self::Portals,
            b"AutonomousEntities" => Self::AutonomousEntities,
            b"idcounts" => Self::IdCounts,
            b"game_flatworldlayers" => Self::FlatWorldLayers,
            _ => {
                if let Some(id) = key.strip_prefix(b"player_") {
                    Self::RemotePlayer(String::from_utf8_lossy(id).into_owned())
                } else if let Some(n) = key.strip_prefix(b"dimension") {
                    Self::Dimension(String::from_utf8_lossy(n).into_owned())
                } else {
                    return None;
                }
            }
        };
        Some(named)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BiomeData => "BiomeData",
            Self::Overworld => "Overworld",
            Self::Nether => "Nether",
            Self::LocalPlayer => "~local_player",
            Self::RemotePlayer(_) => "player",
            Self::Villages => "villages",
            Self::MVillages => "mVillages",
            Self::Portals => "portals",
            Self::AutonomousEntities => "AutonomousEntities",
            Self::IdCounts => "idcounts",
            Self::FlatWorldLayers => "game_flatworldlayers",
            Self::Dimension(_) => "dimension",
        }
    }
}

/// Identity of a chunk record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub dimension: DimensionId,
    pub pos: ChunkPos,
    pub kind: ChunkRecordKind,
    /// Vertical subchunk index for 10 and 14 byte keys.
    pub subchunk: Option<u8>,
}

/// Result of classifying a store key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordKey {
    Chunk(ChunkKey),
    Named(NamedRecord),
    /// Any other key shape.
    Unknown,
}

/// Classifies a raw store key.
pub fn classify(key: &[u8]) -> Result<RecordKey, ClassifyError> {
    if let Some(named) = NamedRecord::from_key(key) {
        return Ok(RecordKey::Named(named));
    }

    let (dim_raw, tag_at) = match key.len() {
        9 | 10 => (None, 8),
        13 | 14 => (Some(read_i32(key, 8)), 12),
        _ => return Ok(RecordKey::Unknown),
    };

    let pos = ChunkPos::new(read_i32(key, 0), read_i32(key, 4));
    if pos.is_corrupt_sentinel() {
        return Err(ClassifyError::CorruptCoordinates(pos));
    }

    let dimension = match dim_raw {
        None => DimensionId::Overworld,
        Some(raw) => DimensionId::from_keyed(raw).ok_or(ClassifyError::UnknownDimension(raw))?,
    };

    Ok(RecordKey::Chunk(ChunkKey {
        dimension,
        pos,
        kind: ChunkRecordKind::from_tag(key[tag_at]),
        subchunk: key.get(tag_at + 1).copied(),
    }))
}

fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn key_prefix(dimension: DimensionId, pos: ChunkPos) -> Vec<u8> {
    let mut key = Vec::with_capacity(14);
    key.extend_from_slice(&pos.x.to_le_bytes());
    key.extend_from_slice(&pos.z.to_le_bytes());
    if dimension != DimensionId::Overworld {
        key.extend_from_slice(&i32::from(dimension.id()).to_le_bytes());
    }
    key
}

/// Key of a per-chunk record. The overworld omits the dimension id.
pub fn chunk_key(dimension: DimensionId, pos: ChunkPos, kind: ChunkRecordKind) -> Vec<u8> {
    let mut key = key_prefix(dimension, pos);
    key.push(kind.tag());
    key
}

/// Key of cubic subchunk `index` of a chunk.
pub fn subchunk_key(dimension: DimensionId, pos: ChunkPos, index: u8) -> Vec<u8> {
    let mut key = chunk_key(dimension, pos, ChunkRecordKind::SubchunkPrefix);
    key.push(index);
    key
}

/// Formats bytes as rows of 16 hex pairs with an ASCII gutter.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4 + 16);
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:04x}: ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{b:02x} ");
                }
                None => out.push_str("   "),
            }
        }
        out.push(' ');
        for &b in chunk {
            out.push(if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
