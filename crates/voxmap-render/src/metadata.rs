//! Block and biome metadata: names, colors and data-value variants.
//!
//! Loads from a RON manifest. A default table ships inside the crate; a user
//! table with the same layout replaces it wholesale.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use voxmap_chunk::{BLOCK_ID_LIMIT, BlockResolver};

use crate::error::MetadataError;
use crate::palette::{DEFAULT_COLOR, Rgb};

const BUILTIN_TABLE: &str = include_str!("../assets/blocks.ron");

/// Namespace prefix of palette block names.
const NAME_NAMESPACE: &str = "minecraft:";

const BIOME_ID_LIMIT: usize = 256;

/// Color used for in-range block ids the table does not know.
pub const UNKNOWN_BLOCK_COLOR: Rgb = 0xff_00_ff;

/// Color used for block ids outside the id space, kept apart from every table color.
pub const INVALID_BLOCK_COLOR: Rgb = 0xf0_10_d0;

/// Color used for biome ids the table does not know.
pub const UNKNOWN_BIOME_COLOR: Rgb = 0xff_20_20;

// ---------------------------------------------------------------------------
// RON manifest types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MetadataManifest {
    blocks: Vec<BlockEntry>,
    #[serde(default)]
    biomes: Vec<BiomeEntry>,
}

#[derive(Deserialize)]
struct BlockEntry {
    id: u16,
    name: String,
    #[serde(default)]
    color: Option<Rgb>,
    #[serde(default)]
    variants: Vec<VariantInfo>,
}

#[derive(Deserialize)]
struct BiomeEntry {
    id: u16,
    name: String,
    color: Rgb,
}

// ---------------------------------------------------------------------------
// Table entries
// ---------------------------------------------------------------------------

/// A data-value variant of a block with its own color.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct VariantInfo {
    pub data: u8,
    pub name: String,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub name: String,
    /// `None` when no color has been assigned yet.
    pub color: Option<Rgb>,
    pub variants: Vec<VariantInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiomeInfo {
    pub name: String,
    pub color: Rgb,
}

/// Outcome of a block color lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockColor {
    /// Block without variants.
    Block(Rgb),
    /// Variant matching the block data.
    Variant(Rgb),
    /// Block has variants but none matches; carries the block's own color.
    UnmatchedVariant(Rgb),
    /// Block is known but has no color.
    NoColor,
    /// Id not present in the table.
    Unknown,
}

impl BlockColor {
    /// Color to paint, substituting fixed colors for missing entries.
    pub fn rgb(self) -> Rgb {
        match self {
            BlockColor::Block(c) | BlockColor::Variant(c) | BlockColor::UnmatchedVariant(c) => c,
            BlockColor::NoColor => DEFAULT_COLOR,
            BlockColor::Unknown => UNKNOWN_BLOCK_COLOR,
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataTables
// ---------------------------------------------------------------------------

/// Immutable block and biome lookup tables.
///
/// Blocks are stored densely by id in `0..1024`, biomes in `0..256`.
#[derive(Clone, Debug)]
pub struct MetadataTables {
    blocks: Vec<Option<BlockInfo>>,
    biomes: Vec<Option<BiomeInfo>>,
    name_to_id: FxHashMap<String, u16>,
}

impl MetadataTables {
    /// The table compiled into the crate.
    pub fn builtin() -> Result<Self, MetadataError> {
        Self::from_ron_str(BUILTIN_TABLE)
    }

    /// Load a table from a RON file on disk.
    pub fn from_ron(path: &Path) -> Result<Self, MetadataError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    pub fn from_ron_str(ron_str: &str) -> Result<Self, MetadataError> {
        let manifest: MetadataManifest = ron::from_str(ron_str)?;

        let mut blocks = vec![None; BLOCK_ID_LIMIT];
        let mut name_to_id = FxHashMap::default();
        for entry in manifest.blocks {
            let slot = blocks
                .get_mut(usize::from(entry.id))
                .ok_or(MetadataError::IdOutOfRange {
                    kind: "block",
                    id: entry.id,
                })?;
            if name_to_id.insert(entry.name.clone(), entry.id).is_some() {
                return Err(MetadataError::DuplicateName(entry.name));
            }
            *slot = Some(BlockInfo {
                name: entry.name,
                color: entry.color,
                variants: entry.variants,
            });
        }

        let mut biomes = vec![None; BIOME_ID_LIMIT];
        for entry in manifest.biomes {
            let slot = biomes
                .get_mut(usize::from(entry.id))
                .ok_or(MetadataError::IdOutOfRange {
                    kind: "biome",
                    id: entry.id,
                })?;
            *slot = Some(BiomeInfo {
                name: entry.name,
                color: entry.color,
            });
        }

        tracing::debug!(
            blocks = name_to_id.len(),
            biomes = biomes.iter().flatten().count(),
            "Loaded block metadata"
        );
        Ok(Self {
            blocks,
            biomes,
            name_to_id,
        })
    }

    pub fn block(&self, id: u16) -> Option<&BlockInfo> {
        self.blocks.get(usize::from(id))?.as_ref()
    }

    /// Block name, or `"(unknown)"`.
    pub fn block_name(&self, id: u16) -> &str {
        self.block(id).map_or("(unknown)", |b| b.name.as_str())
    }

    /// Id of a block by name, with or without the namespace prefix.
    pub fn block_id(&self, name: &str) -> Option<u16> {
        let bare = name.strip_prefix(NAME_NAMESPACE).unwrap_or(name);
        self.name_to_id.get(bare).copied()
    }

    pub fn block_color(&self, id: u16, data: u8) -> BlockColor {
        let Some(block) = self.block(id) else {
            return BlockColor::Unknown;
        };
        if block.variants.is_empty() {
            return block.color.map_or(BlockColor::NoColor, BlockColor::Block);
        }
        match block.variants.iter().find(|v| v.data == data) {
            Some(variant) => BlockColor::Variant(variant.color),
            None => block
                .color
                .map_or(BlockColor::NoColor, BlockColor::UnmatchedVariant),
        }
    }

    pub fn biome(&self, id: u8) -> Option<&BiomeInfo> {
        self.biomes.get(usize::from(id))?.as_ref()
    }

    pub fn biome_color(&self, id: u8) -> Option<Rgb> {
        self.biome(id).map(|b| b.color)
    }

    /// Ids of known blocks that have no color assigned.
    pub fn blocks_without_color(&self) -> impl Iterator<Item = u16> + '_ {
        self.blocks.iter().enumerate().filter_map(|(id, b)| match b {
            Some(info) if info.color.is_none() => Some(id as u16),
            _ => None,
        })
    }
}

impl BlockResolver for MetadataTables {
    fn resolve(&self, name: &str, val: i16) -> Option<(u16, u8)> {
        let id = self.block_id(name)?;
        Some((id, (val & 0x0f) as u8))
    }
}
