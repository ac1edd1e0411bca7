//! Error types for world sessions and exports.

use std::path::PathBuf;

use voxmap_chunk::{NbtError, StoreError};
use voxmap_render::{MetadataError, RenderError};

/// Errors that abort a world run.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// `level.dat` is missing or cannot be parsed.
    #[error("failed to read level file {path}: {reason}")]
    LevelFile { path: PathBuf, reason: String },

    /// A schematic box cannot be exported.
    #[error("schematic '{name}': {reason}")]
    Schematic { name: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("block table: {0}")]
    Metadata(#[from] MetadataError),

    #[error("NBT error: {0}")]
    Nbt(#[from] NbtError),

    #[error("schematic NBT error: {0}")]
    SchematicNbt(#[from] quartz_nbt::io::NbtIoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
