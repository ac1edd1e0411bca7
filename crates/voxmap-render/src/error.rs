//! Error types for metadata loading and rendering.

use std::path::PathBuf;

use thiserror::Error;
use voxmap_chunk::{DecodeError, DimensionId, StoreError};

/// Errors returned while loading block/biome metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// I/O error reading the table file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// RON deserialization error.
    #[error("ron parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Id outside the table range.
    #[error("{kind} id {id} is out of range")]
    IdOutOfRange { kind: &'static str, id: u16 },

    /// Two blocks share a name.
    #[error("duplicate block name: {0}")]
    DuplicateName(String),
}

/// Errors that abort a render pass.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("png encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The dimension has no chunk bounds to size an image with.
    #[error("no chunks recorded for {0}")]
    EmptyDimension(DimensionId),

    /// Image dimensions exceed what the encoder accepts.
    #[error("image of {width}x{height} chunks is too large")]
    ImageTooLarge { width: u64, height: u64 },

    /// An image was closed before every row was written, or given extra rows.
    #[error("{path}: expected {expected} rows, got {written}")]
    RowCount {
        path: PathBuf,
        expected: u32,
        written: u64,
    },
}
