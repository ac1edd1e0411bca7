//! Error types for record classification, chunk decoding, NBT and stores.

use crate::coords::ChunkPos;

/// Errors from decoding a chunk payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload is shorter than the format requires.
    #[error("payload truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// The subchunk version byte is not one we can decode.
    #[error("unsupported subchunk version: {0}")]
    UnsupportedVersion(u8),
    /// The storage header names a bit width that is not packed on disk.
    #[error("invalid bits per block: {0}")]
    BadBitsPerBlock(u8),
    /// Palette storages flagged as runtime ids only appear on the network.
    #[error("runtime palette ids are not stored on disk")]
    RuntimePalette,
    /// A packed index points past the end of the palette.
    #[error("palette index {index} out of range (palette has {len} entries)")]
    PaletteIndexOutOfRange { index: u16, len: usize },
    /// The palette size field is negative or implausible.
    #[error("invalid palette size: {0}")]
    BadPaletteSize(i32),
    /// A palette entry could not be read.
    #[error("palette entry: {0}")]
    Nbt(#[from] NbtError),
}

/// Errors from classifying a store key.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// The key carries the sentinel coordinates the game writes for corrupt chunks.
    #[error("corrupt chunk coordinates {0}")]
    CorruptCoordinates(ChunkPos),
    /// The key names a dimension id we do not know.
    #[error("unknown dimension id {0:#x}")]
    UnknownDimension(i32),
}

/// Errors from reading or writing NBT.
#[derive(Debug, thiserror::Error)]
pub enum NbtError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown tag type: {0}")]
    UnknownTag(u8),
    #[error("negative length: {0}")]
    NegativeLength(i32),
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
    #[error("root tag is not a compound")]
    RootNotCompound,
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,
}

/// Errors from a chunk store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be opened.
    #[error("failed to open store at {path}: {reason}")]
    Open { path: String, reason: String },
    /// A read or iteration failed.
    #[error("store read failed: {0}")]
    Read(String),
}
