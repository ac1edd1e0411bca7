//! Top-down projections and raster output for voxel world dimensions.
//!
//! A [`DimensionAccumulator`] folds decoded chunk records into per-chunk 2D
//! projections; a [`Rasterizer`] turns a populated accumulator into composite
//! and per-layer PNG images, streaming 16 rows at a time.

pub mod diagnostics;
pub mod dimension;
pub mod error;
pub mod metadata;
pub mod palette;
pub mod raster;

pub use diagnostics::Diagnostics;
pub use dimension::{
    BlockFlags, ChunkBounds, ChunkProjection, DimensionAccumulator, PointOfInterest,
};
pub use error::{MetadataError, RenderError};
pub use metadata::{
    BiomeInfo, BlockColor, BlockInfo, INVALID_BLOCK_COLOR, MetadataTables, UNKNOWN_BIOME_COLOR,
    UNKNOWN_BLOCK_COLOR, VariantInfo,
};
pub use palette::{DEFAULT_COLOR, HeightPalette, Rgb, hsl_to_rgb, rgb_bytes};
pub use raster::{
    BandSink, GRID_COLOR, HEIGHT_ALPHA_OFFSET, ORIGIN_COLOR, PngBandWriter, Rasterizer,
    RenderMode, SLIME_COLOR,
};
