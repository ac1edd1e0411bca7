//! Configuration for voxmap runs.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line via clap. Every section tolerates missing and unknown fields
//! so older config files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, DimensionConfig, DimensionsConfig, HeightMode, ImageModes,
    MAX_SCHEMATIC_VOLUME, OutputConfig, RegionConfig, RenderConfig, ScanConfig, SchematicRegion,
    StoreConfig, WorldConfig,
};
pub use error::ConfigError;
