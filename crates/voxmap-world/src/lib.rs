//! World-level orchestration: opening a LevelDB world, driving the scan and
//! render passes, and writing region, schematic and GeoJSON exports.

pub mod error;
pub mod geojson;
pub mod level;
pub mod region;
pub mod schematic;
pub mod session;
pub mod store;

pub use error::WorldError;
pub use level::{LevelInfo, encode_level_dat, world_name};
pub use region::{ClipBox, ReferenceWorld, RegionExporter, RegionReport, RegionRequest};
pub use schematic::{build_schematic, export_schematic};
pub use session::{IMAGES_DIR, RenderReport, SUMMARY_FILE, ScanReport, WorldSession};
pub use store::LevelDbStore;
