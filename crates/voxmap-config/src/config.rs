//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Input world settings.
    pub world: WorldConfig,
    /// Output location settings.
    pub output: OutputConfig,
    /// Raster output settings.
    pub render: RenderConfig,
    /// Per-dimension block lists and overlays.
    pub dimensions: DimensionsConfig,
    /// Point-cloud / block-list export settings.
    pub region: RegionConfig,
    /// Record scan settings.
    pub scan: ScanConfig,
    /// Key-value store tuning.
    pub store: StoreConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Input world configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World directory (contains `level.dat` and `db/`).
    pub path: PathBuf,
    /// Optional reference ("empty") world used to diff region exports.
    pub reference: Option<PathBuf>,
    /// Optional RON file replacing the built-in block/biome tables.
    pub metadata_table: Option<PathBuf>,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving images, point clouds and reports.
    pub dir: PathBuf,
    /// Write `voxmap.summary.txt` with run diagnostics.
    pub summary: bool,
}

/// Source used by height-based render modes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum HeightMode {
    /// Height of the highest non-air block found in the block data.
    #[default]
    Top,
    /// Precomputed height-column value stored alongside the chunk.
    Column,
}

/// Composite image enable flags, one per render mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageModes {
    pub terrain: bool,
    pub biome: bool,
    pub grass: bool,
    pub height_col: bool,
    pub height_col_grayscale: bool,
    pub height_col_alpha: bool,
    pub block_light: bool,
    pub sky_light: bool,
    /// Slime-chunk overlay (overworld only).
    pub slime: bool,
}

/// Raster output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Which composite images to produce.
    pub modes: ImageModes,
    /// Produce one image per height level.
    pub slices: bool,
    /// Height source for height-based modes.
    pub height_mode: HeightMode,
    /// Highest block y rendered (127 for legacy worlds, up to 255).
    pub max_height: u16,
    /// Render independent dimensions on separate threads.
    pub parallel_dimensions: bool,
}

/// Per-dimension overlay and block-list settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DimensionConfig {
    /// Paint chunk grid lines on composite images.
    pub grid: bool,
    /// Block ids ignored when locating the top block of a column.
    pub hide_top: Vec<u16>,
    /// Block ids that always become the top block when present in a column.
    pub force_top: Vec<u16>,
    /// Block ids exported as GeoJSON points.
    pub geojson: Vec<u16>,
}

/// Settings for every known dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DimensionsConfig {
    pub overworld: DimensionConfig,
    pub nether: DimensionConfig,
    pub the_end: DimensionConfig,
}

impl DimensionsConfig {
    /// Returns the settings for a numeric dimension id (0, 1, 2).
    pub fn by_id(&self, id: u8) -> Option<&DimensionConfig> {
        match id {
            0 => Some(&self.overworld),
            1 => Some(&self.nether),
            2 => Some(&self.the_end),
            _ => None,
        }
    }
}

/// Largest block count a schematic box may cover.
pub const MAX_SCHEMATIC_VOLUME: u64 = 1 << 26;

/// A user-defined box exported as a schematic file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchematicRegion {
    /// File name fragment: `voxmap.schematic.<name>.nbt`.
    pub name: String,
    /// Numeric dimension id.
    pub dimension: u8,
    /// Inclusive minimum world corner (x, y, z).
    pub min: (i32, i32, i32),
    /// Inclusive maximum world corner (x, y, z).
    pub max: (i32, i32, i32),
}

impl SchematicRegion {
    /// Block count of the box with its corners in either order, or `None`
    /// when it does not fit a `u64`.
    pub fn volume(&self) -> Option<u64> {
        let side = |a: i32, b: i32| (i64::from(a) - i64::from(b)).unsigned_abs() + 1;
        side(self.min.0, self.max.0)
            .checked_mul(side(self.min.1, self.max.1))?
            .checked_mul(side(self.min.2, self.max.2))
    }
}

/// Point-cloud / block-list export configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    /// Produce the point cloud and block report.
    pub enabled: bool,
    /// Dimension to export.
    pub dimension: u8,
    pub min_x: Option<i32>,
    pub max_x: Option<i32>,
    pub min_y: Option<i32>,
    pub max_y: Option<i32>,
    pub min_z: Option<i32>,
    pub max_z: Option<i32>,
    /// Only blocks with this name are emitted (`None` = all).
    pub block_filter: Option<String>,
    /// Ids seen at most this many times keep every coordinate.
    pub rare_threshold: u64,
    /// Maximum number of blocks listed individually in the report.
    pub max_listed: u32,
    /// Schematic boxes to extract.
    pub schematics: Vec<SchematicRegion>,
}

/// Record scan configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Stop every scan after this many records ("short run").
    pub record_limit: Option<u64>,
}

/// Key-value store tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Store block size in bytes.
    pub block_size: usize,
    /// Bloom filter bits per key (0 = no filter).
    pub bloom_filter_bits: u32,
    /// Retry a failed open with relaxed consistency checks.
    pub repair: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write JSON logs into the output directory.
    pub file_logging: bool,
    /// Dump key/value hex for every auxiliary chunk record.
    pub verbose_records: bool,
}

// --- Default implementations ---

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("voxmap-out"),
            summary: true,
        }
    }
}

impl Default for ImageModes {
    fn default() -> Self {
        Self {
            terrain: true,
            biome: false,
            grass: false,
            height_col: false,
            height_col_grayscale: false,
            height_col_alpha: false,
            block_light: false,
            sky_light: false,
            slime: false,
        }
    }
}

impl ImageModes {
    /// Enables every composite mode.
    pub fn all() -> Self {
        Self {
            terrain: true,
            biome: true,
            grass: true,
            height_col: true,
            height_col_grayscale: true,
            height_col_alpha: true,
            block_light: true,
            sky_light: true,
            slime: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            modes: ImageModes::default(),
            slices: false,
            height_mode: HeightMode::Top,
            max_height: 127,
            parallel_dimensions: false,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dimension: 0,
            min_x: None,
            max_x: None,
            min_y: None,
            max_y: None,
            min_z: None,
            max_z: None,
            block_filter: None,
            rare_threshold: 10,
            max_listed: 1000,
            schematics: Vec::new(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            block_size: 4096,
            bloom_filter_bits: 10,
            repair: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logging: false,
            verbose_records: false,
        }
    }
}

// --- Load / Save / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(127..=255).contains(&self.render.max_height) {
            return Err(ConfigError::Invalid(format!(
                "render.max_height must be within 127..=255, got {}",
                self.render.max_height
            )));
        }
        let dims = [
            &self.dimensions.overworld,
            &self.dimensions.nether,
            &self.dimensions.the_end,
        ];
        for dim in dims {
            let lists = [&dim.hide_top, &dim.force_top, &dim.geojson];
            if let Some(id) = lists.iter().flat_map(|l| l.iter()).find(|&&id| id >= 1024) {
                return Err(ConfigError::Invalid(format!(
                    "block id {id} in a dimension block list is outside 0..1024"
                )));
            }
        }
        if self.region.dimension > 2 {
            return Err(ConfigError::Invalid(format!(
                "region.dimension {} is not a known dimension",
                self.region.dimension
            )));
        }
        for region in &self.region.schematics {
            match region.volume() {
                Some(volume) if volume <= MAX_SCHEMATIC_VOLUME => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "schematic '{}' covers more than {MAX_SCHEMATIC_VOLUME} blocks",
                        region.name
                    )));
                }
            }
        }
        Ok(())
    }
}
