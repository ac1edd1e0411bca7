//! Command-line argument parsing for voxmap.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;
use crate::config::HeightMode;

const APP_NAME: &str = "voxmap";

/// voxmap command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "voxmap", about = "Render voxel world databases to maps")]
pub struct CliArgs {
    /// World directory (contains level.dat and db/).
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Render every composite image mode.
    #[arg(long)]
    pub all_images: bool,

    /// Render one image per height level.
    #[arg(long)]
    pub slices: bool,

    /// Use the precomputed height column instead of the top non-air block.
    #[arg(long)]
    pub height_column: bool,

    /// Highest block y to render (127..=255).
    #[arg(long)]
    pub max_height: Option<u16>,

    /// Paint chunk grid lines in every dimension.
    #[arg(long)]
    pub grid: bool,

    /// Stop each scan after this many records.
    #[arg(long)]
    pub short_run: Option<u64>,

    /// Export the point cloud and block report.
    #[arg(long)]
    pub blocks: bool,

    /// Only export blocks with this name.
    #[arg(long)]
    pub block_filter: Option<String>,

    /// Reference world used to diff the block export.
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Retry a failed store open with relaxed checks.
    #[arg(long)]
    pub repair: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Directory holding `config.ron`: `--config`, else the OS config dir.
    pub fn config_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.config {
            return dir.clone();
        }
        dirs::config_dir()
            .map(|base| base.join(APP_NAME))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref db) = args.db {
            self.world.path = db.clone();
        }
        if let Some(ref out) = args.out {
            self.output.dir = out.clone();
        }
        if args.all_images {
            self.render.modes = crate::ImageModes::all();
        }
        if args.slices {
            self.render.slices = true;
        }
        if args.height_column {
            self.render.height_mode = HeightMode::Column;
        }
        if let Some(h) = args.max_height {
            self.render.max_height = h;
        }
        if args.grid {
            self.dimensions.overworld.grid = true;
            self.dimensions.nether.grid = true;
            self.dimensions.the_end.grid = true;
        }
        if let Some(limit) = args.short_run {
            self.scan.record_limit = Some(limit);
        }
        if args.blocks {
            self.region.enabled = true;
        }
        if let Some(ref filter) = args.block_filter {
            self.region.block_filter = Some(filter.clone());
        }
        if let Some(ref reference) = args.reference {
            self.world.reference = Some(reference.clone());
        }
        if args.repair {
            self.store.repair = true;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
