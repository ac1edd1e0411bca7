//! Composite and per-layer image rendering from accumulated dimensions.
//!
//! Images are produced one chunk row (16 pixel rows) at a time so memory
//! stays proportional to the image width, whatever the world size.

mod sink;
mod slices;

pub use sink::{BandSink, PngBandWriter};

use std::path::Path;

use voxmap_chunk::{AIR, BLOCK_ID_LIMIT, CHUNK_WIDTH, ChunkPos, DimensionId, UNRESOLVED_BLOCK};
use voxmap_config::{HeightMode, ImageModes};

use crate::diagnostics::Diagnostics;
use crate::dimension::{ChunkBounds, ChunkProjection, DimensionAccumulator};
use crate::error::RenderError;
use crate::metadata::{
    BlockColor, INVALID_BLOCK_COLOR, MetadataTables, UNKNOWN_BIOME_COLOR, UNKNOWN_BLOCK_COLOR,
};
use crate::palette::{HeightPalette, Rgb, rgb_bytes};

/// Chunk grid line color.
pub const GRID_COLOR: Rgb = 0xc1_ff_c4;
/// Color of world origin when grid lines are drawn in the overworld.
pub const ORIGIN_COLOR: Rgb = 0xeb_33_33;
/// Slime chunks in the slime overlay.
pub const SLIME_COLOR: Rgb = 0x4f_d6_4f;

/// Offset added to the maximum height in the height-alpha falloff.
///
/// Raising it keeps low terrain more transparent.
pub const HEIGHT_ALPHA_OFFSET: u32 = 32;
const HEIGHT_ALPHA_CEILING: u8 = 235;

/// Chunk rows between progress log lines.
const PROGRESS_ROWS: usize = 20;

// ---------------------------------------------------------------------------
// RenderMode
// ---------------------------------------------------------------------------

/// One composite image per mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Terrain,
    Biome,
    Grass,
    HeightCol,
    HeightColGrayscale,
    HeightColAlpha,
    BlockLight,
    SkyLight,
    Slime,
}

impl RenderMode {
    pub const ALL: [RenderMode; 9] = [
        Self::Terrain,
        Self::Biome,
        Self::Grass,
        Self::HeightCol,
        Self::HeightColGrayscale,
        Self::HeightColAlpha,
        Self::BlockLight,
        Self::SkyLight,
        Self::Slime,
    ];

    /// File name fragment for this mode.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Terrain => "terrain",
            Self::Biome => "biome",
            Self::Grass => "grass",
            Self::HeightCol => "height_col",
            Self::HeightColGrayscale => "height_col_grayscale",
            Self::HeightColAlpha => "height_col_alpha",
            Self::BlockLight => "block_light",
            Self::SkyLight => "sky_light",
            Self::Slime => "slime",
        }
    }

    /// Whether the image carries an alpha channel.
    pub fn is_rgba(self) -> bool {
        self == Self::HeightColAlpha
    }

    fn is_enabled(self, modes: &ImageModes) -> bool {
        match self {
            Self::Terrain => modes.terrain,
            Self::Biome => modes.biome,
            Self::Grass => modes.grass,
            Self::HeightCol => modes.height_col,
            Self::HeightColGrayscale => modes.height_col_grayscale,
            Self::HeightColAlpha => modes.height_col_alpha,
            Self::BlockLight => modes.block_light,
            Self::SkyLight => modes.sky_light,
            Self::Slime => modes.slime,
        }
    }

    /// Modes switched on in the config, in a stable order.
    pub fn enabled(modes: &ImageModes) -> Vec<RenderMode> {
        Self::ALL
            .into_iter()
            .filter(|m| m.is_enabled(modes))
            .collect()
    }
}

/// Quadratic falloff from opaque at the bottom to transparent at the top.
fn height_alpha_table(max_height: u16) -> [u8; 256] {
    let max = f64::from(max_height.max(1));
    let top = max + 1.0 + f64::from(HEIGHT_ALPHA_OFFSET);
    let mut table = [0u8; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let t = top - i as f64;
        let v = (t * t) / (max * max) * 255.0;
        *slot = v.clamp(0.0, f64::from(HEIGHT_ALPHA_CEILING)) as u8;
    }
    table
}

fn gray(level: u8) -> Rgb {
    let l = u32::from(level);
    (l << 16) | (l << 8) | l
}

fn darken(color: Rgb) -> Rgb {
    (color >> 1) & 0x7f_7f_7f
}

/// Checks that an image of the given bounds fits the encoder.
fn image_size(dimension: DimensionId, bounds: &ChunkBounds) -> Result<(u32, u32), RenderError> {
    if !bounds.is_valid() {
        return Err(RenderError::EmptyDimension(dimension));
    }
    match (
        u32::try_from(bounds.image_width()),
        u32::try_from(bounds.image_height()),
    ) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(RenderError::ImageTooLarge {
            width: bounds.width_chunks(),
            height: bounds.height_chunks(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Rasterizer
// ---------------------------------------------------------------------------

/// Renders images for populated dimensions.
///
/// Holds only read-only lookup state, so one instance can serve several
/// dimensions on separate threads.
pub struct Rasterizer<'a> {
    tables: &'a MetadataTables,
    palette: HeightPalette,
    alpha: [u8; 256],
    height_mode: HeightMode,
}

impl<'a> Rasterizer<'a> {
    pub fn new(tables: &'a MetadataTables, max_height: u16, height_mode: HeightMode) -> Self {
        Self {
            tables,
            palette: HeightPalette::new(max_height),
            alpha: height_alpha_table(max_height),
            height_mode,
        }
    }

    pub fn tables(&self) -> &MetadataTables {
        self.tables
    }

    fn height_of(&self, p: &ChunkProjection, cx: usize, cz: usize) -> u8 {
        match self.height_mode {
            HeightMode::Top => p.top_y[cx][cz],
            HeightMode::Column => p.height_col[cx][cz],
        }
    }

    /// Color of one block, tallying lookups that fall back to fixed colors.
    fn block_rgb(&self, id: u16, data: u8, diag: &mut Diagnostics) -> Rgb {
        if id == UNRESOLVED_BLOCK {
            return UNKNOWN_BLOCK_COLOR;
        }
        if usize::from(id) >= BLOCK_ID_LIMIT {
            diag.record_invalid_block(id);
            return INVALID_BLOCK_COLOR;
        }
        let color = self.tables.block_color(id, data);
        match color {
            BlockColor::UnmatchedVariant(_) => diag.record_unmatched_variant(id, data),
            BlockColor::NoColor => diag.record_needs_color(id),
            BlockColor::Unknown => diag.record_unknown_block(id),
            BlockColor::Block(_) | BlockColor::Variant(_) => {}
        }
        color.rgb()
    }

    fn terrain_rgb(&self, p: &ChunkProjection, cx: usize, cz: usize, diag: &mut Diagnostics) -> Rgb {
        let id = p.top_block[cx][cz];
        if id == AIR {
            return 0;
        }
        self.block_rgb(id, p.top_data[cx][cz], diag)
    }

    /// Color of one column. Alpha mode puts its value in the low byte.
    fn column_rgb(
        &self,
        mode: RenderMode,
        p: &ChunkProjection,
        slime: bool,
        cx: usize,
        cz: usize,
        diag: &mut Diagnostics,
    ) -> Rgb {
        match mode {
            RenderMode::Terrain => self.terrain_rgb(p, cx, cz, diag),
            RenderMode::Biome => {
                let biome = (p.grass_and_biome[cx][cz] & 0xff) as u8;
                self.tables.biome_color(biome).unwrap_or_else(|| {
                    diag.record_unknown_biome(biome);
                    UNKNOWN_BIOME_COLOR
                })
            }
            RenderMode::Grass => p.grass_and_biome[cx][cz] >> 8,
            RenderMode::HeightCol => self.palette.color(self.height_of(p, cx, cz)),
            RenderMode::HeightColGrayscale => {
                let h = u32::from(self.height_of(p, cx, cz));
                let max = u32::from(self.palette.max_height().max(1));
                gray((h * 255 / max).min(255) as u8)
            }
            RenderMode::HeightColAlpha => {
                u32::from(self.alpha[usize::from(self.height_of(p, cx, cz))])
            }
            RenderMode::BlockLight => gray((p.top_light[cx][cz] & 0x0f) << 4),
            RenderMode::SkyLight => gray(p.top_light[cx][cz] & 0xf0),
            RenderMode::Slime => {
                if slime {
                    SLIME_COLOR
                } else {
                    darken(self.terrain_rgb(p, cx, cz, diag))
                }
            }
        }
    }

    /// Renders one composite image into `sink`.
    ///
    /// Chunks never seen are left black (transparent in alpha mode).
    pub fn render_composite(
        &self,
        acc: &DimensionAccumulator,
        mode: RenderMode,
        grid: bool,
        sink: &mut dyn BandSink,
    ) -> Result<Diagnostics, RenderError> {
        let bounds = acc.chunk_bounds();
        let (width, _) = image_size(acc.dimension(), &bounds)?;
        let bpp = if mode.is_rgba() { 4 } else { 3 };
        let row_bytes = width as usize * bpp;
        let rows = bounds.height_chunks() as usize;
        let mut diag = Diagnostics::default();
        let mut band = vec![0u8; row_bytes * CHUNK_WIDTH];

        for (row, chunk_z) in (bounds.min_z..=bounds.max_z).enumerate() {
            band.fill(0);
            for chunk_x in bounds.min_x..=bounds.max_x {
                let pos = ChunkPos::new(chunk_x, chunk_z);
                let Some(p) = acc.chunk(pos) else {
                    continue;
                };
                let slime = mode == RenderMode::Slime && acc.is_slime_chunk(pos);
                let x0 = (i64::from(chunk_x) - i64::from(bounds.min_x)) as usize * CHUNK_WIDTH;
                for cz in 0..CHUNK_WIDTH {
                    for cx in 0..CHUNK_WIDTH {
                        let mut color = self.column_rgb(mode, p, slime, cx, cz, &mut diag);
                        let mut alpha = 0xff;
                        if mode.is_rgba() {
                            alpha = color as u8;
                            color = 0;
                        }
                        if grid && (cx == 0 || cz == 0) {
                            let origin = acc.dimension() == DimensionId::Overworld
                                && pos == ChunkPos::new(0, 0)
                                && cx == 0
                                && cz == 0;
                            color = if origin { ORIGIN_COLOR } else { GRID_COLOR };
                            alpha = 0xff;
                        }
                        let at = cz * row_bytes + (x0 + cx) * bpp;
                        band[at..at + 3].copy_from_slice(&rgb_bytes(color));
                        if bpp == 4 {
                            band[at + 3] = alpha;
                        }
                    }
                }
            }
            sink.write_band(&band)?;
            if row % PROGRESS_ROWS == 0 {
                tracing::info!(
                    dimension = %acc.dimension(),
                    mode = mode.tag(),
                    "Rendered chunk row {row}/{rows}"
                );
            }
        }

        if mode == RenderMode::Terrain {
            for id in diag.needs_color.keys() {
                tracing::warn!(id, name = self.tables.block_name(*id), "Need pixel color");
            }
        }
        Ok(diag)
    }

    /// Renders a composite image straight into a PNG file.
    ///
    /// A failed render removes the partial file.
    pub fn render_composite_png(
        &self,
        acc: &DimensionAccumulator,
        mode: RenderMode,
        grid: bool,
        path: &Path,
    ) -> Result<Diagnostics, RenderError> {
        let result = self.write_composite_png(acc, mode, grid, path);
        if result.is_err() {
            let _ = std::fs::remove_file(path);
        }
        result
    }

    fn write_composite_png(
        &self,
        acc: &DimensionAccumulator,
        mode: RenderMode,
        grid: bool,
        path: &Path,
    ) -> Result<Diagnostics, RenderError> {
        let (width, height) = image_size(acc.dimension(), &acc.chunk_bounds())?;
        let mut writer = PngBandWriter::create(path, width, height, mode.is_rgba())?;
        let diag = self.render_composite(acc, mode, grid, &mut writer)?;
        writer.finish()?;
        tracing::info!(path = %path.display(), width, height, "Wrote {} image", mode.tag());
        Ok(diag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::BlockFlags;
    use voxmap_chunk::{BlockResolver, ChunkFormat, decode::CUBIC_LEN_WITH_LIGHT};

    struct NoNames;

    impl BlockResolver for NoNames {
        fn resolve(&self, _name: &str, _val: i16) -> Option<(u16, u8)> {
            None
        }
    }

    fn subchunk_with(cx: usize, cz: usize, cy: usize, id: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; CUBIC_LEN_WITH_LIGHT];
        bytes[1 + (cx * 16 + cz) * 16 + cy] = id;
        bytes
    }

    fn populated(dimension: DimensionId, chunks: &[(i32, i32, u8)]) -> DimensionAccumulator {
        let mut acc = DimensionAccumulator::new(dimension, 127, BlockFlags::default());
        let mut diag = Diagnostics::default();
        for &(x, z, id) in chunks {
            let pos = ChunkPos::new(x, z);
            acc.add_to_chunk_bounds(pos);
            let bytes = subchunk_with(0, 0, 3, id);
            acc.add_chunk_block_data(ChunkFormat::CubicByte, pos, 4, &bytes, &NoNames, &mut diag)
                .unwrap();
        }
        acc
    }

    fn pixel(buf: &[u8], width: usize, x: usize, y: usize) -> [u8; 3] {
        let at = (y * width + x) * 3;
        [buf[at], buf[at + 1], buf[at + 2]]
    }

    #[test]
    fn test_alpha_table_clamps() {
        let table = height_alpha_table(127);
        assert_eq!(table[0], HEIGHT_ALPHA_CEILING);
        // (160 - 127)^2 / 127^2 * 255
        assert_eq!(table[127], 17);
        assert!(table.windows(2).take(128).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_enabled_modes_follow_config() {
        let mut modes = ImageModes::default();
        assert_eq!(RenderMode::enabled(&modes), vec![RenderMode::Terrain]);
        modes.slime = true;
        modes.height_col_alpha = true;
        assert_eq!(
            RenderMode::enabled(&modes),
            vec![
                RenderMode::Terrain,
                RenderMode::HeightColAlpha,
                RenderMode::Slime
            ]
        );
        assert_eq!(RenderMode::enabled(&ImageModes::all()).len(), 9);
    }

    #[test]
    fn test_terrain_composite_colors_and_background() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let acc = populated(DimensionId::Overworld, &[(0, 0, 1), (1, 1, 12)]);
        let mut out = Vec::new();
        let diag = raster
            .render_composite(&acc, RenderMode::Terrain, false, &mut out)
            .unwrap();
        assert!(diag.is_clean());
        assert_eq!(out.len(), 32 * 32 * 3);

        let stone = rgb_bytes(tables.block_color(1, 0).rgb());
        let sand = rgb_bytes(tables.block_color(12, 0).rgb());
        assert_eq!(pixel(&out, 32, 0, 0), stone);
        assert_eq!(pixel(&out, 32, 16, 16), sand);
        // Empty columns and missing chunks stay black.
        assert_eq!(pixel(&out, 32, 5, 5), [0, 0, 0]);
        assert_eq!(pixel(&out, 32, 20, 3), [0, 0, 0]);
    }

    #[test]
    fn test_grid_and_origin_overlay() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let acc = populated(DimensionId::Overworld, &[(-1, 0, 1), (0, 0, 1)]);
        let mut out = Vec::new();
        raster
            .render_composite(&acc, RenderMode::Terrain, true, &mut out)
            .unwrap();
        assert_eq!(pixel(&out, 32, 16, 0), rgb_bytes(ORIGIN_COLOR));
        assert_eq!(pixel(&out, 32, 0, 0), rgb_bytes(GRID_COLOR));
        assert_eq!(pixel(&out, 32, 20, 0), rgb_bytes(GRID_COLOR));
        assert_eq!(pixel(&out, 32, 16, 7), rgb_bytes(GRID_COLOR));
        assert_eq!(pixel(&out, 32, 17, 1), [0, 0, 0]);

        // No origin marker outside the overworld.
        let nether = populated(DimensionId::Nether, &[(0, 0, 87)]);
        let mut out = Vec::new();
        raster
            .render_composite(&nether, RenderMode::Terrain, true, &mut out)
            .unwrap();
        assert_eq!(pixel(&out, 16, 0, 0), rgb_bytes(GRID_COLOR));
    }

    #[test]
    fn test_out_of_range_id_uses_invalid_color() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let mut diag = Diagnostics::default();

        let invalid = raster.block_rgb(BLOCK_ID_LIMIT as u16, 0, &mut diag);
        assert_eq!(invalid, INVALID_BLOCK_COLOR);
        assert_eq!(diag.invalid_block_ids[&(BLOCK_ID_LIMIT as u16)], 1);
        assert!(diag.unknown_block_ids.is_empty());

        let unknown = raster.block_rgb(200, 0, &mut diag);
        assert_eq!(unknown, UNKNOWN_BLOCK_COLOR);
        assert_ne!(INVALID_BLOCK_COLOR, UNKNOWN_BLOCK_COLOR);
        assert_eq!(diag.unknown_block_ids[&200], 1);
        assert_eq!(diag.invalid_block_ids.len(), 1);
    }

    #[test]
    fn test_unknown_ids_use_sentinel_colors() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        // Id 200 has no table entry.
        let acc = populated(DimensionId::Overworld, &[(0, 0, 200)]);
        let mut out = Vec::new();
        let diag = raster
            .render_composite(&acc, RenderMode::Terrain, false, &mut out)
            .unwrap();
        assert_eq!(pixel(&out, 16, 0, 0), rgb_bytes(UNKNOWN_BLOCK_COLOR));
        assert_eq!(diag.unknown_block_ids[&200], 1);
        assert!(diag.invalid_block_ids.is_empty());

        // Biome words default to zero, which is ocean.
        let mut out = Vec::new();
        let diag = raster
            .render_composite(&acc, RenderMode::Biome, false, &mut out)
            .unwrap();
        assert_eq!(pixel(&out, 16, 0, 0), rgb_bytes(tables.biome_color(0).unwrap()));
        assert!(diag.unknown_biomes.is_empty());
    }

    #[test]
    fn test_height_modes() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let acc = populated(DimensionId::Overworld, &[(0, 0, 1)]);

        let mut out = Vec::new();
        raster
            .render_composite(&acc, RenderMode::HeightCol, false, &mut out)
            .unwrap();
        assert_eq!(pixel(&out, 16, 0, 0), rgb_bytes(HeightPalette::new(127).color(67)));

        let mut out = Vec::new();
        raster
            .render_composite(&acc, RenderMode::HeightColGrayscale, false, &mut out)
            .unwrap();
        let level = (67 * 255 / 127) as u8;
        assert_eq!(pixel(&out, 16, 0, 0), [level; 3]);

        let mut out = Vec::new();
        raster
            .render_composite(&acc, RenderMode::HeightColAlpha, false, &mut out)
            .unwrap();
        assert_eq!(out.len(), 16 * 16 * 4);
        assert_eq!(&out[..4], &[0, 0, 0, height_alpha_table(127)[67]]);
    }

    #[test]
    fn test_slime_overlay() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        // (-1, 0) is a slime chunk, (0, 0) is not.
        let acc = populated(DimensionId::Overworld, &[(-1, 0, 1), (0, 0, 1)]);
        let mut out = Vec::new();
        raster
            .render_composite(&acc, RenderMode::Slime, false, &mut out)
            .unwrap();
        assert_eq!(pixel(&out, 32, 3, 3), rgb_bytes(SLIME_COLOR));
        let stone = tables.block_color(1, 0).rgb();
        assert_eq!(pixel(&out, 32, 16, 0), rgb_bytes(darken(stone)));
    }

    #[test]
    fn test_empty_dimension_is_an_error() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let acc = DimensionAccumulator::new(DimensionId::TheEnd, 127, BlockFlags::default());
        let mut out = Vec::new();
        assert!(matches!(
            raster.render_composite(&acc, RenderMode::Terrain, false, &mut out),
            Err(RenderError::EmptyDimension(DimensionId::TheEnd))
        ));
    }

    #[test]
    fn test_png_output() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let acc = populated(DimensionId::Overworld, &[(0, 0, 1), (2, 0, 1)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.png");
        raster
            .render_composite_png(&acc, RenderMode::Terrain, false, &path)
            .unwrap();
        let decoder = png::Decoder::new(std::fs::File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 48);
        assert_eq!(reader.info().height, 16);
    }
}
