//! Point-cloud and block-report export for a box of world space.
//!
//! Every stored subchunk inside the box is re-read from the store. Blocks are
//! written to `<world>_<dim>_blocks.xyz` as `x, y, z, r, g, b` lines, and a
//! text report lists individual blocks, rare blocks and a per-id histogram.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use voxmap_chunk::{
    AIR, BLOCK_ID_LIMIT, CHUNK_WIDTH, ChunkPos, ChunkStore, RawChunk, SUBCHUNK_COUNT,
    SUBCHUNK_HEIGHT,
};
use voxmap_config::RegionConfig;
use voxmap_render::{
    ChunkBounds, DEFAULT_COLOR, Diagnostics, DimensionAccumulator, MetadataTables, RenderError,
    rgb_bytes,
};

use crate::error::WorldError;

/// Chunk rows between progress lines.
const PROGRESS_ROWS: usize = 20;

/// Inclusive box in world block coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipBox {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
    pub min_z: i64,
    pub max_z: i64,
}

impl ClipBox {
    /// The full extent of `bounds` from y 0 to `max_height`, narrowed by any
    /// limits set in `config`. Limits outside the extent are ignored.
    pub fn new(bounds: &ChunkBounds, max_height: u8, config: &RegionConfig) -> Self {
        let lower = |limit: Option<i32>, extent: i64| {
            limit.map_or(extent, |v| i64::from(v).max(extent))
        };
        let upper = |limit: Option<i32>, extent: i64| {
            limit.map_or(extent, |v| i64::from(v).min(extent))
        };
        let width = CHUNK_WIDTH as i64;
        Self {
            min_x: lower(config.min_x, i64::from(bounds.min_x) * width),
            max_x: upper(config.max_x, i64::from(bounds.max_x) * width + width - 1),
            min_y: lower(config.min_y, 0),
            max_y: upper(config.max_y, i64::from(max_height)),
            min_z: lower(config.min_z, i64::from(bounds.min_z) * width),
            max_z: upper(config.max_z, i64::from(bounds.max_z) * width + width - 1),
        }
    }

    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        (self.min_x..=self.max_x).contains(&x)
            && (self.min_y..=self.max_y).contains(&y)
            && (self.min_z..=self.max_z).contains(&z)
    }
}

/// A second world whose blocks are subtracted from the export.
pub struct ReferenceWorld<'a> {
    pub name: String,
    pub store: &'a mut dyn ChunkStore,
}

/// Parameters of one export.
pub struct RegionRequest<'a> {
    pub clip: ClipBox,
    /// Only blocks with this name are written (`None` writes all).
    pub block_filter: Option<String>,
    /// Ids seen at most this many times keep every coordinate.
    pub rare_threshold: u64,
    /// Blocks listed individually in the report.
    pub max_listed: u32,
    pub reference: Option<ReferenceWorld<'a>>,
}

impl<'a> RegionRequest<'a> {
    pub fn from_config(clip: ClipBox, config: &RegionConfig) -> Self {
        Self {
            clip,
            block_filter: config.block_filter.clone(),
            rare_threshold: config.rare_threshold,
            max_listed: config.max_listed,
            reference: None,
        }
    }
}

/// Totals of one export.
#[derive(Debug)]
pub struct RegionReport {
    /// Per-id block counts inside the box, filtered or not.
    pub histogram: Vec<u64>,
    pub points_written: u64,
    pub listed: u32,
    /// Stored subchunks visited in the primary world.
    pub subchunks_found: u64,
    /// Of those, subchunks also present in the reference world.
    pub subchunks_compared: u64,
    pub diagnostics: Diagnostics,
}

impl RegionReport {
    fn new() -> Self {
        Self {
            histogram: vec![0; BLOCK_ID_LIMIT],
            points_written: 0,
            listed: 0,
            subchunks_found: 0,
            subchunks_compared: 0,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn total_blocks(&self) -> u64 {
        self.histogram.iter().sum()
    }
}

pub struct RegionExporter<'a> {
    tables: &'a MetadataTables,
    world_name: &'a str,
}

impl<'a> RegionExporter<'a> {
    pub fn new(tables: &'a MetadataTables, world_name: &'a str) -> Self {
        Self { tables, world_name }
    }

    /// Output paths of the point cloud and the report.
    pub fn output_paths(&self, acc: &DimensionAccumulator, out_dir: &Path) -> (PathBuf, PathBuf) {
        let stem = format!("{}_{}_blocks", self.world_name, acc.dimension());
        (
            out_dir.join(format!("{stem}.xyz")),
            out_dir.join(format!("{stem}.txt")),
        )
    }

    /// Writes both files into `out_dir`.
    pub fn export(
        &self,
        acc: &DimensionAccumulator,
        store: &mut dyn ChunkStore,
        request: &mut RegionRequest<'_>,
        out_dir: &Path,
    ) -> Result<RegionReport, WorldError> {
        let (xyz_path, txt_path) = self.output_paths(acc, out_dir);
        let mut xyz = BufWriter::new(File::create(&xyz_path)?);
        let mut txt = BufWriter::new(File::create(&txt_path)?);
        let report = self.write(acc, store, request, &mut xyz, &mut txt)?;
        xyz.flush()?;
        txt.flush()?;
        tracing::info!(
            dimension = %acc.dimension(),
            points = report.points_written,
            blocks = report.total_blocks(),
            "Wrote {} and {}",
            xyz_path.display(),
            txt_path.display()
        );
        Ok(report)
    }

    /// Streams the point cloud to `xyz` and the report to `txt`.
    pub fn write(
        &self,
        acc: &DimensionAccumulator,
        store: &mut dyn ChunkStore,
        request: &mut RegionRequest<'_>,
        xyz: &mut dyn Write,
        txt: &mut dyn Write,
    ) -> Result<RegionReport, WorldError> {
        let bounds = acc.chunk_bounds();
        if !bounds.is_valid() {
            return Err(RenderError::EmptyDimension(acc.dimension()).into());
        }
        let clip = request.clip;
        self.write_header(&bounds, request, txt)?;

        // Some(None) is a filter naming no known block: nothing matches.
        let filter = request.block_filter.as_deref().map(|name| {
            let id = self.tables.block_id(name);
            if id.is_none() {
                tracing::warn!(name, "Block filter names no known block");
            }
            id
        });

        let mut report = RegionReport::new();
        let mut rare: Vec<Vec<(i64, i64, i64)>> = vec![Vec::new(); BLOCK_ID_LIMIT];
        let chunk_span = |min: i64, max: i64| {
            let width = CHUNK_WIDTH as i64;
            (min.div_euclid(width) as i32)..=(max.div_euclid(width) as i32)
        };
        let rows = chunk_span(clip.min_z, clip.max_z).count();

        for (row, chunk_z) in chunk_span(clip.min_z, clip.max_z).enumerate() {
            if row % PROGRESS_ROWS == 0 {
                tracing::info!(dimension = %acc.dimension(), "Exporting chunk row {row}/{rows}");
            }
            for chunk_x in chunk_span(clip.min_x, clip.max_x) {
                let pos = ChunkPos::new(chunk_x, chunk_z);
                let Some(raw) = RawChunk::load(store, acc.dimension(), pos)? else {
                    continue;
                };
                let reference_raw = match request.reference.as_mut() {
                    Some(reference) => match RawChunk::load(reference.store, acc.dimension(), pos)? {
                        Some(raw) => Some(raw),
                        None => {
                            report.subchunks_found +=
                                (0..SUBCHUNK_COUNT).filter(|&i| raw.has_subchunk(i)).count() as u64;
                            continue;
                        }
                    },
                    None => None,
                };

                let diag = &mut report.diagnostics;
                let blocks = raw.decode(self.tables, &mut |index, e| {
                    tracing::warn!(%pos, ?index, "Exporting undecodable blocks as air: {e}");
                    diag.record_decode_error();
                });
                let reference_blocks = reference_raw
                    .as_ref()
                    .map(|raw| raw.decode(self.tables, &mut |_, _| {}));

                for slab in 0..SUBCHUNK_COUNT {
                    if !raw.has_subchunk(slab) {
                        continue;
                    }
                    report.subchunks_found += 1;
                    if let Some(reference) = &reference_raw {
                        if !reference.has_subchunk(slab) {
                            continue;
                        }
                        report.subchunks_compared += 1;
                    }

                    let base_y = usize::from(slab) * SUBCHUNK_HEIGHT;
                    for cx in 0..CHUNK_WIDTH {
                        for cz in 0..CHUNK_WIDTH {
                            for cy in 0..SUBCHUNK_HEIGHT {
                                let (x, z) = (
                                    i64::from(chunk_x) * CHUNK_WIDTH as i64 + cx as i64,
                                    i64::from(chunk_z) * CHUNK_WIDTH as i64 + cz as i64,
                                );
                                let y = (base_y + cy) as i64;
                                if !clip.contains(x, y, z) {
                                    continue;
                                }
                                let (id, data) = blocks.block(cx, cz, base_y + cy);
                                if usize::from(id) >= BLOCK_ID_LIMIT {
                                    report.diagnostics.record_invalid_block(id);
                                    continue;
                                }
                                let Some(info) = self.tables.block(id) else {
                                    report.diagnostics.record_unknown_block(id);
                                    continue;
                                };
                                if let Some(reference) = &reference_blocks
                                    && reference.block(cx, cz, base_y + cy) == (id, data)
                                {
                                    continue;
                                }

                                if filter.is_none_or(|wanted| wanted == Some(id)) {
                                    if id != AIR {
                                        let [r, g, b] = rgb_bytes(self.tables.block_color(id, data).rgb());
                                        writeln!(xyz, "{x}, {y}, {z}, {r}, {g}, {b}")?;
                                        report.points_written += 1;
                                    }
                                    if report.listed < request.max_listed {
                                        report.listed += 1;
                                        writeln!(txt, "blockid={id}, name='{}', ({x}, {y}, {z})", info.name)?;
                                    }
                                }

                                let count = &mut report.histogram[usize::from(id)];
                                *count += 1;
                                if *count <= request.rare_threshold {
                                    rare[usize::from(id)].push((x, y, z));
                                }
                            }
                        }
                    }
                }
            }
        }

        self.write_footer(&report, &rare, request.rare_threshold, txt)?;
        Ok(report)
    }

    fn write_header(
        &self,
        bounds: &ChunkBounds,
        request: &RegionRequest<'_>,
        txt: &mut dyn Write,
    ) -> std::io::Result<()> {
        let clip = &request.clip;
        writeln!(txt, "WORLD NAME: '{}'", self.world_name)?;
        if let Some(reference) = &request.reference {
            writeln!(txt, "COMPARISON WORLD (EMPTY): '{}'", reference.name)?;
        }
        writeln!(
            txt,
            "WORLD SIZE: [X:{} => {}, Z:{} => {}]",
            i64::from(bounds.min_x) * 16,
            i64::from(bounds.max_x) * 16 + 15,
            i64::from(bounds.min_z) * 16,
            i64::from(bounds.max_z) * 16 + 15
        )?;
        writeln!(
            txt,
            "WORLD FILTER: [X:{} => {}, Y:{} => {}, Z:{} => {}]",
            clip.min_x, clip.max_x, clip.min_y, clip.max_y, clip.min_z, clip.max_z
        )?;
        writeln!(
            txt,
            "WORLD BLOCKS FILTERED by name '{}'",
            request.block_filter.as_deref().unwrap_or("<all>")
        )
    }

    fn write_footer(
        &self,
        report: &RegionReport,
        rare: &[Vec<(i64, i64, i64)>],
        rare_threshold: u64,
        txt: &mut dyn Write,
    ) -> std::io::Result<()> {
        if report.subchunks_compared != 0 && report.subchunks_found != 0 {
            tracing::info!(
                "Found {}/{} comparison subchunks",
                report.subchunks_compared,
                report.subchunks_found
            );
            writeln!(
                txt,
                "WORLD COMPARE CHUNKS {}/{} = {:.1}%",
                report.subchunks_compared,
                report.subchunks_found,
                100.0 * report.subchunks_compared as f64 / report.subchunks_found as f64
            )?;
        }

        let mut by_count: Vec<u16> = (0..BLOCK_ID_LIMIT as u16).collect();
        by_count.sort_by_key(|&id| report.histogram[usize::from(id)]);

        writeln!(txt, "WORLD RARE BLOCKS (TOTAL less that {rare_threshold})")?;
        for &id in &by_count {
            if report.histogram[usize::from(id)] > rare_threshold {
                continue;
            }
            for (x, y, z) in &rare[usize::from(id)] {
                writeln!(
                    txt,
                    "blockid={id}, name='{}', ({x}, {y}, {z})",
                    self.tables.block_name(id)
                )?;
            }
        }

        writeln!(txt, "WORLD BLOCKS LEGEND (TOTAL #= {})", report.total_blocks())?;
        for &id in &by_count {
            let count = report.histogram[usize::from(id)];
            if count == 0 {
                continue;
            }
            let color = self
                .tables
                .block(id)
                .and_then(|info| info.color)
                .unwrap_or(DEFAULT_COLOR);
            writeln!(
                txt,
                "blockid={id}, tot={count}, name='{}', color={color:06x}",
                self.tables.block_name(id)
            )?;
        }
        Ok(())
    }
}
