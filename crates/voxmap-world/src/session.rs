//! One run over one world: scan the store, project every dimension, write
//! images and exports.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use voxmap_chunk::{
    ChunkFormat, ChunkKey, ChunkPos, ChunkRecordKind, ChunkStore, DecodeError, DimensionId,
    NamedRecord,
    RecordKey, classify, hex_dump, nbt,
};
use voxmap_config::Config;
use voxmap_render::{
    BlockFlags, Diagnostics, DimensionAccumulator, MetadataTables, Rasterizer, RenderMode,
};

use crate::error::WorldError;
use crate::level::{LevelInfo, world_name};
use crate::region::{ClipBox, ReferenceWorld, RegionExporter, RegionRequest};
use crate::store::LevelDbStore;
use crate::{geojson, schematic};

/// Records between scan progress lines.
const PROGRESS_RECORDS: u64 = 10_000;

/// Name of the run summary written into the output directory.
pub const SUMMARY_FILE: &str = "voxmap.summary.txt";

/// Subdirectory of the output directory receiving images.
pub const IMAGES_DIR: &str = "images";

/// Expected lengths of byte subchunks, without and with light.
const CUBIC_LENGTHS: [usize; 2] = [
    voxmap_chunk::decode::CUBIC_LEN_NO_LIGHT,
    voxmap_chunk::decode::CUBIC_LEN_WITH_LIGHT,
];

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Record tallies from the accumulation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub records: u64,
    /// Chunk records by kind label.
    pub chunk_records: BTreeMap<&'static str, u64>,
    /// Named records by label.
    pub named_records: BTreeMap<&'static str, u64>,
    /// Chunk record tags with no known meaning.
    pub undocumented_tags: BTreeMap<u8, u64>,
    /// Keys of no known shape.
    pub unknown_keys: u64,
    /// Keys rejected by the classifier.
    pub rejected_keys: u64,
    /// Records that failed to decode.
    pub decode_errors: u64,
    /// Entity compounds per dimension id.
    pub entities: [u64; 3],
    /// Block entity compounds per dimension id.
    pub block_entities: [u64; 3],
    pub player_ids: Vec<String>,
    /// The scan stopped at the record limit.
    pub truncated: bool,
}

/// Outputs and diagnostics of the render phase.
#[derive(Clone, Debug, Default)]
pub struct RenderReport {
    pub diagnostics: Diagnostics,
    pub files: Vec<PathBuf>,
}

impl RenderReport {
    pub fn merge(&mut self, other: RenderReport) {
        self.diagnostics.merge(other.diagnostics);
        self.files.extend(other.files);
    }
}

// ---------------------------------------------------------------------------
// Accumulation
// ---------------------------------------------------------------------------

/// Borrowed state the accumulation pass writes into.
struct Accumulation<'a> {
    tables: &'a MetadataTables,
    dimensions: &'a mut [DimensionAccumulator],
    report: &'a mut ScanReport,
    diag: &'a mut Diagnostics,
    verbose: bool,
}

impl Accumulation<'_> {
    fn record(&mut self, key: &[u8], value: &[u8]) {
        match classify(key) {
            Ok(RecordKey::Chunk(chunk)) => self.chunk_record(chunk, key, value),
            Ok(RecordKey::Named(named)) => self.named_record(named, value),
            Ok(RecordKey::Unknown) => {
                self.report.unknown_keys += 1;
                tracing::debug!("Unknown record key\n{}", hex_dump(key));
            }
            Err(e) => {
                self.report.rejected_keys += 1;
                tracing::warn!("Skipping record: {e}");
                tracing::debug!("Rejected key\n{}", hex_dump(key));
            }
        }
    }

    fn chunk_record(&mut self, chunk: ChunkKey, key: &[u8], value: &[u8]) {
        *self.report.chunk_records.entry(chunk.kind.label()).or_insert(0) += 1;
        let dim = usize::from(chunk.dimension.id());
        let acc = &mut self.dimensions[dim];

        let result = match chunk.kind {
            ChunkRecordKind::LegacyTerrain => acc.add_chunk_block_data(
                ChunkFormat::Legacy,
                chunk.pos,
                0,
                value,
                self.tables,
                self.diag,
            ),
            ChunkRecordKind::SubchunkPrefix => {
                let index = chunk.subchunk.unwrap_or(0);
                match ChunkFormat::of_subchunk(value) {
                    Some(format) => {
                        if format == ChunkFormat::CubicByte && !CUBIC_LENGTHS.contains(&value.len()) {
                            tracing::warn!(
                                pos = %chunk.pos,
                                index,
                                len = value.len(),
                                "Unexpected cubic subchunk length"
                            );
                        }
                        acc.add_chunk_block_data(format, chunk.pos, index, value, self.tables, self.diag)
                    }
                    None => Err(DecodeError::Truncated {
                        expected: 1,
                        actual: 0,
                    }),
                }
            }
            ChunkRecordKind::Data2D => acc.add_chunk_column_data(chunk.pos, value),
            ChunkRecordKind::Entity | ChunkRecordKind::BlockEntity => {
                match nbt::read_le_all(value) {
                    Ok(compounds) => {
                        let counts = if chunk.kind == ChunkRecordKind::Entity {
                            &mut self.report.entities
                        } else {
                            &mut self.report.block_entities
                        };
                        counts[dim] += compounds.len() as u64;
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            ChunkRecordKind::Undocumented(tag) => {
                *self.report.undocumented_tags.entry(tag).or_insert(0) += 1;
                tracing::debug!(
                    pos = %chunk.pos,
                    dimension = %chunk.dimension,
                    "Undocumented chunk record 0x{tag:02x}\n{}\n{}",
                    hex_dump(key),
                    hex_dump(value)
                );
                Ok(())
            }
            _ => {
                if self.verbose {
                    tracing::debug!(
                        kind = chunk.kind.label(),
                        pos = %chunk.pos,
                        dimension = %chunk.dimension,
                        "Chunk record\n{}",
                        hex_dump(value)
                    );
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            self.report.decode_errors += 1;
            self.diag.record_decode_error();
            tracing::warn!(
                kind = chunk.kind.label(),
                pos = %chunk.pos,
                dimension = %chunk.dimension,
                "Skipping record: {e}"
            );
            tracing::debug!("Key\n{}\nValue\n{}", hex_dump(key), hex_dump(value));
        }
    }

    fn named_record(&mut self, named: NamedRecord, value: &[u8]) {
        *self.report.named_records.entry(named.label()).or_insert(0) += 1;
        match &named {
            NamedRecord::LocalPlayer => self.report.player_ids.push("~local_player".to_string()),
            NamedRecord::RemotePlayer(id) => self.report.player_ids.push(id.clone()),
            _ => {}
        }
        if matches!(named, NamedRecord::FlatWorldLayers) {
            tracing::info!("Flat world layers: {}", String::from_utf8_lossy(value).trim());
            return;
        }
        match nbt::read_le_all(value) {
            Ok(compounds) => {
                tracing::debug!(record = named.label(), compounds = compounds.len(), "Named record");
            }
            Err(e) => {
                self.report.decode_errors += 1;
                tracing::warn!(record = named.label(), "Cannot parse named record: {e}");
            }
        }
    }
}

/// Visits records in key order, stopping after `limit` of them.
///
/// Returns the number visited and whether the limit cut the scan short.
fn scan_records(
    store: &mut dyn ChunkStore,
    limit: Option<u64>,
    visit: &mut dyn FnMut(&[u8], &[u8]),
) -> Result<(u64, bool), WorldError> {
    let mut seen = 0u64;
    let mut truncated = false;
    store.scan(&mut |key, value| {
        if limit.is_some_and(|limit| seen >= limit) {
            truncated = true;
            return ControlFlow::Break(());
        }
        seen += 1;
        visit(key, value);
        if seen % PROGRESS_RECORDS == 0 {
            tracing::info!("Processed {seen} records");
        }
        ControlFlow::Continue(())
    })?;
    Ok((seen, truncated))
}

// ---------------------------------------------------------------------------
// WorldSession
// ---------------------------------------------------------------------------

/// Everything known about one world during a run.
pub struct WorldSession {
    config: Config,
    tables: MetadataTables,
    name: String,
    level: LevelInfo,
    dimensions: Vec<DimensionAccumulator>,
    scan: ScanReport,
    diagnostics: Diagnostics,
}

impl WorldSession {
    /// Sets up one accumulator per dimension from the config's block lists.
    pub fn new(config: Config, name: String, level: LevelInfo) -> Result<Self, WorldError> {
        let tables = match &config.world.metadata_table {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading block table");
                MetadataTables::from_ron(path)?
            }
            None => MetadataTables::builtin()?,
        };

        let mut dimensions = Vec::with_capacity(DimensionId::ALL.len());
        for dimension in DimensionId::ALL {
            let dim_config = config
                .dimensions
                .by_id(dimension.id())
                .cloned()
                .unwrap_or_default();
            log_block_lists(dimension, &dim_config, &tables);
            dimensions.push(DimensionAccumulator::new(
                dimension,
                config.render.max_height,
                BlockFlags::from_config(&dim_config),
            ));
        }

        Ok(Self {
            config,
            tables,
            name,
            level,
            dimensions,
            scan: ScanReport::default(),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seed(&self) -> i64 {
        self.level.seed
    }

    pub fn spawn(&self) -> (i32, i32, i32) {
        self.level.spawn
    }

    pub fn tables(&self) -> &MetadataTables {
        &self.tables
    }

    pub fn dimension(&self, dimension: DimensionId) -> &DimensionAccumulator {
        &self.dimensions[usize::from(dimension.id())]
    }

    pub fn scan_report(&self) -> &ScanReport {
        &self.scan
    }

    /// Diagnostics of the accumulation pass.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn out_dir(&self) -> &Path {
        &self.config.output.dir
    }

    /// First pass: chunk bounds of every dimension from block record keys.
    pub fn scan_bounds(&mut self, store: &mut dyn ChunkStore) -> Result<(), WorldError> {
        for acc in &mut self.dimensions {
            acc.invalidate_bounds();
        }
        tracing::info!("Scanning chunk bounds");
        let mut found: Vec<(DimensionId, ChunkPos)> = Vec::new();
        scan_records(store, self.config.scan.record_limit, &mut |key, _| {
            if let Ok(RecordKey::Chunk(chunk)) = classify(key)
                && matches!(
                    chunk.kind,
                    ChunkRecordKind::LegacyTerrain | ChunkRecordKind::SubchunkPrefix
                )
            {
                found.push((chunk.dimension, chunk.pos));
            }
        })?;
        for (dimension, pos) in found {
            self.dimensions[usize::from(dimension.id())].add_to_chunk_bounds(pos);
        }
        for acc in &self.dimensions {
            let bounds = acc.chunk_bounds();
            if bounds.is_valid() {
                tracing::info!(
                    dimension = %acc.dimension(),
                    "Chunk bounds X {} => {}, Z {} => {}",
                    bounds.min_x,
                    bounds.max_x,
                    bounds.min_z,
                    bounds.max_z
                );
            }
        }
        Ok(())
    }

    /// Second pass: every record is classified and folded into its dimension.
    pub fn accumulate(&mut self, store: &mut dyn ChunkStore) -> Result<(), WorldError> {
        tracing::info!("Accumulating chunk records");
        let limit = self.config.scan.record_limit;
        let mut report = ScanReport::default();
        let mut diag = Diagnostics::default();
        let mut pass = Accumulation {
            tables: &self.tables,
            dimensions: &mut self.dimensions,
            report: &mut report,
            diag: &mut diag,
            verbose: self.config.debug.verbose_records,
        };

        let (records, truncated) = scan_records(store, limit, &mut |key, value| pass.record(key, value))?;
        report.records = records;
        report.truncated = truncated;

        if report.truncated {
            tracing::warn!(records, "Stopped at the record limit");
        }
        for acc in &self.dimensions {
            tracing::info!(dimension = %acc.dimension(), chunks = acc.chunk_count(), "Accumulated");
        }
        self.scan = report;
        self.diagnostics.merge(diag);
        Ok(())
    }

    /// Logs where the world origin and spawn land on the overworld images.
    fn log_landmarks(&self) {
        let overworld = self.dimension(DimensionId::Overworld);
        let (spawn_x, _, spawn_z) = self.level.spawn;
        let landmarks = [
            ("World origin", 0, 0),
            ("World spawn", i64::from(spawn_x), i64::from(spawn_z)),
        ];
        for (label, x, z) in landmarks {
            match overworld.world_point_to_image_point(x, z) {
                Some((ix, iz)) => tracing::info!("{label} ({x}, {z}) is at image ({ix}, {iz})"),
                None => tracing::info!("{label} ({x}, {z}) is outside the image"),
            }
        }
    }

    /// Composite images of one dimension.
    fn render_dimension(&self, acc: &DimensionAccumulator, images: &Path) -> Result<RenderReport, WorldError> {
        let raster = Rasterizer::new(
            &self.tables,
            self.config.render.max_height,
            self.config.render.height_mode,
        );
        let grid = self
            .config
            .dimensions
            .by_id(acc.dimension().id())
            .is_some_and(|d| d.grid);
        let mut report = RenderReport::default();
        for mode in RenderMode::enabled(&self.config.render.modes) {
            if mode == RenderMode::Slime && acc.dimension() != DimensionId::Overworld {
                continue;
            }
            let path = images.join(format!("voxmap.{}.{}.png", acc.dimension(), mode.tag()));
            report.diagnostics.merge(raster.render_composite_png(acc, mode, grid, &path)?);
            tracing::info!(dimension = %acc.dimension(), mode = mode.tag(), "Wrote {}", path.display());
            report.files.push(path);
        }
        Ok(report)
    }

    /// Composite images of every populated dimension, on scoped threads when
    /// configured.
    fn render_composites(&self, images: &Path) -> Result<RenderReport, WorldError> {
        let populated: Vec<&DimensionAccumulator> = self
            .dimensions
            .iter()
            .filter(|acc| acc.chunk_bounds().is_valid())
            .collect();
        let mut report = RenderReport::default();

        if !self.config.render.parallel_dimensions {
            for acc in populated {
                report.merge(self.render_dimension(acc, images)?);
            }
            return Ok(report);
        }

        let results = std::thread::scope(|scope| {
            let handles = populated
                .iter()
                .map(|&acc| {
                    std::thread::Builder::new()
                        .name(format!("render-{}", acc.dimension()))
                        .spawn_scoped(scope, move || self.render_dimension(acc, images))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, WorldError>(
                handles
                    .into_iter()
                    .map(|handle| match handle.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect::<Vec<_>>(),
            )
        })?;
        for result in results {
            report.merge(result?);
        }
        Ok(report)
    }

    /// Writes every enabled output. Slices and exports re-read `store`.
    pub fn render(
        &self,
        store: &mut dyn ChunkStore,
        reference: Option<ReferenceWorld<'_>>,
    ) -> Result<RenderReport, WorldError> {
        let out_dir = self.out_dir();
        let images = out_dir.join(IMAGES_DIR);
        std::fs::create_dir_all(&images)?;
        self.log_landmarks();

        let mut report = self.render_composites(&images)?;

        if self.config.render.slices {
            let raster = Rasterizer::new(
                &self.tables,
                self.config.render.max_height,
                self.config.render.height_mode,
            );
            for acc in self.dimensions.iter().filter(|acc| acc.chunk_bounds().is_valid()) {
                let prefix = format!("voxmap.{}.slice", acc.dimension());
                report
                    .diagnostics
                    .merge(raster.render_slices_png(acc, store, &images, &prefix)?);
            }
        }

        if self.config.region.enabled {
            report.merge(self.export_region(store, reference)?);
        }

        for region in &self.config.region.schematics {
            report
                .files
                .push(schematic::export_schematic(store, &self.tables, region, out_dir)?);
        }

        for acc in &self.dimensions {
            if let Some(path) = geojson::export_geojson(acc, &self.tables, out_dir)? {
                report.files.push(path);
            }
        }
        Ok(report)
    }

    fn export_region(
        &self,
        store: &mut dyn ChunkStore,
        reference: Option<ReferenceWorld<'_>>,
    ) -> Result<RenderReport, WorldError> {
        let region = &self.config.region;
        let Some(dimension) = DimensionId::from_id(region.dimension) else {
            tracing::warn!(id = region.dimension, "Unknown region dimension; skipping export");
            return Ok(RenderReport::default());
        };
        let acc = self.dimension(dimension);
        if !acc.chunk_bounds().is_valid() {
            tracing::warn!(%dimension, "No chunks to export");
            return Ok(RenderReport::default());
        }

        let clip = ClipBox::new(&acc.chunk_bounds(), acc.max_height(), region);
        let mut request = RegionRequest::from_config(clip, region);
        request.reference = reference;
        let exporter = RegionExporter::new(&self.tables, &self.name);
        let result = exporter.export(acc, store, &mut request, self.out_dir())?;
        let (xyz, txt) = exporter.output_paths(acc, self.out_dir());
        Ok(RenderReport {
            diagnostics: result.diagnostics,
            files: vec![xyz, txt],
        })
    }

    /// Writes the run summary text.
    pub fn write_summary(&self, render: &RenderReport, out: &mut dyn Write) -> std::io::Result<()> {
        let (x, y, z) = self.level.spawn;
        writeln!(out, "WORLD NAME: '{}'", self.name)?;
        writeln!(out, "SEED: {}", self.level.seed)?;
        writeln!(out, "SPAWN: ({x}, {y}, {z})")?;
        writeln!(out, "STORAGE VERSION: {}", self.level.storage_version)?;

        let scan = &self.scan;
        writeln!(out, "RECORDS: {}{}", scan.records, if scan.truncated { " (limit reached)" } else { "" })?;
        for acc in &self.dimensions {
            let dim = usize::from(acc.dimension().id());
            let bounds = acc.chunk_bounds();
            write!(out, "DIMENSION {}: chunks={}", acc.dimension(), acc.chunk_count())?;
            if bounds.is_valid() {
                write!(
                    out,
                    " bounds=[X:{} => {}, Z:{} => {}]",
                    bounds.min_x, bounds.max_x, bounds.min_z, bounds.max_z
                )?;
            }
            writeln!(
                out,
                " entities={} block_entities={} points={}",
                scan.entities[dim],
                scan.block_entities[dim],
                acc.points_of_interest().len()
            )?;
        }
        for (label, count) in &scan.chunk_records {
            writeln!(out, "  chunk record {label}: {count}")?;
        }
        for (label, count) in &scan.named_records {
            writeln!(out, "  named record {label}: {count}")?;
        }
        for (tag, count) in &scan.undocumented_tags {
            writeln!(out, "  undocumented tag 0x{tag:02x}: {count}")?;
        }
        writeln!(
            out,
            "  unknown keys: {}, rejected keys: {}, decode errors: {}",
            scan.unknown_keys, scan.rejected_keys, scan.decode_errors
        )?;
        if !scan.player_ids.is_empty() {
            writeln!(out, "PLAYERS: {}", scan.player_ids.join(", "))?;
        }
        writeln!(out, "FILES: {}", render.files.len())?;
        for path in &render.files {
            writeln!(out, "  {}", path.display())?;
        }

        let mut diagnostics = self.diagnostics.clone();
        diagnostics.merge(render.diagnostics.clone());
        diagnostics.write_summary(out, &self.tables)
    }

    /// Full run over the world directory named in the config.
    ///
    /// Fails when `level.dat` cannot be read or the store cannot be opened.
    pub fn run(config: Config) -> Result<RenderReport, WorldError> {
        let world_dir = config.world.path.clone();
        tracing::info!(world = %world_dir.display(), "Opening world");
        let level = LevelInfo::load(&world_dir)?;
        let name = world_name(&world_dir);
        let mut store = LevelDbStore::open(&world_dir.join("db"), &config.store)?;

        let mut reference_store = match &config.world.reference {
            Some(path) => Some((world_name(path), LevelDbStore::open(&path.join("db"), &config.store)?)),
            None => None,
        };

        let mut session = WorldSession::new(config, name, level)?;
        session.scan_bounds(&mut store)?;
        session.accumulate(&mut store)?;

        let reference = reference_store.as_mut().map(|(name, store)| ReferenceWorld {
            name: name.clone(),
            store,
        });
        let report = session.render(&mut store, reference)?;

        if session.config.output.summary {
            let path = session.out_dir().join(SUMMARY_FILE);
            let mut out = BufWriter::new(File::create(&path)?);
            session.write_summary(&report, &mut out)?;
            out.flush()?;
            tracing::info!("Wrote {}", path.display());
        }
        if !session.diagnostics.is_clean() || !report.diagnostics.is_clean() {
            tracing::warn!("Some blocks or biomes could not be rendered faithfully; see the summary");
        }
        Ok(report)
    }
}

fn log_block_lists(
    dimension: DimensionId,
    config: &voxmap_config::DimensionConfig,
    tables: &MetadataTables,
) {
    let lists = [
        ("hide-top", &config.hide_top),
        ("force-top", &config.force_top),
        ("geojson", &config.geojson),
    ];
    for (label, ids) in lists {
        for &id in ids {
            tracing::info!(
                %dimension,
                "'{label}' block: {} (id={id} 0x{id:x})",
                tables.block_name(id)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmap_chunk::decode::CUBIC_LEN_NO_LIGHT;
    use voxmap_chunk::{MemoryStore, chunk_key, subchunk_key};

    fn level() -> LevelInfo {
        LevelInfo {
            storage_version: 8,
            seed: 42,
            spawn: (8, 70, 8),
        }
    }

    fn stone_subchunk() -> Vec<u8> {
        let mut bytes = vec![0u8; CUBIC_LEN_NO_LIGHT];
        bytes[1] = 1;
        bytes
    }

    fn session(config: Config) -> WorldSession {
        WorldSession::new(config, "test".to_string(), level()).unwrap()
    }

    #[test]
    fn test_bounds_pass_covers_block_records_only() {
        let mut store = MemoryStore::new();
        store.insert(subchunk_key(DimensionId::Overworld, ChunkPos::new(-2, 3), 0), stone_subchunk());
        store.insert(subchunk_key(DimensionId::Nether, ChunkPos::new(5, 5), 0), stone_subchunk());
        // Column data alone does not extend the bounds.
        store.insert(
            chunk_key(DimensionId::Overworld, ChunkPos::new(40, 40), ChunkRecordKind::Data2D),
            vec![0u8; 768],
        );

        let mut session = session(Config::default());
        session.scan_bounds(&mut store).unwrap();
        let bounds = session.dimension(DimensionId::Overworld).chunk_bounds();
        assert_eq!((bounds.min_x, bounds.max_x, bounds.min_z, bounds.max_z), (-2, -2, 3, 3));
        assert!(session.dimension(DimensionId::Nether).chunk_bounds().is_valid());
        assert!(!session.dimension(DimensionId::TheEnd).chunk_bounds().is_valid());
    }

    #[test]
    fn test_accumulate_routes_and_counts_records() {
        let mut store = MemoryStore::new();
        let pos = ChunkPos::new(0, 0);
        store.insert(subchunk_key(DimensionId::Overworld, pos, 0), stone_subchunk());
        store.insert(
            chunk_key(DimensionId::TheEnd, pos, ChunkRecordKind::Entity),
            Vec::<u8>::new(),
        );
        store.insert(chunk_key(DimensionId::Overworld, pos, ChunkRecordKind::Undocumented(0x99)), vec![1]);
        // Corrupt sentinel coordinates.
        let mut corrupt = i32::MIN.to_le_bytes().to_vec();
        corrupt.extend_from_slice(&i32::MIN.to_le_bytes());
        corrupt.push(0x2f);
        corrupt.push(0);
        store.insert(corrupt, stone_subchunk());
        // Subchunk too short to decode.
        store.insert(subchunk_key(DimensionId::Overworld, ChunkPos::new(1, 0), 0), vec![0u8; 12]);
        store.insert(b"player_abc".to_vec(), Vec::<u8>::new());
        store.insert(b"unknown".to_vec(), vec![0u8]);

        let mut session = session(Config::default());
        session.scan_bounds(&mut store).unwrap();
        session.accumulate(&mut store).unwrap();

        let report = session.scan_report();
        assert_eq!(report.records, 7);
        assert_eq!(report.rejected_keys, 1);
        assert_eq!(report.unknown_keys, 1);
        assert_eq!(report.undocumented_tags.get(&0x99), Some(&1));
        assert_eq!(report.decode_errors, 1);
        assert_eq!(report.player_ids, vec!["abc".to_string()]);
        assert_eq!(report.entities, [0, 0, 0]);
        assert_eq!(session.diagnostics().decode_errors, 1);

        let overworld = session.dimension(DimensionId::Overworld);
        let projection = overworld.chunk(pos).unwrap();
        assert_eq!(projection.top_block[0][0], 1);
    }

    #[test]
    fn test_record_limit_stops_scan() {
        let mut store = MemoryStore::new();
        for x in 0..5 {
            store.insert(subchunk_key(DimensionId::Overworld, ChunkPos::new(x, 0), 0), stone_subchunk());
        }
        let mut config = Config::default();
        config.scan.record_limit = Some(3);
        let mut session = session(config);
        session.scan_bounds(&mut store).unwrap();
        session.accumulate(&mut store).unwrap();
        assert!(session.scan_report().truncated);
        assert_eq!(session.scan_report().records, 3);
        assert_eq!(session.dimension(DimensionId::Overworld).chunk_count(), 3);
    }

    #[test]
    fn test_render_writes_enabled_outputs() {
        let mut store = MemoryStore::new();
        store.insert(subchunk_key(DimensionId::Overworld, ChunkPos::new(0, 0), 0), stone_subchunk());
        store.insert(subchunk_key(DimensionId::Nether, ChunkPos::new(0, 0), 0), stone_subchunk());

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().to_path_buf();
        config.render.modes.slime = true;
        config.render.parallel_dimensions = true;
        config.region.enabled = true;

        let mut session = session(config);
        session.scan_bounds(&mut store).unwrap();
        session.accumulate(&mut store).unwrap();
        let report = session.render(&mut store, None).unwrap();

        let images = dir.path().join(IMAGES_DIR);
        assert!(images.join("voxmap.overworld.terrain.png").exists());
        assert!(images.join("voxmap.nether.terrain.png").exists());
        assert!(images.join("voxmap.overworld.slime.png").exists());
        assert!(!images.join("voxmap.nether.slime.png").exists());
        assert!(!images.join("voxmap.the-end.terrain.png").exists());
        assert!(dir.path().join("test_overworld_blocks.txt").exists());
        assert_eq!(report.files.len(), 5);

        let mut summary = Vec::new();
        session.write_summary(&report, &mut summary).unwrap();
        let summary = String::from_utf8(summary).unwrap();
        assert!(summary.contains("SEED: 42"));
        assert!(summary.contains("DIMENSION overworld: chunks=1"));
        assert!(summary.contains("RENDER DIAGNOSTICS"));
    }
}
