//! One image per height level, re-reading full block data from the store.

use std::path::{Path, PathBuf};

use voxmap_chunk::{AIR, CHUNK_WIDTH, ChunkBlocks, ChunkPos, ChunkStore, DimensionId, RawChunk};

use super::sink::{BandSink, PngBandWriter};
use super::{PROGRESS_ROWS, Rasterizer, image_size};
use crate::diagnostics::Diagnostics;
use crate::dimension::DimensionAccumulator;
use crate::error::RenderError;
use crate::palette::{Rgb, rgb_bytes};

impl Rasterizer<'_> {
    /// Renders one image per height level, `sinks[y]` receiving level `y`.
    ///
    /// Levels beyond the dimension's maximum height are not written. Air
    /// above a column's surface repeats the surface color, except in the
    /// nether where it stays black.
    pub fn render_slices<S: BandSink>(
        &self,
        acc: &DimensionAccumulator,
        store: &mut dyn ChunkStore,
        sinks: &mut [S],
    ) -> Result<Diagnostics, RenderError> {
        let bounds = acc.chunk_bounds();
        let (width, _) = image_size(acc.dimension(), &bounds)?;
        let max = usize::from(acc.max_height());
        let levels = sinks.len().min(max + 1);
        let row_bytes = width as usize * 3;
        let rows = bounds.height_chunks() as usize;
        let fill_air = acc.dimension() != DimensionId::Nether;
        let mut diag = Diagnostics::default();
        let mut bands = vec![vec![0u8; row_bytes * CHUNK_WIDTH]; levels];

        for (row, chunk_z) in (bounds.min_z..=bounds.max_z).enumerate() {
            for band in &mut bands {
                band.fill(0);
            }
            for chunk_x in bounds.min_x..=bounds.max_x {
                let pos = ChunkPos::new(chunk_x, chunk_z);
                let Some(p) = acc.chunk(pos) else {
                    continue;
                };
                let raw = RawChunk::load(store, acc.dimension(), pos)?;
                let blocks = match &raw {
                    Some(raw) => raw.decode(self.tables, &mut |index, e| {
                        tracing::warn!(%pos, ?index, "Reading slice blocks as air: {e}");
                        diag.record_decode_error();
                    }),
                    None => ChunkBlocks::Empty,
                };
                let x0 = (i64::from(chunk_x) - i64::from(bounds.min_x)) as usize * CHUNK_WIDTH;

                for cz in 0..CHUNK_WIDTH {
                    for cx in 0..CHUNK_WIDTH {
                        let top = if p.top_block[cx][cz] == AIR {
                            max
                        } else {
                            usize::from(p.top_y[cx][cz])
                        };
                        let at = cz * row_bytes + (x0 + cx) * 3;
                        let mut top_color: Rgb = 0;
                        for (y, band) in bands.iter_mut().enumerate() {
                            let (id, data) = blocks.block(cx, cz, y);
                            let color = if id != AIR {
                                self.block_rgb(id, data, &mut diag)
                            } else if fill_air && y > top {
                                top_color
                            } else {
                                0
                            };
                            if y == top {
                                top_color = color;
                            }
                            band[at..at + 3].copy_from_slice(&rgb_bytes(color));
                        }
                    }
                }
            }
            for (sink, band) in sinks.iter_mut().zip(&bands) {
                sink.write_band(band)?;
            }
            if row % PROGRESS_ROWS == 0 {
                tracing::info!(
                    dimension = %acc.dimension(),
                    levels,
                    "Rendered slice chunk row {row}/{rows}"
                );
            }
        }
        Ok(diag)
    }

    /// Renders every height level to `<dir>/<prefix>.<yyy>.png`.
    ///
    /// On failure every file of the set is removed.
    pub fn render_slices_png(
        &self,
        acc: &DimensionAccumulator,
        store: &mut dyn ChunkStore,
        dir: &Path,
        prefix: &str,
    ) -> Result<Diagnostics, RenderError> {
        let paths: Vec<PathBuf> = (0..=usize::from(acc.max_height()))
            .map(|y| dir.join(format!("{prefix}.{y:03}.png")))
            .collect();
        let result = self.write_slices_png(acc, store, &paths);
        if result.is_err() {
            for path in &paths {
                let _ = std::fs::remove_file(path);
            }
        }
        result
    }

    fn write_slices_png(
        &self,
        acc: &DimensionAccumulator,
        store: &mut dyn ChunkStore,
        paths: &[PathBuf],
    ) -> Result<Diagnostics, RenderError> {
        let (width, height) = image_size(acc.dimension(), &acc.chunk_bounds())?;
        let mut writers = paths
            .iter()
            .map(|path| PngBandWriter::create(path, width, height, false))
            .collect::<Result<Vec<_>, _>>()?;
        let diag = self.render_slices(acc, store, &mut writers)?;
        for writer in writers {
            writer.finish()?;
        }
        tracing::info!(
            dimension = %acc.dimension(),
            images = paths.len(),
            width,
            height,
            "Wrote slice images"
        );
        Ok(diag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::BlockFlags;
    use crate::metadata::MetadataTables;
    use voxmap_chunk::decode::{CUBIC_LEN_NO_LIGHT, LEGACY_LEN_MIN};
    use voxmap_chunk::{ChunkFormat, ChunkRecordKind, MemoryStore, chunk_key, subchunk_key};
    use voxmap_config::HeightMode;

    const STONE: u8 = 1;

    fn subchunk_with(blocks: &[(usize, usize, usize, u8)]) -> Vec<u8> {
        let mut bytes = vec![0u8; CUBIC_LEN_NO_LIGHT];
        for &(cx, cz, cy, id) in blocks {
            bytes[1 + (cx * 16 + cz) * 16 + cy] = id;
        }
        bytes
    }

    /// Single chunk with stone at y = 10 in column (2, 3) and air up to y = 50.
    fn world(dimension: DimensionId) -> (DimensionAccumulator, MemoryStore) {
        let pos = ChunkPos::new(0, 0);
        let bytes = subchunk_with(&[(2, 3, 10, STONE)]);
        let mut store = MemoryStore::new();
        store.insert(subchunk_key(dimension, pos, 0), bytes.clone());
        // Subchunks 1..=3 are stored but empty; the rest are absent.
        for index in 1..4 {
            store.insert(subchunk_key(dimension, pos, index), subchunk_with(&[]));
        }

        let tables = MetadataTables::builtin().unwrap();
        let mut acc = DimensionAccumulator::new(dimension, 127, BlockFlags::default());
        let mut diag = Diagnostics::default();
        acc.add_to_chunk_bounds(pos);
        acc.add_chunk_block_data(ChunkFormat::CubicByte, pos, 0, &bytes, &tables, &mut diag)
            .unwrap();
        (acc, store)
    }

    fn slices(dimension: DimensionId) -> Vec<Vec<u8>> {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let (acc, mut store) = world(dimension);
        let mut sinks: Vec<Vec<u8>> = vec![Vec::new(); 128];
        raster.render_slices(&acc, &mut store, &mut sinks).unwrap();
        sinks
    }

    fn column_pixel(image: &[u8]) -> [u8; 3] {
        // Column (2, 3) of a 16-wide image.
        let at = (3 * 16 + 2) * 3;
        [image[at], image[at + 1], image[at + 2]]
    }

    #[test]
    fn test_air_above_surface_repeats_surface_color() {
        let tables = MetadataTables::builtin().unwrap();
        let stone = rgb_bytes(tables.block_color(1, 0).rgb());
        for dimension in [DimensionId::Overworld, DimensionId::TheEnd] {
            let images = slices(dimension);
            assert_eq!(column_pixel(&images[10]), stone);
            for y in 11..=50 {
                assert_eq!(column_pixel(&images[y]), stone, "{dimension} y={y}");
            }
            // Absent subchunks are air as well.
            assert_eq!(column_pixel(&images[100]), stone);
            // Below the surface stays air.
            assert_eq!(column_pixel(&images[9]), [0, 0, 0]);
        }
    }

    #[test]
    fn test_nether_air_stays_black() {
        let tables = MetadataTables::builtin().unwrap();
        let stone = rgb_bytes(tables.block_color(1, 0).rgb());
        let images = slices(DimensionId::Nether);
        assert_eq!(column_pixel(&images[10]), stone);
        for y in 11..=50 {
            assert_eq!(column_pixel(&images[y]), [0, 0, 0], "y={y}");
        }
    }

    #[test]
    fn test_empty_columns_stay_black() {
        let images = slices(DimensionId::Overworld);
        // Column (0, 0) has no blocks at all.
        for image in &images {
            assert_eq!(&image[..3], &[0, 0, 0]);
            assert_eq!(image.len(), 16 * 16 * 3);
        }
    }

    #[test]
    fn test_legacy_record_is_preferred() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let pos = ChunkPos::new(0, 0);
        let mut legacy = vec![0u8; LEGACY_LEN_MIN];
        // Sand at column (0, 0), y = 5.
        legacy[5] = 12;
        let mut store = MemoryStore::new();
        let key = chunk_key(DimensionId::Overworld, pos, ChunkRecordKind::LegacyTerrain);
        store.insert(key, legacy.clone());
        store.insert(
            subchunk_key(DimensionId::Overworld, pos, 0),
            subchunk_with(&[(0, 0, 5, STONE)]),
        );

        let mut acc = DimensionAccumulator::new(DimensionId::Overworld, 127, BlockFlags::default());
        let mut diag = Diagnostics::default();
        acc.add_to_chunk_bounds(pos);
        acc.add_chunk_block_data(ChunkFormat::Legacy, pos, 0, &legacy, &tables, &mut diag)
            .unwrap();

        let mut sinks: Vec<Vec<u8>> = vec![Vec::new(); 128];
        raster.render_slices(&acc, &mut store, &mut sinks).unwrap();
        let sand = rgb_bytes(tables.block_color(12, 0).rgb());
        assert_eq!(&sinks[5][..3], &sand);
    }

    #[test]
    fn test_slice_pngs_written() {
        let tables = MetadataTables::builtin().unwrap();
        let raster = Rasterizer::new(&tables, 127, HeightMode::Top);
        let (acc, mut store) = world(DimensionId::Overworld);
        let dir = tempfile::tempdir().unwrap();
        raster
            .render_slices_png(&acc, &mut store, dir.path(), "world.overworld.slice")
            .unwrap();
        assert!(dir.path().join("world.overworld.slice.000.png").exists());
        assert!(dir.path().join("world.overworld.slice.127.png").exists());
        assert!(!dir.path().join("world.overworld.slice.128.png").exists());
    }
}
