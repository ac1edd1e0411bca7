//! Per-dimension accumulation of chunk records into 2D projections.
//!
//! The scan feeds every block and column record of one dimension into a
//! [`DimensionAccumulator`]; afterwards the renderers only read from it.

use rustc_hash::FxHashMap;
use voxmap_chunk::{
    AIR, BLOCK_ID_LIMIT, BlockResolver, BlockSource, CHUNK_WIDTH, ChunkFormat, ChunkPos,
    ColumnData, DecodeError, DimensionId, LegacyChunk, SUBCHUNK_HEIGHT, SubchunkPayload,
    UNRESOLVED_BLOCK, is_slime_chunk,
};
use voxmap_config::DimensionConfig;

use crate::diagnostics::Diagnostics;

/// Light assumed above a block at the top of its record: full sky, no block light.
const OPEN_SKY_LIGHT: u8 = 0xf0;

// ---------------------------------------------------------------------------
// ChunkProjection
// ---------------------------------------------------------------------------

/// Top-down summary of one chunk. Every grid is indexed `[cx][cz]`.
#[derive(Clone, Debug)]
pub struct ChunkProjection {
    /// Surface block id (`AIR` when the column is empty).
    pub top_block: [[u16; CHUNK_WIDTH]; CHUNK_WIDTH],
    /// Data nibble of the surface block.
    pub top_data: [[u8; CHUNK_WIDTH]; CHUNK_WIDTH],
    /// Height of the surface block.
    pub top_y: [[u8; CHUNK_WIDTH]; CHUNK_WIDTH],
    /// Stored height-column value, or the highest non-air block.
    pub height_col: [[u8; CHUNK_WIDTH]; CHUNK_WIDTH],
    /// Grass color in the high 24 bits, biome id in the low byte.
    pub grass_and_biome: [[u32; CHUNK_WIDTH]; CHUNK_WIDTH],
    /// Light above the surface block, `sky << 4 | block`.
    pub top_light: [[u8; CHUNK_WIDTH]; CHUNK_WIDTH],
    forced: [[bool; CHUNK_WIDTH]; CHUNK_WIDTH],
    column_data: bool,
}

impl Default for ChunkProjection {
    fn default() -> Self {
        Self {
            top_block: [[AIR; CHUNK_WIDTH]; CHUNK_WIDTH],
            top_data: [[0; CHUNK_WIDTH]; CHUNK_WIDTH],
            top_y: [[0; CHUNK_WIDTH]; CHUNK_WIDTH],
            height_col: [[0; CHUNK_WIDTH]; CHUNK_WIDTH],
            grass_and_biome: [[0; CHUNK_WIDTH]; CHUNK_WIDTH],
            top_light: [[0; CHUNK_WIDTH]; CHUNK_WIDTH],
            forced: [[false; CHUNK_WIDTH]; CHUNK_WIDTH],
            column_data: false,
        }
    }
}

impl ChunkProjection {
    /// Whether a column record has supplied the height column.
    pub fn has_column_data(&self) -> bool {
        self.column_data
    }

    /// Whether the surface of a column came from the force-top list.
    pub fn is_forced(&self, cx: usize, cz: usize) -> bool {
        self.forced[cx][cz]
    }
}

// ---------------------------------------------------------------------------
// ChunkBounds
// ---------------------------------------------------------------------------

/// Running min/max of the chunk positions seen in one dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
    valid: bool,
}

impl Default for ChunkBounds {
    fn default() -> Self {
        Self {
            min_x: i32::MAX,
            max_x: i32::MIN,
            min_z: i32::MAX,
            max_z: i32::MIN,
            valid: false,
        }
    }
}

impl ChunkBounds {
    pub fn add(&mut self, pos: ChunkPos) {
        self.min_x = self.min_x.min(pos.x);
        self.max_x = self.max_x.max(pos.x);
        self.min_z = self.min_z.min(pos.z);
        self.max_z = self.max_z.max(pos.z);
        self.valid = true;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Width in chunks.
    pub fn width_chunks(&self) -> u64 {
        if !self.valid {
            return 0;
        }
        (i64::from(self.max_x) - i64::from(self.min_x) + 1) as u64
    }

    /// Height (Z extent) in chunks.
    pub fn height_chunks(&self) -> u64 {
        if !self.valid {
            return 0;
        }
        (i64::from(self.max_z) - i64::from(self.min_z) + 1) as u64
    }

    pub fn image_width(&self) -> u64 {
        self.width_chunks() * CHUNK_WIDTH as u64
    }

    pub fn image_height(&self) -> u64 {
        self.height_chunks() * CHUNK_WIDTH as u64
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.valid
            && (self.min_x..=self.max_x).contains(&pos.x)
            && (self.min_z..=self.max_z).contains(&pos.z)
    }
}

// ---------------------------------------------------------------------------
// BlockFlags
// ---------------------------------------------------------------------------

/// O(1) membership tables for the per-dimension block id lists.
///
/// Built once from the configuration before any record is accumulated.
#[derive(Clone, Debug)]
pub struct BlockFlags {
    hide_top: Vec<bool>,
    force_top: Vec<bool>,
    geojson: Vec<bool>,
    any_force_top: bool,
    any_geojson: bool,
}

fn id_table(ids: &[u16]) -> Vec<bool> {
    let mut table = vec![false; BLOCK_ID_LIMIT];
    for &id in ids {
        if let Some(slot) = table.get_mut(usize::from(id)) {
            *slot = true;
        }
    }
    table
}

impl BlockFlags {
    pub fn new(hide_top: &[u16], force_top: &[u16], geojson: &[u16]) -> Self {
        let force = id_table(force_top);
        let geo = id_table(geojson);
        Self {
            hide_top: id_table(hide_top),
            any_force_top: force.contains(&true),
            any_geojson: geo.contains(&true),
            force_top: force,
            geojson: geo,
        }
    }

    pub fn from_config(config: &DimensionConfig) -> Self {
        Self::new(&config.hide_top, &config.force_top, &config.geojson)
    }

    /// Ids must be below `BLOCK_ID_LIMIT`.
    pub fn is_hidden(&self, id: u16) -> bool {
        self.hide_top[usize::from(id)]
    }

    pub fn is_forced(&self, id: u16) -> bool {
        self.force_top[usize::from(id)]
    }

    pub fn is_geojson(&self, id: u16) -> bool {
        self.geojson[usize::from(id)]
    }
}

impl Default for BlockFlags {
    fn default() -> Self {
        Self::new(&[], &[], &[])
    }
}

/// A block on the geojson list, in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointOfInterest {
    pub id: u16,
    pub data: u8,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

// ---------------------------------------------------------------------------
// DimensionAccumulator
// ---------------------------------------------------------------------------

/// Chunk projections, bounds and points of interest for one dimension.
pub struct DimensionAccumulator {
    dimension: DimensionId,
    max_height: u8,
    flags: BlockFlags,
    bounds: ChunkBounds,
    chunks: FxHashMap<ChunkPos, Box<ChunkProjection>>,
    points: Vec<PointOfInterest>,
}

impl DimensionAccumulator {
    /// `max_height` above 255 is clamped.
    pub fn new(dimension: DimensionId, max_height: u16, flags: BlockFlags) -> Self {
        Self {
            dimension,
            max_height: max_height.min(255) as u8,
            flags,
            bounds: ChunkBounds::default(),
            chunks: FxHashMap::default(),
            points: Vec::new(),
        }
    }

    pub fn dimension(&self) -> DimensionId {
        self.dimension
    }

    pub fn max_height(&self) -> u8 {
        self.max_height
    }

    pub fn flags(&self) -> &BlockFlags {
        &self.flags
    }

    // --- Bounds ---

    pub fn add_to_chunk_bounds(&mut self, pos: ChunkPos) {
        self.bounds.add(pos);
    }

    pub fn chunk_bounds(&self) -> ChunkBounds {
        self.bounds
    }

    /// Clears the bounds ahead of a rescan.
    pub fn invalidate_bounds(&mut self) {
        self.bounds = ChunkBounds::default();
    }

    /// Maps a world block coordinate onto the composite image.
    ///
    /// Returns `None` until bounds are known.
    pub fn world_point_to_image_point(&self, world_x: i64, world_z: i64) -> Option<(i64, i64)> {
        if !self.bounds.is_valid() {
            return None;
        }
        let (origin_x, origin_z) = ChunkPos::new(self.bounds.min_x, self.bounds.min_z).world_origin();
        Some((world_x - origin_x, world_z - origin_z))
    }

    // --- Chunks ---

    pub fn chunk(&self, pos: ChunkPos) -> Option<&ChunkProjection> {
        self.chunks.get(&pos).map(|c| &**c)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn points_of_interest(&self) -> &[PointOfInterest] {
        &self.points
    }

    pub fn is_slime_chunk(&self, pos: ChunkPos) -> bool {
        self.dimension == DimensionId::Overworld && is_slime_chunk(pos.x, pos.z)
    }

    fn projection_mut(&mut self, pos: ChunkPos) -> &mut ChunkProjection {
        self.chunks.entry(pos).or_default()
    }

    /// Decodes a block record and folds it into the chunk's projection.
    ///
    /// `subchunk_y` is ignored for legacy records.
    pub fn add_chunk_block_data(
        &mut self,
        format: ChunkFormat,
        pos: ChunkPos,
        subchunk_y: u8,
        payload: &[u8],
        resolver: &dyn BlockResolver,
        diag: &mut Diagnostics,
    ) -> Result<(), DecodeError> {
        match format {
            ChunkFormat::Legacy => {
                let chunk = LegacyChunk::new(payload)?;
                self.fold_blocks(pos, 0, &chunk, diag);
                self.fold_legacy_columns(pos, &chunk);
            }
            ChunkFormat::CubicByte | ChunkFormat::Palette => {
                let sub = SubchunkPayload::new(payload).decode(resolver)?;
                for name in sub.unresolved_names() {
                    diag.record_unresolved_name(name);
                }
                let base_y = usize::from(subchunk_y) * SUBCHUNK_HEIGHT;
                self.fold_blocks(pos, base_y, &sub, diag);
            }
        }
        Ok(())
    }

    /// Merges a column record's heights and grass/biome words.
    pub fn add_chunk_column_data(&mut self, pos: ChunkPos, payload: &[u8]) -> Result<(), DecodeError> {
        let column = ColumnData::parse(payload)?;
        let max = i16::from(self.max_height);
        let projection = self.projection_mut(pos);
        for cx in 0..CHUNK_WIDTH {
            for cz in 0..CHUNK_WIDTH {
                projection.height_col[cx][cz] = column.height(cx, cz).clamp(0, max) as u8;
                if let Some(word) = column.grass_and_biome(cx, cz) {
                    projection.grass_and_biome[cx][cz] = word;
                }
            }
        }
        projection.column_data = true;
        Ok(())
    }

    fn fold_legacy_columns(&mut self, pos: ChunkPos, chunk: &LegacyChunk<'_>) {
        let max = self.max_height;
        let projection = self.projection_mut(pos);
        for cx in 0..CHUNK_WIDTH {
            for cz in 0..CHUNK_WIDTH {
                if !projection.column_data
                    && let Some(h) = chunk.height_column(cx, cz)
                {
                    projection.height_col[cx][cz] = h.min(max);
                }
                if let Some(word) = chunk.grass_and_biome(cx, cz) {
                    projection.grass_and_biome[cx][cz] = word;
                }
            }
        }
    }

    /// Top-down scan of every column in `source`, whose layer 0 sits at `base_y`.
    fn fold_blocks(
        &mut self,
        pos: ChunkPos,
        base_y: usize,
        source: &dyn BlockSource,
        diag: &mut Diagnostics,
    ) {
        let max = usize::from(self.max_height);
        if base_y > max {
            return;
        }
        let layers = source.height().min(max - base_y + 1);
        let (origin_x, origin_z) = pos.world_origin();
        let flags = &self.flags;
        let points = &mut self.points;
        let projection = self.chunks.entry(pos).or_default();

        for cx in 0..CHUNK_WIDTH {
            for cz in 0..CHUNK_WIDTH {
                let mut settled = false;
                let mut highest_solid = None;
                for cy in (0..layers).rev() {
                    let id = source.block_at(cx, cz, cy);
                    if id == AIR || id == UNRESOLVED_BLOCK {
                        continue;
                    }
                    if usize::from(id) >= BLOCK_ID_LIMIT {
                        diag.record_invalid_block(id);
                        continue;
                    }
                    let y = base_y + cy;
                    highest_solid.get_or_insert(y);
                    if flags.is_hidden(id) {
                        continue;
                    }
                    let forced_block = flags.is_forced(id);
                    if settled && !forced_block {
                        continue;
                    }
                    let slot_forced = projection.forced[cx][cz];
                    let current_y = usize::from(projection.top_y[cx][cz]);
                    let wins = if forced_block {
                        !slot_forced || y > current_y
                    } else {
                        !slot_forced && (projection.top_block[cx][cz] == AIR || y > current_y)
                    };
                    if wins {
                        projection.top_block[cx][cz] = id;
                        projection.top_data[cx][cz] = source.data_at(cx, cz, cy);
                        projection.top_y[cx][cz] = y as u8;
                        projection.forced[cx][cz] = forced_block;
                        let above = if cy + 1 < source.height() {
                            source.light_at(cx, cz, cy + 1).map(|l| l.packed())
                        } else {
                            Some(OPEN_SKY_LIGHT)
                        };
                        if let Some(light) = above {
                            projection.top_light[cx][cz] = light;
                        }
                    }
                    if forced_block {
                        break;
                    }
                    settled = true;
                    if !flags.any_force_top {
                        break;
                    }
                }

                if !projection.column_data
                    && let Some(y) = highest_solid
                {
                    let y = y as u8;
                    if y > projection.height_col[cx][cz] {
                        projection.height_col[cx][cz] = y;
                    }
                }

                if flags.any_geojson {
                    for cy in 0..layers {
                        let id = source.block_at(cx, cz, cy);
                        if usize::from(id) < BLOCK_ID_LIMIT && flags.is_geojson(id) {
                            points.push(PointOfInterest {
                                id,
                                data: source.data_at(cx, cz, cy),
                                x: origin_x + cx as i64,
                                y: (base_y + cy) as i64,
                                z: origin_z + cz as i64,
                            });
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmap_chunk::decode::CUBIC_LEN_WITH_LIGHT;

    struct NoNames;

    impl BlockResolver for NoNames {
        fn resolve(&self, _name: &str, _val: i16) -> Option<(u16, u8)> {
            None
        }
    }

    /// Byte subchunk with the given `(cx, cz, cy, id, data)` blocks and full sky light.
    fn cubic(blocks: &[(usize, usize, usize, u8, u8)]) -> Vec<u8> {
        let mut bytes = vec![0u8; CUBIC_LEN_WITH_LIGHT];
        for b in &mut bytes[1 + 4096 + 2048..1 + 4096 + 4096] {
            *b = 0xff;
        }
        for &(cx, cz, cy, id, data) in blocks {
            let i = (cx * 16 + cz) * 16 + cy;
            bytes[1 + i] = id;
            let at = 1 + 4096 + i / 2;
            bytes[at] |= if i & 1 == 0 { data & 0x0f } else { data << 4 };
        }
        bytes
    }

    fn accumulator(flags: BlockFlags) -> DimensionAccumulator {
        DimensionAccumulator::new(DimensionId::Overworld, 127, flags)
    }

    fn add(acc: &mut DimensionAccumulator, pos: ChunkPos, sy: u8, bytes: &[u8]) {
        let mut diag = Diagnostics::default();
        acc.add_chunk_block_data(ChunkFormat::CubicByte, pos, sy, bytes, &NoNames, &mut diag)
            .unwrap();
    }

    #[test]
    fn test_bounds_track_min_max() {
        let mut acc = accumulator(BlockFlags::default());
        assert!(!acc.chunk_bounds().is_valid());
        assert_eq!(acc.world_point_to_image_point(0, 0), None);
        for (x, z) in [(3, -2), (-5, 4), (0, 0), (2, 7)] {
            acc.add_to_chunk_bounds(ChunkPos::new(x, z));
        }
        let b = acc.chunk_bounds();
        assert_eq!((b.min_x, b.max_x, b.min_z, b.max_z), (-5, 3, -2, 7));
        assert_eq!(b.image_width(), 9 * 16);
        assert_eq!(b.image_height(), 10 * 16);
        // Chunk (min_x, min_z) maps to the image origin.
        assert_eq!(acc.world_point_to_image_point(-5 * 16, -2 * 16), Some((0, 0)));
        assert_eq!(acc.world_point_to_image_point(0, 0), Some((80, 32)));

        acc.invalidate_bounds();
        assert!(!acc.chunk_bounds().is_valid());
        assert_eq!(acc.chunk_bounds().width_chunks(), 0);
    }

    #[test]
    fn test_higher_subchunk_wins() {
        let mut acc = accumulator(BlockFlags::default());
        let pos = ChunkPos::new(0, 0);
        add(&mut acc, pos, 1, &cubic(&[(2, 3, 4, 1, 0)]));
        add(&mut acc, pos, 0, &cubic(&[(2, 3, 15, 3, 1)]));
        let p = acc.chunk(pos).unwrap();
        assert_eq!(p.top_block[2][3], 1);
        assert_eq!(p.top_y[2][3], 20);
        assert_eq!(p.height_col[2][3], 20);
        assert_eq!(p.top_block[0][0], AIR);
    }

    #[test]
    fn test_hidden_blocks_are_skipped() {
        let mut acc = accumulator(BlockFlags::new(&[18], &[], &[]));
        let pos = ChunkPos::new(0, 0);
        add(&mut acc, pos, 4, &cubic(&[(1, 1, 9, 18, 0), (1, 1, 2, 2, 0)]));
        let p = acc.chunk(pos).unwrap();
        assert_eq!(p.top_block[1][1], 2);
        assert_eq!(p.top_y[1][1], 66);
        // The height column still sees the leaves.
        assert_eq!(p.height_col[1][1], 73);
    }

    #[test]
    fn test_force_top_is_sticky() {
        let mut acc = accumulator(BlockFlags::new(&[], &[56], &[]));
        let pos = ChunkPos::new(0, 0);
        add(&mut acc, pos, 0, &cubic(&[(0, 0, 12, 1, 0), (0, 0, 5, 56, 0)]));
        add(&mut acc, pos, 3, &cubic(&[(0, 0, 0, 2, 0)]));
        let p = acc.chunk(pos).unwrap();
        assert_eq!(p.top_block[0][0], 56);
        assert_eq!(p.top_y[0][0], 5);
        assert!(p.is_forced(0, 0));
    }

    #[test]
    fn test_light_is_sampled_above_surface() {
        let mut acc = accumulator(BlockFlags::default());
        let pos = ChunkPos::new(0, 0);
        add(&mut acc, pos, 0, &cubic(&[(4, 4, 3, 1, 0)]));
        assert_eq!(acc.chunk(pos).unwrap().top_light[4][4], 0xf0);
    }

    #[test]
    fn test_column_data_overrides_scanned_height() {
        let mut acc = accumulator(BlockFlags::default());
        let pos = ChunkPos::new(1, 1);
        let mut column = vec![0u8; voxmap_chunk::decode::COLUMN_DATA_LEN];
        column[0..2].copy_from_slice(&300i16.to_le_bytes());
        column[2..4].copy_from_slice(&(-4i16).to_le_bytes());
        column[512..516].copy_from_slice(&((0x11_22_33u32 << 8) | 4).to_le_bytes());
        acc.add_chunk_column_data(pos, &column).unwrap();
        add(&mut acc, pos, 5, &cubic(&[(0, 0, 0, 1, 0)]));

        let p = acc.chunk(pos).unwrap();
        assert!(p.has_column_data());
        assert_eq!(p.height_col[0][0], 127);
        assert_eq!(p.height_col[1][0], 0);
        // The 8x8 word grid covers 2x2 columns per word.
        assert_eq!(p.grass_and_biome[1][1], (0x11_22_33 << 8) | 4);
        assert_eq!(p.top_y[0][0], 80);
    }

    #[test]
    fn test_blocks_above_max_height_are_ignored() {
        let mut acc = accumulator(BlockFlags::default());
        let pos = ChunkPos::new(0, 0);
        add(&mut acc, pos, 8, &cubic(&[(0, 0, 0, 1, 0)]));
        add(&mut acc, pos, 7, &cubic(&[(0, 0, 15, 3, 0), (1, 0, 14, 3, 0)]));
        let p = acc.chunk(pos).unwrap();
        assert_eq!(p.top_block[0][0], 3);
        assert_eq!(p.top_y[0][0], 127);
        assert_eq!(p.top_y[1][0], 126);
    }

    #[test]
    fn test_geojson_points_in_world_coordinates() {
        let mut acc = accumulator(BlockFlags::new(&[], &[], &[54]));
        add(&mut acc, ChunkPos::new(-1, 2), 4, &cubic(&[(3, 5, 1, 54, 2)]));
        assert_eq!(
            acc.points_of_interest(),
            &[PointOfInterest {
                id: 54,
                data: 2,
                x: -13,
                y: 65,
                z: 37,
            }]
        );
    }

    #[test]
    fn test_unresolved_palette_names_are_recorded() {
        use voxmap_chunk::decode::{PackedIndices, PaletteEntry, encode_palette_subchunk};

        let palette = vec![
            PaletteEntry {
                name: "minecraft:air".to_string(),
                val: 0,
            },
            PaletteEntry {
                name: "minecraft:mystery".to_string(),
                val: 0,
            },
        ];
        let mut indices = PackedIndices::new(1, 4096);
        indices.set(0, 1);
        let bytes = encode_palette_subchunk(&palette, &indices).unwrap();

        let mut acc = accumulator(BlockFlags::default());
        let mut diag = Diagnostics::default();
        acc.add_chunk_block_data(
            ChunkFormat::Palette,
            ChunkPos::new(0, 0),
            0,
            &bytes,
            &NoNames,
            &mut diag,
        )
        .unwrap();
        assert_eq!(diag.unresolved_names["minecraft:mystery"], 1);
        assert_eq!(acc.chunk(ChunkPos::new(0, 0)).unwrap().top_block[0][0], AIR);
    }

    #[test]
    fn test_slime_only_in_overworld() {
        let over = accumulator(BlockFlags::default());
        let nether = DimensionAccumulator::new(DimensionId::Nether, 127, BlockFlags::default());
        let pos = ChunkPos::new(-1, 0);
        assert!(over.is_slime_chunk(pos));
        assert!(!nether.is_slime_chunk(pos));
    }
}
