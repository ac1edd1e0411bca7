//! Box extraction into the classic `.schematic` format.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use voxmap_chunk::{BlockResolver, CHUNK_WIDTH, ChunkPos, ChunkStore, DimensionId, RawChunk};
use voxmap_config::{MAX_SCHEMATIC_VOLUME, SchematicRegion};

use crate::error::WorldError;

/// Root tag name of a schematic file.
pub const SCHEMATIC_ROOT: &str = "Schematic";

/// Heights outside this range are air.
const WORLD_HEIGHT: i64 = 256;

/// Inclusive box with its corners normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Extent {
    min: (i64, i64, i64),
    max: (i64, i64, i64),
}

impl Extent {
    fn new(region: &SchematicRegion) -> Self {
        let (a, b) = (region.min, region.max);
        Self {
            min: (
                i64::from(a.0.min(b.0)),
                i64::from(a.1.min(b.1)),
                i64::from(a.2.min(b.2)),
            ),
            max: (
                i64::from(a.0.max(b.0)),
                i64::from(a.1.max(b.1)),
                i64::from(a.2.max(b.2)),
            ),
        }
    }

    fn width(&self) -> i64 {
        self.max.0 - self.min.0 + 1
    }

    fn height(&self) -> i64 {
        self.max.1 - self.min.1 + 1
    }

    fn length(&self) -> i64 {
        self.max.2 - self.min.2 + 1
    }
}

/// Output path of a region: `<out>/voxmap.schematic.<name>.nbt`.
pub fn schematic_path(out_dir: &Path, region: &SchematicRegion) -> PathBuf {
    out_dir.join(format!("voxmap.schematic.{}.nbt", region.name))
}

/// Reads the blocks of `region` into a `Schematic` compound.
///
/// Blocks are stored in y, z, x order. Chunks missing from the store are air.
/// Boxes over [`MAX_SCHEMATIC_VOLUME`] blocks are rejected before allocating.
pub fn build_schematic(
    store: &mut dyn ChunkStore,
    resolver: &dyn BlockResolver,
    region: &SchematicRegion,
) -> Result<NbtCompound, WorldError> {
    let invalid = |reason: String| WorldError::Schematic {
        name: region.name.clone(),
        reason,
    };
    let dimension = DimensionId::from_id(region.dimension)
        .ok_or_else(|| invalid(format!("unknown dimension {}", region.dimension)))?;
    let extent = Extent::new(region);
    let (width, height, length) = (extent.width(), extent.height(), extent.length());
    for (axis, size) in [("width", width), ("height", height), ("length", length)] {
        if size > i64::from(i16::MAX) {
            return Err(invalid(format!("{axis} {size} exceeds {}", i16::MAX)));
        }
    }

    let volume = (width as u64)
        .checked_mul(height as u64)
        .and_then(|area| area.checked_mul(length as u64))
        .filter(|&volume| volume <= MAX_SCHEMATIC_VOLUME)
        .ok_or_else(|| invalid(format!("box exceeds {MAX_SCHEMATIC_VOLUME} blocks")))?;
    let mut blocks = vec![0i8; volume as usize];
    let mut data = vec![0i8; volume as usize];
    let mut truncated_ids = 0u64;

    let chunk_width = CHUNK_WIDTH as i64;
    let chunk_range = |min: i64, max: i64| {
        (min.div_euclid(chunk_width) as i32)..=(max.div_euclid(chunk_width) as i32)
    };
    for chunk_z in chunk_range(extent.min.2, extent.max.2) {
        for chunk_x in chunk_range(extent.min.0, extent.max.0) {
            let pos = ChunkPos::new(chunk_x, chunk_z);
            let Some(raw) = RawChunk::load(store, dimension, pos)? else {
                tracing::warn!(%pos, %dimension, schematic = %region.name, "Missing chunk; using air");
                continue;
            };
            let column = raw.decode(resolver, &mut |index, e| {
                tracing::warn!(%pos, ?index, schematic = %region.name, "Using air for undecodable blocks: {e}");
            });

            let (origin_x, origin_z) = pos.world_origin();
            let x_range = extent.min.0.max(origin_x)..=extent.max.0.min(origin_x + chunk_width - 1);
            let z_range = extent.min.2.max(origin_z)..=extent.max.2.min(origin_z + chunk_width - 1);
            let y_range = extent.min.1.max(0)..=extent.max.1.min(WORLD_HEIGHT - 1);
            for y in y_range {
                for z in z_range.clone() {
                    for x in x_range.clone() {
                        let (id, meta) = column.block(
                            (x - origin_x) as usize,
                            (z - origin_z) as usize,
                            y as usize,
                        );
                        if id > u16::from(u8::MAX) {
                            truncated_ids += 1;
                        }
                        let at = (((y - extent.min.1) * length + (z - extent.min.2)) * width
                            + (x - extent.min.0)) as usize;
                        blocks[at] = id as u8 as i8;
                        data[at] = meta as i8;
                    }
                }
            }
        }
    }
    if truncated_ids > 0 {
        tracing::warn!(
            schematic = %region.name,
            count = truncated_ids,
            "Block ids above 255 were truncated to one byte"
        );
    }

    let mut root = NbtCompound::new();
    root.insert("Width", NbtTag::Short(width as i16));
    root.insert("Height", NbtTag::Short(height as i16));
    root.insert("Length", NbtTag::Short(length as i16));
    root.insert("Materials", NbtTag::String("Alpha".to_string()));
    root.insert("Blocks", NbtTag::ByteArray(blocks));
    root.insert("Data", NbtTag::ByteArray(data));
    root.insert("Entities", NbtTag::List(NbtList::new()));
    root.insert("TileEntities", NbtTag::List(NbtList::new()));
    Ok(root)
}

/// Extracts `region` and writes it gzip-compressed into `out_dir`.
pub fn export_schematic(
    store: &mut dyn ChunkStore,
    resolver: &dyn BlockResolver,
    region: &SchematicRegion,
    out_dir: &Path,
) -> Result<PathBuf, WorldError> {
    let root = build_schematic(store, resolver, region)?;
    let path = schematic_path(out_dir, region);
    let mut writer = BufWriter::new(File::create(&path)?);
    quartz_nbt::io::write_nbt(&mut writer, Some(SCHEMATIC_ROOT), &root, Flavor::GzCompressed)?;
    writer.flush()?;
    tracing::info!(schematic = %region.name, path = %path.display(), "Wrote schematic");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmap_chunk::decode::{CUBIC_LEN_NO_LIGHT, CUBIC_LEN_WITH_LIGHT};
    use voxmap_chunk::{MemoryStore, subchunk_key};

    struct NoNames;

    impl BlockResolver for NoNames {
        fn resolve(&self, _name: &str, _val: i16) -> Option<(u16, u8)> {
            None
        }
    }

    fn region(min: (i32, i32, i32), max: (i32, i32, i32)) -> SchematicRegion {
        SchematicRegion {
            name: "box".to_string(),
            dimension: 0,
            min,
            max,
        }
    }

    fn byte_array<'a>(root: &'a NbtCompound, name: &str) -> &'a [i8] {
        match root.inner().get(name) {
            Some(NbtTag::ByteArray(bytes)) => bytes,
            other => panic!("{name}: {other:?}"),
        }
    }

    fn short(root: &NbtCompound, name: &str) -> i16 {
        root.get::<_, i16>(name).unwrap()
    }

    #[test]
    fn test_blocks_in_yzx_order_across_chunks() {
        let mut store = MemoryStore::new();
        // Chunk (-1, 0): stone at world (-1, 1, 0).
        let mut west = vec![0u8; CUBIC_LEN_NO_LIGHT];
        west[1 + (15 * 16) * 16 + 1] = 1;
        store.insert(subchunk_key(DimensionId::Overworld, ChunkPos::new(-1, 0), 0), west);
        // Chunk (0, 0): dirt with data 2 at world (0, 0, 1), stored with light.
        let mut east = vec![0u8; CUBIC_LEN_WITH_LIGHT];
        east[1 + (0 * 16 + 1) * 16] = 3;
        east[1 + 4096 + 16 / 2] = 0x02;
        store.insert(subchunk_key(DimensionId::Overworld, ChunkPos::new(0, 0), 0), east);

        // Corners given in the wrong order are normalized.
        let root = build_schematic(&mut store, &NoNames, &region((0, 1, 1), (-1, 0, 0))).unwrap();
        assert_eq!(short(&root, "Width"), 2);
        assert_eq!(short(&root, "Height"), 2);
        assert_eq!(short(&root, "Length"), 2);
        assert_eq!(root.get::<_, &str>("Materials").unwrap(), "Alpha");

        let blocks = byte_array(&root, "Blocks");
        let index = |x: i64, y: i64, z: i64| (((y * 2) + z) * 2 + (x + 1)) as usize;
        assert_eq!(blocks[index(-1, 1, 0)], 1);
        assert_eq!(blocks[index(0, 0, 1)], 3);
        assert_eq!(blocks.iter().filter(|&&b| b != 0).count(), 2);
        let data = byte_array(&root, "Data");
        assert_eq!(data[index(0, 0, 1)], 2);
        assert_eq!(data[index(-1, 1, 0)], 0);
    }

    #[test]
    fn test_missing_chunks_are_air() {
        let mut store = MemoryStore::new();
        let root = build_schematic(&mut store, &NoNames, &region((0, 0, 0), (20, 3, 20))).unwrap();
        let blocks = byte_array(&root, "Blocks");
        assert_eq!(blocks.len(), 21 * 4 * 21);
        assert!(blocks.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        let mut store = MemoryStore::new();
        let mut bad = region((0, 0, 0), (1, 1, 1));
        bad.dimension = 9;
        assert!(matches!(
            build_schematic(&mut store, &NoNames, &bad),
            Err(WorldError::Schematic { .. })
        ));
    }

    #[test]
    fn test_oversize_box_rejected_before_allocating() {
        let mut store = MemoryStore::new();
        let huge = region((0, 0, 0), (32766, 32766, 32766));
        assert!(matches!(
            build_schematic(&mut store, &NoNames, &huge),
            Err(WorldError::Schematic { .. })
        ));
    }

    #[test]
    fn test_export_writes_gzip_big_endian() {
        let mut store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let path = export_schematic(&mut store, &NoNames, &region((0, 0, 0), (1, 1, 1)), dir.path())
            .unwrap();
        assert_eq!(path, dir.path().join("voxmap.schematic.box.nbt"));

        let (root, name) =
            quartz_nbt::io::read_nbt(&mut File::open(&path).unwrap(), Flavor::GzCompressed)
                .unwrap();
        assert_eq!(name, SCHEMATIC_ROOT);
        assert_eq!(short(&root, "Width"), 2);
        assert_eq!(byte_array(&root, "Blocks").len(), 8);
    }
}
