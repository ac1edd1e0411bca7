//! World metadata: `level.dat` and `levelname.txt`.

use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use voxmap_chunk::nbt::{self, Compound, Tag};

use crate::error::WorldError;

pub const LEVEL_DAT: &str = "level.dat";
pub const LEVEL_NAME: &str = "levelname.txt";

/// Fields of `level.dat` the renderer needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelInfo {
    /// Storage version from the file header.
    pub storage_version: i32,
    pub seed: i64,
    /// World spawn block (x, y, z).
    pub spawn: (i32, i32, i32),
}

impl LevelInfo {
    /// Reads `<world>/level.dat`.
    pub fn load(world_dir: &Path) -> Result<Self, WorldError> {
        let path = world_dir.join(LEVEL_DAT);
        let level_error = |reason: String| WorldError::LevelFile {
            path: path.clone(),
            reason,
        };
        let bytes = std::fs::read(&path).map_err(|e| level_error(e.to_string()))?;
        let info = Self::parse(&bytes).map_err(level_error)?;
        tracing::info!(
            version = info.storage_version,
            seed = info.seed,
            "Found world spawn: x={} y={} z={}",
            info.spawn.0,
            info.spawn.1,
            info.spawn.2
        );
        Ok(info)
    }

    /// Parses the 8-byte header (version, payload length) and the
    /// little-endian NBT root that follows it.
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let mut header = Cursor::new(bytes);
        let storage_version = header
            .read_i32::<LittleEndian>()
            .map_err(|_| "missing header".to_string())?;
        let length = header
            .read_i32::<LittleEndian>()
            .map_err(|_| "missing header".to_string())?;
        let length = usize::try_from(length).map_err(|_| format!("negative payload length {length}"))?;
        let payload = bytes
            .get(8..8 + length)
            .ok_or_else(|| format!("payload length {length} exceeds file size {}", bytes.len()))?;

        let (_, root) = nbt::read_le_compound(&mut Cursor::new(payload)).map_err(|e| e.to_string())?;
        Ok(Self {
            storage_version,
            seed: required(&root, "RandomSeed", Tag::as_i64)?,
            spawn: (
                required(&root, "SpawnX", Tag::as_i32)?,
                required(&root, "SpawnY", Tag::as_i32)?,
                required(&root, "SpawnZ", Tag::as_i32)?,
            ),
        })
    }
}

fn required<T>(root: &Compound, name: &str, get: fn(&Tag) -> Option<T>) -> Result<T, String> {
    root.get(name)
        .and_then(get)
        .ok_or_else(|| format!("missing or mistyped tag {name}"))
}

/// Display name from `levelname.txt`, falling back to the directory name.
pub fn world_name(world_dir: &Path) -> String {
    let fallback = || {
        world_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "world".to_string())
    };
    match std::fs::read_to_string(world_dir.join(LEVEL_NAME)) {
        Ok(text) => match text.lines().next().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                tracing::warn!(dir = %world_dir.display(), "Empty {LEVEL_NAME}; using directory name");
                fallback()
            }
        },
        Err(e) => {
            tracing::warn!(dir = %world_dir.display(), "Cannot read {LEVEL_NAME}: {e}");
            fallback()
        }
    }
}

/// Builds `level.dat` bytes; used to set up test worlds.
pub fn encode_level_dat(version: i32, seed: i64, spawn: (i32, i32, i32)) -> Result<Vec<u8>, WorldError> {
    let mut root = Compound::new();
    root.insert("RandomSeed".to_string(), Tag::Long(seed));
    root.insert("SpawnX".to_string(), Tag::Int(spawn.0));
    root.insert("SpawnY".to_string(), Tag::Int(spawn.1));
    root.insert("SpawnZ".to_string(), Tag::Int(spawn.2));
    root.insert("LevelName".to_string(), Tag::String("voxmap".to_string()));
    let payload = nbt::write_le("", &root)?;

    let mut bytes = Vec::with_capacity(8 + payload.len());
    bytes.extend_from_slice(&version.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_dat() {
        let bytes = encode_level_dat(8, -1234567890123, (10, 64, -20)).unwrap();
        let info = LevelInfo::parse(&bytes).unwrap();
        assert_eq!(info.storage_version, 8);
        assert_eq!(info.seed, -1234567890123);
        assert_eq!(info.spawn, (10, 64, -20));
    }

    #[test]
    fn test_truncated_level_dat_rejected() {
        let bytes = encode_level_dat(8, 1, (0, 0, 0)).unwrap();
        assert!(LevelInfo::parse(&bytes[..bytes.len() - 4]).is_err());
        assert!(LevelInfo::parse(&bytes[..5]).is_err());
    }

    #[test]
    fn test_missing_seed_rejected() {
        let mut root = Compound::new();
        root.insert("SpawnX".to_string(), Tag::Int(0));
        let payload = nbt::write_le("", &root).unwrap();
        let mut bytes = vec![8, 0, 0, 0];
        bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        let err = LevelInfo::parse(&bytes).unwrap_err();
        assert!(err.contains("RandomSeed"));
    }

    #[test]
    fn test_missing_level_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            LevelInfo::load(dir.path()),
            Err(WorldError::LevelFile { .. })
        ));
    }

    #[test]
    fn test_world_name_sources() {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("my-world");
        std::fs::create_dir(&world).unwrap();
        assert_eq!(world_name(&world), "my-world");

        std::fs::write(world.join(LEVEL_NAME), "Castle Build\n").unwrap();
        assert_eq!(world_name(&world), "Castle Build");
    }
}
