//! LevelDB-backed [`ChunkStore`] for on-disk worlds.
//!
//! World databases compress table blocks with zlib (compressor id 2) or raw
//! deflate (id 4) instead of LevelDB's snappy default, so both are registered
//! alongside the uncompressed id 0.

use std::io::{Read, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use flate2::Compression;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use rusty_leveldb::compressor::NoneCompressor;
use rusty_leveldb::{BloomPolicy, Compressor, CompressorList, DB, LdbIterator, Options};
use voxmap_chunk::{ChunkStore, StoreError};
use voxmap_config::StoreConfig;

/// Compressor id of zlib-wrapped blocks.
pub const ZLIB_COMPRESSOR_ID: u8 = 2;
/// Compressor id of raw deflate blocks.
pub const RAW_DEFLATE_COMPRESSOR_ID: u8 = 4;

struct ZlibCompressor;

impl Compressor for ZlibCompressor {
    fn encode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&block)?;
        Ok(encoder.finish()?)
    }

    fn decode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(block.len() * 2);
        ZlibDecoder::new(&block[..]).read_to_end(&mut out)?;
        Ok(out)
    }
}

struct RawDeflateCompressor;

impl Compressor for RawDeflateCompressor {
    fn encode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&block)?;
        Ok(encoder.finish()?)
    }

    fn decode(&self, block: Vec<u8>) -> rusty_leveldb::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(block.len() * 2);
        DeflateDecoder::new(&block[..]).read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Read options for a world database. `paranoid` turns on consistency checks.
fn world_options(config: &StoreConfig, paranoid: bool) -> Options {
    let mut compressors = CompressorList::new();
    compressors.set_with_id(0, NoneCompressor);
    compressors.set_with_id(ZLIB_COMPRESSOR_ID, ZlibCompressor);
    compressors.set_with_id(RAW_DEFLATE_COMPRESSOR_ID, RawDeflateCompressor);

    let mut options = Options {
        create_if_missing: false,
        paranoid_checks: paranoid,
        block_size: config.block_size,
        compressor: RAW_DEFLATE_COMPRESSOR_ID,
        compressor_list: Rc::new(compressors),
        ..Options::default()
    };
    if config.bloom_filter_bits > 0 {
        options.filter_policy = Rc::new(Box::new(BloomPolicy::new(config.bloom_filter_bits)));
    }
    options
}

/// A world's `db/` directory opened read-only in practice.
///
/// The handle is not `Send`; it stays on the thread that opened it.
pub struct LevelDbStore {
    db: DB,
    path: PathBuf,
}

impl LevelDbStore {
    /// Opens the database at `path`.
    ///
    /// With `config.repair` set, a failed open is retried once with
    /// consistency checks relaxed.
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        let open_error = |reason: String| StoreError::Open {
            path: path.display().to_string(),
            reason,
        };
        if !path.is_dir() {
            return Err(open_error("not a directory".to_string()));
        }

        let db = match DB::open(path, world_options(config, true)) {
            Ok(db) => db,
            Err(e) if config.repair => {
                tracing::warn!(path = %path.display(), "Store open failed ({e}); retrying in repair mode");
                DB::open(path, world_options(config, false)).map_err(|e| open_error(e.to_string()))?
            }
            Err(e) => return Err(open_error(e.to_string())),
        };
        tracing::info!(
            path = %path.display(),
            block_size = config.block_size,
            bloom_filter_bits = config.bloom_filter_bits,
            "Opened world store"
        );
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkStore for LevelDbStore {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key).map(|value| value.to_vec()))
    }

    fn scan(
        &mut self,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> Result<u64, StoreError> {
        let mut iter = self
            .db
            .new_iter()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        let mut visited = 0;
        while let Some((key, value)) = iter.next() {
            visited += 1;
            if visit(&key[..], &value[..]).is_break() {
                break;
            }
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_db(path: &Path, records: &[(&str, &str)]) {
        let mut options = world_options(&StoreConfig::default(), true);
        options.create_if_missing = true;
        let mut db = DB::open(path, options).unwrap();
        for (key, value) in records {
            db.put(key.as_bytes(), value.as_bytes()).unwrap();
        }
        db.flush().unwrap();
    }

    #[test]
    fn test_compressors_invert() {
        let block = b"chunk chunk chunk chunk chunk".repeat(8);
        for compressor in [
            &ZlibCompressor as &dyn Compressor,
            &RawDeflateCompressor as &dyn Compressor,
        ] {
            let packed = compressor.encode(block.clone()).unwrap();
            assert!(packed.len() < block.len());
            assert_eq!(compressor.decode(packed).unwrap(), block);
        }
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = LevelDbStore::open(&dir.path().join("db"), &StoreConfig::default());
        assert!(matches!(result, Err(StoreError::Open { .. })));
    }

    #[test]
    fn test_scan_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        write_db(&path, &[("b", "2"), ("a", "1"), ("c", "3")]);

        let mut store = LevelDbStore::open(&path, &StoreConfig::default()).unwrap();
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.get(b"z").unwrap(), None);

        let mut keys = Vec::new();
        let visited = store
            .scan(&mut |key, _| {
                keys.push(key.to_vec());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(visited, 3);
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_scan_stops_on_break() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        write_db(&path, &[("a", "1"), ("b", "2")]);
        let mut store = LevelDbStore::open(&path, &StoreConfig::default()).unwrap();
        let visited = store.scan(&mut |_, _| ControlFlow::Break(())).unwrap();
        assert_eq!(visited, 1);
    }
}
