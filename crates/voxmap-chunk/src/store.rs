//! Ordered key-value access to world records.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::error::StoreError;

/// An ordered store of world records.
///
/// Iteration visits keys in bytewise ascending order, matching LevelDB's
/// default comparator.
pub trait ChunkStore {
    /// Looks up a single record.
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Visits every record in key order until `visit` breaks.
    ///
    /// Returns the number of records visited.
    fn scan(
        &mut self,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> Result<u64, StoreError>;
}

/// In-memory store backed by a `BTreeMap`.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.records.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ChunkStore for MemoryStore {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    fn scan(
        &mut self,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> Result<u64, StoreError> {
        let mut visited = 0;
        for (key, value) in &self.records {
            visited += 1;
            if visit(key.as_slice(), value.as_slice()).is_break() {
                break;
            }
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_is_key_ordered() {
        let mut store = MemoryStore::new();
        store.insert(b"b".to_vec(), b"2".to_vec());
        store.insert(b"a".to_vec(), b"1".to_vec());
        store.insert(vec![0xffu8], b"3".to_vec());
        let mut seen = Vec::new();
        let n = store
            .scan(&mut |k, _| {
                seen.push(k.to_vec());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), vec![0xff]]);
    }

    #[test]
    fn test_scan_stops_on_break() {
        let mut store = MemoryStore::new();
        for i in 0u8..10 {
            store.insert(vec![i], vec![i]);
        }
        let n = store
            .scan(&mut |k, _| {
                if k[0] == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(n, 4);
    }

    #[test]
    fn test_get_missing() {
        let mut store = MemoryStore::new();
        store.insert(b"k".to_vec(), b"v".to_vec());
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get(b"x").unwrap(), None);
    }
}
