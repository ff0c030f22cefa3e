use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::Result;
use super::loader::load_file;
use super::model::GridTable;

// ---------------------------------------------------------------------------
// Memoized dataset loads
// ---------------------------------------------------------------------------

/// Loaded tables keyed by canonical path.
///
/// Each distinct file is read at most once for the lifetime of the cache;
/// the table is immutable afterwards and handed out as a shared `Arc`.
/// Failed loads are not cached.
#[derive(Debug, Default)]
pub struct DatasetCache {
    tables: HashMap<PathBuf, Arc<GridTable>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, loading it on first use.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<GridTable>> {
        let key = cache_key(path);
        if let Some(table) = self.tables.get(&key) {
            log::debug!("Dataset cache hit for {}", key.display());
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(load_file(path)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Number of distinct files loaded so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Canonicalize so `./data/x.csv` and `data/x.csv` share one entry.
/// Paths that cannot be canonicalized (missing files) are used as given.
fn cache_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::GridError;

    const CSV: &str = "grid_id,grid_segment,grid_segment_kmeans,grid_score,building_density,\
yellow_building_density,total_road_density,empty,waterbody\n\
1,A,K0,10,0.5,0,0,0,0\n";

    #[test]
    fn test_repeated_load_returns_same_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grids.csv");
        std::fs::write(&path, CSV).unwrap();

        let mut cache = DatasetCache::new();
        let first = cache.get_or_load(&path).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let alias = dir.path().join(".").join("grids.csv");
        let third = cache.get_or_load(&alias).unwrap();
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cached_table_survives_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grids.csv");
        std::fs::write(&path, CSV).unwrap();

        let mut cache = DatasetCache::new();
        let first = cache.get_or_load(&path).unwrap();

        std::fs::write(&path, format!("{CSV}2,B,K1,20,0.2,0,0,0,0\n")).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert_eq!(second.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.csv");

        let mut cache = DatasetCache::new();
        assert!(matches!(cache.get_or_load(&path), Err(GridError::DataLoad { .. })));
        assert!(cache.is_empty());

        std::fs::write(&path, CSV).unwrap();
        assert_eq!(cache.get_or_load(&path).unwrap().len(), 1);
    }
}
