use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::loader::load_raw;
use super::model::NormalizedTable;
use super::normalize::{normalize, NormalizeOptions};
use crate::error::{LoadError, LoadResult};

// ---------------------------------------------------------------------------
// Source identity
// ---------------------------------------------------------------------------

/// Identifies one version of a source file: same path, same size and same
/// modification time means the normalized table can be reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceKey {
    pub fn of(path: &Path) -> LoadResult<Self> {
        let path = path
            .canonicalize()
            .map_err(|e| LoadError::data_load(path, e))?;
        let meta = std::fs::metadata(&path).map_err(|e| LoadError::data_load(&path, e))?;
        Ok(SourceKey {
            len: meta.len(),
            modified: meta.modified().ok(),
            path,
        })
    }
}

// ---------------------------------------------------------------------------
// TableCache
// ---------------------------------------------------------------------------

/// Load-once store of normalized tables.
///
/// Owned by the application state and handed to whoever needs a table; there
/// is no global instance. Entries live until `clear`/`invalidate` or process
/// exit.
#[derive(Debug, Default)]
pub struct TableCache {
    options: NormalizeOptions,
    entries: HashMap<SourceKey, Arc<NormalizedTable>>,
}

impl TableCache {
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            entries: HashMap::new(),
        }
    }

    /// Return the normalized table for `path`, parsing it only on a miss.
    pub fn get_or_load(&mut self, path: &Path) -> LoadResult<Arc<NormalizedTable>> {
        let key = SourceKey::of(path)?;
        if let Some(table) = self.entries.get(&key) {
            log::debug!(
                "Cache hit for {} ({} bytes, modified {:?})",
                key.path.display(),
                key.len,
                key.modified
            );
            return Ok(Arc::clone(table));
        }

        // A changed file replaces its stale entry.
        self.entries.retain(|k, _| k.path != key.path);

        let raw = load_raw(&key.path)?;
        let table = Arc::new(normalize(raw, &key.path, &self.options)?);
        log::info!(
            "Loaded {} records from {} ({} read, {} duplicates dropped)",
            table.len(),
            key.path.display(),
            table.report.rows_read,
            table.report.duplicates_dropped
        );
        self.entries.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Drop the entry for one source file.
    pub fn invalidate(&mut self, path: &Path) {
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.entries.retain(|k, _| k.path != target);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CSV: &str = "FACTORY,WORK_SHAPE,INPUT_ED,INPUT_LENGTH,INPUT_QTY,DIRECTION_ED,OUTPUT_ED,STEEL_CATEGORY,WORK_START_DT,WORK_END_DT\n\
        F1,1,120,3000,10,110,110.1,CARBON,2023-01-01 08:00:00,2023-01-01 08:45:00\n\
        F1,1,120,3000,10,110,110.1,CARBON,2023-01-01 08:00:00,2023-01-01 08:45:00\n";

    fn csv_file() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        file
    }

    #[test]
    fn second_load_is_a_cache_hit() {
        let file = csv_file();
        let mut cache = TableCache::default();
        let first = cache.get_or_load(file.path()).unwrap();
        let second = cache.get_or_load(file.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_forces_a_reparse() {
        let file = csv_file();
        let mut cache = TableCache::default();
        let first = cache.get_or_load(file.path()).unwrap();
        cache.clear();
        assert_eq!(cache.len(), 0);
        let second = cache.get_or_load(file.path()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn invalidate_drops_only_that_source() {
        let a = csv_file();
        let b = csv_file();
        let mut cache = TableCache::default();
        cache.get_or_load(a.path()).unwrap();
        cache.get_or_load(b.path()).unwrap();
        cache.invalidate(a.path());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn changed_file_is_reloaded() {
        let mut file = csv_file();
        let mut cache = TableCache::default();
        let first = cache.get_or_load(file.path()).unwrap();
        file.write_all(b"F2,2,130,3000,10,120,120,STS,2023-01-01 09:00:00,2023-01-01 09:30:00\n")
            .unwrap();
        file.flush().unwrap();
        let second = cache.get_or_load(file.path()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn bundled_sample_normalizes() {
        let mut cache = TableCache::default();
        let table = cache
            .get_or_load(Path::new("data/steel_ai_01_on.csv"))
            .unwrap();
        assert_eq!(table.report.rows_read, 15);
        assert_eq!(table.report.duplicates_dropped, 2);
        assert_eq!(table.len(), 13);
        assert_eq!(table.steel_categories.len(), 6);
        assert_eq!(table.work_groups.len(), 3);
        assert_eq!(table.records[0].duration_minutes, 58);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache = TableCache::default();
        let err = cache
            .get_or_load(Path::new("/no/such/steel.csv"))
            .unwrap_err();
        assert!(matches!(err, LoadError::DataLoad { .. }));
        assert_eq!(cache.len(), 0);
    }
}
