use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::loader::load_tables;
use super::model::ForecastTables;
use crate::config::DataSources;
use crate::error::LoadError;

/// Read-through cache for the forecast tables.
///
/// The first successful [`TableCache::load`] reads storage; every later call
/// hands back the same `Arc`. A failed load is not cached.
#[derive(Debug)]
pub struct TableCache {
    sources: DataSources,
    tables: OnceCell<Arc<ForecastTables>>,
}

impl TableCache {
    pub fn new(sources: DataSources) -> Self {
        Self {
            sources,
            tables: OnceCell::new(),
        }
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    pub fn load(&self) -> Result<Arc<ForecastTables>, LoadError> {
        self.tables
            .get_or_try_init(|| {
                log::info!("Loading forecast tables from {}", self.sources.data_dir.display());
                load_tables(&self.sources).map(Arc::new)
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::write_sample_dir;

    #[test]
    fn second_load_returns_same_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_dir(dir.path());
        let cache = TableCache::new(DataSources::in_dir(dir.path()));

        let first = cache.load().unwrap();
        // Storage is not touched again.
        std::fs::remove_file(dir.path().join("predictions.csv")).unwrap();
        let second = cache.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.expected_value, 5.234);
    }

    #[test]
    fn failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new(DataSources::in_dir(dir.path()));
        assert!(cache.load().is_err());

        write_sample_dir(dir.path());
        assert!(cache.load().is_ok());
    }
}
