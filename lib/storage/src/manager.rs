use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use airroute_core::QueryConfig;
use crate::dataset::Dataset;
use crate::import::{import_all, ImportReport, ImportSources};
use crate::snapshot::{SnapshotDescription, SnapshotManager};

struct Live {
    generation: u64,
    dataset: Arc<Dataset>,
}

/// Owns the live dataset and its on-disk snapshots.
///
/// Readers take a cheap `Arc` clone; imports and restores build a new
/// dataset off to the side and swap it in. Every swap bumps the generation.
pub struct StorageManager {
    live: RwLock<Live>,
    data_dir: PathBuf,
    snapshots: SnapshotManager,
    fuzzy_threshold: f64,
}

impl StorageManager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        Self::with_config(data_dir, &QueryConfig::default())
    }

    /// Open `data_dir`, restoring the newest readable snapshot if there is one
    pub fn with_config<P: AsRef<Path>>(data_dir: P, config: &QueryConfig) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;
        let snapshots = SnapshotManager::new(data_dir.join("snapshots"))?;

        let dataset = match snapshots.load_latest()? {
            Some((description, data)) => {
                info!("Restoring snapshot {}", description.name);
                Dataset::from_snapshot(data, config.fuzzy_threshold)
            }
            None => {
                info!("No snapshot in {}, starting empty", data_dir.display());
                Dataset::empty()
            }
        };

        Ok(Self {
            live: RwLock::new(Live {
                generation: 0,
                dataset: Arc::new(dataset),
            }),
            data_dir,
            snapshots,
            fuzzy_threshold: config.fuzzy_threshold,
        })
    }

    /// Current dataset; stays valid even if a newer one is swapped in
    #[inline]
    pub fn dataset(&self) -> Arc<Dataset> {
        self.live.read().dataset.clone()
    }

    /// Current dataset together with its generation, read under one lock
    pub fn current(&self) -> (u64, Arc<Dataset>) {
        let live = self.live.read();
        (live.generation, live.dataset.clone())
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.live.read().generation
    }

    pub fn replace(&self, dataset: Dataset) {
        let mut live = self.live.write();
        live.generation += 1;
        live.dataset = Arc::new(dataset);
    }

    /// Import CSV sources, swap the result in and snapshot it
    pub fn import(&self, sources: &ImportSources) -> Result<(ImportReport, SnapshotDescription)> {
        let (graph, cities, report) = import_all(sources)?;
        self.replace(Dataset::with_fuzzy_threshold(graph, cities, self.fuzzy_threshold));
        let snapshot = self.save()?;
        Ok((report, snapshot))
    }

    /// Snapshot the current dataset
    pub fn save(&self) -> Result<SnapshotDescription> {
        let data = self.dataset().to_snapshot();
        self.snapshots.create(&data)
    }

    /// Replace the current dataset with a named snapshot
    pub fn restore(&self, name: &str) -> Result<()> {
        let data = self.snapshots.load(name)?;
        self.replace(Dataset::from_snapshot(data, self.fuzzy_threshold));
        info!("Restored snapshot {}", name);
        Ok(())
    }

    pub fn list_snapshots(&self) -> Result<Vec<SnapshotDescription>> {
        self.snapshots.list()
    }

    #[inline]
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airroute_core::{Airport, GraphStore};
    use tempfile::TempDir;

    #[test]
    fn test_empty_then_restored() {
        let dir = TempDir::new().unwrap();
        let manager = StorageManager::new(dir.path()).unwrap();
        assert!(manager.dataset().is_empty());

        let mut graph = GraphStore::new();
        graph.insert_airport(Airport::new(1, "Boryspil", 50.345, 30.894722)).unwrap();
        manager.replace(Dataset::new(graph, Vec::new()));
        let snapshot = manager.save().unwrap();

        let reopened = StorageManager::new(dir.path()).unwrap();
        assert_eq!(reopened.dataset().stats().airports, 1);
        assert_eq!(reopened.list_snapshots().unwrap()[0].name, snapshot.name);
    }

    #[test]
    fn test_readers_keep_old_dataset() {
        let dir = TempDir::new().unwrap();
        let manager = StorageManager::new(dir.path()).unwrap();
        let before = manager.dataset();

        let mut graph = GraphStore::new();
        graph.insert_airport(Airport::new(1, "Boryspil", 50.345, 30.894722)).unwrap();
        manager.replace(Dataset::new(graph, Vec::new()));

        assert!(before.is_empty());
        assert!(!manager.dataset().is_empty());
        assert_eq!(manager.generation(), 1);
        assert!(manager.restore("missing.snapshot").is_err());
        assert_eq!(manager.generation(), 1);

        let (generation, current) = manager.current();
        assert_eq!(generation, 1);
        assert_eq!(current.stats().airports, 1);
    }
}
