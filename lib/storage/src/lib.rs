pub mod dataset;
pub mod import;
pub mod manager;
pub mod snapshot;

pub use dataset::{Dataset, DatasetStats};
pub use import::{import_all, ImportReport, ImportSources};
pub use manager::StorageManager;
pub use snapshot::{SnapshotData, SnapshotDescription, SnapshotManager};
