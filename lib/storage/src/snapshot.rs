// Compressed dataset snapshots
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AllowOverwrite, AtomicFile};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use airroute_core::{Airline, Airport, City, Route};

const SNAPSHOT_EXTENSION: &str = "snapshot";
const CHECKSUM_EXTENSION: &str = "sha256";

/// Snapshot description for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Everything needed to rebuild a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub airports: Vec<Airport>,
    pub airlines: Vec<Airline>,
    pub routes: Vec<Route>,
    pub cities: Vec<City>,
    /// Unix seconds
    pub created_at: i64,
}

pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)
            .with_context(|| format!("creating snapshot directory {}", snapshot_dir.display()))?;
        Ok(Self { snapshot_dir })
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// Timestamped name; lexical order equals creation order
    fn generate_snapshot_name(now: DateTime<Utc>) -> String {
        format!(
            "dataset-{}.{}",
            now.format("%Y-%m-%d-%H-%M-%S-%3f"),
            SNAPSHOT_EXTENSION
        )
    }

    fn checksum_path(&self, name: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{}.{}", name, CHECKSUM_EXTENSION))
    }

    fn describe(&self, name: &str, path: &Path) -> Result<SnapshotDescription> {
        let metadata = fs::metadata(path)?;
        let creation_time = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%dT%H:%M:%SZ").to_string());
        let checksum = fs::read_to_string(self.checksum_path(name))
            .ok()
            .map(|s| s.trim().to_string());

        Ok(SnapshotDescription {
            name: name.to_string(),
            creation_time,
            size: metadata.len(),
            checksum,
        })
    }

    /// Write `data` as bincode inside gzip, plus a SHA-256 sidecar file.
    ///
    /// Both files are replaced atomically.
    pub fn create(&self, data: &SnapshotData) -> Result<SnapshotDescription> {
        let name = Self::generate_snapshot_name(Utc::now());
        let path = self.snapshot_dir.join(&name);

        let encoded = bincode::serialize(data).map_err(|e| anyhow!("Serialization error: {}", e))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&encoded)?;
        let compressed = encoder.finish()?;
        let checksum = format!("{:x}", Sha256::digest(&compressed));

        AtomicFile::new(&path, AllowOverwrite)
            .write(|f| f.write_all(&compressed))
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        AtomicFile::new(self.checksum_path(&name), AllowOverwrite)
            .write(|f| f.write_all(checksum.as_bytes()))
            .context("writing snapshot checksum")?;

        info!(
            "Snapshot {} written: {} airports, {} routes, {} cities",
            name,
            data.airports.len(),
            data.routes.len(),
            data.cities.len()
        );
        self.describe(&name, &path)
    }

    /// Snapshots in the directory, newest first
    pub fn list(&self) -> Result<Vec<SnapshotDescription>> {
        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.snapshot_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                snapshots.push(self.describe(name, &path)?);
            }
        }
        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }

    /// Read and verify a snapshot
    pub fn load(&self, name: &str) -> Result<SnapshotData> {
        let path = self.snapshot_dir.join(name);
        if !path.exists() {
            return Err(anyhow!("Snapshot '{}' not found", name));
        }
        let compressed = fs::read(&path).with_context(|| format!("reading snapshot {}", path.display()))?;

        match fs::read_to_string(self.checksum_path(name)) {
            Ok(expected) => {
                let actual = format!("{:x}", Sha256::digest(&compressed));
                if actual != expected.trim() {
                    return Err(anyhow!(
                        "Checksum mismatch for {}: expected {}, got {}",
                        name,
                        expected.trim(),
                        actual
                    ));
                }
            }
            Err(_) => warn!("Snapshot {} has no checksum file, loading unverified", name),
        }

        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut encoded = Vec::new();
        decoder.read_to_end(&mut encoded)?;
        bincode::deserialize(&encoded).map_err(|e| anyhow!("Deserialization error in {}: {}", name, e))
    }

    /// Newest snapshot that loads cleanly; broken ones are logged and skipped
    pub fn load_latest(&self) -> Result<Option<(SnapshotDescription, SnapshotData)>> {
        for description in self.list()? {
            match self.load(&description.name) {
                Ok(data) => return Ok(Some((description, data))),
                Err(e) => warn!("Skipping snapshot {}: {:#}", description.name, e),
            }
        }
        Ok(None)
    }

    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.snapshot_dir.join(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        let checksum = self.checksum_path(name);
        if checksum.exists() {
            fs::remove_file(checksum)?;
        }
        Ok(true)
    }
}
