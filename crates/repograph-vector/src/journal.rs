use chrono::{DateTime, Utc};
use dashmap::DashMap;
use repograph_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Completed,
    Partial,
    Failed,
}

/// Snapshot of one collection's index run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub collection: String,
    pub model: String,
    pub vector_size: usize,
    pub distance: String,
    pub points_count: u64,
    pub indexed_at: DateTime<Utc>,
    pub status: IndexState,
}

impl IndexStatus {
    pub fn new(
        collection: impl Into<String>,
        model: impl Into<String>,
        vector_size: usize,
        points_count: u64,
        status: IndexState,
    ) -> Self {
        Self {
            collection: collection.into(),
            model: model.into(),
            vector_size,
            distance: "Cosine".to_string(),
            points_count,
            indexed_at: Utc::now(),
            status,
        }
    }
}

/// Writes the two sidecar artifacts of an index run: the point-to-node
/// map and the status snapshot. Writes go through write-to-temp + rename
/// and are serialized per target path, so concurrent jobs cannot
/// interleave on the same file and readers never see a torn file.
#[derive(Default)]
pub struct Journal {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Persists the `point_id -> node_id` mapping. Keys are stringified
    /// so the artifact is a plain JSON object.
    pub async fn write_map(&self, path: &Path, map: &BTreeMap<u64, String>) -> Result<()> {
        let stringified: BTreeMap<String, &String> =
            map.iter().map(|(k, v)| (k.to_string(), v)).collect();
        let bytes = serde_json::to_vec_pretty(&stringified)?;
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;
        write_atomic(path, &bytes)?;
        info!("wrote point map with {} entries to {}", map.len(), path.display());
        Ok(())
    }

    pub async fn read_map(&self, path: &Path) -> Result<BTreeMap<u64, String>> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;
        let data = std::fs::read(path)?;
        let stringified: BTreeMap<String, String> = serde_json::from_slice(&data)?;
        Ok(stringified
            .into_iter()
            .filter_map(|(k, v)| k.parse::<u64>().ok().map(|id| (id, v)))
            .collect())
    }

    pub async fn write_status(&self, path: &Path, status: &IndexStatus) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(status)?;
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;
        write_atomic(path, &bytes)?;
        info!(
            "wrote index status for {} ({:?}) to {}",
            status.collection,
            status.status,
            path.display()
        );
        Ok(())
    }

    pub async fn read_status(&self, path: &Path) -> Result<IndexStatus> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
