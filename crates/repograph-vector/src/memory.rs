use crate::types::{CollectionInfo, IndexPoint, PointPayload, ScoredPoint, VectorIndex};
use async_trait::async_trait;
use parking_lot::RwLock;
use repograph_core::{RepoGraphError, Result};
use std::collections::{BTreeMap, HashMap};

struct CollectionState {
    dimension: usize,
    points: BTreeMap<u64, (Vec<f32>, PointPayload)>,
}

/// Brute-force cosine index held in memory.
///
/// Serves as the offline backend and as the test double for the Qdrant
/// client; on repositories of a few thousand nodes an O(n·d) scan is
/// well under a millisecond.
#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, CollectionState>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, name: &str, dimension: usize, recreate: bool) -> Result<()> {
        let mut collections = self.collections.write();
        if recreate {
            collections.remove(name);
        }
        collections.entry(name.to_string()).or_insert(CollectionState {
            dimension,
            points: BTreeMap::new(),
        });
        Ok(())
    }

    async fn upsert(&self, name: &str, points: Vec<IndexPoint>) -> Result<usize> {
        let mut collections = self.collections.write();
        let state = collections
            .get_mut(name)
            .ok_or_else(|| RepoGraphError::NotFound(format!("collection {}", name)))?;
        for point in points {
            if point.vector.len() != state.dimension {
                return Err(RepoGraphError::InvalidInput(format!(
                    "vector width {} does not match collection width {}",
                    point.vector.len(),
                    state.dimension
                )));
            }
            state.points.insert(point.id, (point.vector, point.payload));
        }
        Ok(state.points.len())
    }

    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let state = collections
            .get(name)
            .ok_or_else(|| RepoGraphError::NotFound(format!("collection {}", name)))?;

        let mut scored: Vec<ScoredPoint> = state
            .points
            .iter()
            .map(|(&id, (v, payload))| ScoredPoint {
                id,
                // Stored vectors are unit-normalized, so the dot product
                // is the cosine similarity.
                score: v.iter().zip(vector.iter()).map(|(a, b)| a * b).sum(),
                payload: Some(payload.clone()),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scroll(&self, name: &str, limit: usize) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let state = collections
            .get(name)
            .ok_or_else(|| RepoGraphError::NotFound(format!("collection {}", name)))?;
        Ok(state
            .points
            .iter()
            .take(limit)
            .map(|(&id, (_, payload))| ScoredPoint {
                id,
                score: 0.0,
                payload: Some(payload.clone()),
            })
            .collect())
    }

    async fn count(&self, name: &str) -> Result<u64> {
        let collections = self.collections.read();
        let state = collections
            .get(name)
            .ok_or_else(|| RepoGraphError::NotFound(format!("collection {}", name)))?;
        Ok(state.points.len() as u64)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read();
        let mut infos: Vec<CollectionInfo> = collections
            .iter()
            .map(|(name, state)| CollectionInfo {
                name: name.clone(),
                points_count: state.points.len() as u64,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().remove(name);
        Ok(())
    }
}
