use async_trait::async_trait;
use repograph_core::{RepoGraphError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// The node fields carried alongside each vector, enough to render a
/// search hit without loading the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub node_id: String,
    pub snippet: String,
    pub file: String,
    pub start_line: u32,
    #[serde(default)]
    pub doc: String,
}

#[derive(Debug, Clone)]
pub struct IndexPoint {
    /// Dense positive integer, assigned monotonically within a collection.
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: u64,
    /// Cosine similarity; higher is more similar.
    pub score: f32,
    pub payload: Option<PointPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
}

/// Narrow synchronous-feeling client over the external ANN index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the collection; with `recreate`, drops any existing
    /// collection of the same name first.
    async fn ensure_collection(&self, name: &str, dimension: usize, recreate: bool) -> Result<()>;

    /// Idempotent on point id. Returns the total count written.
    async fn upsert(&self, name: &str, points: Vec<IndexPoint>) -> Result<usize>;

    /// Results ordered by descending score.
    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;

    /// Payload listing for keyword-scan fallbacks; scores are zero.
    async fn scroll(&self, name: &str, limit: usize) -> Result<Vec<ScoredPoint>>;

    async fn count(&self, name: &str) -> Result<u64>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    async fn delete_collection(&self, name: &str) -> Result<()>;
}

/// Retries an index operation on `IndexUnavailable` with 1 s, 2 s, 4 s
/// back-off. Other errors propagate immediately.
pub async fn retry_index_op<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = Duration::from_secs(1);
    let mut attempts_left = 3u8;
    loop {
        match op().await {
            Err(RepoGraphError::IndexUnavailable(reason)) if attempts_left > 0 => {
                warn!(
                    "vector index unavailable ({}), retrying in {:?}",
                    reason, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempts_left -= 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_unavailable_with_backoff() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32> = retry_index_op(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RepoGraphError::IndexUnavailable("connection refused".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_retries() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32> = retry_index_op(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RepoGraphError::IndexUnavailable("still down".into())) }
        })
        .await;
        assert!(matches!(result, Err(RepoGraphError::IndexUnavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn not_ready_is_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32> = retry_index_op(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RepoGraphError::IndexNotReady("optimizing".into())) }
        })
        .await;
        assert!(matches!(result, Err(RepoGraphError::IndexNotReady(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
