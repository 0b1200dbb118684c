use crate::types::{CollectionInfo, IndexPoint, PointPayload, ScoredPoint, VectorIndex};
use async_trait::async_trait;
use repograph_core::{RepoGraphError, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

const UPSERT_BATCH: usize = 256;

/// Narrow REST client over the Qdrant HTTP API.
///
/// Upserts are issued with `wait=true`, which is what gives searches
/// issued after a completed index job read-after-write visibility of
/// every point that job wrote.
pub struct QdrantClient {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl QdrantClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| {
                RepoGraphError::IndexUnavailable(format!(
                    "request to {} exceeded {:?}",
                    self.base_url, self.request_timeout
                ))
            })?
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    RepoGraphError::IndexUnavailable(e.to_string())
                } else {
                    RepoGraphError::Internal(format!("qdrant request failed: {}", e))
                }
            })?;
        Ok(response)
    }

    async fn check(&self, response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RepoGraphError::NotFound(format!("{}: {}", context, body)));
        }
        // The index accepts points before its ANN structure is built;
        // queries in that window come back with an optimizer complaint.
        let lowered = body.to_lowercase();
        if lowered.contains("not ready") || lowered.contains("optimiz") {
            return Err(RepoGraphError::IndexNotReady(format!(
                "{}: {}",
                context, body
            )));
        }
        if status.is_server_error() {
            return Err(RepoGraphError::IndexUnavailable(format!(
                "{}: {} {}",
                context, status, body
            )));
        }
        Err(RepoGraphError::Internal(format!(
            "{}: {} {}",
            context, status, body
        )))
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{}", self.base_url, name)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .send(self.client.get(self.collection_url(name)))
            .await?;
        Ok(response.status().is_success())
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct SearchHit {
    id: u64,
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
}

#[derive(Deserialize)]
struct ScrollPoint {
    id: u64,
    payload: Option<PointPayload>,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Deserialize)]
struct CollectionDescription {
    #[serde(default)]
    points_count: Option<u64>,
}

#[async_trait]
impl VectorIndex for QdrantClient {
    async fn ensure_collection(&self, name: &str, dimension: usize, recreate: bool) -> Result<()> {
        let exists = self.collection_exists(name).await?;
        if exists && !recreate {
            debug!("collection {} already present", name);
            return Ok(());
        }
        if exists && recreate {
            info!("dropping collection {} before recreate", name);
            let response = self
                .send(self.client.delete(self.collection_url(name)))
                .await?;
            self.check(response, "delete collection").await?;
        }

        let body = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        let response = self
            .send(self.client.put(self.collection_url(name)).json(&body))
            .await?;
        self.check(response, "create collection").await?;
        info!("created collection {} (dim {}, Cosine)", name, dimension);
        Ok(())
    }

    async fn upsert(&self, name: &str, points: Vec<IndexPoint>) -> Result<usize> {
        let total = points.len();
        for chunk in points.chunks(UPSERT_BATCH) {
            let body = json!({
                "points": chunk
                    .iter()
                    .map(|p| json!({
                        "id": p.id,
                        "vector": p.vector,
                        "payload": p.payload,
                    }))
                    .collect::<Vec<_>>()
            });
            let url = format!("{}/points?wait=true", self.collection_url(name));
            let response = self.send(self.client.put(url).json(&body)).await?;
            self.check(response, "upsert points").await?;
            debug!("upserted batch of {} into {}", chunk.len(), name);
        }
        Ok(total)
    }

    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let url = format!("{}/points/search", self.collection_url(name));
        let response = self.send(self.client.post(url).json(&body)).await?;
        let response = self.check(response, "search").await?;
        let parsed: ApiResponse<Vec<SearchHit>> = response
            .json()
            .await
            .map_err(|e| RepoGraphError::Internal(format!("malformed search response: {}", e)))?;
        Ok(parsed
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }

    async fn scroll(&self, name: &str, limit: usize) -> Result<Vec<ScoredPoint>> {
        let body = json!({ "limit": limit, "with_payload": true });
        let url = format!("{}/points/scroll", self.collection_url(name));
        let response = self.send(self.client.post(url).json(&body)).await?;
        let response = self.check(response, "scroll").await?;
        let parsed: ApiResponse<ScrollResult> = response
            .json()
            .await
            .map_err(|e| RepoGraphError::Internal(format!("malformed scroll response: {}", e)))?;
        Ok(parsed
            .result
            .points
            .into_iter()
            .map(|p| ScoredPoint {
                id: p.id,
                score: 0.0,
                payload: p.payload,
            })
            .collect())
    }

    async fn count(&self, name: &str) -> Result<u64> {
        let body = json!({ "exact": true });
        let url = format!("{}/points/count", self.collection_url(name));
        let response = self.send(self.client.post(url).json(&body)).await?;
        let response = self.check(response, "count").await?;
        let parsed: ApiResponse<CountResult> = response
            .json()
            .await
            .map_err(|e| RepoGraphError::Internal(format!("malformed count response: {}", e)))?;
        Ok(parsed.result.count)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let response = self
            .send(self.client.get(format!("{}/collections", self.base_url)))
            .await?;
        let response = self.check(response, "list collections").await?;
        let parsed: ApiResponse<CollectionsResult> = response.json().await.map_err(|e| {
            RepoGraphError::Internal(format!("malformed collections response: {}", e))
        })?;

        let mut infos = Vec::new();
        for collection in parsed.result.collections {
            let response = self
                .send(self.client.get(self.collection_url(&collection.name)))
                .await?;
            let response = self.check(response, "describe collection").await?;
            let description: ApiResponse<CollectionDescription> =
                response.json().await.map_err(|e| {
                    RepoGraphError::Internal(format!("malformed collection description: {}", e))
                })?;
            infos.push(CollectionInfo {
                name: collection.name,
                points_count: description.result.points_count.unwrap_or(0),
            });
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .send(self.client.delete(self.collection_url(name)))
            .await?;
        self.check(response, "delete collection").await?;
        Ok(())
    }
}
