use crate::document::{make_document, snippet_of};
use crate::journal::{IndexState, IndexStatus, Journal};
use crate::provider::EmbeddingProvider;
use crate::types::{retry_index_op, IndexPoint, PointPayload, VectorIndex};
use repograph_core::{RepoGraphError, Result};
use repograph_graph::Graph;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub collection: String,
    pub recreate: bool,
    pub batch_size: usize,
    pub map_path: PathBuf,
    pub status_path: PathBuf,
}

impl IndexerConfig {
    pub fn new(collection: impl Into<String>, map_path: PathBuf, status_path: PathBuf) -> Self {
        Self {
            collection: collection.into(),
            recreate: false,
            batch_size: 32,
            map_path,
            status_path,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub collection: String,
    pub model: String,
    pub vector_size: usize,
    pub points_count: u64,
    pub status: IndexState,
}

/// Drives graph -> documents -> embeddings -> upsert -> journal.
///
/// Point ids are dense positive integers assigned in graph node order,
/// so re-indexing the same graph is idempotent on the collection.
pub struct Indexer {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    journal: Arc<Journal>,
}

impl Indexer {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        journal: Arc<Journal>,
    ) -> Self {
        Self {
            provider,
            index,
            journal,
        }
    }

    pub async fn index_graph(&self, graph: &Graph, config: &IndexerConfig) -> Result<IndexReport> {
        self.index_graph_with_cancel(graph, config, &CancellationToken::new())
            .await
    }

    /// Like [`Self::index_graph`], but stops at the next batch boundary
    /// once `cancel` fires. A cancelled run writes no journal files.
    pub async fn index_graph_with_cancel(
        &self,
        graph: &Graph,
        config: &IndexerConfig,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let dimension = self.provider.dimension();
        let model = self.provider.model_name().to_string();

        if !self.provider.is_available().await {
            return Err(RepoGraphError::EmbedFailed(format!(
                "embedding provider {} is unavailable",
                model
            )));
        }

        retry_index_op(|| {
            self.index
                .ensure_collection(&config.collection, dimension, config.recreate)
        })
        .await?;

        let nodes: Vec<_> = graph.nodes().collect();
        info!(
            "indexing {} nodes into {} with {}",
            nodes.len(),
            config.collection,
            model
        );

        let mut map: BTreeMap<u64, String> = BTreeMap::new();
        let mut written: u64 = 0;
        let mut not_ready = false;

        for (batch_index, batch) in nodes.chunks(config.batch_size.max(1)).enumerate() {
            if cancel.is_cancelled() {
                info!("index run cancelled before batch {}", batch_index);
                return Err(RepoGraphError::Internal("index run cancelled".into()));
            }
            let docs: Vec<String> = batch.iter().map(|n| make_document(n)).collect();
            let vectors = self.embed_with_retry(&docs).await?;

            let points: Vec<IndexPoint> = batch
                .iter()
                .zip(vectors)
                .enumerate()
                .map(|(offset, (node, vector))| IndexPoint {
                    // Dense ids starting at 1, monotonic across batches.
                    id: (batch_index * config.batch_size.max(1) + offset) as u64 + 1,
                    vector,
                    payload: PointPayload {
                        node_id: node.id.clone(),
                        snippet: snippet_of(node),
                        file: node.file.clone(),
                        start_line: node.start_line,
                        doc: node.doc.clone(),
                    },
                })
                .collect();

            let count = points.len() as u64;
            let upsert_result = retry_index_op(|| {
                let points = points.clone();
                self.index.upsert(&config.collection, points)
            })
            .await;

            match upsert_result {
                Ok(_) => {
                    for point in &points {
                        map.insert(point.id, point.payload.node_id.clone());
                    }
                    written += count;
                }
                // Vectors were accepted but the ANN structure is still
                // building; the indexer treats this as success.
                Err(RepoGraphError::IndexNotReady(reason)) => {
                    warn!("index not ready after upsert ({}); continuing", reason);
                    not_ready = true;
                    for point in &points {
                        map.insert(point.id, point.payload.node_id.clone());
                    }
                    written += count;
                }
                Err(e) => {
                    let state = if written > 0 {
                        IndexState::Partial
                    } else {
                        IndexState::Failed
                    };
                    self.write_journal(config, &model, dimension, written, state, &map)
                        .await?;
                    return Err(e);
                }
            }
        }

        if cancel.is_cancelled() {
            info!("index run cancelled before journal write");
            return Err(RepoGraphError::Internal("index run cancelled".into()));
        }

        let points_count = match self.index.count(&config.collection).await {
            Ok(count) => count,
            Err(_) => written,
        };

        self.write_journal(
            config,
            &model,
            dimension,
            points_count,
            IndexState::Completed,
            &map,
        )
        .await?;

        if not_ready {
            info!("collection {} upserted; ANN structure still building", config.collection);
        }

        Ok(IndexReport {
            collection: config.collection.clone(),
            model,
            vector_size: dimension,
            points_count,
            status: IndexState::Completed,
        })
    }

    async fn embed_with_retry(&self, docs: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.provider.embed(docs).await {
            Ok(vectors) => Ok(vectors),
            Err(first) => {
                warn!("embedding batch failed ({}), retrying once", first);
                self.provider.embed(docs).await.map_err(|e| {
                    RepoGraphError::EmbedFailed(format!("embedding failed after retry: {}", e))
                })
            }
        }
    }

    async fn write_journal(
        &self,
        config: &IndexerConfig,
        model: &str,
        dimension: usize,
        points_count: u64,
        state: IndexState,
        map: &BTreeMap<u64, String>,
    ) -> Result<()> {
        self.journal.write_map(&config.map_path, map).await?;
        let status = IndexStatus::new(
            config.collection.clone(),
            model.to_string(),
            dimension,
            points_count,
            state,
        );
        self.journal.write_status(&config.status_path, &status).await
    }
}
