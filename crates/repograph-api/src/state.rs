use crate::jobs::JobRegistry;
use crate::query::QueryEngine;
use dashmap::DashMap;
use repograph_core::{Result, Settings};
use repograph_graph::{load_graph, Graph};
use repograph_vector::{
    EmbeddingProvider, HashEmbeddingProvider, HttpEmbeddingConfig, HttpEmbeddingProvider, Journal,
    QdrantClient, VectorIndex,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Everything the handlers and workers share. Handlers receive a clone;
/// all members are cheap `Arc` handles.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<JobRegistry>,
    pub graph: Arc<RwLock<Option<Graph>>>,
    pub provider: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub journal: Arc<Journal>,
    pub query: Arc<QueryEngine>,
    path_locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl AppState {
    /// Wires real backends from the environment: a Qdrant index and
    /// either the remote embedding server or the deterministic offline
    /// embedder when none is configured.
    pub fn from_settings(settings: Settings) -> Self {
        let provider: Arc<dyn EmbeddingProvider> = match &settings.embedding_url {
            Some(url) => Arc::new(HttpEmbeddingProvider::new(HttpEmbeddingConfig {
                base_url: url.clone(),
                model_name: settings.model_name.clone(),
                ..HttpEmbeddingConfig::default()
            })),
            None => {
                info!("no EMBEDDING_URL configured, using offline embedder");
                Arc::new(HashEmbeddingProvider::default())
            }
        };
        let index: Arc<dyn VectorIndex> = Arc::new(QdrantClient::new(settings.qdrant_url.clone()));
        Self::with_components(settings, provider, index)
    }

    /// Assembles the state around explicit backends; tests hand in the
    /// in-memory index here.
    pub fn with_components(
        settings: Settings,
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let query = Arc::new(QueryEngine::new(provider.clone(), index.clone()));
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(JobRegistry::new()),
            graph: Arc::new(RwLock::new(None)),
            provider,
            index,
            journal: Arc::new(Journal::new()),
            query,
            path_locks: Arc::new(DashMap::new()),
        }
    }

    /// Per-path mutex used to serialize graph file writes.
    pub fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.path_locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Loads the persisted graph into memory when none is resident yet.
    pub async fn ensure_graph(&self) -> Result<()> {
        {
            if self.graph.read().await.is_some() {
                return Ok(());
            }
        }
        let path = self.settings.graph_path();
        let lock = self.path_lock(&path);
        let _guard = lock.lock().await;
        let loaded = load_graph(&path)?;
        info!(
            "loaded graph from {} ({} nodes, {} edges)",
            path.display(),
            loaded.node_count(),
            loaded.edge_count()
        );
        *self.graph.write().await = Some(loaded);
        Ok(())
    }

    /// Best-effort graph preload at startup; a missing file is fine, the
    /// first parse job will create it.
    pub async fn preload_graph(&self) {
        if let Err(e) = self.ensure_graph().await {
            warn!("no graph preloaded: {}", e);
        }
    }
}
