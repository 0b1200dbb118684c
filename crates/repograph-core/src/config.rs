use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Runtime settings, resolved once at startup from the environment.
///
/// Every knob is optional; defaults match a local single-node deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory for durable artifacts: graph.json, qdrant_map.json,
    /// index_status.json.
    pub data_dir: PathBuf,
    /// Scratch directory for repository checkouts.
    pub tmp_dir: PathBuf,
    pub qdrant_url: String,
    pub collection: String,
    pub model_name: String,
    /// Base URL of the embedding server. When unset the deterministic
    /// offline embedder is used instead.
    pub embedding_url: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tmp_dir: env::temp_dir().join("repograph"),
            qdrant_url: "http://localhost:6333".to_string(),
            collection: "repograph".to_string(),
            model_name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_url: None,
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            tmp_dir: env::var("TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.tmp_dir),
            qdrant_url: env::var("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            collection: env::var("QDRANT_COLLECTION_NAME").unwrap_or(defaults.collection),
            model_name: env::var("MODEL_NAME").unwrap_or(defaults.model_name),
            embedding_url: env::var("EMBEDDING_URL").ok(),
            host: env::var("WORKER_HOST").unwrap_or(defaults.host),
            port: env::var("WORKER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn graph_path(&self) -> PathBuf {
        self.data_dir.join("graph.json")
    }

    pub fn map_path(&self) -> PathBuf {
        self.data_dir.join("qdrant_map.json")
    }

    pub fn status_path(&self) -> PathBuf {
        self.data_dir.join("index_status.json")
    }
}
