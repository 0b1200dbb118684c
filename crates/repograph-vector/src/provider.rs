use async_trait::async_trait;
use repograph_core::{RepoGraphError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Capability shared by every embedding backend: a batch of documents in,
/// a row-aligned matrix of unit-L2-normalized vectors out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Row order matches input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    async fn is_available(&self) -> bool;
}

pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Deterministic offline embedder: sha2 feature hashing of word tokens
/// into a fixed-width vector. No model, no network, stable across runs,
/// which is exactly what tests and air-gapped deployments need.
pub struct HashEmbeddingProvider {
    dimension: usize,
    model_name: String,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: format!("feature-hash-{}", dimension),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
                as usize
                % self.dimension;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbeddingConfig {
    pub base_url: String,
    pub model_name: String,
    pub dimension: usize,
    pub timeout: Duration,
    pub batch_size: usize,
}

impl Default for HttpEmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model_name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            timeout: Duration::from_secs(60),
            batch_size: 32,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Remote embedding server speaking the Ollama-style `/api/embeddings`
/// protocol.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: HttpEmbeddingConfig,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpEmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.model_name,
            prompt: text,
        };

        let response = timeout(
            self.config.timeout,
            self.client
                .post(format!("{}/api/embeddings", self.config.base_url))
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| {
            RepoGraphError::Timeout(format!(
                "embedding request exceeded {:?}",
                self.config.timeout
            ))
        })?
        .map_err(|e| RepoGraphError::EmbedFailed(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepoGraphError::EmbedFailed(format!(
                "embedding server error: {}",
                body
            )));
        }

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RepoGraphError::EmbedFailed(format!("malformed embedding: {}", e)))?;

        let mut vector = payload.embedding;
        if vector.len() != self.config.dimension {
            return Err(RepoGraphError::EmbedFailed(format!(
                "expected {}-wide vector, got {}",
                self.config.dimension,
                vector.len()
            )));
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            debug!("embedding batch of {}", chunk.len());
            for text in chunk {
                vectors.push(self.embed_single(text).await?);
            }
            // Yield between batches so the worker stays responsive.
            tokio::task::yield_now().await;
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    async fn is_available(&self) -> bool {
        let probe = timeout(
            Duration::from_secs(5),
            self.client
                .get(format!("{}/api/tags", self.config.base_url))
                .send(),
        )
        .await;
        match probe {
            Ok(Ok(response)) => response.status().is_success(),
            _ => {
                warn!("embedding server at {} unreachable", self.config.base_url);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[tokio::test]
    async fn hash_embeddings_are_stable() {
        let provider = HashEmbeddingProvider::default();
        let docs = vec!["def hello(): return world".to_string()];
        let a = provider.embed(&docs).await.unwrap();
        let b = provider.embed(&docs).await.unwrap();
        for (x, y) in a[0].iter().zip(b[0].iter()) {
            assert!((x - y).abs() <= 1e-6);
        }
    }

    #[tokio::test]
    async fn hash_embeddings_are_unit_norm() {
        let provider = HashEmbeddingProvider::default();
        let docs = vec!["some function that parses files".to_string()];
        let vectors = provider.embed(&docs).await.unwrap();
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-5);
    }

    #[tokio::test]
    async fn rows_align_with_input_order() {
        let provider = HashEmbeddingProvider::default();
        let docs = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = provider.embed(&docs).await.unwrap();
        let alpha_again = provider.embed(&docs[..1].to_vec()).await.unwrap();
        assert_eq!(vectors[0], alpha_again[0]);
        assert_ne!(vectors[0], vectors[1]);
    }

    #[test]
    fn zero_vector_survives_normalization() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
