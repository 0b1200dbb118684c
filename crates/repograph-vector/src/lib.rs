pub mod document;
pub mod indexer;
pub mod journal;
pub mod memory;
pub mod provider;
pub mod qdrant;
pub mod types;

pub use document::{make_document, snippet_of, DOCUMENT_CHAR_CAP, SNIPPET_CHAR_CAP};
pub use indexer::{Indexer, IndexerConfig, IndexReport};
pub use journal::{IndexState, IndexStatus, Journal};
pub use memory::MemoryIndex;
pub use provider::{
    l2_normalize, EmbeddingProvider, HashEmbeddingProvider, HttpEmbeddingConfig,
    HttpEmbeddingProvider,
};
pub use qdrant::QdrantClient;
pub use types::{retry_index_op, CollectionInfo, IndexPoint, PointPayload, ScoredPoint, VectorIndex};
