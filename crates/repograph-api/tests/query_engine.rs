use async_trait::async_trait;
use repograph_core::{Edge, EdgeKind, Language, Node, NodeKind, RepoGraphError, Result};
use repograph_graph::Graph;
use repograph_api::QueryEngine;
use repograph_vector::{
    CollectionInfo, HashEmbeddingProvider, IndexPoint, Indexer, IndexerConfig, Journal,
    MemoryIndex, PointPayload, ScoredPoint, VectorIndex,
};
use std::sync::Arc;

fn function_node(name: &str, file: &str, doc: &str) -> Node {
    Node {
        id: Node::make_id(NodeKind::Function, name, file, 1),
        kind: NodeKind::Function,
        name: name.to_string(),
        file: file.to_string(),
        start_line: 1,
        end_line: 2,
        code: format!("def {}():\n    pass", name),
        doc: doc.to_string(),
        language: Language::Python,
        loc: 2,
        cyclomatic: 1,
        num_calls_in: 0,
        num_calls_out: 0,
    }
}

/// The S2 shape: `apple_handler` calls `banana_handler`.
fn call_graph() -> Graph {
    let a = function_node("apple_handler", "apple.py", "Handles apples.");
    let b = function_node("banana_handler", "banana.py", "Handles bananas.");
    let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeKind::Call);
    Graph::from_parts(vec![a, b], vec![edge]).unwrap()
}

async fn indexed_state(graph: &Graph) -> (Arc<MemoryIndex>, QueryEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let provider = Arc::new(HashEmbeddingProvider::default());
    let indexer = Indexer::new(provider.clone(), index.clone(), Arc::new(Journal::new()));
    indexer
        .index_graph(
            graph,
            &IndexerConfig::new(
                "test",
                dir.path().join("qdrant_map.json"),
                dir.path().join("index_status.json"),
            ),
        )
        .await
        .unwrap();
    let engine = QueryEngine::new(provider, index.clone());
    (index, engine, dir)
}

#[tokio::test]
async fn search_scores_never_increase() {
    let graph = call_graph();
    let (_index, engine, _dir) = indexed_state(&graph).await;

    let hits = engine.search("Handles apples.", 5, "test").await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn analyze_connects_the_hits_through_the_call_edge() {
    let graph = call_graph();
    let (_index, engine, _dir) = indexed_state(&graph).await;

    let answer = engine
        .analyze(&graph, "Handles apples.", 2, "test")
        .await
        .unwrap();

    let a_id = "function:apple_handler:apple.py:1";
    let b_id = "function:banana_handler:banana.py:1";
    assert_eq!(answer.answer_path, vec![a_id.to_string(), b_id.to_string()]);
    assert_eq!(answer.path_edges.len(), 1);
    assert_eq!(answer.path_edges[0].source, a_id);
    assert_eq!(answer.path_edges[0].target, b_id);
    assert_eq!(answer.path_edges[0].kind, EdgeKind::Call);
    assert_eq!(answer.snippets.len(), 2);

    // Every path node exists in the graph and every edge endpoint is
    // adjacent on the path.
    for id in &answer.answer_path {
        assert!(graph.contains(id));
    }
    for edge in &answer.path_edges {
        let i = answer.answer_path.iter().position(|n| *n == edge.source);
        let j = answer.answer_path.iter().position(|n| *n == edge.target);
        let (i, j) = (i.unwrap(), j.unwrap());
        assert_eq!(i.abs_diff(j), 1);
    }

    assert_eq!(answer.summary.steps.len(), 2);
    assert_eq!(answer.summary.node_refs.len(), 2);
    assert_eq!(answer.summary.node_refs[0].excerpt_line, "def apple_handler():");
    assert!(!answer.summary.caveats.is_empty());
}

#[tokio::test]
async fn analyze_with_a_single_hit_returns_that_node() {
    let node = function_node("solo", "solo.py", "All alone.");
    let graph = Graph::from_parts(vec![node], vec![]).unwrap();
    let (_index, engine, _dir) = indexed_state(&graph).await;

    let answer = engine.analyze(&graph, "All alone.", 1, "test").await.unwrap();
    assert_eq!(answer.answer_path.len(), 1);
    assert!(answer.path_edges.is_empty());
    assert_eq!(answer.snippets.len(), 1);
}

#[tokio::test]
async fn analyze_is_deterministic() {
    let graph = call_graph();
    let (_index, engine, _dir) = indexed_state(&graph).await;

    let first = engine
        .analyze(&graph, "Handles apples.", 2, "test")
        .await
        .unwrap();
    let second = engine
        .analyze(&graph, "Handles apples.", 2, "test")
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

/// Index double whose ANN structure is permanently "still building":
/// vectors are accepted but searches fail until then.
struct BuildingIndex {
    inner: MemoryIndex,
}

#[async_trait]
impl VectorIndex for BuildingIndex {
    async fn ensure_collection(&self, name: &str, dimension: usize, recreate: bool) -> Result<()> {
        self.inner.ensure_collection(name, dimension, recreate).await
    }
    async fn upsert(&self, name: &str, points: Vec<IndexPoint>) -> Result<usize> {
        self.inner.upsert(name, points).await
    }
    async fn search(&self, _name: &str, _vector: &[f32], _limit: usize) -> Result<Vec<ScoredPoint>> {
        Err(RepoGraphError::IndexNotReady("optimizer running".into()))
    }
    async fn scroll(&self, name: &str, limit: usize) -> Result<Vec<ScoredPoint>> {
        self.inner.scroll(name, limit).await
    }
    async fn count(&self, name: &str) -> Result<u64> {
        self.inner.count(name).await
    }
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        self.inner.list_collections().await
    }
    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }
}

async fn building_index_with_payloads() -> Arc<BuildingIndex> {
    let index = Arc::new(BuildingIndex {
        inner: MemoryIndex::new(),
    });
    index.ensure_collection("test", 2, false).await.unwrap();

    let payloads = vec![
        PointPayload {
            node_id: "function:parse_config:config.py:10".into(),
            snippet: "def parse_config(path):".into(),
            file: "config.py".into(),
            start_line: 10,
            doc: "Reads the config file.".into(),
        },
        PointPayload {
            node_id: "function:render:canvas.py:5".into(),
            snippet: "def render(surface):".into(),
            file: "canvas.py".into(),
            start_line: 5,
            doc: "Paints the canvas.".into(),
        },
    ];
    let points = payloads
        .into_iter()
        .enumerate()
        .map(|(i, payload)| IndexPoint {
            id: i as u64 + 1,
            vector: vec![1.0, 0.0],
            payload,
        })
        .collect();
    index.upsert("test", points).await.unwrap();
    index
}

#[tokio::test]
async fn search_degrades_to_keyword_scan_while_index_builds() {
    let index = building_index_with_payloads().await;
    let engine = QueryEngine::new(Arc::new(HashEmbeddingProvider::default()), index);

    let hits = engine.search("render", 5, "test").await.unwrap();
    // "render" appears in one snippet (0.8) and its node id (0.6).
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 1.4).abs() < 1e-6);
    assert!(hits.len() <= 5);
}

#[tokio::test]
async fn keyword_scan_scoring_rule_is_frozen() {
    let index = building_index_with_payloads().await;
    let engine = QueryEngine::new(Arc::new(HashEmbeddingProvider::default()), index);

    // Matches snippet (0.8) and node id (0.6) of parse_config.
    let hits = engine.search("parse_config", 5, "test").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 1.4).abs() < 1e-6);

    // Matches only the doc field (0.7).
    let hits = engine.search("paints the canvas", 5, "test").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 0.7).abs() < 1e-6);

    // Matches the file path (0.4) and the node id that embeds it (0.6).
    let hits = engine.search("config.py", 5, "test").await.unwrap();
    assert!((hits[0].score - 1.0).abs() < 1e-6);

    // No match at all yields no results.
    let hits = engine.search("zzz_nothing", 5, "test").await.unwrap();
    assert!(hits.is_empty());
}
