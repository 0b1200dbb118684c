use repograph_core::{Edge, EdgeKind, Language, Node, NodeKind};
use repograph_graph::Graph;
use repograph_vector::{
    HashEmbeddingProvider, Indexer, IndexerConfig, Journal, MemoryIndex, VectorIndex,
};
use std::sync::Arc;

fn function_node(name: &str, file: &str) -> Node {
    Node {
        id: Node::make_id(NodeKind::Function, name, file, 1),
        kind: NodeKind::Function,
        name: name.to_string(),
        file: file.to_string(),
        start_line: 1,
        end_line: 2,
        code: format!("def {}():\n    pass", name),
        doc: format!("The {} operation.", name),
        language: Language::Python,
        loc: 2,
        cyclomatic: 1,
        num_calls_in: 0,
        num_calls_out: 0,
    }
}

fn sample_graph() -> Graph {
    let a = function_node("alpha", "alpha.py");
    let b = function_node("beta", "beta.py");
    let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeKind::Call);
    Graph::from_parts(vec![a, b], vec![edge]).unwrap()
}

fn indexer_with(index: Arc<MemoryIndex>) -> (Indexer, Arc<Journal>) {
    let journal = Arc::new(Journal::new());
    let indexer = Indexer::new(
        Arc::new(HashEmbeddingProvider::default()),
        index,
        journal.clone(),
    );
    (indexer, journal)
}

fn config(dir: &tempfile::TempDir, recreate: bool) -> IndexerConfig {
    let mut config = IndexerConfig::new(
        "repograph_test",
        dir.path().join("qdrant_map.json"),
        dir.path().join("index_status.json"),
    );
    config.recreate = recreate;
    config
}

#[tokio::test]
async fn indexing_writes_points_and_journal() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let (indexer, journal) = indexer_with(index.clone());
    let graph = sample_graph();

    let report = indexer
        .index_graph(&graph, &config(&dir, false))
        .await
        .unwrap();

    assert_eq!(report.points_count, 2);
    assert_eq!(report.vector_size, 384);
    assert_eq!(index.count("repograph_test").await.unwrap(), 2);

    let map = journal
        .read_map(&dir.path().join("qdrant_map.json"))
        .await
        .unwrap();
    assert_eq!(map.len(), 2);
    // Point ids are dense and start at 1.
    assert!(map.contains_key(&1));
    assert!(map.contains_key(&2));
    assert!(map.values().any(|v| v.starts_with("function:alpha:")));

    let status = journal
        .read_status(&dir.path().join("index_status.json"))
        .await
        .unwrap();
    assert_eq!(status.points_count, 2);
    assert_eq!(status.distance, "Cosine");
}

#[tokio::test]
async fn reindex_without_recreate_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let (indexer, _journal) = indexer_with(index.clone());
    let graph = sample_graph();

    let first = indexer
        .index_graph(&graph, &config(&dir, false))
        .await
        .unwrap();
    let second = indexer
        .index_graph(&graph, &config(&dir, false))
        .await
        .unwrap();

    assert_eq!(first.points_count, second.points_count);
    assert_eq!(index.count("repograph_test").await.unwrap(), 2);
}

#[tokio::test]
async fn reindex_with_recreate_drops_and_repopulates() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let (indexer, _journal) = indexer_with(index.clone());
    let graph = sample_graph();

    indexer
        .index_graph(&graph, &config(&dir, false))
        .await
        .unwrap();
    let again = indexer
        .index_graph(&graph, &config(&dir, true))
        .await
        .unwrap();

    assert_eq!(again.points_count, 2);
    assert_eq!(index.count("repograph_test").await.unwrap(), 2);
}

#[tokio::test]
async fn cancelled_run_writes_no_journal_files() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let (indexer, _journal) = indexer_with(index.clone());
    let graph = sample_graph();

    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();
    let result = indexer
        .index_graph_with_cancel(&graph, &config(&dir, false), &cancel)
        .await;

    assert!(result.is_err());
    assert!(!dir.path().join("qdrant_map.json").exists());
    assert!(!dir.path().join("index_status.json").exists());
}

#[tokio::test]
async fn search_after_index_finds_the_right_node() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let (indexer, _journal) = indexer_with(index.clone());
    let graph = sample_graph();

    indexer
        .index_graph(&graph, &config(&dir, false))
        .await
        .unwrap();

    let provider = HashEmbeddingProvider::default();
    use repograph_vector::EmbeddingProvider;
    let query = provider
        .embed(&["The alpha operation.".to_string()])
        .await
        .unwrap();

    let hits = index
        .search("repograph_test", &query[0], 2)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(hits[0]
        .payload
        .as_ref()
        .unwrap()
        .node_id
        .starts_with("function:alpha:"));
}
