use repograph_api::pipeline::{index_pipeline, parse_pipeline, IndexRequest, ParseRequest};
use repograph_api::AppState;
use repograph_core::{RepoGraphError, Settings};
use repograph_vector::{HashEmbeddingProvider, MemoryIndex};
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn test_state(data_dir: &std::path::Path) -> AppState {
    let settings = Settings {
        data_dir: data_dir.to_path_buf(),
        tmp_dir: data_dir.join("tmp"),
        ..Settings::default()
    };
    AppState::with_components(
        settings,
        Arc::new(HashEmbeddingProvider::default()),
        Arc::new(MemoryIndex::new()),
    )
}

fn write_fixture_repo(dir: &std::path::Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("orders.py"),
        "def load_orders(path):\n    \"\"\"Load orders from disk.\"\"\"\n    return validate_orders(path)\n",
    )
    .unwrap();
    fs::write(
        dir.join("validate.py"),
        "def validate_orders(path):\n    \"\"\"Reject malformed orders.\"\"\"\n    return path\n",
    )
    .unwrap();
}

#[tokio::test]
async fn parse_then_index_then_analyze() {
    let scratch = tempfile::tempdir().unwrap();
    let repo_dir = scratch.path().join("repo");
    write_fixture_repo(&repo_dir);
    let state = test_state(&scratch.path().join("data"));

    // Parse.
    let parse_request = ParseRequest {
        repo_path: Some(repo_dir.to_string_lossy().to_string()),
        ..ParseRequest::default()
    };
    let token = CancellationToken::new();
    let parse_result = parse_pipeline(&state, &token, "test_parse", &parse_request)
        .await
        .unwrap();
    assert_eq!(parse_result["node_count"], 2);
    assert_eq!(parse_result["edge_count"], 1);
    assert!(state.settings.graph_path().exists());

    // Index into the in-memory backend.
    let index_result = index_pipeline(&state, &token, "test_index", &IndexRequest::default())
        .await
        .unwrap();
    assert_eq!(index_result["points_count"], 2);
    assert!(state.settings.map_path().exists());
    assert!(state.settings.status_path().exists());

    // Analyze: the two definitions are linked by the call edge.
    let guard = state.graph.read().await;
    let graph = guard.as_ref().unwrap();
    let answer = state
        .query
        .analyze(graph, "orders", 2, &state.settings.collection)
        .await
        .unwrap();
    assert_eq!(answer.answer_path.len(), 2);
    assert_eq!(answer.path_edges.len(), 1);
    assert_eq!(answer.snippets.len(), 2);
}

#[tokio::test]
async fn index_without_a_graph_is_not_found() {
    let scratch = tempfile::tempdir().unwrap();
    let state = test_state(&scratch.path().join("data"));

    let err = index_pipeline(
        &state,
        &CancellationToken::new(),
        "test_index",
        &IndexRequest::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepoGraphError::NotFound(_)));
}

#[tokio::test]
async fn parse_rejects_a_missing_local_path() {
    let scratch = tempfile::tempdir().unwrap();
    let state = test_state(&scratch.path().join("data"));

    let request = ParseRequest {
        repo_path: Some("/definitely/not/here".into()),
        ..ParseRequest::default()
    };
    let err = parse_pipeline(&state, &CancellationToken::new(), "test_parse", &request)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoGraphError::InvalidInput(_)));
}

#[tokio::test]
async fn cancelled_parse_leaves_no_graph_file() {
    let scratch = tempfile::tempdir().unwrap();
    let repo_dir = scratch.path().join("repo");
    write_fixture_repo(&repo_dir);
    let state = test_state(&scratch.path().join("data"));

    let token = CancellationToken::new();
    token.cancel();
    let request = ParseRequest {
        repo_path: Some(repo_dir.to_string_lossy().to_string()),
        ..ParseRequest::default()
    };
    let result = parse_pipeline(&state, &token, "test_parse", &request).await;
    assert!(result.is_err());
    assert!(!state.settings.graph_path().exists());
}
