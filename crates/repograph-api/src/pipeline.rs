use crate::fetch::fetch_repository;
use crate::state::AppState;
use repograph_core::{JobKind, RepoGraphError, Result};
use repograph_graph::{load_graph, save_graph, Graph};
use repograph_parser::RepoParser;
use repograph_vector::{Indexer, IndexerConfig};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(120);
pub const EMBED_TIMEOUT: Duration = Duration::from_secs(600);
pub const UPSERT_TIMEOUT: Duration = Duration::from_secs(300);
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseRequest {
    pub repo_url: Option<String>,
    pub repo_path: Option<String>,
    pub branch: Option<String>,
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexRequest {
    pub collection: Option<String>,
    pub graph_path: Option<String>,
    #[serde(default)]
    pub recreate: bool,
}

/// Spawns a job task and returns its pending record immediately.
fn spawn_job<F>(state: AppState, kind: JobKind, work: F) -> repograph_core::Job
where
    F: FnOnce(
            AppState,
            CancellationToken,
            String,
        ) -> futures::future::BoxFuture<'static, Result<serde_json::Value>>
        + Send
        + 'static,
{
    let job = state.registry.create(kind);
    let job_id = job.job_id.clone();

    tokio::spawn(async move {
        let token = state
            .registry
            .token(&job_id)
            .unwrap_or_else(CancellationToken::new);
        if token.is_cancelled() {
            return;
        }
        state.registry.mark_running(&job_id);

        let outcome = work(state.clone(), token.clone(), job_id.clone()).await;
        if token.is_cancelled() {
            info!("job {} cancelled", job_id);
            state.registry.mark_cancelled(&job_id);
            return;
        }
        match outcome {
            Ok(result) => state.registry.complete(&job_id, result),
            Err(e) => state.registry.fail(&job_id, &e),
        }
    });

    job
}

pub fn spawn_parse_job(state: AppState, request: ParseRequest) -> repograph_core::Job {
    spawn_job(state, JobKind::Parse, move |state, token, job_id| {
        Box::pin(async move { parse_pipeline(&state, &token, &job_id, &request).await })
    })
}

pub fn spawn_index_job(state: AppState, request: IndexRequest) -> repograph_core::Job {
    spawn_job(state, JobKind::Index, move |state, token, job_id| {
        Box::pin(async move { index_pipeline(&state, &token, &job_id, &request).await })
    })
}

pub fn spawn_parse_and_index_job(
    state: AppState,
    parse: ParseRequest,
    index: IndexRequest,
) -> repograph_core::Job {
    spawn_job(state, JobKind::ParseAndIndex, move |state, token, job_id| {
        Box::pin(async move {
            // The index phase reads whatever graph file the parse phase
            // just wrote.
            let mut index = index;
            if index.graph_path.is_none() {
                index.graph_path = parse.output_path.clone();
            }

            let parse_result = parse_pipeline(&state, &token, &job_id, &parse).await?;
            if token.is_cancelled() {
                return Err(cancelled());
            }
            let index_result = index_pipeline(&state, &token, &job_id, &index).await?;
            Ok(json!({ "parse": parse_result, "index": index_result }))
        })
    })
}

fn cancelled() -> RepoGraphError {
    RepoGraphError::Internal("job cancelled".into())
}

/// fetch -> parse -> annotate -> persist graph.
pub async fn parse_pipeline(
    state: &AppState,
    token: &CancellationToken,
    job_id: &str,
    request: &ParseRequest,
) -> Result<serde_json::Value> {
    state.registry.set_progress(job_id, "fetching repository");
    let repo_path = resolve_repo_path(state, request).await?;
    if token.is_cancelled() {
        return Err(cancelled());
    }

    state.registry.set_progress(job_id, "parsing repository");
    let outcome = RepoParser::new().parse_repository(&repo_path).await?;
    if token.is_cancelled() {
        return Err(cancelled());
    }

    let graph = Graph::from_parts(outcome.nodes, outcome.edges)?;
    let graph_path = request
        .output_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| state.settings.graph_path());

    {
        let lock = state.path_lock(&graph_path);
        let _guard = lock.lock().await;
        save_graph(&graph, &graph_path)?;
    }

    let result = json!({
        "graph_path": graph_path.to_string_lossy(),
        "node_count": graph.node_count(),
        "edge_count": graph.edge_count(),
        "files_parsed": outcome.stats.parsed_files,
        "files_failed": outcome.stats.failed_files,
        "files_per_second": outcome.stats.files_per_second,
        "lines_per_second": outcome.stats.lines_per_second,
    });

    *state.graph.write().await = Some(graph);
    Ok(result)
}

/// load graph -> embed -> upsert -> journal.
pub async fn index_pipeline(
    state: &AppState,
    token: &CancellationToken,
    job_id: &str,
    request: &IndexRequest,
) -> Result<serde_json::Value> {
    let graph_path = request
        .graph_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| state.settings.graph_path());

    let graph = {
        let lock = state.path_lock(&graph_path);
        let _guard = lock.lock().await;
        load_graph(&graph_path).map_err(|e| match e {
            RepoGraphError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                RepoGraphError::NotFound(format!("graph file {}", graph_path.display()))
            }
            other => other,
        })?
    };
    if token.is_cancelled() {
        return Err(cancelled());
    }

    let collection = request
        .collection
        .clone()
        .unwrap_or_else(|| state.settings.collection.clone());
    let mut config = IndexerConfig::new(
        collection,
        state.settings.map_path(),
        state.settings.status_path(),
    );
    config.recreate = request.recreate;

    let indexer = Indexer::new(
        state.provider.clone(),
        state.index.clone(),
        state.journal.clone(),
    );

    state.registry.set_progress(job_id, "embedding and upserting");
    // Embedding and upsert interleave per batch, so their time limits
    // combine.
    let report = tokio::time::timeout(
        EMBED_TIMEOUT + UPSERT_TIMEOUT,
        indexer.index_graph_with_cancel(&graph, &config, token),
    )
    .await
    .map_err(|_| RepoGraphError::Timeout("embed/upsert phase exceeded its time limit".into()))??;

    *state.graph.write().await = Some(graph);
    Ok(serde_json::to_value(report)?)
}

async fn resolve_repo_path(state: &AppState, request: &ParseRequest) -> Result<PathBuf> {
    if let Some(path) = &request.repo_path {
        let path = PathBuf::from(path);
        if !path.is_dir() {
            return Err(RepoGraphError::InvalidInput(format!(
                "repo_path {} is not a directory",
                path.display()
            )));
        }
        return Ok(path);
    }

    let Some(url) = request.repo_url.clone() else {
        return Err(RepoGraphError::InvalidInput(
            "one of repo_url or repo_path is required".into(),
        ));
    };

    let branch = request.branch.clone();
    let tmp_dir = state.settings.tmp_dir.clone();
    let cloned = tokio::time::timeout(
        FETCH_TIMEOUT,
        tokio::task::spawn_blocking(move || {
            fetch_repository(&url, branch.as_deref(), &tmp_dir)
        }),
    )
    .await
    .map_err(|_| RepoGraphError::Timeout("repository fetch exceeded 120s".into()))?
    .map_err(|e| RepoGraphError::Internal(format!("fetch task failed: {}", e)))??;

    Ok(cloned)
}
