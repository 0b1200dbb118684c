use crate::error::{ApiError, ApiResult};
use crate::pipeline::{
    spawn_index_job, spawn_parse_and_index_job, spawn_parse_job, IndexRequest, ParseRequest,
    QUERY_TIMEOUT,
};
use crate::query::{Answer, Hit};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use repograph_core::{Job, RepoGraphError};
use repograph_graph::graph_to_value;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub collection: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Hit>,
    pub query: String,
    pub total_results: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub collection: Option<String>,
    #[serde(default)]
    pub include_full_graph: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub answer: Answer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<Value>,
    pub processing_time: f64,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ParseAndIndexRequest {
    #[serde(flatten)]
    pub parse: ParseRequest,
    #[serde(flatten)]
    pub index: IndexRequest,
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "active_jobs": state.registry.active_count(),
        "environment": {
            "data_dir": state.settings.data_dir.to_string_lossy(),
            "qdrant_url": state.settings.qdrant_url,
            "collection": state.settings.collection,
            "model": state.provider.model_name(),
        }
    }))
}

fn accepted(job: Job) -> Json<JobAccepted> {
    Json(JobAccepted {
        job_id: job.job_id,
        status: "processing",
    })
}

pub async fn parse(
    State(state): State<AppState>,
    Json(request): Json<ParseRequest>,
) -> ApiResult<Json<JobAccepted>> {
    if request.repo_url.is_none() && request.repo_path.is_none() {
        return Err(ApiError(RepoGraphError::InvalidInput(
            "one of repo_url or repo_path is required".into(),
        )));
    }
    Ok(accepted(spawn_parse_job(state, request)))
}

pub async fn index(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> ApiResult<Json<JobAccepted>> {
    Ok(accepted(spawn_index_job(state, request)))
}

pub async fn parse_and_index(
    State(state): State<AppState>,
    Json(request): Json<ParseAndIndexRequest>,
) -> ApiResult<Json<JobAccepted>> {
    if request.parse.repo_url.is_none() && request.parse.repo_path.is_none() {
        return Err(ApiError(RepoGraphError::InvalidInput(
            "one of repo_url or repo_path is required".into(),
        )));
    }
    Ok(accepted(spawn_parse_and_index_job(
        state,
        request.parse,
        request.index,
    )))
}

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let collection = request
        .collection
        .unwrap_or_else(|| state.settings.collection.clone());

    let results = tokio::time::timeout(
        QUERY_TIMEOUT,
        state.query.search(&request.query, request.top_k, &collection),
    )
    .await
    .map_err(|_| ApiError(RepoGraphError::Timeout("search exceeded 30s".into())))??;

    Ok(Json(SearchResponse {
        total_results: results.len(),
        results,
        query: request.query,
    }))
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let started = Instant::now();
    let collection = request
        .collection
        .unwrap_or_else(|| state.settings.collection.clone());

    state.ensure_graph().await.map_err(|e| match e {
        RepoGraphError::Io(_) => {
            ApiError(RepoGraphError::NotFound("no graph available; run parse first".into()))
        }
        other => ApiError(other),
    })?;

    let guard = state.graph.read().await;
    let graph = guard
        .as_ref()
        .ok_or_else(|| ApiError(RepoGraphError::NotFound("graph not loaded".into())))?;

    let answer = tokio::time::timeout(
        QUERY_TIMEOUT,
        state
            .query
            .analyze(graph, &request.query, request.top_k, &collection),
    )
    .await
    .map_err(|_| ApiError(RepoGraphError::Timeout("analyze exceeded 30s".into())))??;

    let graph_value = if request.include_full_graph {
        Some(graph_to_value(graph).map_err(ApiError)?)
    } else {
        None
    };

    Ok(Json(AnalyzeResponse {
        answer,
        graph: graph_value,
        processing_time: started.elapsed().as_secs_f64(),
    }))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state
        .registry
        .get(&job_id)
        .ok_or_else(|| ApiError(RepoGraphError::NotFound(format!("job {}", job_id))))?;
    Ok(Json(job))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<crate::jobs::JobSummary> {
    Json(state.registry.summary())
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.registry.delete(&job_id).map_err(ApiError)?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.registry.cancel(&job_id).map_err(ApiError)?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn list_collections(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let collections = state.index.list_collections().await.map_err(ApiError)?;
    Ok(Json(json!({ "collections": collections })))
}
