use crate::collector::{CallRef, FileExtraction, ImportRef, SourceCollector};
use crate::file_collect::collect_source_files;
use crate::language::LanguageRegistry;
use crate::{metrics, resolver};
use futures::stream::{self, StreamExt};
use repograph_core::{Edge, Node, RepoGraphError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct ParsingStatistics {
    pub total_files: usize,
    pub parsed_files: usize,
    pub failed_files: usize,
    pub total_lines: usize,
    pub parsing_duration: Duration,
    pub files_per_second: f64,
    pub lines_per_second: f64,
}

#[derive(Debug)]
pub struct ParseOutcome {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: ParsingStatistics,
}

/// Parses a repository tree into nodes and resolved edges.
///
/// Files are parsed concurrently under a semaphore, largest first to
/// reduce tail latency; per-file failures are logged and skipped. The
/// parse fails only when no file could be parsed at all.
pub struct RepoParser {
    registry: Arc<LanguageRegistry>,
    max_concurrent_files: usize,
}

impl RepoParser {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(LanguageRegistry::new()),
            max_concurrent_files: std::cmp::max(2, num_cpus::get()),
        }
    }

    pub fn with_concurrency(mut self, max_concurrent_files: usize) -> Self {
        self.max_concurrent_files = max_concurrent_files.max(1);
        self
    }

    pub async fn parse_repository(&self, root: &Path) -> Result<ParseOutcome> {
        let start_time = Instant::now();
        let root = root.to_path_buf();
        info!("parsing repository at {}", root.display());

        let registry = self.registry.clone();
        let sized_files = tokio::task::spawn_blocking({
            let root = root.clone();
            let registry = registry.clone();
            move || {
                collect_source_files(&root)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|(p, _)| {
                        registry.detect_language(&p.to_string_lossy()).is_some()
                    })
                    .collect::<Vec<(PathBuf, u64)>>()
            }
        })
        .await
        .map_err(|e| RepoGraphError::Internal(format!("file collection task failed: {}", e)))?;

        // Schedule big files first.
        let mut sized_files = sized_files;
        sized_files.sort_by(|a, b| b.1.cmp(&a.1));
        let files: Vec<PathBuf> = sized_files.into_iter().map(|(p, _)| p).collect();
        let total_files = files.len();
        info!("found {} files to parse", total_files);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_files));
        let mut stream = stream::iter(files.into_iter().map(|file_path| {
            let semaphore = semaphore.clone();
            let registry = registry.clone();
            let root = root.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| RepoGraphError::Internal("semaphore closed".into()))?;
                parse_one_file(&registry, &root, &file_path).await
            }
        }))
        .buffer_unordered(self.max_concurrent_files);

        let mut extractions: Vec<(String, FileExtraction, usize)> = Vec::new();
        let mut failed_files = 0;
        let mut total_lines = 0;

        while let Some(result) = stream.next().await {
            match result {
                Ok((relpath, extraction, lines)) => {
                    debug!("parsed {} ({} nodes)", relpath, extraction.nodes.len());
                    total_lines += lines;
                    extractions.push((relpath, extraction, lines));
                }
                Err(e) => {
                    failed_files += 1;
                    warn!("failed to parse file: {}", e);
                }
            }
        }

        let parsed_files = extractions.len();
        if parsed_files == 0 {
            return Err(RepoGraphError::ParseFailed(format!(
                "no parseable source files under {}",
                root.display()
            )));
        }

        // Merge in path order so output is independent of completion order.
        extractions.sort_by(|a, b| a.0.cmp(&b.0));
        let mut nodes: Vec<Node> = Vec::new();
        let mut calls: Vec<CallRef> = Vec::new();
        let mut imports: Vec<ImportRef> = Vec::new();
        for (_, extraction, _) in extractions {
            nodes.extend(extraction.nodes);
            calls.extend(extraction.calls);
            imports.extend(extraction.imports);
        }

        let edges = resolver::resolve_edges(&nodes, &calls, &imports);
        metrics::annotate_fan_counts(&mut nodes, &edges);

        let parsing_duration = start_time.elapsed();
        let secs = parsing_duration.as_secs_f64();
        let stats = ParsingStatistics {
            total_files,
            parsed_files,
            failed_files,
            total_lines,
            parsing_duration,
            files_per_second: if secs > 0.0 { parsed_files as f64 / secs } else { 0.0 },
            lines_per_second: if secs > 0.0 { total_lines as f64 / secs } else { 0.0 },
        };

        info!(
            "parsing completed: {}/{} files, {} nodes, {} edges in {:.2}s",
            parsed_files,
            total_files,
            nodes.len(),
            edges.len(),
            secs
        );

        Ok(ParseOutcome {
            nodes,
            edges,
            stats,
        })
    }
}

impl Default for RepoParser {
    fn default() -> Self {
        Self::new()
    }
}

async fn parse_one_file(
    registry: &LanguageRegistry,
    root: &Path,
    file_path: &Path,
) -> Result<(String, FileExtraction, usize)> {
    let content = tokio::fs::read_to_string(file_path).await?;
    let relpath = file_path
        .strip_prefix(root)
        .unwrap_or(file_path)
        .to_string_lossy()
        .replace('\\', "/");

    let language = registry
        .detect_language(&relpath)
        .ok_or_else(|| RepoGraphError::ParseFailed(format!("unsupported language: {}", relpath)))?;
    let config = registry
        .get_config(&language)
        .ok_or_else(|| RepoGraphError::ParseFailed(format!("no grammar for {}", language)))?;
    let mut parser = registry
        .create_parser(&language)
        .ok_or_else(|| RepoGraphError::ParseFailed(format!("parser init failed for {}", language)))?;

    let tree = parser
        .parse(&content, None)
        .ok_or_else(|| RepoGraphError::ParseFailed(format!("syntax tree unavailable: {}", relpath)))?;

    let lines = content.lines().count();
    let extraction = SourceCollector::extract(&tree, &content, &relpath, config.profile);
    Ok((relpath, extraction, lines))
}
