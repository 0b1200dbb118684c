use repograph_core::{NodeId, RepoGraphError, Result};
use repograph_graph::Graph;
use repograph_vector::{retry_index_op, EmbeddingProvider, ScoredPoint, VectorIndex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Frozen keyword-fallback weights; tests assert on these.
const SNIPPET_WEIGHT: f32 = 0.8;
const DOC_WEIGHT: f32 = 0.7;
const NODE_ID_WEIGHT: f32 = 0.6;
const FILE_WEIGHT: f32 = 0.4;

/// How much of the collection the keyword fallback scans.
const FALLBACK_SCROLL_LIMIT: usize = 1024;

#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub node_id: String,
    pub score: f32,
    pub snippet: String,
    pub file: String,
    pub start_line: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snippet {
    pub node_id: String,
    pub code: String,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub doc: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: repograph_core::EdgeKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRef {
    pub node_id: String,
    pub excerpt_line: String,
}

/// Structured summary stub. An external summarizer may refine the prose;
/// this form is always produced, collaborator or not.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub one_liner: String,
    pub steps: Vec<String>,
    pub inputs_outputs: String,
    pub caveats: Vec<String>,
    pub node_refs: Vec<NodeRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer_path: Vec<NodeId>,
    pub path_edges: Vec<PathEdge>,
    pub snippets: Vec<Snippet>,
    pub summary: Summary,
}

/// Semantic search plus answer-path assembly over the program graph.
pub struct QueryEngine {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl QueryEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { provider, index }
    }

    /// Embeds the query and searches the collection. When the index is
    /// unreachable or still building, degrades to the keyword scan with
    /// the frozen scoring rule.
    pub async fn search(&self, query: &str, top_k: usize, collection: &str) -> Result<Vec<Hit>> {
        if query.trim().is_empty() {
            return Err(RepoGraphError::InvalidInput("empty query".into()));
        }
        let top_k = top_k.max(1);

        let vectors = self.provider.embed(&[query.to_string()]).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| RepoGraphError::EmbedFailed("embedder returned no rows".into()))?;

        let searched = retry_index_op(|| {
            let vector = vector.clone();
            let collection = collection.to_string();
            let index = self.index.clone();
            async move { index.search(&collection, &vector, top_k).await }
        })
        .await;

        match searched {
            Ok(points) => Ok(points.into_iter().filter_map(hit_from_point).collect()),
            Err(RepoGraphError::IndexUnavailable(reason))
            | Err(RepoGraphError::IndexNotReady(reason)) => {
                warn!("vector search degraded to keyword scan: {}", reason);
                self.keyword_fallback(query, top_k, collection).await
            }
            Err(e) => Err(e),
        }
    }

    /// Substring scan over the payload corpus. Each payload scores the sum
    /// of 0.8 (snippet), 0.7 (doc), 0.6 (node id) and 0.4 (file path) for
    /// a case-insensitive query match in that field.
    async fn keyword_fallback(
        &self,
        query: &str,
        top_k: usize,
        collection: &str,
    ) -> Result<Vec<Hit>> {
        let points = self.index.scroll(collection, FALLBACK_SCROLL_LIMIT).await?;
        let needle = query.to_lowercase();

        let mut hits: Vec<Hit> = points
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload?;
                let mut score = 0.0;
                if payload.snippet.to_lowercase().contains(&needle) {
                    score += SNIPPET_WEIGHT;
                }
                if payload.doc.to_lowercase().contains(&needle) {
                    score += DOC_WEIGHT;
                }
                if payload.node_id.to_lowercase().contains(&needle) {
                    score += NODE_ID_WEIGHT;
                }
                if payload.file.to_lowercase().contains(&needle) {
                    score += FILE_WEIGHT;
                }
                if score == 0.0 {
                    return None;
                }
                Some(Hit {
                    node_id: payload.node_id,
                    score,
                    snippet: payload.snippet,
                    file: payload.file,
                    start_line: payload.start_line,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        hits.truncate(top_k);
        debug!("keyword fallback produced {} hits", hits.len());
        Ok(hits)
    }

    /// Search, then connect the hits through the graph and assemble the
    /// snippets and summary stub for the path.
    pub async fn analyze(
        &self,
        graph: &Graph,
        query: &str,
        top_k: usize,
        collection: &str,
    ) -> Result<Answer> {
        let hits = self.search(query, top_k, collection).await?;

        let hit_ids: Vec<NodeId> = hits
            .iter()
            .map(|h| h.node_id.clone())
            .filter(|id| graph.contains(id))
            .collect();
        if hit_ids.is_empty() {
            return Err(RepoGraphError::NotFound(format!(
                "no search hits map to graph nodes for \"{}\"",
                query
            )));
        }

        let (answer_path, path_edges) = if hit_ids.len() == 1 {
            (vec![hit_ids[0].clone()], Vec::new())
        } else {
            let id_set: BTreeSet<NodeId> = hit_ids.iter().cloned().collect();
            match graph.shortest_path(&id_set, &id_set) {
                Some((path, edges)) => (path, edges),
                // Hits exist but are mutually disconnected; fall back to
                // the best-ranked one.
                None => (vec![hit_ids[0].clone()], Vec::new()),
            }
        };

        let snippets: Vec<Snippet> = answer_path
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|node| Snippet {
                node_id: node.id.clone(),
                code: node.code.clone(),
                file: node.file.clone(),
                start_line: node.start_line,
                end_line: node.end_line,
                doc: node.doc.clone(),
            })
            .collect();

        let summary = build_summary(graph, query, &answer_path);

        Ok(Answer {
            answer_path,
            path_edges: path_edges
                .into_iter()
                .map(|e| PathEdge {
                    source: e.source,
                    target: e.target,
                    kind: e.kind,
                })
                .collect(),
            snippets,
            summary,
        })
    }
}

fn build_summary(graph: &Graph, query: &str, path: &[NodeId]) -> Summary {
    let steps: Vec<String> = path
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|node| {
            format!(
                "{} `{}` in {} (lines {}-{})",
                node.kind, node.name, node.file, node.start_line, node.end_line
            )
        })
        .collect();

    let node_refs: Vec<NodeRef> = path
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|node| NodeRef {
            node_id: node.id.clone(),
            excerpt_line: first_nonblank_line(&node.code),
        })
        .collect();

    let inputs_outputs = match (
        path.first().and_then(|id| graph.node(id)),
        path.last().and_then(|id| graph.node(id)),
    ) {
        (Some(first), Some(last)) => {
            let entry = first_nonblank_line(&first.code);
            let exit = first_nonblank_line(&last.code);
            if entry.is_empty() || exit.is_empty() {
                "Inputs and outputs derived statically from the answer path.".to_string()
            } else {
                format!("entry: {}; exit: {}", entry, exit)
            }
        }
        _ => "Inputs and outputs derived statically from the answer path.".to_string(),
    };

    Summary {
        one_liner: format!(
            "Answer path of {} node(s) connecting the top matches for \"{}\"",
            path.len(),
            query
        ),
        steps,
        inputs_outputs,
        caveats: vec![
            "Derived from static analysis; runtime behavior may differ.".to_string(),
            "Name-based edge resolution can include ambiguous candidates.".to_string(),
        ],
        node_refs,
    }
}

fn hit_from_point(point: ScoredPoint) -> Option<Hit> {
    let payload = point.payload?;
    Some(Hit {
        node_id: payload.node_id,
        score: point.score,
        snippet: payload.snippet,
        file: payload.file,
        start_line: payload.start_line,
    })
}

fn first_nonblank_line(code: &str) -> String {
    code.lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}
