use crate::Graph;
use repograph_core::{Edge, Language, Node, NodeKind, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const SCHEMA_VERSION: &str = "1.0";

/// On-disk node record. Identical to [`Node`] plus the `label` field some
/// downstream consumers key on (always equal to `name`).
#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: String,
    label: String,
    name: String,
    kind: NodeKind,
    file: String,
    start_line: u32,
    end_line: u32,
    code: String,
    #[serde(default)]
    doc: String,
    language: Language,
    #[serde(default)]
    loc: u32,
    #[serde(default = "one")]
    cyclomatic: u32,
    #[serde(default)]
    num_calls_in: u32,
    #[serde(default)]
    num_calls_out: u32,
}

fn one() -> u32 {
    1
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            label: node.name.clone(),
            name: node.name.clone(),
            kind: node.kind,
            file: node.file.clone(),
            start_line: node.start_line,
            end_line: node.end_line,
            code: node.code.clone(),
            doc: node.doc.clone(),
            language: node.language.clone(),
            loc: node.loc,
            cyclomatic: node.cyclomatic,
            num_calls_in: node.num_calls_in,
            num_calls_out: node.num_calls_out,
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Node {
            id: record.id,
            kind: record.kind,
            name: record.name,
            file: record.file,
            start_line: record.start_line,
            end_line: record.end_line,
            code: record.code,
            doc: record.doc,
            language: record.language,
            loc: record.loc,
            cyclomatic: record.cyclomatic,
            num_calls_in: record.num_calls_in,
            num_calls_out: record.num_calls_out,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub generated_by: String,
    pub schema_version: String,
}

#[derive(Serialize, Deserialize)]
struct GraphFile {
    nodes: Vec<NodeRecord>,
    edges: Vec<Edge>,
    metadata: GraphMetadata,
}

/// Writes the graph as JSON via write-to-temp + rename, so readers never
/// observe a half-written file.
pub fn save_graph(graph: &Graph, path: &Path) -> Result<()> {
    let file = GraphFile {
        nodes: graph.nodes().map(NodeRecord::from).collect(),
        edges: graph.edges().to_vec(),
        metadata: GraphMetadata {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            generated_by: format!("repograph {}", env!("CARGO_PKG_VERSION")),
            schema_version: SCHEMA_VERSION.to_string(),
        },
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, serde_json::to_vec_pretty(&file)?)?;
    fs::rename(&tmp_path, path)?;
    info!(
        "saved graph to {} ({} nodes, {} edges)",
        path.display(),
        file.metadata.node_count,
        file.metadata.edge_count
    );
    Ok(())
}

/// Renders the graph in the same shape as the on-disk file, for callers
/// that embed it in a response.
pub fn graph_to_value(graph: &Graph) -> Result<serde_json::Value> {
    let file = GraphFile {
        nodes: graph.nodes().map(NodeRecord::from).collect(),
        edges: graph.edges().to_vec(),
        metadata: GraphMetadata {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            generated_by: format!("repograph {}", env!("CARGO_PKG_VERSION")),
            schema_version: SCHEMA_VERSION.to_string(),
        },
    };
    Ok(serde_json::to_value(&file)?)
}

pub fn load_graph(path: &Path) -> Result<Graph> {
    let data = fs::read(path)?;
    let file: GraphFile = serde_json::from_slice(&data)?;
    let nodes = file.nodes.into_iter().map(Node::from).collect();
    Graph::from_parts(nodes, file.edges)
}
