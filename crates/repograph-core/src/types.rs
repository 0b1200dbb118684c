use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical node identifier: `"<kind>:<qualname>:<relpath>:<start_line>"`.
pub type NodeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Function,
    Class,
    File,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::File => "file",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Call,
    Import,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeKind::Call => "call",
            EdgeKind::Import => "import",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Other(String),
}

impl Language {
    pub fn as_str(&self) -> &str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "python" => Language::Python,
            "javascript" => Language::JavaScript,
            "typescript" => Language::TypeScript,
            "rust" => Language::Rust,
            "go" => Language::Go,
            other => Language::Other(other.to_string()),
        })
    }
}

impl Serialize for Language {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(Language::Other(s)))
    }
}

/// A top-level program unit: a function, class or file.
///
/// Created by the parser, annotated once with derived metrics, immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    /// Repository-relative path of the defining file.
    pub file: String,
    /// 1-based, inclusive.
    pub start_line: u32,
    pub end_line: u32,
    /// Verbatim source slice from declaration header to closing delimiter.
    pub code: String,
    /// Leading documentation block, empty when absent.
    #[serde(default)]
    pub doc: String,
    pub language: Language,
    #[serde(default)]
    pub loc: u32,
    #[serde(default = "one")]
    pub cyclomatic: u32,
    #[serde(default)]
    pub num_calls_in: u32,
    #[serde(default)]
    pub num_calls_out: u32,
}

fn one() -> u32 {
    1
}

impl Node {
    /// Builds the canonical id for a node.
    pub fn make_id(kind: NodeKind, qualname: &str, relpath: &str, start_line: u32) -> NodeId {
        format!("{}:{}:{}:{}", kind, qualname, relpath, start_line)
    }
}

/// Directed relation between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    #[serde(alias = "from")]
    pub source: NodeId,
    #[serde(alias = "to")]
    pub target: NodeId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    /// True when name resolution could not map the reference to a single
    /// node and the edge fans out over every candidate.
    #[serde(default)]
    pub ambiguous: bool,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
            ambiguous: false,
        }
    }

    pub fn ambiguous(mut self) -> Self {
        self.ambiguous = true;
        self
    }

    /// Identity used to collapse duplicate edges.
    pub fn key(&self) -> (&str, &str, EdgeKind) {
        (&self.source, &self.target, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_format() {
        let id = Node::make_id(NodeKind::Function, "Canvas.render", "src/canvas.py", 42);
        assert_eq!(id, "function:Canvas.render:src/canvas.py:42");
    }

    #[test]
    fn edge_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EdgeKind::Call).unwrap(), "\"call\"");
        assert_eq!(
            serde_json::to_string(&EdgeKind::Import).unwrap(),
            "\"import\""
        );
    }

    #[test]
    fn edge_accepts_legacy_from_to_keys() {
        let edge: Edge =
            serde_json::from_str(r#"{"from":"a","to":"b","type":"call"}"#).unwrap();
        assert_eq!(edge.source, "a");
        assert_eq!(edge.target, "b");
        assert!(!edge.ambiguous);
    }

    #[test]
    fn language_round_trips_unknown_values() {
        let lang: Language = serde_json::from_str("\"zig\"").unwrap();
        assert_eq!(lang, Language::Other("zig".to_string()));
        assert_eq!(serde_json::to_string(&lang).unwrap(), "\"zig\"");
    }
}
