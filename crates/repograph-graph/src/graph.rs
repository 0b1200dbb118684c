use repograph_core::{Edge, Node, NodeId, RepoGraphError, Result};
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Directed multigraph over program nodes.
///
/// Node storage is keyed by id with parallel successor/predecessor index
/// lists, so both directions enumerate in O(1) per neighbor and in edge
/// insertion order. The graph may be cyclic; nothing here assumes
/// otherwise.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    node_order: Vec<NodeId>,
    edges: Vec<Edge>,
    outgoing: HashMap<NodeId, Vec<usize>>,
    incoming: HashMap<NodeId, Vec<usize>>,
    by_name: HashMap<String, Vec<NodeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from parsed parts, validating edge endpoints and
    /// collapsing duplicate `(source, target, type)` triples.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert_node(node)?;
        }
        for edge in edges {
            graph.insert_edge(edge)?;
        }
        Ok(graph)
    }

    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(RepoGraphError::InvalidInput(format!(
                "duplicate node id: {}",
                node.id
            )));
        }
        self.node_order.push(node.id.clone());
        self.by_name
            .entry(node.name.clone())
            .or_default()
            .push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn insert_edge(&mut self, edge: Edge) -> Result<()> {
        if !self.nodes.contains_key(&edge.source) {
            return Err(RepoGraphError::InvalidInput(format!(
                "edge source not in graph: {}",
                edge.source
            )));
        }
        if !self.nodes.contains_key(&edge.target) {
            return Err(RepoGraphError::InvalidInput(format!(
                "edge target not in graph: {}",
                edge.target
            )));
        }
        if self
            .edges
            .iter()
            .any(|existing| existing.key() == edge.key())
        {
            return Ok(());
        }

        let index = self.edges.len();
        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(index);
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(index);
        self.edges.push(edge);
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn nodes_by_name(&self, name: &str) -> &[NodeId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Neighbor ids in edge insertion order.
    pub fn neighbors(&self, id: &str, direction: Direction) -> Vec<&str> {
        let index = match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
        };
        index
            .get(id)
            .map(|edge_indices| {
                edge_indices
                    .iter()
                    .map(|&i| match direction {
                        Direction::Outgoing => self.edges[i].target.as_str(),
                        Direction::Incoming => self.edges[i].source.as_str(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Minimum-hop path between any source and any distinct sink over the
    /// undirected projection of the graph.
    ///
    /// Ties break on smallest hop count, then on the lexicographically
    /// smallest node-id sequence, which makes the result deterministic for
    /// a fixed graph. Reported edges keep their original direction.
    pub fn shortest_path(
        &self,
        sources: &BTreeSet<NodeId>,
        sinks: &BTreeSet<NodeId>,
    ) -> Option<(Vec<NodeId>, Vec<Edge>)> {
        let mut best: Option<Vec<NodeId>> = None;

        for source in sources {
            if !self.contains(source) {
                continue;
            }
            let dist = self.bfs_undirected(source);
            for sink in sinks {
                if sink == source || !dist.contains_key(sink.as_str()) {
                    continue;
                }
                let Some(path) = self.reconstruct(source, sink, &dist) else {
                    continue;
                };
                let better = match &best {
                    None => true,
                    Some(current) => {
                        path.len() < current.len()
                            || (path.len() == current.len() && path < *current)
                    }
                };
                if better {
                    best = Some(path);
                }
            }
        }

        let path = best?;
        let edges = self.edges_along(&path);
        Some((path, edges))
    }

    fn bfs_undirected(&self, start: &str) -> HashMap<&str, u32> {
        let mut dist: HashMap<&str, u32> = HashMap::new();
        let Some((start_key, _)) = self.nodes.get_key_value(start) else {
            return dist;
        };
        let start = start_key.as_str();
        dist.insert(start, 0);
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let d = dist[current];
            for next in self.undirected_neighbors(current) {
                if !dist.contains_key(next) {
                    dist.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }
        dist
    }

    fn undirected_neighbors(&self, id: &str) -> Vec<&str> {
        let mut neighbors: Vec<&str> = Vec::new();
        if let Some(edge_indices) = self.outgoing.get(id) {
            neighbors.extend(edge_indices.iter().map(|&i| self.edges[i].target.as_str()));
        }
        if let Some(edge_indices) = self.incoming.get(id) {
            neighbors.extend(edge_indices.iter().map(|&i| self.edges[i].source.as_str()));
        }
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// Walks back from the sink, always taking the smallest-id predecessor
    /// one hop closer to the source.
    fn reconstruct(
        &self,
        source: &str,
        sink: &str,
        dist: &HashMap<&str, u32>,
    ) -> Option<Vec<NodeId>> {
        let mut path = vec![sink.to_string()];
        let mut current = sink;
        while current != source {
            let want = dist.get(current)?.checked_sub(1)?;
            let predecessor = self
                .undirected_neighbors(current)
                .into_iter()
                .filter(|n| dist.get(n).copied() == Some(want))
                .min()?;
            path.push(predecessor.to_string());
            current = self.nodes.get_key_value(predecessor).map(|(k, _)| k.as_str())?;
        }
        path.reverse();
        Some(path)
    }

    /// Original directed edges between consecutive path nodes, first
    /// inserted edge winning when parallel edges exist.
    fn edges_along(&self, path: &[NodeId]) -> Vec<Edge> {
        path.windows(2)
            .filter_map(|pair| {
                self.edges
                    .iter()
                    .find(|e| {
                        (e.source == pair[0] && e.target == pair[1])
                            || (e.source == pair[1] && e.target == pair[0])
                    })
                    .cloned()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::{EdgeKind, Language, NodeKind};

    fn node(id: &str, name: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Function,
            name: name.to_string(),
            file: "test.py".to_string(),
            start_line: 1,
            end_line: 1,
            code: String::new(),
            doc: String::new(),
            language: Language::Python,
            loc: 1,
            cyclomatic: 1,
            num_calls_in: 0,
            num_calls_out: 0,
        }
    }

    fn call(source: &str, target: &str) -> Edge {
        Edge::new(source.to_string(), target.to_string(), EdgeKind::Call)
    }

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let nodes = nodes.iter().map(|id| node(id, id)).collect();
        let edges = edges.iter().map(|(s, t)| call(s, t)).collect();
        Graph::from_parts(nodes, edges).unwrap()
    }

    #[test]
    fn rejects_dangling_edges() {
        let result = Graph::from_parts(vec![node("a", "a")], vec![call("a", "ghost")]);
        assert!(result.is_err());
    }

    #[test]
    fn collapses_duplicate_edges() {
        let g = Graph::from_parts(
            vec![node("a", "a"), node("b", "b")],
            vec![call("a", "b"), call("a", "b")],
        )
        .unwrap();
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn neighbors_follow_insertion_order() {
        let g = graph(&["a", "b", "c"], &[("a", "c"), ("a", "b")]);
        assert_eq!(g.neighbors("a", Direction::Outgoing), vec!["c", "b"]);
        assert_eq!(g.neighbors("b", Direction::Incoming), vec!["a"]);
        assert!(g.neighbors("c", Direction::Outgoing).is_empty());
    }

    #[test]
    fn name_index_groups_same_named_nodes() {
        let g = Graph::from_parts(
            vec![
                node("function:foo:one.py:1", "foo"),
                node("function:foo:two.py:1", "foo"),
                node("function:bar:one.py:9", "bar"),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(g.nodes_by_name("foo").len(), 2);
        assert_eq!(g.nodes_by_name("bar"), &["function:bar:one.py:9".to_string()]);
        assert!(g.nodes_by_name("missing").is_empty());
    }

    #[test]
    fn path_ignores_edge_direction_for_reachability() {
        // a -> b <- c : a reaches c only through the undirected projection.
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("c", "b")]);
        let sources = BTreeSet::from(["a".to_string()]);
        let sinks = BTreeSet::from(["c".to_string()]);
        let (path, edges) = g.shortest_path(&sources, &sinks).unwrap();
        assert_eq!(path, vec!["a", "b", "c"]);
        // Edges keep their original direction.
        assert_eq!(edges[0].source, "a");
        assert_eq!(edges[0].target, "b");
        assert_eq!(edges[1].source, "c");
        assert_eq!(edges[1].target, "b");
    }

    #[test]
    fn path_prefers_fewest_hops_then_lexicographic() {
        // Two 2-hop routes from a to d: via b and via c. The b route is
        // lexicographically smaller.
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "c"), ("c", "d"), ("a", "b"), ("b", "d")],
        );
        let sources = BTreeSet::from(["a".to_string()]);
        let sinks = BTreeSet::from(["d".to_string()]);
        let (path, _) = g.shortest_path(&sources, &sinks).unwrap();
        assert_eq!(path, vec!["a", "b", "d"]);
    }

    #[test]
    fn no_path_between_disconnected_components() {
        let g = graph(&["a", "b", "x", "y"], &[("a", "b"), ("x", "y")]);
        let sources = BTreeSet::from(["a".to_string()]);
        let sinks = BTreeSet::from(["y".to_string()]);
        assert!(g.shortest_path(&sources, &sinks).is_none());
    }

    #[test]
    fn multi_source_picks_the_closest_pair() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")],
        );
        let hits = BTreeSet::from(["a".to_string(), "d".to_string(), "e".to_string()]);
        let (path, _) = g.shortest_path(&hits, &hits).unwrap();
        assert_eq!(path, vec!["d", "e"]);
    }
}
