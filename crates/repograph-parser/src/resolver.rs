use crate::collector::{CallRef, ImportRef};
use repograph_core::{Edge, EdgeKind, Node, NodeKind};
use std::collections::HashMap;

/// Resolves raw call and import references against the extracted nodes.
///
/// Calls resolve by unqualified name first, then by receiver-qualified
/// name. A name mapping to several nodes prefers the candidate in the
/// caller's own file; failing that, one edge per candidate is emitted with
/// `ambiguous = true`. Unresolved names are dropped. Duplicate
/// `(source, target, type)` triples are collapsed, an unambiguous
/// observation winning over an ambiguous one.
pub fn resolve_edges(nodes: &[Node], calls: &[CallRef], imports: &[ImportRef]) -> Vec<Edge> {
    let mut by_name: HashMap<&str, Vec<&Node>> = HashMap::new();
    let mut by_qualname: HashMap<String, Vec<&Node>> = HashMap::new();
    let mut files_by_name: HashMap<&str, Vec<&Node>> = HashMap::new();
    let mut file_of: HashMap<&str, &str> = HashMap::new();

    for node in nodes {
        file_of.insert(node.id.as_str(), node.file.as_str());
        match node.kind {
            NodeKind::File => files_by_name.entry(node.name.as_str()).or_default().push(node),
            _ => {
                by_name.entry(node.name.as_str()).or_default().push(node);
                if let Some(qualname) = qualname_of(&node.id) {
                    by_qualname.entry(qualname.to_string()).or_default().push(node);
                }
            }
        }
    }

    let mut edges: Vec<Edge> = Vec::new();
    let mut seen: HashMap<(String, String, EdgeKind), usize> = HashMap::new();

    for call in calls {
        let mut candidates: Vec<&Node> = by_name.get(call.name.as_str()).cloned().unwrap_or_default();
        if candidates.is_empty() {
            if let Some(qualified) = &call.qualified {
                candidates = by_qualname.get(qualified).cloned().unwrap_or_default();
            }
        }
        if candidates.is_empty() {
            continue;
        }

        if candidates.len() > 1 {
            let owner_file = file_of.get(call.owner.as_str()).copied();
            let same_file: Vec<&Node> = candidates
                .iter()
                .copied()
                .filter(|n| Some(n.file.as_str()) == owner_file)
                .collect();
            if same_file.len() == 1 {
                candidates = same_file;
            } else {
                for candidate in &candidates {
                    push_edge(
                        &mut edges,
                        &mut seen,
                        Edge::new(call.owner.clone(), candidate.id.clone(), EdgeKind::Call)
                            .ambiguous(),
                    );
                }
                continue;
            }
        }

        push_edge(
            &mut edges,
            &mut seen,
            Edge::new(call.owner.clone(), candidates[0].id.clone(), EdgeKind::Call),
        );
    }

    for import in imports {
        for module in &import.modules {
            // `import a.b.c` may be addressed by the full dotted path or
            // by the final module segment.
            let mut candidates: Vec<&Node> =
                files_by_name.get(module.as_str()).cloned().unwrap_or_default();
            if candidates.is_empty() {
                if let Some(last) = module.rsplit('.').next() {
                    candidates = files_by_name.get(last).cloned().unwrap_or_default();
                }
            }
            emit_import_edges(&mut edges, &mut seen, &import.owner, candidates);
        }
        for symbol in &import.symbols {
            let candidates: Vec<&Node> =
                by_name.get(symbol.as_str()).cloned().unwrap_or_default();
            emit_import_edges(&mut edges, &mut seen, &import.owner, candidates);
        }
    }

    edges
}

fn push_edge(
    edges: &mut Vec<Edge>,
    seen: &mut HashMap<(String, String, EdgeKind), usize>,
    edge: Edge,
) {
    let key = (edge.source.clone(), edge.target.clone(), edge.kind);
    match seen.get(&key) {
        Some(&i) => edges[i].ambiguous &= edge.ambiguous,
        None => {
            seen.insert(key, edges.len());
            edges.push(edge);
        }
    }
}

fn emit_import_edges(
    edges: &mut Vec<Edge>,
    seen: &mut HashMap<(String, String, EdgeKind), usize>,
    owner: &str,
    candidates: Vec<&Node>,
) {
    match candidates.len() {
        0 => {}
        1 => push_edge(
            edges,
            seen,
            Edge::new(owner.to_string(), candidates[0].id.clone(), EdgeKind::Import),
        ),
        _ => {
            for candidate in candidates {
                push_edge(
                    edges,
                    seen,
                    Edge::new(owner.to_string(), candidate.id.clone(), EdgeKind::Import)
                        .ambiguous(),
                );
            }
        }
    }
}

/// The qualified-name segment of a canonical node id.
fn qualname_of(id: &str) -> Option<&str> {
    id.splitn(3, ':').nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::Language;

    fn node(kind: NodeKind, name: &str, file: &str, line: u32) -> Node {
        let id = Node::make_id(kind, name, file, line);
        Node {
            id,
            kind,
            name: name.rsplit('.').next().unwrap_or(name).to_string(),
            file: file.to_string(),
            start_line: line,
            end_line: line,
            code: String::new(),
            doc: String::new(),
            language: Language::Python,
            loc: 1,
            cyclomatic: 1,
            num_calls_in: 0,
            num_calls_out: 0,
        }
    }

    #[test]
    fn unique_name_resolves_unambiguously() {
        let nodes = vec![
            node(NodeKind::Function, "a", "a.py", 1),
            node(NodeKind::Function, "b", "b.py", 1),
        ];
        let calls = vec![CallRef {
            owner: nodes[0].id.clone(),
            name: "b".into(),
            qualified: None,
        }];
        let edges = resolve_edges(&nodes, &calls, &[]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, nodes[1].id);
        assert!(!edges[0].ambiguous);
    }

    #[test]
    fn colliding_names_fan_out_as_ambiguous() {
        let nodes = vec![
            node(NodeKind::Function, "caller", "main.py", 1),
            node(NodeKind::Function, "foo", "one.py", 1),
            node(NodeKind::Function, "foo", "two.py", 1),
        ];
        let calls = vec![CallRef {
            owner: nodes[0].id.clone(),
            name: "foo".into(),
            qualified: None,
        }];
        let edges = resolve_edges(&nodes, &calls, &[]);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.ambiguous));
    }

    #[test]
    fn same_file_candidate_wins_the_tie() {
        let nodes = vec![
            node(NodeKind::Function, "caller", "one.py", 5),
            node(NodeKind::Function, "foo", "one.py", 1),
            node(NodeKind::Function, "foo", "two.py", 1),
        ];
        let calls = vec![CallRef {
            owner: nodes[0].id.clone(),
            name: "foo".into(),
            qualified: None,
        }];
        let edges = resolve_edges(&nodes, &calls, &[]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, nodes[1].id);
        assert!(!edges[0].ambiguous);
    }

    #[test]
    fn unresolved_names_are_dropped() {
        let nodes = vec![node(NodeKind::Function, "a", "a.py", 1)];
        let calls = vec![CallRef {
            owner: nodes[0].id.clone(),
            name: "missing".into(),
            qualified: None,
        }];
        assert!(resolve_edges(&nodes, &calls, &[]).is_empty());
    }

    #[test]
    fn duplicate_edges_collapse() {
        let nodes = vec![
            node(NodeKind::Function, "a", "a.py", 1),
            node(NodeKind::Function, "b", "b.py", 1),
        ];
        let calls = vec![
            CallRef {
                owner: nodes[0].id.clone(),
                name: "b".into(),
                qualified: None,
            },
            CallRef {
                owner: nodes[0].id.clone(),
                name: "b".into(),
                qualified: None,
            },
        ];
        let edges = resolve_edges(&nodes, &calls, &[]);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn qualified_call_reaches_method() {
        let nodes = vec![
            node(NodeKind::Function, "caller", "main.py", 1),
            node(NodeKind::Function, "Canvas.render", "canvas.py", 10),
            node(NodeKind::Function, "Grid.render", "grid.py", 10),
        ];
        // Unqualified "render" is ambiguous; the qualified form is not
        // consulted because the name index already has candidates.
        let calls = vec![CallRef {
            owner: nodes[0].id.clone(),
            name: "render".into(),
            qualified: Some("Canvas.render".into()),
        }];
        let edges = resolve_edges(&nodes, &calls, &[]);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.ambiguous));
    }

    #[test]
    fn import_symbol_resolves_to_definition() {
        let nodes = vec![
            node(NodeKind::File, "main", "main.py", 1),
            node(NodeKind::Function, "helper", "util.py", 1),
        ];
        let imports = vec![ImportRef {
            owner: nodes[0].id.clone(),
            modules: vec!["util".into()],
            symbols: vec!["helper".into()],
        }];
        let edges = resolve_edges(&nodes, &[], &imports);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, EdgeKind::Import);
        assert_eq!(edges[0].target, nodes[1].id);
    }
}
