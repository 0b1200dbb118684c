use repograph_core::Node;

/// Per-node character cap for embedder input. Documents are truncated,
/// never omitted.
pub const DOCUMENT_CHAR_CAP: usize = 4000;

/// Character cap for the snippet carried in point payloads.
pub const SNIPPET_CHAR_CAP: usize = 800;

/// Renders the textual representation of a node fed to the embedder:
/// kind, name, path, doc and code with stable separators.
pub fn make_document(node: &Node) -> String {
    let mut doc = format!("{} {}\npath: {}\n", node.kind, node.name, node.file);
    if !node.doc.is_empty() {
        doc.push_str(&node.doc);
        doc.push('\n');
    }
    doc.push_str(&node.code);
    truncate_chars(&doc, DOCUMENT_CHAR_CAP)
}

/// The code slice carried in search payloads, capped so payloads stay
/// renderable without loading the graph.
pub fn snippet_of(node: &Node) -> String {
    truncate_chars(&node.code, SNIPPET_CHAR_CAP)
}

fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        return s.to_string();
    }
    s.chars().take(cap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::{Language, NodeKind};

    fn node_with_code(code: &str) -> Node {
        Node {
            id: "function:f:f.py:1".into(),
            kind: NodeKind::Function,
            name: "f".into(),
            file: "f.py".into(),
            start_line: 1,
            end_line: 1,
            code: code.to_string(),
            doc: "Does things.".into(),
            language: Language::Python,
            loc: 1,
            cyclomatic: 1,
            num_calls_in: 0,
            num_calls_out: 0,
        }
    }

    #[test]
    fn document_contains_all_sections_in_order() {
        let doc = make_document(&node_with_code("def f(): pass"));
        assert!(doc.starts_with("function f\npath: f.py\n"));
        let doc_pos = doc.find("Does things.").unwrap();
        let code_pos = doc.find("def f(): pass").unwrap();
        assert!(doc_pos < code_pos);
    }

    #[test]
    fn oversized_documents_are_truncated_not_dropped() {
        let long_code = "x".repeat(DOCUMENT_CHAR_CAP * 2);
        let doc = make_document(&node_with_code(&long_code));
        assert_eq!(doc.chars().count(), DOCUMENT_CHAR_CAP);
    }

    #[test]
    fn same_node_always_renders_the_same_document() {
        let node = node_with_code("def f(): return 1");
        assert_eq!(make_document(&node), make_document(&node));
    }
}
