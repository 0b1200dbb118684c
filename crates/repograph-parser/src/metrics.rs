use crate::language::LanguageProfile;
use repograph_core::{Edge, EdgeKind, Node};
use std::collections::HashMap;
use tree_sitter::Node as TsNode;

/// Cyclomatic complexity of one declaration: 1 + count of decision
/// constructs in its body. Nested function/class bodies are excluded;
/// each nested declaration carries its own complexity.
pub fn cyclomatic_complexity(node: &TsNode, profile: &LanguageProfile) -> u32 {
    1 + count_decisions(node, profile, true)
}

fn count_decisions(node: &TsNode, profile: &LanguageProfile, is_root: bool) -> u32 {
    if !is_root && profile.is_declaration(node.kind()) {
        return 0;
    }

    let mut count = 0;
    if profile.decision_kinds.contains(&node.kind()) {
        count += 1;
    }

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            // Logical operators are anonymous tokens under their
            // expression node.
            if profile.logical_operator_kinds.contains(&child.kind()) {
                count += 1;
            } else {
                count += count_decisions(&child, profile, false);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    count
}

/// Recomputes `num_calls_out` and `num_calls_in` from resolved call edges.
pub fn annotate_fan_counts(nodes: &mut [Node], edges: &[Edge]) {
    let mut out: HashMap<&str, u32> = HashMap::new();
    let mut inc: HashMap<&str, u32> = HashMap::new();
    for edge in edges.iter().filter(|e| e.kind == EdgeKind::Call) {
        *out.entry(edge.source.as_str()).or_default() += 1;
        *inc.entry(edge.target.as_str()).or_default() += 1;
    }

    for node in nodes.iter_mut() {
        node.num_calls_out = out.get(node.id.as_str()).copied().unwrap_or(0);
        node.num_calls_in = inc.get(node.id.as_str()).copied().unwrap_or(0);
    }
}
