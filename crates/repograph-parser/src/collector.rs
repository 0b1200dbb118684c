use crate::language::{DocConvention, LanguageProfile};
use crate::metrics;
use repograph_core::{Node, NodeId, NodeKind};
use tree_sitter::{Node as TsNode, Tree};

/// Raw import destructured by a language profile, before resolution.
#[derive(Debug, Clone, Default)]
pub struct RawImport {
    pub modules: Vec<String>,
    pub symbols: Vec<String>,
}

/// A call expression observed inside `owner`, waiting for name resolution.
#[derive(Debug, Clone)]
pub struct CallRef {
    pub owner: NodeId,
    /// Unqualified callee name.
    pub name: String,
    /// Receiver-qualified form (`Canvas.render`) when the callee is a
    /// dotted or scoped path, normalized to dots.
    pub qualified: Option<String>,
}

/// Import declarations observed in a file, attributed to its file node.
#[derive(Debug, Clone)]
pub struct ImportRef {
    pub owner: NodeId,
    pub modules: Vec<String>,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    pub nodes: Vec<Node>,
    pub calls: Vec<CallRef>,
    pub imports: Vec<ImportRef>,
}

/// Walks one file's concrete syntax tree and emits nodes plus raw call and
/// import references. Generic over the language profile; the profile tables
/// are the only language-specific input.
pub struct SourceCollector<'a> {
    profile: &'static LanguageProfile,
    source: &'a str,
    relpath: &'a str,
    scopes: Vec<String>,
    owners: Vec<NodeId>,
    file_node_id: NodeId,
    nodes: Vec<Node>,
    calls: Vec<CallRef>,
    imports: Vec<ImportRef>,
}

impl<'a> SourceCollector<'a> {
    pub fn extract(
        tree: &Tree,
        source: &'a str,
        relpath: &'a str,
        profile: &'static LanguageProfile,
    ) -> FileExtraction {
        let stem = std::path::Path::new(relpath)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(relpath)
            .to_string();
        let file_node_id = Node::make_id(NodeKind::File, &stem, relpath, 1);

        let mut collector = SourceCollector {
            profile,
            source,
            relpath,
            scopes: Vec::new(),
            owners: vec![file_node_id.clone()],
            file_node_id: file_node_id.clone(),
            nodes: Vec::new(),
            calls: Vec::new(),
            imports: Vec::new(),
        };

        let root = tree.root_node();
        collector.walk(root);

        // A file node exists only when it anchors something: module-level
        // calls or import declarations. Plain definition files stay
        // file-node-free so node counts match what was declared.
        let anchors_refs = !collector.imports.is_empty()
            || collector.calls.iter().any(|c| c.owner == file_node_id);
        if anchors_refs {
            let end_line = source.lines().count().max(1) as u32;
            let file_node = Node {
                id: file_node_id,
                kind: NodeKind::File,
                name: stem,
                file: relpath.to_string(),
                start_line: 1,
                end_line,
                code: source.to_string(),
                doc: collector.module_doc(root),
                language: profile.language.clone(),
                loc: end_line,
                cyclomatic: metrics::cyclomatic_complexity(&root, profile),
                num_calls_in: 0,
                num_calls_out: 0,
            };
            collector.nodes.insert(0, file_node);
        }

        FileExtraction {
            nodes: collector.nodes,
            calls: collector.calls,
            imports: collector.imports,
        }
    }

    fn walk(&mut self, node: TsNode) {
        let kind = node.kind();

        if self.profile.is_declaration(kind) {
            self.visit_declaration(node);
            return;
        }

        if self.profile.scope_kinds.contains(&kind) {
            let pushed = self.push_scope_name(node);
            self.walk_children(node);
            if pushed {
                self.scopes.pop();
            }
            return;
        }

        if self.profile.call_kinds.contains(&kind) {
            self.record_call(node);
            // Arguments may contain further calls.
            self.walk_children(node);
            return;
        }

        if self.profile.import_kinds.contains(&kind) {
            if let Some(raw) = (self.profile.parse_import)(&node, self.source) {
                self.imports.push(ImportRef {
                    owner: self.file_node_id.clone(),
                    modules: raw.modules,
                    symbols: raw.symbols,
                });
            }
            return;
        }

        self.walk_children(node);
    }

    fn walk_children(&mut self, node: TsNode) {
        let mut cursor = node.walk();
        let children: Vec<TsNode> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child);
        }
    }

    fn visit_declaration(&mut self, node: TsNode) {
        let Some(name) = self.declared_name(node) else {
            // Anonymous declaration: nothing to address it by, but nested
            // declarations are still reachable.
            self.walk_children(node);
            return;
        };

        let kind = if self.profile.function_kinds.contains(&node.kind()) {
            NodeKind::Function
        } else {
            NodeKind::Class
        };

        let qualname = if self.scopes.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", self.scopes.join("."), name)
        };
        let start_line = node.start_position().row as u32 + 1;
        let end_line = node.end_position().row as u32 + 1;
        let id = Node::make_id(kind, &qualname, self.relpath, start_line);

        let code = self.node_text(&node);
        let doc = self.node_doc(node);

        self.nodes.push(Node {
            id: id.clone(),
            kind,
            name: name.clone(),
            file: self.relpath.to_string(),
            start_line,
            end_line,
            code,
            doc,
            language: self.profile.language.clone(),
            loc: end_line - start_line + 1,
            cyclomatic: metrics::cyclomatic_complexity(&node, self.profile),
            num_calls_in: 0,
            num_calls_out: 0,
        });

        self.scopes.push(name);
        self.owners.push(id);
        self.walk_children(node);
        self.owners.pop();
        self.scopes.pop();
    }

    fn record_call(&mut self, node: TsNode) {
        let callee = node
            .child_by_field_name("function")
            .or_else(|| node.child_by_field_name("constructor"))
            .or_else(|| node.named_child(0));
        let Some(callee) = callee else { return };

        let raw = self.node_text(&callee);
        let normalized = raw.replace("::", ".");
        if !normalized
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
        {
            // Computed or higher-order callee; nothing to resolve by name.
            return;
        }
        let Some(name) = normalized.rsplit('.').next().map(str::to_string) else {
            return;
        };
        if name.is_empty() {
            return;
        }

        let owner = self.owners.last().cloned().unwrap_or_default();
        let qualified = if normalized.contains('.') {
            Some(normalized)
        } else {
            None
        };
        self.calls.push(CallRef {
            owner,
            name,
            qualified,
        });
    }

    fn declared_name(&self, node: TsNode) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(self.node_text(&name));
        }
        // Grammars without a name field on the declaration itself
        // (e.g. Go type_declaration wraps a type_spec).
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let mut cursor = current.walk();
            for child in current.named_children(&mut cursor) {
                match child.kind() {
                    "identifier" | "type_identifier" | "property_identifier"
                    | "field_identifier" => {
                        return Some(self.node_text(&child));
                    }
                    _ => {
                        if !self.profile.is_declaration(child.kind()) {
                            stack.push(child);
                        }
                    }
                }
            }
        }
        None
    }

    fn push_scope_name(&mut self, node: TsNode) -> bool {
        let Some(type_node) = node.child_by_field_name("type") else {
            return false;
        };
        let raw = self.node_text(&type_node);
        // `impl Foo<T>` scopes as `Foo`.
        let name = raw.split('<').next().unwrap_or(&raw).trim().to_string();
        if name.is_empty() {
            return false;
        }
        self.scopes.push(name);
        true
    }

    fn node_doc(&self, node: TsNode) -> String {
        match self.profile.doc_convention {
            DocConvention::Docstring => self.docstring(node),
            DocConvention::PrecedingComments => self.preceding_comments(node),
        }
    }

    fn docstring(&self, node: TsNode) -> String {
        let Some(body) = node.child_by_field_name("body") else {
            return String::new();
        };
        let Some(first) = body.named_child(0) else {
            return String::new();
        };
        if first.kind() != "expression_statement" {
            return String::new();
        }
        match first.named_child(0) {
            Some(inner) if inner.kind() == "string" => {
                clean_string_literal(&self.node_text(&inner))
            }
            _ => String::new(),
        }
    }

    fn preceding_comments(&self, node: TsNode) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut expected_row = node.start_position().row;
        let mut current = node;

        while let Some(prev) = current.prev_sibling() {
            if !self.profile.comment_kinds.contains(&prev.kind()) {
                break;
            }
            if prev.end_position().row + 1 != expected_row {
                break;
            }
            parts.push(self.node_text(&prev));
            expected_row = prev.start_position().row;
            current = prev;
        }

        parts.reverse();
        clean_comment_block(&parts.join("\n"))
    }

    fn module_doc(&self, root: TsNode) -> String {
        match self.profile.doc_convention {
            DocConvention::Docstring => {
                let Some(first) = root.named_child(0) else {
                    return String::new();
                };
                if first.kind() != "expression_statement" {
                    return String::new();
                }
                match first.named_child(0) {
                    Some(inner) if inner.kind() == "string" => {
                        clean_string_literal(&self.node_text(&inner))
                    }
                    _ => String::new(),
                }
            }
            DocConvention::PrecedingComments => {
                // Leading comment block at the very top of the file.
                let mut parts: Vec<String> = Vec::new();
                let mut expected_row = 0;
                let mut cursor = root.walk();
                for child in root.named_children(&mut cursor) {
                    if !self.profile.comment_kinds.contains(&child.kind()) {
                        break;
                    }
                    if child.start_position().row > expected_row {
                        break;
                    }
                    parts.push(self.node_text(&child));
                    expected_row = child.end_position().row + 1;
                }
                clean_comment_block(&parts.join("\n"))
            }
        }
    }

    fn node_text(&self, node: &TsNode) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or("")
            .to_string()
    }
}

fn clean_string_literal(raw: &str) -> String {
    let trimmed = raw.trim_start_matches(|c| "rbufRBUF".contains(c));
    let stripped = if let Some(inner) = trimmed
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
    {
        inner
    } else if let Some(inner) = trimmed
        .strip_prefix("'''")
        .and_then(|s| s.strip_suffix("'''"))
    {
        inner
    } else {
        trimmed
            .trim_start_matches(|c| c == '"' || c == '\'')
            .trim_end_matches(|c| c == '"' || c == '\'')
    };
    stripped.trim().to_string()
}

fn clean_comment_block(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches("///")
                .trim_start_matches("//!")
                .trim_start_matches("//")
                .trim_start_matches("/**")
                .trim_start_matches("/*")
                .trim_end_matches("*/")
                .trim_start_matches('*')
                .trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_python_docstrings() {
        assert_eq!(
            clean_string_literal("\"\"\"Render the canvas.\"\"\""),
            "Render the canvas."
        );
        assert_eq!(clean_string_literal("'single'"), "single");
        assert_eq!(clean_string_literal("r\"\"\"raw\"\"\""), "raw");
    }

    #[test]
    fn cleans_comment_blocks() {
        let block = "/// Adds two numbers.\n/// Returns the sum.";
        assert_eq!(
            clean_comment_block(block),
            "Adds two numbers.\nReturns the sum."
        );
        let js = "/**\n * Renders a node.\n */";
        assert_eq!(clean_comment_block(js), "Renders a node.");
    }
}
