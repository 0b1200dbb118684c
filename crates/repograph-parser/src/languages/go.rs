use crate::collector::RawImport;
use crate::language::{DocConvention, LanguageProfile};
use repograph_core::Language;
use tree_sitter::Node;

pub static PROFILE: LanguageProfile = LanguageProfile {
    language: Language::Go,
    function_kinds: &["function_declaration", "method_declaration"],
    class_kinds: &["type_declaration"],
    scope_kinds: &[],
    call_kinds: &["call_expression"],
    import_kinds: &["import_declaration"],
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "type_case",
    ],
    logical_operator_kinds: &["&&", "||"],
    comment_kinds: &["comment"],
    doc_convention: DocConvention::PrecedingComments,
    parse_import: parse_import,
};

/// `import "path/to/pkg"` and grouped import blocks.
fn parse_import(node: &Node, source: &str) -> Option<RawImport> {
    let mut import = RawImport::default();
    let mut stack = vec![*node];

    while let Some(current) = stack.pop() {
        let mut cursor = current.walk();
        for child in current.named_children(&mut cursor) {
            match child.kind() {
                "import_spec_list" => stack.push(child),
                "import_spec" => {
                    if let Some(path) = child.child_by_field_name("path") {
                        let raw = path.utf8_text(source.as_bytes()).unwrap_or("");
                        let spec = raw.trim_matches('"');
                        if let Some(pkg) = spec.rsplit('/').next() {
                            if !pkg.is_empty() {
                                import.modules.push(pkg.to_string());
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if import.modules.is_empty() {
        None
    } else {
        Some(import)
    }
}
