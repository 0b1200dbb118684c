use crate::collector::RawImport;
use crate::language::{DocConvention, LanguageProfile};
use repograph_core::Language;
use tree_sitter::Node;

pub static PROFILE: LanguageProfile = LanguageProfile {
    language: Language::Rust,
    function_kinds: &["function_item"],
    class_kinds: &["struct_item", "enum_item", "trait_item"],
    // impl blocks qualify the names of the methods inside them without
    // producing a node of their own.
    scope_kinds: &["impl_item"],
    call_kinds: &["call_expression"],
    import_kinds: &["use_declaration"],
    decision_kinds: &[
        "if_expression",
        "while_expression",
        "for_expression",
        "match_arm",
    ],
    logical_operator_kinds: &["&&", "||"],
    comment_kinds: &["line_comment", "block_comment"],
    doc_convention: DocConvention::PrecedingComments,
    parse_import: parse_import,
};

/// `use crate::module::{a, b as c};` forms. The final path segments are the
/// referenced symbols; the segment before them names the module.
fn parse_import(node: &Node, source: &str) -> Option<RawImport> {
    let argument = node.child_by_field_name("argument")?;
    let mut import = RawImport::default();

    let text = argument.utf8_text(source.as_bytes()).unwrap_or("");
    let segments: Vec<&str> = text
        .split("::")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    // The segment before the final one names the module, whether the use
    // ends in a symbol (`util::helper`) or a list (`util::{a, b}`).
    if segments.len() > 1 {
        let module = segments[segments.len() - 2];
        if !matches!(module, "crate" | "self" | "super") && !module.starts_with('{') {
            import.modules.push(module.to_string());
        }
    }

    collect_use_targets(&argument, source, &mut import.symbols);

    if import.modules.is_empty() && import.symbols.is_empty() {
        None
    } else {
        Some(import)
    }
}

fn collect_use_targets(node: &Node, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" => {
            let name = node.utf8_text(source.as_bytes()).unwrap_or("");
            if !matches!(name, "crate" | "self" | "super") {
                out.push(name.to_string());
            }
        }
        "scoped_identifier" => {
            if let Some(name) = node.child_by_field_name("name") {
                collect_use_targets(&name, source, out);
            }
        }
        "use_as_clause" => {
            if let Some(path) = node.child_by_field_name("path") {
                collect_use_targets(&path, source, out);
            }
        }
        "use_list" | "scoped_use_list" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_use_targets(&child, source, out);
            }
        }
        _ => {}
    }
}
