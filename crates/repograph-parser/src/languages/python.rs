use crate::collector::RawImport;
use crate::language::{DocConvention, LanguageProfile};
use repograph_core::Language;
use tree_sitter::Node;

pub static PROFILE: LanguageProfile = LanguageProfile {
    language: Language::Python,
    function_kinds: &["function_definition"],
    class_kinds: &["class_definition"],
    scope_kinds: &[],
    call_kinds: &["call"],
    import_kinds: &["import_statement", "import_from_statement"],
    decision_kinds: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "conditional_expression",
        "except_clause",
        "case_clause",
        // comprehension filter: `[x for x in xs if p(x)]`
        "if_clause",
    ],
    logical_operator_kinds: &["and", "or"],
    comment_kinds: &["comment"],
    doc_convention: DocConvention::Docstring,
    parse_import: parse_import,
};

/// `import a, b` and `from a import x, y` forms.
fn parse_import(node: &Node, source: &str) -> Option<RawImport> {
    let text = |n: Node| n.utf8_text(source.as_bytes()).unwrap_or("").to_string();
    let mut import = RawImport::default();

    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "dotted_name" => import.modules.push(text(child)),
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            import.modules.push(text(name));
                        }
                    }
                    _ => {}
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                import.modules.push(text(module));
            }
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                // Children after the module name are the imported symbols.
                if Some(child) == node.child_by_field_name("module_name") {
                    continue;
                }
                match child.kind() {
                    "dotted_name" | "identifier" => import.symbols.push(text(child)),
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            import.symbols.push(text(name));
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => return None,
    }

    if import.modules.is_empty() && import.symbols.is_empty() {
        None
    } else {
        Some(import)
    }
}
