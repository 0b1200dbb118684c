use crate::collector::RawImport;
use crate::language::{DocConvention, LanguageProfile};
use repograph_core::Language;
use tree_sitter::Node;

pub static PROFILE: LanguageProfile = LanguageProfile {
    language: Language::JavaScript,
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    class_kinds: &["class_declaration"],
    scope_kinds: &[],
    call_kinds: &["call_expression", "new_expression"],
    import_kinds: &["import_statement"],
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
    ],
    logical_operator_kinds: &["&&", "||"],
    comment_kinds: &["comment"],
    doc_convention: DocConvention::PrecedingComments,
    parse_import: parse_import,
};

/// TypeScript shares the JavaScript syntax for everything the collector
/// cares about; only the grammar and the language tag differ.
pub static TS_PROFILE: LanguageProfile = LanguageProfile {
    language: Language::TypeScript,
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    class_kinds: &["class_declaration", "interface_declaration"],
    scope_kinds: &[],
    call_kinds: &["call_expression", "new_expression"],
    import_kinds: &["import_statement"],
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
    ],
    logical_operator_kinds: &["&&", "||"],
    comment_kinds: &["comment"],
    doc_convention: DocConvention::PrecedingComments,
    parse_import: parse_import,
};

/// `import defaultName, { a, b } from "./module"` forms.
fn parse_import(node: &Node, source: &str) -> Option<RawImport> {
    let text = |n: Node| n.utf8_text(source.as_bytes()).unwrap_or("").to_string();
    let mut import = RawImport::default();

    if let Some(src) = node.child_by_field_name("source") {
        let raw = text(src);
        let spec = raw.trim_matches(|c| c == '"' || c == '\'' || c == '`');
        // "./lib/helpers.js" -> "helpers"
        let module = spec
            .rsplit('/')
            .next()
            .unwrap_or(spec)
            .trim_end_matches(".js")
            .trim_end_matches(".ts")
            .trim_end_matches(".mjs")
            .trim_end_matches(".cjs");
        if !module.is_empty() && module != "." && module != ".." {
            import.modules.push(module.to_string());
        }
    }

    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        let mut cursor = current.walk();
        for child in current.named_children(&mut cursor) {
            match child.kind() {
                "import_clause" | "named_imports" => stack.push(child),
                "import_specifier" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        import.symbols.push(text(name));
                    }
                }
                "identifier" if current.kind() == "import_clause" => {
                    import.symbols.push(text(child));
                }
                _ => {}
            }
        }
    }

    if import.modules.is_empty() && import.symbols.is_empty() {
        None
    } else {
        Some(import)
    }
}
