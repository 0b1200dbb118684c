use repograph_core::Language;
use std::collections::HashMap;
use tree_sitter::Parser;

/// How a language attaches documentation to a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocConvention {
    /// First string expression in the declaration body (Python).
    Docstring,
    /// Contiguous comment lines immediately preceding the declaration.
    PrecedingComments,
}

/// Concrete-syntax kind tables for one language.
///
/// The collector is generic over this profile; adding a language means
/// adding a table, not a new traversal.
pub struct LanguageProfile {
    pub language: Language,
    /// Declaration kinds that produce `function` nodes.
    pub function_kinds: &'static [&'static str],
    /// Declaration kinds that produce `class` nodes.
    pub class_kinds: &'static [&'static str],
    /// Kinds that qualify nested declaration names without producing a
    /// node themselves (e.g. Rust impl blocks).
    pub scope_kinds: &'static [&'static str],
    /// Call-expression kinds collected for edge resolution.
    pub call_kinds: &'static [&'static str],
    /// Import-declaration kinds collected for edge resolution.
    pub import_kinds: &'static [&'static str],
    /// Kinds counted as decision points for cyclomatic complexity.
    pub decision_kinds: &'static [&'static str],
    /// Operator token kinds counted as decision points (logical and/or).
    pub logical_operator_kinds: &'static [&'static str],
    /// Comment node kinds.
    pub comment_kinds: &'static [&'static str],
    pub doc_convention: DocConvention,
    /// Language-specific import destructuring.
    pub parse_import: fn(&tree_sitter::Node, &str) -> Option<crate::collector::RawImport>,
}

impl LanguageProfile {
    pub fn is_declaration(&self, kind: &str) -> bool {
        self.function_kinds.contains(&kind) || self.class_kinds.contains(&kind)
    }
}

pub struct LanguageConfig {
    pub grammar: tree_sitter::Language,
    pub profile: &'static LanguageProfile,
    pub file_extensions: &'static [&'static str],
}

pub struct LanguageRegistry {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut configs = HashMap::new();

        configs.insert(
            Language::Python,
            LanguageConfig {
                grammar: tree_sitter_python::LANGUAGE.into(),
                profile: &crate::languages::python::PROFILE,
                file_extensions: &["py", "pyi"],
            },
        );

        configs.insert(
            Language::JavaScript,
            LanguageConfig {
                grammar: tree_sitter_javascript::LANGUAGE.into(),
                profile: &crate::languages::javascript::PROFILE,
                file_extensions: &["js", "jsx", "mjs", "cjs"],
            },
        );

        configs.insert(
            Language::TypeScript,
            LanguageConfig {
                grammar: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                profile: &crate::languages::javascript::TS_PROFILE,
                file_extensions: &["ts", "tsx"],
            },
        );

        configs.insert(
            Language::Rust,
            LanguageConfig {
                grammar: tree_sitter_rust::LANGUAGE.into(),
                profile: &crate::languages::rust::PROFILE,
                file_extensions: &["rs"],
            },
        );

        configs.insert(
            Language::Go,
            LanguageConfig {
                grammar: tree_sitter_go::LANGUAGE.into(),
                profile: &crate::languages::go::PROFILE,
                file_extensions: &["go"],
            },
        );

        Self { configs }
    }

    pub fn detect_language(&self, file_path: &str) -> Option<Language> {
        let extension = std::path::Path::new(file_path).extension()?.to_str()?;
        for (lang, config) in &self.configs {
            if config.file_extensions.contains(&extension) {
                return Some(lang.clone());
            }
        }
        None
    }

    pub fn get_config(&self, language: &Language) -> Option<&LanguageConfig> {
        self.configs.get(language)
    }

    pub fn create_parser(&self, language: &Language) -> Option<Parser> {
        let config = self.get_config(language)?;
        let mut parser = Parser::new();
        parser.set_language(&config.grammar).ok()?;
        Some(parser)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
