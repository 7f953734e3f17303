//! Client configuration.
//!
//! Settings arrive as JSON, either in `initializationOptions.settings.xml`
//! or in a configuration change notification. Every field is optional and
//! falls back to its default, so a partial object is always valid.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SettingsError;
use crate::types::{DiagnosticSeverity, MarkupKind};

/// Settings shared by every feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SharedSettings {
    pub completion: CompletionSettings,
    pub hover: HoverSettings,
    pub validation: ValidationSettings,
    pub code_lens: CodeLensSettings,
    pub symbols: SymbolSettings,
    pub foldings: FoldingSettings,
    pub file_associations: Vec<FileAssociation>,
    pub markup_kind: MarkupKind,
}

impl SharedSettings {
    /// Parse settings from a JSON object holding the `xml` settings section.
    pub fn from_json(value: &Value) -> Result<Self, SettingsError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Settings from LSP `initializationOptions`, reading `settings.xml`.
    ///
    /// Missing sections yield the defaults.
    pub fn from_initialization_options(options: Option<&Value>) -> Result<Self, SettingsError> {
        match options.and_then(xml_section) {
            Some(xml) => Self::from_json(xml),
            None => Ok(Self::default()),
        }
    }

    /// Apply a later configuration over this one.
    ///
    /// Only the fields present in `update` change; nested objects are
    /// merged key by key and arrays are replaced.
    pub fn merge(&mut self, update: &Value) -> Result<(), SettingsError> {
        let update = xml_section(update).unwrap_or(update);
        if !update.is_object() {
            return Err(SettingsError::NotAnObject);
        }
        let mut current = serde_json::to_value(&*self)?;
        merge_values(&mut current, update);
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

/// `settings.xml` inside initialization options, or `xml` inside a settings object.
fn xml_section(value: &Value) -> Option<&Value> {
    value
        .pointer("/settings/xml")
        .or_else(|| value.get("xml"))
}

fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target), Value::Object(update)) => {
            for (key, value) in update {
                match target.get_mut(key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, update) => *target = update.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionSettings {
    /// Insert `</tag>` when a start tag is closed.
    pub auto_close_tags: bool,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            auto_close_tags: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoverSettings {
    /// Show grammar documentation on hover.
    pub documentation: bool,
}

impl Default for HoverSettings {
    fn default() -> Self {
        Self {
            documentation: true,
        }
    }
}

/// How to report a document that is not bound to any grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoGrammarSeverity {
    Ignore,
    #[default]
    Hint,
    Info,
    Warning,
    Error,
}

impl NoGrammarSeverity {
    /// Diagnostic severity, `None` when the diagnostic is ignored.
    pub fn severity(self) -> Option<DiagnosticSeverity> {
        match self {
            Self::Ignore => None,
            Self::Hint => Some(DiagnosticSeverity::Hint),
            Self::Info => Some(DiagnosticSeverity::Information),
            Self::Warning => Some(DiagnosticSeverity::Warning),
            Self::Error => Some(DiagnosticSeverity::Error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    pub enabled: bool,
    /// Validate against schemas when a grammar is found.
    pub schema: bool,
    pub no_grammar: NoGrammarSeverity,
    pub disallow_doc_type_decl: bool,
    pub resolve_external_entities: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            schema: true,
            no_grammar: NoGrammarSeverity::default(),
            disallow_doc_type_decl: false,
            resolve_external_entities: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeLensSettings {
    pub enabled: bool,
    /// Code lens kinds the client can execute, e.g. `references`.
    pub supported_kinds: Vec<String>,
}

impl CodeLensSettings {
    pub fn is_supported_by_client(&self, kind: &str) -> bool {
        self.supported_kinds.iter().any(|k| k == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolSettings {
    pub enabled: bool,
    /// Glob patterns of document URIs without symbols, e.g. `**/*.xsd`.
    pub excluded: Vec<String>,
}

impl Default for SymbolSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded: Vec::new(),
        }
    }
}

impl SymbolSettings {
    pub fn is_excluded(&self, uri: &str) -> bool {
        self.excluded.iter().any(|pattern| glob_matches(pattern, uri))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FoldingSettings {
    /// Keep the closing tag visible when an element is folded.
    pub include_closing_tag_in_fold: bool,
}

/// Binds documents matching `pattern` to the grammar at `system_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAssociation {
    pub pattern: String,
    pub system_id: String,
}

impl FileAssociation {
    pub fn matches(&self, uri: &str) -> bool {
        glob_matches(&self.pattern, uri)
    }
}

/// `*`, `?` and `[...]` stay within one path segment; only `**` crosses `/`.
const URI_GLOB: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Match `uri` against a glob pattern such as `**/*.xsd`.
pub fn glob_matches(pattern: &str, uri: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(glob) => glob.matches_with(uri, URI_GLOB),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "ignoring invalid glob pattern");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = SharedSettings::default();
        assert!(settings.completion.auto_close_tags);
        assert!(settings.validation.enabled);
        assert_eq!(settings.validation.no_grammar, NoGrammarSeverity::Hint);
        assert!(!settings.code_lens.enabled);
        assert_eq!(settings.markup_kind, MarkupKind::Markdown);
    }

    #[test]
    fn test_from_initialization_options() {
        let options = json!({
            "settings": {
                "xml": {
                    "validation": { "noGrammar": "ignore" },
                    "codeLens": { "enabled": true }
                }
            }
        });
        let settings = SharedSettings::from_initialization_options(Some(&options)).unwrap();
        assert_eq!(settings.validation.no_grammar.severity(), None);
        assert!(settings.validation.enabled);
        assert!(settings.code_lens.enabled);

        let settings = SharedSettings::from_initialization_options(None).unwrap();
        assert_eq!(settings, SharedSettings::default());
    }

    #[test]
    fn test_merge_keeps_unspecified_fields() {
        let mut settings = SharedSettings::default();
        settings
            .merge(&json!({ "codeLens": { "enabled": true } }))
            .unwrap();
        settings
            .merge(&json!({ "xml": { "validation": { "noGrammar": "warning" } } }))
            .unwrap();

        assert!(settings.code_lens.enabled);
        assert_eq!(
            settings.validation.no_grammar.severity(),
            Some(DiagnosticSeverity::Warning)
        );
        assert!(settings.validation.schema);
    }

    #[test]
    fn test_merge_rejects_invalid_values() {
        let mut settings = SharedSettings::default();
        assert!(settings.merge(&json!(true)).is_err());
        assert!(
            settings
                .merge(&json!({ "validation": { "noGrammar": "loud" } }))
                .is_err()
        );
        assert_eq!(settings, SharedSettings::default());
    }

    #[test]
    fn test_symbols_excluded() {
        let symbols = SymbolSettings {
            enabled: true,
            excluded: vec!["**/*.xsd".to_string(), "**/*.xml".to_string()],
        };
        assert!(symbols.is_excluded("file:///home/user/test.xml"));
        assert!(symbols.is_excluded("file:///C:/Users/user/test.xsd"));
        assert!(!symbols.is_excluded("file:///home/user/test.java"));
    }

    #[test]
    fn test_file_association() {
        let association = FileAssociation {
            pattern: "**/*.project".to_string(),
            system_id: "project.dtd".to_string(),
        };
        assert!(association.matches("file:///ws/.project"));
        assert!(!association.matches("file:///ws/.project.bak"));
    }

    #[test]
    fn test_glob_character_classes_and_separators() {
        assert!(glob_matches("**/[ab].xml", "file:///w/a.xml"));
        assert!(!glob_matches("**/[ab].xml", "file:///w/c.xml"));
        assert!(glob_matches("**/item?.xml", "file:///w/item1.xml"));
        assert!(!glob_matches("file:///*.xml", "file:///w/a.xml"));
        assert!(glob_matches("file:///**/*.xml", "file:///w/a.xml"));
        assert!(!glob_matches("**/[ab.xml", "file:///w/a.xml"));
    }
}
