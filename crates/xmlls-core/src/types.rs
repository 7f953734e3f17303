//! Feature results.
//!
//! Plain data with the field names of the Language Server Protocol, so a
//! front end can serialize them as they are or map them onto `lsp-types`.
//! Lines and characters are zero-based; characters count UTF-16 units.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use xmlls_dom::{Position, Range};

/// Value of [`Diagnostic::source`] for diagnostics produced by this crate.
pub const DIAGNOSTIC_SOURCE: &str = "xml";

/// A location inside a resource, such as a line inside a text file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

impl Location {
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
        }
    }
}

/// A link between a source and a target location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLink {
    /// Span of the origin of this link, used for highlighting in the editor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_selection_range: Option<Range>,
    pub target_uri: String,
    /// The full target range, e.g. a whole declaration.
    pub target_range: Range,
    /// The range to select when the link is followed, e.g. the declared name.
    pub target_selection_range: Range,
}

impl LocationLink {
    /// Create a link whose target and selection ranges are the same.
    pub fn new(origin: Range, target_uri: impl Into<String>, target: Range) -> Self {
        Self {
            origin_selection_range: Some(origin),
            target_uri: target_uri.into(),
            target_range: target,
            target_selection_range: target,
        }
    }
}

/// Severity of a [`Diagnostic`]. The discriminants are the protocol's numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

/// Another place involved in a diagnostic, e.g. the start tag of an unclosed element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRelatedInformation {
    pub location: Location,
    pub message: String,
}

/// A diagnostic message, such as a syntax error or a missing grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    pub severity: DiagnosticSeverity,
    /// Stable identifier that quick fixes match on, e.g. `ETagRequired`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// [`DIAGNOSTIC_SOURCE`] unless a participant says otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    pub fn new(range: Range, severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            code: None,
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: message.into(),
            related_information: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_related(mut self, location: Location, message: impl Into<String>) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            location,
            message: message.into(),
        });
        self
    }
}

/// Diagnostics computed for one document, ready to be sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishDiagnostics {
    pub uri: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl PublishDiagnostics {
    pub fn new(uri: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            uri: uri.into(),
            diagnostics,
        }
    }
}

/// Format of a [`MarkupContent`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    PlainText,
    #[default]
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupContent {
    pub kind: MarkupKind,
    pub value: String,
}

impl MarkupContent {
    pub fn new(kind: MarkupKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn markdown(value: impl Into<String>) -> Self {
        Self::new(MarkupKind::Markdown, value)
    }

    pub fn plain_text(value: impl Into<String>) -> Self {
        Self::new(MarkupKind::PlainText, value)
    }
}

/// The result of a hover request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hover {
    pub contents: MarkupContent,
    /// The range the hover applies to, usually the hovered tag or attribute name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// A textual edit applicable to a text document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

/// Edits to several documents, keyed by URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkspaceEdit {
    pub changes: BTreeMap<String, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `edits` to the edits of `uri`.
    pub fn extend(&mut self, uri: impl Into<String>, edits: impl IntoIterator<Item = TextEdit>) {
        self.changes.entry(uri.into()).or_default().extend(edits);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.values().all(|edits| edits.is_empty())
    }
}

/// Completion item kinds, matching LSP CompletionItemKind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionItemKind {
    Text = 1,
    Method = 2,
    Function = 3,
    Constructor = 4,
    Field = 5,
    Variable = 6,
    Class = 7,
    Interface = 8,
    Module = 9,
    Property = 10,
    Unit = 11,
    Value = 12,
    Enum = 13,
    Keyword = 14,
    Snippet = 15,
    Color = 16,
    File = 17,
    Reference = 18,
    Folder = 19,
    EnumMember = 20,
    Constant = 21,
    Struct = 22,
    Event = 23,
    Operator = 24,
    TypeParameter = 25,
}

/// Whether a completion's insert text is plain text or a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsertTextFormat {
    #[default]
    PlainText = 1,
    Snippet = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<CompletionItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<MarkupContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_text: Option<String>,
    pub insert_text_format: InsertTextFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_edit: Option<TextEdit>,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, kind: CompletionItemKind) -> Self {
        Self {
            label: label.into(),
            kind: Some(kind),
            detail: None,
            documentation: None,
            filter_text: None,
            sort_text: None,
            insert_text_format: InsertTextFormat::PlainText,
            text_edit: None,
        }
    }

    pub fn with_edit(mut self, range: Range, new_text: impl Into<String>) -> Self {
        self.text_edit = Some(TextEdit::new(range, new_text));
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_documentation(mut self, documentation: MarkupContent) -> Self {
        self.documentation = Some(documentation);
        self
    }

    pub fn with_filter_text(mut self, filter_text: impl Into<String>) -> Self {
        self.filter_text = Some(filter_text.into());
        self
    }

    pub fn with_sort_text(mut self, sort_text: impl Into<String>) -> Self {
        self.sort_text = Some(sort_text.into());
        self
    }

    pub fn snippet(mut self) -> Self {
        self.insert_text_format = InsertTextFormat::Snippet;
        self
    }

    /// The text inserted when the item is accepted.
    pub fn insert_text(&self) -> &str {
        self.text_edit
            .as_ref()
            .map_or(self.label.as_str(), |edit| edit.new_text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompletionList {
    pub is_incomplete: bool,
    pub items: Vec<CompletionItem>,
}

impl CompletionList {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.label.as_str())
    }
}

/// Highlight kinds, matching LSP DocumentHighlightKind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentHighlightKind {
    Text = 1,
    #[default]
    Read = 2,
    Write = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentHighlight {
    pub range: Range,
    pub kind: DocumentHighlightKind,
}

impl DocumentHighlight {
    pub fn new(range: Range, kind: DocumentHighlightKind) -> Self {
        Self { range, kind }
    }
}

/// A command to be run by the client, e.g. "show references".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub title: String,
    pub command: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub arguments: Vec<serde_json::Value>,
}

impl Command {
    pub fn new(title: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            command: command.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: serde_json::Value) -> Self {
        self.arguments.push(argument);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeLens {
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAction {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit: Option<WorkspaceEdit>,
}

impl CodeAction {
    /// A quick fix replacing `range` in `uri` by `new_text`.
    pub fn quick_fix(
        title: impl Into<String>,
        diagnostic: &Diagnostic,
        uri: &str,
        range: Range,
        new_text: impl Into<String>,
    ) -> Self {
        let mut edit = WorkspaceEdit::new();
        edit.extend(uri, [TextEdit::new(range, new_text)]);
        Self {
            title: title.into(),
            kind: Some("quickfix".to_string()),
            diagnostics: vec![diagnostic.clone()],
            edit: Some(edit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Symbol kinds for document outline, matching LSP SymbolKind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    File = 1,
    Module = 2,
    Namespace = 3,
    Package = 4,
    Class = 5,
    Method = 6,
    Property = 7,
    Field = 8,
    Constructor = 9,
    Enum = 10,
    Interface = 11,
    Function = 12,
    Variable = 13,
    Constant = 14,
    String = 15,
    Number = 16,
    Boolean = 17,
    Array = 18,
    Object = 19,
    Key = 20,
    Null = 21,
    EnumMember = 22,
    Struct = 23,
    Event = 24,
    Operator = 25,
    TypeParameter = 26,
}

/// An outline entry. Elements nest their child elements, the DOCTYPE its
/// declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    /// E.g. the element an ATTLIST attribute belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub kind: SymbolKind,
    /// The whole node, from its start tag to its end tag.
    pub range: Range,
    /// The name, or the whole node when it has none.
    pub selection_range: Range,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<DocumentSymbol>,
}

impl DocumentSymbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        range: Range,
        selection_range: Range,
    ) -> Self {
        Self {
            name: name.into(),
            detail: None,
            kind,
            range,
            selection_range,
            children: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = DocumentSymbol>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A flat symbol with a location and the name of its container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInformation {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

/// Folding range kinds, matching LSP FoldingRangeKind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldingRangeKind {
    Comment,
    Imports,
    Region,
}

/// A range of lines that can be folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldingRange {
    pub start_line: u32,
    pub end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FoldingRangeKind>,
}

impl FoldingRange {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
            kind: None,
        }
    }

    pub fn with_kind(start_line: u32, end_line: u32, kind: FoldingRangeKind) -> Self {
        Self {
            start_line,
            end_line,
            kind: Some(kind),
        }
    }
}

/// Text to insert when a tag is auto-closed, as a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCloseTagResponse {
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_json_uses_lowercase_severity() {
        let diag = Diagnostic::new(
            Range::new(Position::new(0, 0), Position::new(0, 10)),
            DiagnosticSeverity::Error,
            "Test error",
        )
        .with_code("MarkupEntityMismatch");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"source\":\"xml\""));
        assert!(json.contains("\"code\":\"MarkupEntityMismatch\""));
        assert!(!json.contains("relatedInformation"));
    }

    #[test]
    fn test_workspace_edit_groups_by_uri() {
        let range = Range::point(Position::new(0, 1));
        let mut edit = WorkspaceEdit::new();
        assert!(edit.is_empty());
        edit.extend("file:///a.xml", [TextEdit::new(range, "x")]);
        edit.extend("file:///a.xml", [TextEdit::new(range, "y")]);
        edit.extend("file:///b.xml", [TextEdit::new(range, "z")]);

        assert_eq!(edit.changes.len(), 2);
        assert_eq!(edit.changes["file:///a.xml"].len(), 2);
    }

    #[test]
    fn test_completion_item_insert_text() {
        let range = Range::point(Position::new(0, 1));
        let plain = CompletionItem::new("root", CompletionItemKind::Property);
        assert_eq!(plain.insert_text(), "root");

        let edited = plain.with_edit(range, "root></root>").snippet();
        assert_eq!(edited.insert_text(), "root></root>");

        let json = serde_json::to_string(&edited).unwrap();
        assert!(json.contains("\"insertTextFormat\":\"snippet\""));
        assert!(json.contains("\"newText\":\"root></root>\""));
    }

    #[test]
    fn test_symbol_children() {
        let child = DocumentSymbol::new(
            "child",
            SymbolKind::Field,
            Range::new(Position::new(1, 2), Position::new(1, 12)),
            Range::new(Position::new(1, 2), Position::new(1, 12)),
        );

        let parent = DocumentSymbol::new(
            "root",
            SymbolKind::Field,
            Range::new(Position::new(0, 0), Position::new(2, 7)),
            Range::new(Position::new(0, 0), Position::new(2, 7)),
        )
        .with_children([child]);

        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].name, "child");
    }
}
