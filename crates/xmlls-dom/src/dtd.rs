//! DOCTYPE and DTD markup declarations.
//!
//! DTD declarations are whitespace separated sequences of loosely typed
//! parameters. Each parameter keeps its exact source span so hover and
//! go-to-definition can point back at it.

use crate::position::Span;
use serde::Serialize;

/// One parameter of a declaration, e.g. the name in `<!ELEMENT name ...>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeclParam {
    pub span: Span,
    text: String,
}

impl DeclParam {
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text without its first and last character, i.e. a quoted literal without quotes.
    pub fn text_without_first_and_last_char(&self) -> &str {
        let mut chars = self.text.chars();
        chars.next();
        chars.next_back();
        chars.as_str()
    }

    /// The text without surrounding quotes, if it is quoted.
    pub fn unquoted(&self) -> &str {
        let text = self.text.as_str();
        let text = text.strip_prefix(['"', '\'']).unwrap_or(text);
        text.strip_suffix(['"', '\'']).unwrap_or(text)
    }
}

/// `PUBLIC` or `SYSTEM` in a DOCTYPE, ENTITY, or NOTATION declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExternalIdKind {
    Public,
    System,
    Invalid,
}

impl ExternalIdKind {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "PUBLIC" => Self::Public,
            "SYSTEM" => Self::System,
            _ => Self::Invalid,
        }
    }
}

/// `<!DOCTYPE name [PUBLIC "pub"] ["sys"] [ [internal subset] ]>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentType {
    pub(crate) name: Option<DeclParam>,
    pub(crate) kind: Option<DeclParam>,
    pub(crate) public_id: Option<DeclParam>,
    pub(crate) system_id: Option<DeclParam>,
    /// From `[` to `]` inclusive. The end is `None` while the subset is unterminated.
    pub(crate) internal_subset_start: Option<usize>,
    pub(crate) internal_subset_end: Option<usize>,
    pub(crate) parameters: Vec<DeclParam>,
    pub(crate) unrecognized: Option<DeclParam>,
    pub(crate) closed: bool,
    /// Synthetic DOCTYPE standing for a whole `.dtd` file.
    pub(crate) synthetic: bool,
}

impl DocumentType {
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(DeclParam::text)
    }

    pub fn name_param(&self) -> Option<&DeclParam> {
        self.name.as_ref()
    }

    pub fn kind(&self) -> Option<ExternalIdKind> {
        self.kind
            .as_ref()
            .map(|k| ExternalIdKind::from_keyword(k.text()))
    }

    /// Public id as written, including quotes.
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_ref().map(DeclParam::text)
    }

    pub fn public_id_without_quotes(&self) -> Option<&str> {
        self.public_id
            .as_ref()
            .map(DeclParam::text_without_first_and_last_char)
    }

    /// System id as written, including quotes.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_ref().map(DeclParam::text)
    }

    pub fn system_id_without_quotes(&self) -> Option<&str> {
        self.system_id
            .as_ref()
            .map(DeclParam::text_without_first_and_last_char)
    }

    pub fn system_id_param(&self) -> Option<&DeclParam> {
        self.system_id.as_ref()
    }

    /// Span of the internal subset including the brackets.
    pub fn internal_subset_span(&self, document_end: usize) -> Option<Span> {
        let start = self.internal_subset_start?;
        Some(Span::new(
            start,
            self.internal_subset_end.unwrap_or(document_end),
        ))
    }

    pub fn has_internal_subset(&self) -> bool {
        self.internal_subset_start.is_some()
    }

    pub fn parameters(&self) -> &[DeclParam] {
        &self.parameters
    }

    pub fn unrecognized(&self) -> Option<&DeclParam> {
        self.unrecognized.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// `<!ELEMENT name (category | (content))>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElementDecl {
    pub(crate) name: Option<DeclParam>,
    pub(crate) category: Option<DeclParam>,
    /// The whole content model from `(` to the closing `)` and its occurrence marker.
    pub(crate) content: Option<DeclParam>,
    pub(crate) parameters: Vec<DeclParam>,
    pub(crate) unrecognized: Option<DeclParam>,
    pub(crate) closed: bool,
}

impl ElementDecl {
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(DeclParam::text)
    }

    pub fn name_param(&self) -> Option<&DeclParam> {
        self.name.as_ref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_ref().map(DeclParam::text)
    }

    pub fn content(&self) -> Option<&DeclParam> {
        self.content.as_ref()
    }

    /// Element names referenced from the content model, with their spans.
    pub fn content_names(&self) -> Vec<DeclParam> {
        let Some(content) = &self.content else {
            return Vec::new();
        };
        let mut names = Vec::new();
        let mut current: Option<usize> = None;
        let text = content.text();
        for (idx, ch) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
            let is_name = ch.is_alphanumeric() || matches!(ch, '_' | ':' | '-' | '.' | '#');
            match (is_name, current) {
                (true, None) => current = Some(idx),
                (false, Some(start)) => {
                    let name = &text[start..idx];
                    if !name.starts_with('#') {
                        let abs = content.span.start + start;
                        names.push(DeclParam::new(Span::new(abs, abs + name.len()), name));
                    }
                    current = None;
                }
                _ => {}
            }
        }
        names
    }

    pub fn parameters(&self) -> &[DeclParam] {
        &self.parameters
    }

    pub fn unrecognized(&self) -> Option<&DeclParam> {
        self.unrecognized.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// One `name type default` triple of an ATTLIST declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttlistDef {
    pub(crate) name: Option<DeclParam>,
    pub(crate) value_type: Option<DeclParam>,
    pub(crate) default_value: Option<DeclParam>,
}

impl AttlistDef {
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(DeclParam::text)
    }

    pub fn name_param(&self) -> Option<&DeclParam> {
        self.name.as_ref()
    }

    pub fn value_type(&self) -> Option<&str> {
        self.value_type.as_ref().map(DeclParam::text)
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_ref().map(DeclParam::text)
    }

    pub fn is_required(&self) -> bool {
        self.default_value() == Some("#REQUIRED")
    }

    /// Values of an enumerated type such as `(a|b|c)`.
    pub fn enumeration(&self) -> Vec<&str> {
        match self.value_type() {
            Some(t) if t.contains('(') => {
                let inner = t
                    .split_once('(')
                    .map(|(_, rest)| rest.trim_end_matches(')'))
                    .unwrap_or_default();
                inner
                    .split('|')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

/// `<!ATTLIST element (name type default)*>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttlistDecl {
    pub(crate) element_name: Option<DeclParam>,
    pub(crate) definitions: Vec<AttlistDef>,
    pub(crate) parameters: Vec<DeclParam>,
    pub(crate) unrecognized: Option<DeclParam>,
    pub(crate) closed: bool,
}

impl AttlistDecl {
    pub fn element_name(&self) -> Option<&str> {
        self.element_name.as_ref().map(DeclParam::text)
    }

    pub fn element_name_param(&self) -> Option<&DeclParam> {
        self.element_name.as_ref()
    }

    pub fn definitions(&self) -> &[AttlistDef] {
        &self.definitions
    }

    pub fn parameters(&self) -> &[DeclParam] {
        &self.parameters
    }

    pub fn unrecognized(&self) -> Option<&DeclParam> {
        self.unrecognized.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// `<!ENTITY [%] name ("value" | external id)>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityDecl {
    pub(crate) percent: Option<DeclParam>,
    pub(crate) name: Option<DeclParam>,
    pub(crate) value: Option<DeclParam>,
    pub(crate) kind: Option<DeclParam>,
    pub(crate) public_id: Option<DeclParam>,
    pub(crate) system_id: Option<DeclParam>,
    pub(crate) parameters: Vec<DeclParam>,
    pub(crate) unrecognized: Option<DeclParam>,
    pub(crate) closed: bool,
}

impl EntityDecl {
    pub fn is_parameter_entity(&self) -> bool {
        self.percent.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(DeclParam::text)
    }

    pub fn name_param(&self) -> Option<&DeclParam> {
        self.name.as_ref()
    }

    /// Replacement text without quotes.
    pub fn value(&self) -> Option<&str> {
        self.value
            .as_ref()
            .map(DeclParam::text_without_first_and_last_char)
    }

    pub fn kind(&self) -> Option<ExternalIdKind> {
        self.kind
            .as_ref()
            .map(|k| ExternalIdKind::from_keyword(k.text()))
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_ref().map(DeclParam::text)
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_ref().map(DeclParam::text)
    }

    pub fn parameters(&self) -> &[DeclParam] {
        &self.parameters
    }

    pub fn unrecognized(&self) -> Option<&DeclParam> {
        self.unrecognized.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// `<!NOTATION name (PUBLIC "pub" ["sys"] | SYSTEM "sys")>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotationDecl {
    pub(crate) name: Option<DeclParam>,
    pub(crate) kind: Option<DeclParam>,
    pub(crate) public_id: Option<DeclParam>,
    pub(crate) system_id: Option<DeclParam>,
    pub(crate) parameters: Vec<DeclParam>,
    pub(crate) unrecognized: Option<DeclParam>,
    pub(crate) closed: bool,
}

impl NotationDecl {
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(DeclParam::text)
    }

    pub fn name_param(&self) -> Option<&DeclParam> {
        self.name.as_ref()
    }

    pub fn kind(&self) -> Option<ExternalIdKind> {
        self.kind
            .as_ref()
            .map(|k| ExternalIdKind::from_keyword(k.text()))
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_ref().map(DeclParam::text)
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_ref().map(DeclParam::text)
    }

    pub fn parameters(&self) -> &[DeclParam] {
        &self.parameters
    }

    pub fn unrecognized(&self) -> Option<&DeclParam> {
        self.unrecognized.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
