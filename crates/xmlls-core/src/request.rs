//! Request objects handed to participants.
//!
//! A request bundles the parsed document, the cursor position and its byte
//! offset, the node under the cursor, and the registry (for component
//! lookup). Feature-specific requests wrap a [`PositionRequest`] and
//! dereference to it.

use std::collections::HashSet;
use std::ops::Deref;

use xmlls_dom::{AttrRef, BadLocation, Document, ElementRef, NodeRef, Span};

use crate::registry::ExtensionRegistry;
use crate::settings::{CodeLensSettings, SharedSettings};
use crate::types::{CompletionItem, CompletionList, MarkupKind, Position, Range};

/// A document, a cursor, and the node under it.
#[derive(Clone, Copy)]
pub struct PositionRequest<'a> {
    document: &'a Document,
    position: Position,
    offset: usize,
    node: NodeRef<'a>,
    registry: &'a ExtensionRegistry,
}

impl std::fmt::Debug for PositionRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionRequest")
            .field("uri", &self.document.uri())
            .field("position", &self.position)
            .field("offset", &self.offset)
            .field("node", &self.node)
            .finish()
    }
}

impl<'a> PositionRequest<'a> {
    /// Request at `position`. The node is the attribute under the cursor
    /// when there is one, otherwise the deepest node at the offset.
    pub fn new(
        document: &'a Document,
        position: Position,
        registry: &'a ExtensionRegistry,
    ) -> Result<Self, BadLocation> {
        let offset = document.offset_at(position)?;
        let node = document
            .find_attr_at(offset)
            .map_or_else(|| document.find_node_at(offset), |attr| attr.node());
        Ok(Self {
            document,
            position,
            offset,
            node,
            registry,
        })
    }

    /// Request whose node is the one the cursor is "after", as used by completion.
    pub fn before(
        document: &'a Document,
        position: Position,
        registry: &'a ExtensionRegistry,
    ) -> Result<Self, BadLocation> {
        let offset = document.offset_at(position)?;
        Ok(Self {
            document,
            position,
            offset,
            node: document.find_node_before(offset),
            registry,
        })
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn uri(&self) -> &'a str {
        self.document.uri()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    pub fn registry(&self) -> &'a ExtensionRegistry {
        self.registry
    }

    /// The attribute under the cursor.
    pub fn attribute(&self) -> Option<AttrRef<'a>> {
        self.node.as_attr()
    }

    /// The element the cursor is in, the owner element for an attribute.
    pub fn parent_element(&self) -> Option<ElementRef<'a>> {
        match self.node.as_attr() {
            Some(attr) => attr.owner_element(),
            None => self
                .node
                .as_element()
                .or_else(|| self.node.parent_element()),
        }
    }

    /// Tag name of [`Self::parent_element`].
    pub fn current_tag(&self) -> Option<&'a str> {
        self.parent_element().and_then(|e| e.tag_name())
    }

    pub fn current_attribute_name(&self) -> Option<&'a str> {
        self.attribute().map(|a| a.name())
    }

    pub fn find_node_at(&self, offset: usize) -> NodeRef<'a> {
        self.document.find_node_at(offset)
    }

    pub fn find_attr_at(&self, offset: usize) -> Option<AttrRef<'a>> {
        self.document.find_attr_at(offset)
    }

    /// Range of a span of this document.
    pub fn range_of(&self, span: Span) -> Result<Range, BadLocation> {
        self.document.range_of(span)
    }

    /// Look up a component registered on the registry.
    pub fn component<T: std::any::Any + Send + Sync>(&self) -> Option<std::sync::Arc<T>> {
        self.registry.component::<T>()
    }
}

pub type DefinitionRequest<'a> = PositionRequest<'a>;
pub type TypeDefinitionRequest<'a> = PositionRequest<'a>;
pub type HighlightRequest<'a> = PositionRequest<'a>;

/// Hover request: the hovered tag or attribute range and display settings.
#[derive(Debug, Clone, Copy)]
pub struct HoverRequest<'a> {
    base: PositionRequest<'a>,
    tag_range: Option<Range>,
    open: bool,
    settings: &'a SharedSettings,
}

impl<'a> HoverRequest<'a> {
    pub fn new(
        base: PositionRequest<'a>,
        tag_range: Option<Range>,
        open: bool,
        settings: &'a SharedSettings,
    ) -> Self {
        Self {
            base,
            tag_range,
            open,
            settings,
        }
    }

    /// Range of the hovered tag name (or attribute part).
    pub fn tag_range(&self) -> Option<Range> {
        self.tag_range
    }

    /// `true` on a start tag, `false` on an end tag.
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn settings(&self) -> &'a SharedSettings {
        self.settings
    }

    pub fn markup_kind(&self) -> MarkupKind {
        self.settings.markup_kind
    }

    pub fn can_support_markup_kind(&self, kind: MarkupKind) -> bool {
        kind == MarkupKind::PlainText || self.settings.markup_kind == MarkupKind::Markdown
    }
}

impl<'a> Deref for HoverRequest<'a> {
    type Target = PositionRequest<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// Completion request: the text range items replace, and what the
/// completion service learned while rescanning the tag under the cursor.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    base: PositionRequest<'a>,
    settings: &'a SharedSettings,
    replace_span: Span,
    quoted: bool,
    current_tag: Option<&'a str>,
    current_attribute_name: Option<&'a str>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(base: PositionRequest<'a>, settings: &'a SharedSettings) -> Self {
        let offset = base.offset();
        Self {
            base,
            settings,
            replace_span: Span::new(offset, offset),
            quoted: false,
            current_tag: None,
            current_attribute_name: None,
        }
    }

    pub fn settings(&self) -> &'a SharedSettings {
        self.settings
    }

    pub fn replace_span(&self) -> Span {
        self.replace_span
    }

    /// Range the completion items replace.
    pub fn replace_range(&self) -> Range {
        self.base
            .range_of(self.replace_span)
            .unwrap_or_else(|_| Range::point(self.base.position()))
    }

    pub(crate) fn set_replace_span(&mut self, span: Span) {
        self.replace_span = span;
        self.quoted = false;
    }

    /// Replace the content of a quoted attribute value.
    pub(crate) fn set_quoted_replace_span(&mut self, span: Span) {
        self.replace_span = span;
        self.quoted = true;
    }

    pub(crate) fn set_current_tag(&mut self, tag: &'a str) {
        self.current_tag = Some(tag);
    }

    pub(crate) fn set_current_attribute_name(&mut self, name: &'a str) {
        self.current_attribute_name = Some(name);
    }

    /// Tag whose start tag the cursor is in, or the parent element's tag.
    pub fn current_tag(&self) -> Option<&'a str> {
        self.current_tag.or_else(|| self.base.current_tag())
    }

    /// Name of the attribute whose value is being completed.
    pub fn current_attribute_name(&self) -> Option<&'a str> {
        self.current_attribute_name
            .or_else(|| self.base.current_attribute_name())
    }

    /// `value` as it must be inserted: bare inside quotes, quoted otherwise.
    pub fn insert_attr_value(&self, value: &str) -> String {
        if self.quoted {
            value.to_string()
        } else {
            format!("\"{value}\"")
        }
    }

    /// `true` when the replaced text sits inside quotes.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }
}

impl<'a> Deref for CompletionRequest<'a> {
    type Target = PositionRequest<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// Completion items collected from participants.
#[derive(Debug, Default)]
pub struct CompletionResponse {
    items: Vec<CompletionItem>,
    labels: HashSet<String>,
    existing_attributes: HashSet<String>,
    is_incomplete: bool,
}

impl CompletionResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A response that skips attribute names already written on `element`,
    /// except the one at `offset` which is being typed.
    pub fn for_element(element: Option<ElementRef<'_>>, offset: usize) -> Self {
        match element {
            Some(element) => Self::for_node(element.node(), offset),
            None => Self::default(),
        }
    }

    /// Like [`Self::for_element`], for any node with attributes (the prolog included).
    pub fn for_node(node: NodeRef<'_>, offset: usize) -> Self {
        let existing_attributes = node
            .attributes()
            .filter(|a| !a.name_contains_offset(offset))
            .map(|a| a.name().to_string())
            .collect();
        Self {
            existing_attributes,
            ..Self::default()
        }
    }

    pub fn add_completion_item(&mut self, item: CompletionItem) {
        self.labels.insert(item.label.clone());
        self.items.push(item);
    }

    /// Add an attribute name item unless the attribute is already present
    /// or already proposed.
    pub fn add_completion_attribute(&mut self, item: CompletionItem) {
        if self.has_attribute(&item.label) || self.labels.contains(&item.label) {
            return;
        }
        self.add_completion_item(item);
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.existing_attributes.contains(name)
    }

    pub fn has_some_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn items(&self) -> &[CompletionItem] {
        &self.items
    }

    pub fn set_incomplete(&mut self) {
        self.is_incomplete = true;
    }

    pub fn into_list(self) -> CompletionList {
        CompletionList {
            is_incomplete: self.is_incomplete,
            items: self.items,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceRequest<'a> {
    base: PositionRequest<'a>,
    include_declaration: bool,
}

impl<'a> ReferenceRequest<'a> {
    pub fn new(base: PositionRequest<'a>, include_declaration: bool) -> Self {
        Self {
            base,
            include_declaration,
        }
    }

    pub fn include_declaration(&self) -> bool {
        self.include_declaration
    }
}

impl<'a> Deref for ReferenceRequest<'a> {
    type Target = PositionRequest<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenameRequest<'a> {
    base: PositionRequest<'a>,
    new_text: &'a str,
}

impl<'a> RenameRequest<'a> {
    pub fn new(base: PositionRequest<'a>, new_text: &'a str) -> Self {
        Self { base, new_text }
    }

    pub fn new_text(&self) -> &'a str {
        self.new_text
    }
}

impl<'a> Deref for RenameRequest<'a> {
    type Target = PositionRequest<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// Code lens request: a whole document, no cursor.
#[derive(Clone, Copy)]
pub struct CodeLensRequest<'a> {
    document: &'a Document,
    settings: &'a CodeLensSettings,
    registry: &'a ExtensionRegistry,
}

impl<'a> CodeLensRequest<'a> {
    pub fn new(
        document: &'a Document,
        settings: &'a CodeLensSettings,
        registry: &'a ExtensionRegistry,
    ) -> Self {
        Self {
            document,
            settings,
            registry,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn registry(&self) -> &'a ExtensionRegistry {
        self.registry
    }

    /// Whether the client can run code lenses of `kind`, e.g. `references`.
    pub fn is_supported_by_client(&self, kind: &str) -> bool {
        self.settings.is_supported_by_client(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmlls_dom::parse;

    #[test]
    fn test_position_request_prefers_attribute() {
        let registry = ExtensionRegistry::new();
        let doc = parse("<a x=\"1\"><b/></a>", "file:///t.xml");

        let request = PositionRequest::new(&doc, Position::new(0, 3), &registry).unwrap();
        assert_eq!(request.offset(), 3);
        assert_eq!(request.current_attribute_name(), Some("x"));
        assert_eq!(request.current_tag(), Some("a"));

        let request = PositionRequest::new(&doc, Position::new(0, 10), &registry).unwrap();
        assert!(request.attribute().is_none());
        assert_eq!(request.current_tag(), Some("b"));

        assert!(PositionRequest::new(&doc, Position::new(3, 0), &registry).is_err());
    }

    #[test]
    fn test_insert_attr_value() {
        let registry = ExtensionRegistry::new();
        let settings = SharedSettings::default();
        let doc = parse("<a x=\"\"/>", "file:///t.xml");
        let base = PositionRequest::before(&doc, Position::new(0, 6), &registry).unwrap();

        let mut request = CompletionRequest::new(base, &settings);
        assert_eq!(request.insert_attr_value("v"), "\"v\"");
        request.set_quoted_replace_span(Span::new(6, 6));
        assert_eq!(request.insert_attr_value("v"), "v");
        assert!(request.is_quoted());
    }

    #[test]
    fn test_completion_response_skips_existing_attributes() {
        let doc = parse("<a x=\"1\" y/>", "file:///t.xml");
        let element = doc.document_element();
        // The cursor is on `y`, which is still being typed.
        let mut response = CompletionResponse::for_element(element, 10);
        assert!(response.has_attribute("x"));
        assert!(!response.has_attribute("y"));

        use crate::types::CompletionItemKind;
        response.add_completion_attribute(CompletionItem::new("x", CompletionItemKind::Value));
        response.add_completion_attribute(CompletionItem::new("y", CompletionItemKind::Value));
        response.add_completion_attribute(CompletionItem::new("y", CompletionItemKind::Value));
        let list = response.into_list();
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["y"]);
    }
}
