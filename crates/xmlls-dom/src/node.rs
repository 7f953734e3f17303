//! Node records and borrowed views into the DOM arena.
//!
//! A [`Document`] owns every node in a flat `Vec`. Nodes refer to each other
//! by [`NodeId`]; parent links are plain ids used for navigation only.
//! [`NodeRef`], [`ElementRef`] and [`AttrRef`] are cheap `Copy` views that
//! pair an id with the owning document.

use crate::document::Document;
use crate::dtd::{AttlistDecl, DocumentType, ElementDecl, EntityDecl, NotationDecl};
use crate::position::Span;
use serde::Serialize;
use std::borrow::Cow;
use std::hash::{Hash, Hasher};

/// Index of a node in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document node is always the first node.
    pub const DOCUMENT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) span: Span,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

/// The closed set of node variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Attribute(Attr),
    Text,
    Comment(Leaf),
    CData(Leaf),
    ProcessingInstruction(ProcessingInstruction),
    DocumentType(DocumentType),
    ElementDecl(ElementDecl),
    AttlistDecl(AttlistDecl),
    EntityDecl(EntityDecl),
    NotationDecl(NotationDecl),
}

/// Element record. Every tag offset is optional because the tree keeps
/// elements that only have a start tag or only an end tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub(crate) tag: Option<String>,
    pub(crate) tag_span: Option<Span>,
    pub(crate) start_tag_open_offset: Option<usize>,
    pub(crate) start_tag_close_offset: Option<usize>,
    pub(crate) end_tag_open_offset: Option<usize>,
    pub(crate) end_tag_name_span: Option<Span>,
    pub(crate) end_tag_close_offset: Option<usize>,
    pub(crate) self_closed: bool,
    pub(crate) closed: bool,
    pub(crate) attributes: Vec<NodeId>,
}

/// Attribute record.
///
/// Equality and hashing use the name and the quote-stripped value only, so
/// identical attributes written at different places compare equal.
#[derive(Debug, Clone, Default)]
pub struct Attr {
    pub(crate) name: String,
    pub(crate) name_span: Span,
    pub(crate) value_span: Option<Span>,
    pub(crate) original_value: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) has_delimiter: bool,
}

impl Attr {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn original_value(&self) -> Option<&str> {
        self.original_value.as_deref()
    }

    pub fn has_delimiter(&self) -> bool {
        self.has_delimiter
    }

    pub(crate) fn set_value(&mut self, original: &str, span: Span) {
        self.value = Some(quoteless(original).to_string());
        self.original_value = Some(original.to_string());
        self.value_span = Some(span);
    }
}

impl PartialEq for Attr {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Eq for Attr {}

impl Hash for Attr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.value.hash(state);
    }
}

/// Strip a leading and a trailing quote character, if present.
pub fn quoteless(value: &str) -> &str {
    let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
    value.strip_suffix(['"', '\'']).unwrap_or(value)
}

/// Content of a comment or CDATA section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Leaf {
    pub(crate) content: Option<Span>,
    pub(crate) closed: bool,
}

impl Leaf {
    pub fn content_span(&self) -> Option<Span> {
        self.content
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// `<?target content?>`, or the `<?xml ...?>` prolog whose content is parsed as attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingInstruction {
    pub(crate) target: Option<String>,
    pub(crate) target_span: Option<Span>,
    pub(crate) content: Option<Span>,
    pub(crate) prolog: bool,
    pub(crate) closed: bool,
    pub(crate) attributes: Vec<NodeId>,
}

impl ProcessingInstruction {
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn target_span(&self) -> Option<Span> {
        self.target_span
    }

    pub fn content_span(&self) -> Option<Span> {
        self.content
    }

    pub fn is_prolog(&self) -> bool {
        self.prolog
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("span", &self.span())
            .field("name", &self.node_name())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    fn data(&self) -> &'a NodeData {
        self.doc.node_data(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn owner_document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.data().kind
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn start(&self) -> usize {
        self.data().span.start
    }

    pub fn end(&self) -> usize {
        self.data().span.end
    }

    /// Raw source text covered by the node.
    pub fn source(&self) -> &'a str {
        self.span().slice(self.doc.text())
    }

    /// Display name: tag name, attribute name, PI target, DTD declaration name.
    pub fn node_name(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Document => Some("#document"),
            NodeKind::Element(e) => e.tag.as_deref(),
            NodeKind::Attribute(a) => Some(&a.name),
            NodeKind::Text => Some("#text"),
            NodeKind::Comment(_) => Some("#comment"),
            NodeKind::CData(_) => Some("#cdata-section"),
            NodeKind::ProcessingInstruction(pi) => pi.target.as_deref(),
            NodeKind::DocumentType(dt) => dt.name(),
            NodeKind::ElementDecl(d) => d.name(),
            NodeKind::AttlistDecl(d) => d.element_name(),
            NodeKind::EntityDecl(d) => d.name(),
            NodeKind::NotationDecl(d) => d.name(),
        }
    }

    // Navigation.

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| NodeRef::new(self.doc, id))
    }

    pub fn parent_element(&self) -> Option<ElementRef<'a>> {
        self.ancestors().find_map(|n| n.as_element())
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeRef<'a>> + ExactSizeIterator + use<'a> {
        let doc = self.doc;
        self.data()
            .children
            .iter()
            .map(move |&id| NodeRef::new(doc, id))
    }

    pub fn has_children(&self) -> bool {
        !self.data().children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        self.data()
            .children
            .get(index)
            .map(|&id| NodeRef::new(self.doc, id))
    }

    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.child(0)
    }

    pub fn last_child(&self) -> Option<NodeRef<'a>> {
        self.data()
            .children
            .last()
            .map(|&id| NodeRef::new(self.doc, id))
    }

    fn index_in_parent(&self) -> Option<(NodeRef<'a>, usize)> {
        let parent = self.parent()?;
        let idx = parent.data().children.iter().position(|&c| c == self.id)?;
        Some((parent, idx))
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        let (parent, idx) = self.index_in_parent()?;
        parent.child(idx + 1)
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        let (parent, idx) = self.index_in_parent()?;
        idx.checked_sub(1).and_then(|i| parent.child(i))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'a>> + use<'a> {
        self.children().filter_map(|c| c.as_element())
    }

    /// This node and all its descendants in document order (attributes excluded).
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            doc: self.doc,
            stack: vec![self.id],
        }
    }

    // Capability predicates.

    pub fn is_document(&self) -> bool {
        matches!(self.kind(), NodeKind::Document)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind(), NodeKind::Element(_))
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.kind(), NodeKind::Attribute(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind(), NodeKind::Comment(_))
    }

    pub fn is_cdata(&self) -> bool {
        matches!(self.kind(), NodeKind::CData(_))
    }

    pub fn is_processing_instruction(&self) -> bool {
        matches!(self.kind(), NodeKind::ProcessingInstruction(pi) if !pi.prolog)
    }

    pub fn is_prolog(&self) -> bool {
        matches!(self.kind(), NodeKind::ProcessingInstruction(pi) if pi.prolog)
    }

    pub fn is_doctype(&self) -> bool {
        matches!(self.kind(), NodeKind::DocumentType(_))
    }

    pub fn is_dtd_element_decl(&self) -> bool {
        matches!(self.kind(), NodeKind::ElementDecl(_))
    }

    pub fn is_dtd_attlist_decl(&self) -> bool {
        matches!(self.kind(), NodeKind::AttlistDecl(_))
    }

    pub fn is_dtd_entity_decl(&self) -> bool {
        matches!(self.kind(), NodeKind::EntityDecl(_))
    }

    pub fn is_dtd_notation_decl(&self) -> bool {
        matches!(self.kind(), NodeKind::NotationDecl(_))
    }

    pub fn is_dtd_decl(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::ElementDecl(_)
                | NodeKind::AttlistDecl(_)
                | NodeKind::EntityDecl(_)
                | NodeKind::NotationDecl(_)
        )
    }

    /// Whether the node's closing delimiter was seen.
    pub fn is_closed(&self) -> bool {
        match self.kind() {
            NodeKind::Document | NodeKind::Text | NodeKind::Attribute(_) => true,
            NodeKind::Element(e) => e.closed,
            NodeKind::Comment(l) | NodeKind::CData(l) => l.closed,
            NodeKind::ProcessingInstruction(pi) => pi.closed,
            NodeKind::DocumentType(d) => d.closed,
            NodeKind::ElementDecl(d) => d.closed,
            NodeKind::AttlistDecl(d) => d.closed,
            NodeKind::EntityDecl(d) => d.closed,
            NodeKind::NotationDecl(d) => d.closed,
        }
    }

    // Typed access.

    pub fn as_element(&self) -> Option<ElementRef<'a>> {
        match self.kind() {
            NodeKind::Element(data) => Some(ElementRef { node: *self, data }),
            _ => None,
        }
    }

    pub fn as_attr(&self) -> Option<AttrRef<'a>> {
        match self.kind() {
            NodeKind::Attribute(data) => Some(AttrRef { node: *self, data }),
            _ => None,
        }
    }

    pub fn as_processing_instruction(&self) -> Option<&'a ProcessingInstruction> {
        match self.kind() {
            NodeKind::ProcessingInstruction(pi) => Some(pi),
            _ => None,
        }
    }

    pub fn as_doctype(&self) -> Option<&'a DocumentType> {
        match self.kind() {
            NodeKind::DocumentType(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_element_decl(&self) -> Option<&'a ElementDecl> {
        match self.kind() {
            NodeKind::ElementDecl(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_attlist_decl(&self) -> Option<&'a AttlistDecl> {
        match self.kind() {
            NodeKind::AttlistDecl(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_entity_decl(&self) -> Option<&'a EntityDecl> {
        match self.kind() {
            NodeKind::EntityDecl(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_notation_decl(&self) -> Option<&'a NotationDecl> {
        match self.kind() {
            NodeKind::NotationDecl(d) => Some(d),
            _ => None,
        }
    }

    /// Text of a text node, or the inner content of a comment, CDATA section or PI.
    pub fn content(&self) -> Option<&'a str> {
        let text = self.doc.text();
        match self.kind() {
            NodeKind::Text => Some(self.source()),
            NodeKind::Comment(l) | NodeKind::CData(l) => {
                Some(l.content.map(|s| s.slice(text)).unwrap_or_default())
            }
            NodeKind::ProcessingInstruction(pi) => {
                Some(pi.content.map(|s| s.slice(text)).unwrap_or_default())
            }
            _ => None,
        }
    }

    /// Attributes of an element or of the `<?xml ...?>` prolog.
    pub fn attributes(&self) -> impl Iterator<Item = AttrRef<'a>> + use<'a> {
        let ids: &'a [NodeId] = match self.kind() {
            NodeKind::Element(e) => &e.attributes,
            NodeKind::ProcessingInstruction(pi) => &pi.attributes,
            _ => &[],
        };
        let doc = self.doc;
        ids.iter()
            .filter_map(move |&id| NodeRef::new(doc, id).as_attr())
    }

    /// First attribute with the given name.
    pub fn attribute_node(&self, name: &str) -> Option<AttrRef<'a>> {
        self.attributes().find(|a| a.name() == name)
    }

    /// Quote-stripped value of the first attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attribute_node(name).and_then(|a| a.value())
    }

    pub fn has_attributes(&self) -> bool {
        self.attributes().next().is_some()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_node(name).is_some()
    }

    /// Attribute whose name or value contains `offset` (end inclusive).
    pub fn find_attr_at(&self, offset: usize) -> Option<AttrRef<'a>> {
        self.attributes().find(|a| a.span().touches(offset))
    }
}

/// Pre-order traversal returned by [`NodeRef::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        let id = self.stack.pop()?;
        let data = self.doc.node_data(id);
        self.stack.extend(data.children.iter().rev());
        Some(NodeRef::new(self.doc, id))
    }
}

/// Borrowed view of an element.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    node: NodeRef<'a>,
    data: &'a Element,
}

impl std::fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("tag", &self.data.tag)
            .field("span", &self.node.span())
            .finish()
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for ElementRef<'_> {}

impl<'a> ElementRef<'a> {
    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn data(&self) -> &'a Element {
        self.data
    }

    pub fn start(&self) -> usize {
        self.node.start()
    }

    pub fn end(&self) -> usize {
        self.node.end()
    }

    pub fn span(&self) -> Span {
        self.node.span()
    }

    pub fn owner_document(&self) -> &'a Document {
        self.node.doc
    }

    /// Qualified tag name, `None` for `<` or `</>` with no name yet.
    pub fn tag_name(&self) -> Option<&'a str> {
        self.data.tag.as_deref()
    }

    pub fn tag_name_span(&self) -> Option<Span> {
        self.data.tag_span
    }

    pub fn end_tag_name_span(&self) -> Option<Span> {
        self.data.end_tag_name_span
    }

    pub fn local_name(&self) -> Option<&'a str> {
        self.tag_name()
            .map(|t| t.split_once(':').map_or(t, |(_, local)| local))
    }

    pub fn prefix(&self) -> Option<&'a str> {
        self.tag_name()
            .and_then(|t| t.split_once(':').map(|(prefix, _)| prefix))
    }

    pub fn is_same_tag(&self, name: &str) -> bool {
        self.tag_name() == Some(name)
    }

    pub fn start_tag_open_offset(&self) -> Option<usize> {
        self.data.start_tag_open_offset
    }

    pub fn start_tag_close_offset(&self) -> Option<usize> {
        self.data.start_tag_close_offset
    }

    pub fn end_tag_open_offset(&self) -> Option<usize> {
        self.data.end_tag_open_offset
    }

    pub fn end_tag_close_offset(&self) -> Option<usize> {
        self.data.end_tag_close_offset
    }

    pub fn has_start_tag(&self) -> bool {
        self.data.start_tag_open_offset.is_some()
    }

    pub fn has_end_tag(&self) -> bool {
        self.data.end_tag_open_offset.is_some()
    }

    pub fn is_start_tag_closed(&self) -> bool {
        self.data.start_tag_close_offset.is_some()
    }

    pub fn is_end_tag_closed(&self) -> bool {
        self.data.end_tag_close_offset.is_some()
    }

    pub fn is_self_closed(&self) -> bool {
        self.data.self_closed
    }

    /// Closed by an end tag or `/>`.
    pub fn is_closed(&self) -> bool {
        self.data.closed
    }

    pub fn is_document_element(&self) -> bool {
        self.owner_document()
            .document_element()
            .is_some_and(|root| root == *self)
    }

    /// Offset just past the start tag: after `>`/`/>`, or where an
    /// unclosed start tag stops (first child, or the element end).
    pub fn start_tag_end(&self) -> usize {
        match self.data.start_tag_close_offset {
            Some(close) if self.data.self_closed => close + 2,
            Some(close) => close + 1,
            None => self
                .node
                .first_child()
                .map_or(self.end(), |c| c.start()),
        }
    }

    /// `offset` is after the `<` and at or before the `>` of the start tag.
    pub fn is_in_start_tag(&self, offset: usize) -> bool {
        let Some(open) = self.data.start_tag_open_offset else {
            return false;
        };
        let close = self
            .data
            .start_tag_close_offset
            .unwrap_or_else(|| self.start_tag_end());
        offset > open && offset <= close
    }

    /// `offset` is after the `</` start and before the end of the end tag.
    pub fn is_in_end_tag(&self, offset: usize) -> bool {
        let Some(open) = self.data.end_tag_open_offset else {
            return false;
        };
        offset > open && offset < self.end()
    }

    pub fn attributes(&self) -> impl Iterator<Item = AttrRef<'a>> + use<'a> {
        self.node.attributes()
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node.attribute(name)
    }

    pub fn attribute_node(&self, name: &str) -> Option<AttrRef<'a>> {
        self.node.attribute_node(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.node.has_attribute(name)
    }

    pub fn has_attributes(&self) -> bool {
        self.node.has_attributes()
    }

    pub fn find_attr_at(&self, offset: usize) -> Option<AttrRef<'a>> {
        self.node.find_attr_at(offset)
    }

    pub fn parent_element(&self) -> Option<ElementRef<'a>> {
        self.node.parent_element()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'a>> + use<'a> {
        self.node.child_elements()
    }

    /// This element followed by its ancestor elements.
    fn self_and_ancestors(&self) -> impl Iterator<Item = ElementRef<'a>> + use<'a> {
        std::iter::once(*self).chain(self.node.ancestors().filter_map(|n| n.as_element()))
    }

    /// Namespace URI bound to this element's prefix, searching this element then its ancestors.
    pub fn namespace_uri(&self) -> Option<&'a str> {
        self.namespace_uri_for(self.prefix())
    }

    /// Namespace URI bound to `prefix` (`None` for the default namespace).
    pub fn namespace_uri_for(&self, prefix: Option<&str>) -> Option<&'a str> {
        let attr_name = match prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_string(),
        };
        self.self_and_ancestors()
            .find_map(|e| e.attribute(&attr_name))
    }

    /// Prefix declared for `uri` on this element or an ancestor.
    pub fn lookup_prefix(&self, uri: &str) -> Option<&'a str> {
        self.self_and_ancestors()
            .find_map(|e| e.attributes().find_map(|a| a.prefix_if_matches_uri(uri)))
    }

    /// All prefixes declared on this element and its ancestors, nearest first.
    pub fn all_prefixes(&self) -> Vec<&'a str> {
        let mut prefixes: Vec<&'a str> = Vec::new();
        for element in self.self_and_ancestors() {
            for prefix in element.attributes().filter_map(|a| a.extract_prefix_from_xmlns()) {
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }
        prefixes
    }
}

/// Borrowed view of an attribute.
#[derive(Clone, Copy)]
pub struct AttrRef<'a> {
    node: NodeRef<'a>,
    data: &'a Attr,
}

impl std::fmt::Debug for AttrRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttrRef")
            .field("name", &self.data.name)
            .field("value", &self.data.value)
            .finish()
    }
}

impl PartialEq for AttrRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for AttrRef<'_> {}

impl<'a> AttrRef<'a> {
    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    pub fn data(&self) -> &'a Attr {
        self.data
    }

    pub fn name(&self) -> &'a str {
        &self.data.name
    }

    /// Value without surrounding quotes, `None` when no value was written.
    pub fn value(&self) -> Option<&'a str> {
        self.data.value.as_deref()
    }

    /// Value as written, including quotes.
    pub fn original_value(&self) -> Option<&'a str> {
        self.data.original_value.as_deref()
    }

    /// Value with entity and character references resolved.
    pub fn decoded_value(&self) -> Option<Cow<'a, str>> {
        let raw = self.value()?;
        Some(quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw)))
    }

    pub fn has_delimiter(&self) -> bool {
        self.data.has_delimiter
    }

    pub fn name_span(&self) -> Span {
        self.data.name_span
    }

    pub fn value_span(&self) -> Option<Span> {
        self.data.value_span
    }

    /// From the start of the name to the end of the value (or the name).
    pub fn span(&self) -> Span {
        self.node.span()
    }

    pub fn start(&self) -> usize {
        self.node.start()
    }

    pub fn end(&self) -> usize {
        self.node.end()
    }

    pub fn is_quoted(&self) -> bool {
        self.original_value()
            .is_some_and(|v| v.starts_with(['"', '\'']))
    }

    /// The element (or prolog) the attribute is written on.
    pub fn owner(&self) -> Option<NodeRef<'a>> {
        self.node.parent()
    }

    pub fn owner_element(&self) -> Option<ElementRef<'a>> {
        self.owner().and_then(|n| n.as_element())
    }

    pub fn value_contains_offset(&self, offset: usize) -> bool {
        self.data.value_span.is_some_and(|s| s.touches(offset))
    }

    pub fn name_contains_offset(&self, offset: usize) -> bool {
        self.data.name_span.touches(offset)
    }

    /// `xmlns` or `xmlns:prefix`.
    pub fn is_xmlns(&self) -> bool {
        self.is_default_xmlns() || self.is_no_default_xmlns()
    }

    pub fn is_default_xmlns(&self) -> bool {
        self.name() == "xmlns"
    }

    pub fn is_no_default_xmlns(&self) -> bool {
        self.name().starts_with("xmlns:")
    }

    /// `p` for `xmlns:p`, `None` otherwise.
    pub fn extract_prefix_from_xmlns(&self) -> Option<&'a str> {
        self.name().strip_prefix("xmlns:")
    }

    /// The declared prefix when this is `xmlns:p="uri"`.
    pub fn prefix_if_matches_uri(&self, uri: &str) -> Option<&'a str> {
        if self.value() == Some(uri) {
            self.extract_prefix_from_xmlns()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoteless() {
        assert_eq!(quoteless("\"abc\""), "abc");
        assert_eq!(quoteless("'abc"), "abc");
        assert_eq!(quoteless("abc"), "abc");
        assert_eq!(quoteless("\""), "");
        assert_eq!(quoteless(""), "");
    }

    #[test]
    fn test_attr_equality_ignores_position() {
        let mut a = Attr {
            name: "x".to_string(),
            name_span: Span::new(3, 4),
            ..Default::default()
        };
        a.set_value("\"1\"", Span::new(5, 8));
        let mut b = Attr {
            name: "x".to_string(),
            name_span: Span::new(40, 41),
            ..Default::default()
        };
        b.set_value("'1'", Span::new(42, 45));
        assert_eq!(a, b);
        assert_ne!(a.original_value(), b.original_value());

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
