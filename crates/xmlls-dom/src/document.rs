//! The parsed document: text, line index, and the node arena.

use crate::error::BadLocation;
use crate::node::{AttrRef, ElementRef, NodeData, NodeId, NodeKind, NodeRef};
use crate::position::{LineIndex, Position, Range, Span};

/// Namespace URI of XML Schema.
pub const XML_SCHEMA_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// A source-oriented XML document.
///
/// Built once per [`crate::parse`] call and never restructured afterwards.
/// Every node keeps byte offsets into [`Document::text`].
#[derive(Debug, Clone)]
pub struct Document {
    uri: String,
    text: String,
    line_index: LineIndex,
    nodes: Vec<NodeData>,
}

/// True for URIs of standalone DTD files.
pub fn is_dtd_uri(uri: &str) -> bool {
    [".dtd", ".ent", ".mod"].iter().any(|ext| uri.ends_with(ext))
}

impl Document {
    pub(crate) fn from_parts(uri: String, text: String, nodes: Vec<NodeData>) -> Self {
        let line_index = LineIndex::new(&text);
        Self {
            uri,
            text,
            line_index,
            nodes,
        }
    }

    pub(crate) fn node_data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Number of nodes in the arena, attributes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The document node.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(self, NodeId::DOCUMENT)
    }

    /// Look up a node by id. Ids are only meaningful for the document that produced them.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then(|| NodeRef::new(self, id))
    }

    /// First element child of the document node.
    pub fn document_element(&self) -> Option<ElementRef<'_>> {
        self.root().child_elements().next()
    }

    /// The DOCTYPE node, or the synthetic one standing for a DTD file.
    pub fn doctype(&self) -> Option<NodeRef<'_>> {
        self.root().children().find(|n| n.is_doctype())
    }

    /// The `<?xml ...?>` declaration.
    pub fn prolog(&self) -> Option<NodeRef<'_>> {
        self.root().first_child().filter(|n| n.is_prolog())
    }

    pub fn is_dtd(&self) -> bool {
        is_dtd_uri(&self.uri)
    }

    pub fn is_xsd(&self) -> bool {
        self.uri.ends_with(".xsd")
    }

    pub fn has_dtd(&self) -> bool {
        self.doctype().is_some()
    }

    pub fn has_prolog(&self) -> bool {
        self.prolog().is_some()
    }

    /// Prefix bound to the XML Schema namespace on the document element.
    pub fn schema_prefix(&self) -> Option<&str> {
        self.document_element()?
            .attributes()
            .find_map(|a| a.prefix_if_matches_uri(XML_SCHEMA_NS))
    }

    /// Every node in document order, attributes excluded.
    pub fn descendants(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.root().descendants()
    }

    /// Every element in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.descendants().filter_map(|n| n.as_element())
    }

    /// Deepest node whose `[start, end)` contains `offset`.
    ///
    /// The end of the document belongs to the deepest node ending there.
    /// Attributes are not returned; see [`Document::find_attr_at`].
    pub fn find_node_at(&self, offset: usize) -> NodeRef<'_> {
        let at_end = offset >= self.text.len();
        let mut node = self.root();
        loop {
            let children = &self.node_data(node.id()).children;
            let idx = children.partition_point(|&c| self.node_data(c).span.end <= offset);
            let next = match children.get(idx) {
                Some(&c) if self.node_data(c).span.start <= offset => Some(c),
                _ if at_end => children.last().copied().filter(|&c| {
                    let span = self.node_data(c).span;
                    span.end == self.text.len() && span.start < offset
                }),
                _ => None,
            };
            match next {
                Some(id) => node = NodeRef::new(self, id),
                None => return node,
            }
        }
    }

    /// Node the cursor is "after", as used by completion.
    ///
    /// Descends into the last child starting before `offset` as long as
    /// `offset` is inside it, or it shares its end with its last child.
    pub fn find_node_before(&self, offset: usize) -> NodeRef<'_> {
        let mut node = self.root();
        loop {
            let children = &self.node_data(node.id()).children;
            let idx = children.partition_point(|&c| self.node_data(c).span.start < offset);
            let Some(child) = idx.checked_sub(1).map(|i| NodeRef::new(self, children[i])) else {
                return node;
            };
            if offset >= child.end() {
                let nested = child
                    .last_child()
                    .is_some_and(|last| last.end() == child.end());
                if !nested {
                    return child;
                }
            }
            node = child;
        }
    }

    /// Attribute whose name or value contains `offset`, end inclusive.
    pub fn find_attr_at(&self, offset: usize) -> Option<AttrRef<'_>> {
        let node = self.find_node_at(offset);
        node.find_attr_at(offset).or_else(|| {
            // `<a x=1|` at end of input: the cursor is past the element.
            node.parent().and_then(|p| p.find_attr_at(offset))
        })
    }

    /// Text node containing `offset`.
    pub fn find_text_at(&self, offset: usize) -> Option<NodeRef<'_>> {
        Some(self.find_node_at(offset)).filter(|n| n.is_text())
    }

    /// The text before `offset` ends with `ch`.
    pub fn ends_with(&self, ch: char, offset: usize) -> bool {
        self.text
            .get(..offset)
            .is_some_and(|before| before.ends_with(ch))
    }

    /// The text at `offset` starts with `ch`.
    pub fn is_next_char(&self, ch: char, offset: usize) -> bool {
        self.text
            .get(offset..)
            .is_some_and(|after| after.starts_with(ch))
    }

    pub fn position_at(&self, offset: usize) -> Result<Position, BadLocation> {
        self.line_index.position_at(&self.text, offset)
    }

    pub fn offset_at(&self, position: Position) -> Result<usize, BadLocation> {
        self.line_index.offset_at(&self.text, position)
    }

    pub fn range_of(&self, span: Span) -> Result<Range, BadLocation> {
        Ok(Range::new(
            self.position_at(span.start)?,
            self.position_at(span.end)?,
        ))
    }

    pub fn span_of(&self, range: Range) -> Result<Span, BadLocation> {
        Ok(Span::new(
            self.offset_at(range.start)?,
            self.offset_at(range.end)?,
        ))
    }

    /// Same tags, attributes (name and unquoted value) and child sequences.
    pub fn structurally_eq(&self, other: &Document) -> bool {
        nodes_eq(self.root(), other.root())
    }
}

fn nodes_eq(a: NodeRef<'_>, b: NodeRef<'_>) -> bool {
    let same_kind = match (a.kind(), b.kind()) {
        (NodeKind::Element(x), NodeKind::Element(y)) => {
            x.tag == y.tag
                && a.attributes()
                    .map(|at| at.data())
                    .eq(b.attributes().map(|at| at.data()))
        }
        (NodeKind::Text, NodeKind::Text)
        | (NodeKind::Comment(_), NodeKind::Comment(_))
        | (NodeKind::CData(_), NodeKind::CData(_)) => a.content() == b.content(),
        (NodeKind::ProcessingInstruction(_), NodeKind::ProcessingInstruction(_)) => {
            a.node_name() == b.node_name() && a.source() == b.source()
        }
        (x, y) => std::mem::discriminant(x) == std::mem::discriminant(y)
            && a.node_name() == b.node_name(),
    };
    same_kind
        && a.child_count() == b.child_count()
        && a.children().zip(b.children()).all(|(x, y)| nodes_eq(x, y))
}
