//! Token-driven DOM builder.
//!
//! Consumes the scanner's token stream in a single pass. `curr` is the
//! innermost open node; elements, comments, CDATA sections, PIs, the
//! DOCTYPE and DTD declarations are opened by their start token and closed
//! by their end token, or implicitly by the recovery rules below.
//!
//! Recovery:
//! - an end tag closes the nearest open element with the same name and
//!   ends every element opened after it at the `</`;
//! - an end tag with no matching open element becomes a lone element
//!   holding only end-tag offsets;
//! - a start tag that never sees `>` stays open, so the next element
//!   becomes its child;
//! - at end of input every open node ends at the end of the text.

use crate::document::{Document, is_dtd_uri};
use crate::dtd::{
    AttlistDecl, AttlistDef, DeclParam, DocumentType, ElementDecl, EntityDecl, NotationDecl,
};
use crate::node::{Attr, Element, Leaf, NodeData, NodeId, NodeKind, ProcessingInstruction};
use crate::position::Span;
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};

/// Parse `text` into a [`Document`]. Never fails.
///
/// Documents whose URI ends in `.dtd`, `.ent` or `.mod` are parsed as DTD
/// files: the whole text becomes the internal content of a synthetic DOCTYPE.
///
/// # Example
///
/// ```rust
/// let doc = xmlls_dom::parse("<a><b></a>", "file:///a.xml");
/// let a = doc.document_element().unwrap();
/// assert!(a.is_closed());
/// let b = a.child_elements().next().unwrap();
/// assert!(!b.is_closed());
/// assert_eq!(b.end(), 6);
/// ```
pub fn parse(text: impl Into<String>, uri: impl Into<String>) -> Document {
    let text = text.into();
    let uri = uri.into();
    let dtd_file = is_dtd_uri(&uri);
    let nodes = {
        let mut scanner = if dtd_file {
            Scanner::for_dtd(&text)
        } else {
            Scanner::new(&text)
        };
        let mut builder = Builder::new(&text, dtd_file);
        loop {
            let kind = scanner.scan_token();
            if kind == TokenKind::Eos {
                break;
            }
            builder.token(scanner.token(), scanner.in_dtd_content());
        }
        builder.finish()
    };
    tracing::debug!(uri = %uri, nodes = nodes.len(), "parsed document");
    Document::from_parts(uri, text, nodes)
}

struct Builder<'a> {
    text: &'a str,
    nodes: Vec<NodeData>,
    curr: NodeId,
    doctype: Option<NodeId>,
    decl: Option<NodeId>,
    attr: Option<NodeId>,
    end_tag_open: Option<usize>,
    element_content_start: Option<usize>,
}

impl<'a> Builder<'a> {
    fn new(text: &'a str, dtd_file: bool) -> Self {
        let mut builder = Self {
            text,
            nodes: vec![NodeData {
                span: Span::new(0, text.len()),
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            curr: NodeId::DOCUMENT,
            doctype: None,
            decl: None,
            attr: None,
            end_tag_open: None,
            element_content_start: None,
        };
        if dtd_file {
            let doctype = DocumentType {
                synthetic: true,
                ..Default::default()
            };
            let id = builder.open(NodeKind::DocumentType(doctype), Span::new(0, text.len()));
            builder.doctype = Some(id);
        }
        builder
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    fn parent_of(&self, id: NodeId) -> NodeId {
        self.data(id).parent.unwrap_or(NodeId::DOCUMENT)
    }

    fn alloc(&mut self, kind: NodeKind, span: Span, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            span,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Append a child of `curr` without making it current.
    fn append(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = self.alloc(kind, span, self.curr);
        let curr = self.curr;
        self.data_mut(curr).children.push(id);
        id
    }

    /// Append a child of `curr` and make it current.
    fn open(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = self.append(kind, span);
        self.curr = id;
        id
    }

    fn close_curr(&mut self) {
        self.curr = self.parent_of(self.curr);
    }

    fn extend(&mut self, id: NodeId, end: usize) {
        let span = &mut self.data_mut(id).span;
        span.end = span.end.max(end);
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.data_mut(id).kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    fn param(&self, token: Token) -> DeclParam {
        DeclParam::new(
            Span::new(token.start, token.end),
            &self.text[token.start..token.end],
        )
    }

    /// Pop `curr` if it is an element whose end tag was seen but never closed by `>`.
    fn pop_closed_element(&mut self) {
        if let NodeKind::Element(e) = &self.data(self.curr).kind
            && e.closed
        {
            self.close_curr();
        }
    }

    fn close_decl(&mut self) {
        if let Some(decl) = self.decl.take() {
            self.curr = self.parent_of(decl);
        }
    }

    fn close_doctype(&mut self, at: usize) {
        self.close_decl();
        if let Some(doctype) = self.doctype.take() {
            self.extend(doctype, at);
            self.curr = self.parent_of(doctype);
        }
    }

    /// `</` without a name: keep it as a nameless lone end tag.
    fn flush_end_tag_open(&mut self, end: usize, close: Option<usize>) {
        if let Some(open) = self.end_tag_open.take() {
            let element = Element {
                end_tag_open_offset: Some(open),
                end_tag_close_offset: close,
                closed: close.is_some(),
                ..Default::default()
            };
            self.append(NodeKind::Element(element), Span::new(open, end));
        }
    }

    /// Shared preamble of every token that starts new markup or content.
    fn before_markup(&mut self, token: Token, in_dtd_content: bool) {
        self.attr = None;
        self.flush_end_tag_open(token.start, None);
        self.close_decl();
        if self.doctype.is_some() && !in_dtd_content {
            self.close_doctype(token.start);
        }
        self.pop_closed_element();
    }

    fn token(&mut self, token: Token, in_dtd_content: bool) {
        use TokenKind as T;

        let span = Span::new(token.start, token.end);
        match token.kind {
            T::StartTagOpen => {
                self.before_markup(token, in_dtd_content);
                let element = Element {
                    start_tag_open_offset: Some(token.start),
                    ..Default::default()
                };
                self.open(NodeKind::Element(element), span);
            }
            T::StartTag => {
                let curr = self.curr;
                let tag = span.slice(self.text).to_string();
                if let Some(e) = self.element_mut(curr) {
                    e.tag = Some(tag);
                    e.tag_span = Some(span);
                    self.extend(curr, token.end);
                }
            }
            T::StartTagClose => {
                self.attr = None;
                let curr = self.curr;
                if let Some(e) = self.element_mut(curr) {
                    e.start_tag_close_offset = Some(token.start);
                    self.extend(curr, token.end);
                }
            }
            T::StartTagSelfClose => {
                self.attr = None;
                let curr = self.curr;
                if let Some(e) = self.element_mut(curr) {
                    e.start_tag_close_offset = Some(token.start);
                    e.self_closed = true;
                    e.closed = true;
                    self.extend(curr, token.end);
                    self.close_curr();
                }
            }
            T::EndTagOpen => {
                self.before_markup(token, in_dtd_content);
                self.end_tag_open = Some(token.start);
            }
            T::EndTag => self.end_tag(token),
            T::EndTagClose => {
                if self.end_tag_open.is_some() {
                    self.flush_end_tag_open(token.end, Some(token.start));
                    return;
                }
                let curr = self.curr;
                if let Some(e) = self.element_mut(curr)
                    && e.closed
                    && e.end_tag_open_offset.is_some()
                {
                    e.end_tag_close_offset = Some(token.start);
                    self.extend(curr, token.end);
                    self.close_curr();
                }
            }

            T::AttributeName => {
                let owner = self.curr;
                let accepts = match &self.data(owner).kind {
                    NodeKind::Element(_) => true,
                    NodeKind::ProcessingInstruction(pi) => pi.prolog,
                    _ => false,
                };
                if !accepts {
                    return;
                }
                let attr = Attr {
                    name: span.slice(self.text).to_string(),
                    name_span: span,
                    ..Default::default()
                };
                let id = self.alloc(NodeKind::Attribute(attr), span, owner);
                match &mut self.data_mut(owner).kind {
                    NodeKind::Element(e) => e.attributes.push(id),
                    NodeKind::ProcessingInstruction(pi) => pi.attributes.push(id),
                    _ => {}
                }
                self.extend(owner, token.end);
                self.attr = Some(id);
            }
            T::DelimiterAssign => {
                if let Some(id) = self.attr
                    && let NodeKind::Attribute(a) = &mut self.data_mut(id).kind
                {
                    a.has_delimiter = true;
                }
                let curr = self.curr;
                self.extend(curr, token.end);
            }
            T::AttributeValue => {
                if let Some(id) = self.attr.take() {
                    let value = span.slice(self.text);
                    if let NodeKind::Attribute(a) = &mut self.data_mut(id).kind {
                        a.set_value(value, span);
                    }
                    self.extend(id, token.end);
                }
                let curr = self.curr;
                self.extend(curr, token.end);
            }
            T::Unknown => {
                let curr = self.curr;
                if let Some(e) = self.element_mut(curr)
                    && e.start_tag_close_offset.is_none()
                    && e.end_tag_open_offset.is_none()
                {
                    self.extend(curr, token.end);
                }
            }
            T::Whitespace => {}

            T::StartCommentTag => {
                self.before_markup(token, in_dtd_content);
                self.open(NodeKind::Comment(Leaf::default()), span);
            }
            T::Comment | T::CDataContent => {
                let curr = self.curr;
                if let NodeKind::Comment(leaf) | NodeKind::CData(leaf) = &mut self.data_mut(curr).kind {
                    leaf.content = Some(span);
                    self.extend(curr, token.end);
                }
            }
            T::EndCommentTag | T::CDataTagClose => {
                let curr = self.curr;
                if let NodeKind::Comment(leaf) | NodeKind::CData(leaf) = &mut self.data_mut(curr).kind {
                    leaf.closed = true;
                    self.extend(curr, token.end);
                    self.close_curr();
                }
            }
            T::CDataTagOpen => {
                self.before_markup(token, in_dtd_content);
                self.open(NodeKind::CData(Leaf::default()), span);
            }

            T::StartPrologOrPI => {
                self.before_markup(token, in_dtd_content);
                self.open(
                    NodeKind::ProcessingInstruction(ProcessingInstruction::default()),
                    span,
                );
            }
            T::PrologName | T::PIName => {
                let curr = self.curr;
                let target = span.slice(self.text).to_string();
                if let NodeKind::ProcessingInstruction(pi) = &mut self.data_mut(curr).kind {
                    pi.prolog = token.kind == T::PrologName;
                    pi.target = Some(target);
                    pi.target_span = Some(span);
                    self.extend(curr, token.end);
                }
            }
            T::PIContent => {
                let curr = self.curr;
                if let NodeKind::ProcessingInstruction(pi) = &mut self.data_mut(curr).kind {
                    pi.content = Some(span);
                    self.extend(curr, token.end);
                }
            }
            T::PIEnd | T::PrologEnd => {
                self.attr = None;
                let curr = self.curr;
                if let NodeKind::ProcessingInstruction(pi) = &mut self.data_mut(curr).kind {
                    pi.closed = true;
                    self.extend(curr, token.end);
                    self.close_curr();
                }
            }

            T::Content => {
                self.before_markup(token, in_dtd_content);
                self.append(NodeKind::Text, span);
            }

            T::Eos => {}

            kind if kind.is_dtd() => self.dtd_token(token, in_dtd_content),
            _ => {}
        }
    }

    fn end_tag(&mut self, token: Token) {
        let text = self.text;
        let name = &text[token.start..token.end];
        let open = self.end_tag_open.take().unwrap_or(token.start.saturating_sub(2));
        let name_span = Span::new(token.start, token.end);

        // Nearest open element with the same name, walking from `curr` outwards.
        let mut chain = Vec::new();
        let mut cursor = Some(self.curr);
        let mut matched = None;
        while let Some(id) = cursor {
            if let NodeKind::Element(e) = &self.data(id).kind
                && !e.closed
                && e.tag.as_deref() == Some(name)
            {
                matched = Some(id);
                break;
            }
            chain.push(id);
            cursor = self.data(id).parent;
        }

        match matched {
            Some(id) => {
                for unclosed in chain {
                    self.extend(unclosed, open);
                }
                if let Some(e) = self.element_mut(id) {
                    e.closed = true;
                    e.end_tag_open_offset = Some(open);
                    e.end_tag_name_span = Some(name_span);
                }
                self.extend(id, token.end);
                self.curr = id;
            }
            None => {
                let element = Element {
                    tag: Some(name.to_string()),
                    end_tag_open_offset: Some(open),
                    end_tag_name_span: Some(name_span),
                    closed: true,
                    ..Default::default()
                };
                self.open(NodeKind::Element(element), Span::new(open, token.end));
            }
        }
    }

    fn dtd_token(&mut self, token: Token, in_dtd_content: bool) {
        use TokenKind as T;

        match token.kind {
            T::DtdStartDoctypeTag => {
                self.before_markup(token, in_dtd_content);
                let id = self.open(
                    NodeKind::DocumentType(DocumentType::default()),
                    Span::new(token.start, token.end),
                );
                self.doctype = Some(id);
            }
            T::DtdStartInternalSubset => {
                self.with_doctype(token, |dt, _| dt.internal_subset_start = Some(token.start));
            }
            T::DtdEndInternalSubset => {
                self.close_decl();
                self.with_doctype(token, |dt, _| dt.internal_subset_end = Some(token.end));
            }
            T::DtdEndDoctypeTag => {
                self.close_decl();
                if let Some(id) = self.doctype.take() {
                    if let NodeKind::DocumentType(dt) = &mut self.data_mut(id).kind {
                        dt.closed = true;
                    }
                    self.extend(id, token.end);
                    self.curr = self.parent_of(id);
                }
            }
            T::DtdDoctypeName
            | T::DtdDocTypeKindPublic
            | T::DtdDocTypeKindSystem
            | T::DtdDoctypePublicId
            | T::DtdDoctypeSystemId => {
                self.with_doctype(token, |dt, param| {
                    dt.parameters.push(param.clone());
                    let slot = match token.kind {
                        T::DtdDoctypeName => &mut dt.name,
                        T::DtdDoctypePublicId => &mut dt.public_id,
                        T::DtdDoctypeSystemId => &mut dt.system_id,
                        _ => &mut dt.kind,
                    };
                    *slot = Some(param);
                });
            }

            T::DtdStartElement | T::DtdStartAttlist | T::DtdStartEntity | T::DtdStartNotation => {
                self.close_decl();
                self.pop_closed_element();
                let kind = match token.kind {
                    T::DtdStartElement => NodeKind::ElementDecl(ElementDecl::default()),
                    T::DtdStartAttlist => NodeKind::AttlistDecl(AttlistDecl::default()),
                    T::DtdStartEntity => NodeKind::EntityDecl(EntityDecl::default()),
                    _ => NodeKind::NotationDecl(NotationDecl::default()),
                };
                let id = self.open(kind, Span::new(token.start, token.end));
                self.decl = Some(id);
                self.element_content_start = None;
            }
            T::DtdEndTag => {
                if let Some(id) = self.decl.take() {
                    match &mut self.data_mut(id).kind {
                        NodeKind::ElementDecl(d) => d.closed = true,
                        NodeKind::AttlistDecl(d) => d.closed = true,
                        NodeKind::EntityDecl(d) => d.closed = true,
                        NodeKind::NotationDecl(d) => d.closed = true,
                        _ => {}
                    }
                    self.extend(id, token.end);
                    self.curr = self.parent_of(id);
                }
            }
            T::DtdUnrecognizedParameters => {
                let param = self.param(token);
                let target = self.decl.or(self.doctype);
                if let Some(id) = target {
                    let text = self.text;
                    let slot = match &mut self.data_mut(id).kind {
                        NodeKind::DocumentType(d) => &mut d.unrecognized,
                        NodeKind::ElementDecl(d) => &mut d.unrecognized,
                        NodeKind::AttlistDecl(d) => &mut d.unrecognized,
                        NodeKind::EntityDecl(d) => &mut d.unrecognized,
                        NodeKind::NotationDecl(d) => &mut d.unrecognized,
                        _ => return,
                    };
                    *slot = Some(match slot.take() {
                        Some(first) => {
                            let span = Span::new(first.span.start, token.end);
                            DeclParam::new(span, span.slice(text))
                        }
                        None => param,
                    });
                    self.extend(id, token.end);
                }
            }
            _ => self.decl_param(token),
        }
    }

    fn with_doctype(&mut self, token: Token, f: impl FnOnce(&mut DocumentType, DeclParam)) {
        let param = self.param(token);
        if let Some(id) = self.doctype {
            if let NodeKind::DocumentType(dt) = &mut self.data_mut(id).kind {
                f(dt, param);
            }
            self.extend(id, token.end);
        }
    }

    /// A parameter token of the open ELEMENT, ATTLIST, ENTITY or NOTATION declaration.
    fn decl_param(&mut self, token: Token) {
        use TokenKind as T;

        let Some(id) = self.decl else {
            return;
        };
        let param = self.param(token);
        if token.kind == T::DtdStartElementContent {
            self.element_content_start = Some(token.start);
        }
        let content = self.element_content_start.map(|start| {
            let span = Span::new(start, token.end);
            DeclParam::new(span, span.slice(self.text))
        });

        match &mut self.data_mut(id).kind {
            NodeKind::ElementDecl(d) => match token.kind {
                T::DtdElementDeclName => d.name = Some(param.clone()),
                T::DtdElementCategory => d.category = Some(param.clone()),
                T::DtdStartElementContent | T::DtdElementContent | T::DtdEndElementContent => {
                    d.content = content;
                }
                _ => {}
            },
            NodeKind::AttlistDecl(d) => match token.kind {
                T::DtdAttlistElementName => d.element_name = Some(param.clone()),
                T::DtdAttlistAttributeName => d.definitions.push(AttlistDef {
                    name: Some(param.clone()),
                    ..Default::default()
                }),
                T::DtdAttlistAttributeType | T::DtdAttlistAttributeValue => {
                    if d.definitions.is_empty() {
                        d.definitions.push(AttlistDef::default());
                    }
                    if let Some(def) = d.definitions.last_mut() {
                        if token.kind == T::DtdAttlistAttributeType {
                            def.value_type = Some(param.clone());
                        } else {
                            def.default_value = Some(param.clone());
                        }
                    }
                }
                _ => {}
            },
            NodeKind::EntityDecl(d) => match token.kind {
                T::DtdEntityPercent => d.percent = Some(param.clone()),
                T::DtdEntityName => d.name = Some(param.clone()),
                T::DtdEntityValue => d.value = Some(param.clone()),
                T::DtdEntityKindPublic | T::DtdEntityKindSystem => d.kind = Some(param.clone()),
                T::DtdEntityPublicId => d.public_id = Some(param.clone()),
                T::DtdEntitySystemId => d.system_id = Some(param.clone()),
                _ => {}
            },
            NodeKind::NotationDecl(d) => match token.kind {
                T::DtdNotationName => d.name = Some(param.clone()),
                T::DtdNotationKindPublic | T::DtdNotationKindSystem => {
                    d.kind = Some(param.clone())
                }
                T::DtdNotationPublicId => d.public_id = Some(param.clone()),
                T::DtdNotationSystemId => d.system_id = Some(param.clone()),
                _ => {}
            },
            _ => {}
        }

        let params = match &mut self.data_mut(id).kind {
            NodeKind::ElementDecl(d) => &mut d.parameters,
            NodeKind::AttlistDecl(d) => &mut d.parameters,
            NodeKind::EntityDecl(d) => &mut d.parameters,
            NodeKind::NotationDecl(d) => &mut d.parameters,
            _ => return,
        };
        params.push(param);
        self.extend(id, token.end);
    }

    fn finish(mut self) -> Vec<NodeData> {
        let len = self.text.len();
        self.flush_end_tag_open(len, None);
        let mut cursor = Some(self.curr);
        while let Some(id) = cursor {
            self.extend(id, len);
            cursor = self.data(id).parent;
        }
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_nest() {
        let text = "<?xml version='1.0'?><!DOCTYPE r [<!ELEMENT r ANY>]><r a='1'><x><y/></r><!--c";
        let doc = parse(text, "test.xml");
        for node in doc.descendants() {
            assert!(node.start() <= node.end());
            for child in node.children() {
                assert!(
                    node.start() <= child.start() && child.end() <= node.end(),
                    "{:?} escapes {:?}",
                    child,
                    node
                );
            }
        }
    }

    #[test]
    fn test_dtd_file_is_synthetic_doctype() {
        let doc = parse("<!ELEMENT a EMPTY>\n<!ATTLIST a id ID #IMPLIED>", "file:///x.dtd");
        let doctype = doc.doctype().unwrap();
        assert!(doctype.as_doctype().unwrap().is_synthetic());
        let names: Vec<_> = doctype
            .children()
            .filter(|c| c.is_dtd_decl())
            .map(|c| c.node_name())
            .collect();
        assert_eq!(names, vec![Some("a"), Some("a")]);
    }

    #[test]
    fn test_nameless_end_tag() {
        let doc = parse("<a></></a>", "test.xml");
        let a = doc.document_element().unwrap();
        let lone = a.child_elements().next().unwrap();
        assert_eq!(lone.tag_name(), None);
        assert_eq!(lone.span(), Span::new(3, 6));
        assert!(a.is_closed());
    }
}
