//! Completion.
//!
//! The tag under the cursor is rescanned from the start of the node the
//! cursor is after. The token that contains the cursor decides what is
//! being completed: a tag name, an attribute name, an attribute value,
//! text content, an end tag, or the `<?xml` declaration. Participants
//! contribute the items; the service itself proposes close tags and
//! falls back to tag names already used in the document.

use std::sync::Arc;

use xmlls_dom::{BadLocation, Document, Scanner, ScannerState, Span, TokenKind};

use crate::cancel::CancelChecker;
use crate::error::ParticipantResult;
use crate::participants::CompletionParticipant;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::{CompletionRequest, CompletionResponse, PositionRequest};
use crate::settings::SharedSettings;
use crate::types::{AutoCloseTagResponse, CompletionItem, CompletionItemKind, CompletionList, Position};

const PROLOG_SNIPPET: &str = "xml version=\"1.0\" encoding=\"UTF-8\"?>$0";

pub struct XmlCompletion {
    registry: Arc<ExtensionRegistry>,
}

/// State of one completion computation.
struct Collector<'a, 'r> {
    registry: &'r ExtensionRegistry,
    document: &'a Document,
    offset: usize,
    request: CompletionRequest<'a>,
    response: CompletionResponse,
    cancel: &'r dyn CancelChecker,
}

impl XmlCompletion {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    pub fn do_complete(
        &self,
        document: &Document,
        position: Position,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Result<CompletionList, BadLocation> {
        let base = PositionRequest::before(document, position, &self.registry)?;
        let offset = base.offset();
        let node = base.node();
        let mut collector = Collector {
            registry: &self.registry,
            document,
            offset,
            request: CompletionRequest::new(base, settings),
            response: CompletionResponse::for_node(node, offset),
            cancel,
        };
        if node.is_doctype() || node.is_dtd_decl() {
            return Ok(collector.response.into_list());
        }

        let text = document.text();
        let mut scanner = Scanner::with_state(text, node.start(), ScannerState::WithinContent);
        let mut token = scanner.scan_token();
        while token != TokenKind::Eos && scanner.token_offset() <= offset {
            if cancel.is_cancelled() {
                break;
            }
            let (start, end) = (scanner.token_offset(), scanner.token_end());
            match token {
                TokenKind::StartTagOpen if end == offset => {
                    let end_pos = scan_next_for_end_pos(offset, &mut scanner, TokenKind::StartTag);
                    collector.collect_tag_suggestions(offset, end_pos);
                    return Ok(collector.finish());
                }
                TokenKind::StartTag => {
                    if start <= offset && offset <= end {
                        collector.collect_open_tag_suggestions(start, end);
                        return Ok(collector.finish());
                    }
                    collector.request.set_current_tag(scanner.token_text());
                }
                TokenKind::AttributeName => {
                    if start <= offset && offset <= end {
                        collector.collect_attribute_name_suggestions(start, end);
                        return Ok(collector.finish());
                    }
                    collector
                        .request
                        .set_current_attribute_name(scanner.token_text());
                }
                TokenKind::DelimiterAssign if end == offset => {
                    let end_pos =
                        scan_next_for_end_pos(offset, &mut scanner, TokenKind::AttributeValue);
                    collector.collect_attribute_value_suggestions(offset, end_pos);
                    return Ok(collector.finish());
                }
                TokenKind::AttributeValue if start <= offset && offset <= end => {
                    collector.collect_attribute_value_suggestions(start, end);
                    return Ok(collector.finish());
                }
                TokenKind::Whitespace if offset <= end => {
                    match scanner.state() {
                        ScannerState::AfterOpeningStartTag => {
                            let end_pos =
                                scan_next_for_end_pos(offset, &mut scanner, TokenKind::StartTag);
                            collector.collect_tag_suggestions(start, end_pos);
                        }
                        ScannerState::WithinTag
                        | ScannerState::AfterAttributeName
                        | ScannerState::WithinPrologAttributes => {
                            collector.collect_attribute_name_suggestions(end, end);
                        }
                        ScannerState::BeforeAttributeValue => {
                            collector.collect_attribute_value_suggestions(end, end);
                        }
                        ScannerState::AfterOpeningEndTag => {
                            collector.collect_close_tag_suggestions(start.saturating_sub(1), false, end);
                        }
                        ScannerState::WithinContent => collector.collect_inside_content(),
                        _ => {}
                    }
                    return Ok(collector.finish());
                }
                TokenKind::StartTagClose if offset <= end => {
                    if let Some(tag) = collector.request.current_tag()
                        && collector.collect_auto_close_tag_suggestion(end, tag)
                    {
                        return Ok(collector.finish());
                    }
                }
                TokenKind::EndTagOpen if offset <= end => {
                    if offset == start {
                        // Right before `</`: still in the parent's content.
                        collector.collect_inside_content();
                    } else {
                        let end_pos =
                            scan_next_for_end_pos(offset, &mut scanner, TokenKind::EndTag);
                        collector.collect_close_tag_suggestions(start + 1, false, end_pos);
                    }
                    return Ok(collector.finish());
                }
                TokenKind::EndTag if offset <= end => {
                    let before = text.get(..start).unwrap_or_default().trim_end();
                    if before.ends_with('/') {
                        collector.collect_close_tag_suggestions(before.len() - 1, false, end);
                        return Ok(collector.finish());
                    }
                }
                TokenKind::Content if offset <= end => {
                    collector.collect_inside_content();
                    return Ok(collector.finish());
                }
                TokenKind::StartPrologOrPI if offset == end && start == 0 => {
                    collector.collect_prolog_suggestion(end, end);
                    return Ok(collector.finish());
                }
                TokenKind::PrologName | TokenKind::PIName
                    if start == 2 && start <= offset && offset <= end =>
                {
                    collector.collect_prolog_suggestion(start, end);
                    return Ok(collector.finish());
                }
                _ => {}
            }
            token = scanner.scan_token();
        }
        if token == TokenKind::Eos && scanner.state() == ScannerState::WithinContent {
            collector.collect_inside_content();
        }
        Ok(collector.finish())
    }

    /// Text to insert after the user typed `>` or `</`.
    ///
    /// After the `>` of a start tag without end tag this is `$0</name>`;
    /// after `</` it is `name>` for the nearest unclosed element.
    pub fn do_tag_complete(
        &self,
        document: &Document,
        position: Position,
        settings: &SharedSettings,
    ) -> Result<Option<String>, BadLocation> {
        let offset = document.offset_at(position)?;
        if !settings.completion.auto_close_tags || offset == 0 {
            return Ok(None);
        }
        let node = document.find_node_before(offset);
        if document.ends_with('>', offset) {
            if let Some(element) = node.as_element()
                && let Some(tag) = element.tag_name()
                && !element.is_self_closed()
                && !element.has_end_tag()
                && element.start_tag_close_offset() == Some(offset - 1)
            {
                return Ok(Some(format!("$0</{tag}>")));
            }
        } else if document.ends_with('/', offset) && document.ends_with('<', offset - 1) {
            let open = std::iter::once(node)
                .chain(node.ancestors())
                .filter_map(|n| n.as_element())
                .find(|e| e.tag_name().is_some() && !e.is_closed());
            if let Some(tag) = open.and_then(|e| e.tag_name()) {
                return Ok(Some(format!("{tag}>")));
            }
        }
        Ok(None)
    }

    pub fn do_auto_close(
        &self,
        document: &Document,
        position: Position,
        settings: &SharedSettings,
    ) -> Result<Option<AutoCloseTagResponse>, BadLocation> {
        Ok(self
            .do_tag_complete(document, position, settings)?
            .map(|snippet| AutoCloseTagResponse {
                snippet,
                range: None,
            }))
    }
}

/// When the cursor sits at the end of the current token and the next token
/// is `next` starting right there, the end of that token; otherwise `offset`.
fn scan_next_for_end_pos(offset: usize, scanner: &mut Scanner<'_>, next: TokenKind) -> usize {
    if offset == scanner.token_end() {
        let token = scanner.scan_token();
        if token == next && scanner.token_offset() == offset {
            return scanner.token_end();
        }
    }
    offset
}

impl<'a> Collector<'a, '_> {
    fn finish(self) -> CompletionList {
        self.response.into_list()
    }

    fn participants(
        &mut self,
        operation: &'static str,
        mut f: impl FnMut(
            &dyn CompletionParticipant,
            &CompletionRequest<'a>,
            &mut CompletionResponse,
        ) -> ParticipantResult,
    ) {
        for participant in self.registry.completion_participants() {
            if self.cancel.is_cancelled() {
                self.response.set_incomplete();
                break;
            }
            let request = &self.request;
            let response = &mut self.response;
            isolate(operation, participant.name(), || {
                f(participant.as_ref(), request, response)
            });
        }
    }

    fn collect_tag_suggestions(&mut self, tag_name_start: usize, tag_name_end: usize) {
        self.collect_open_tag_suggestions(tag_name_start, tag_name_end);
        self.collect_close_tag_suggestions(tag_name_start, true, tag_name_end);
    }

    fn collect_open_tag_suggestions(&mut self, start: usize, end: usize) {
        self.request.set_replace_span(Span::new(start, end));
        self.participants("on_tag_open", |p, req, resp| p.on_tag_open(req, resp));
        if self.response.has_some_items() {
            return;
        }

        // Without a grammar, offer the tags already used in the document.
        let range = self.request.replace_range();
        let current = self.request.node().as_element();
        let mut seen = std::collections::HashSet::new();
        for element in self.document.elements() {
            let Some(tag) = element.tag_name() else {
                continue;
            };
            if Some(element) == current || !element.has_start_tag() || !seen.insert(tag) {
                continue;
            }
            self.response.add_completion_item(
                CompletionItem::new(tag, CompletionItemKind::Property).with_edit(range, tag),
            );
        }
    }

    /// Propose `/name` for the nearest element still waiting for its end tag.
    fn collect_close_tag_suggestions(
        &mut self,
        after_open_bracket: usize,
        in_open_tag: bool,
        tag_name_end: usize,
    ) {
        let text = self.document.text();
        let Ok(range) = self
            .document
            .range_of(Span::new(after_open_bracket, tag_name_end))
        else {
            return;
        };
        let node = self.request.node();
        let mut current = if in_open_tag { node.parent() } else { Some(node) };
        while let Some(candidate) = current {
            if let Some(element) = candidate.as_element()
                && let Some(tag) = element.tag_name()
            {
                let waiting = !element.is_closed()
                    || element
                        .end_tag_name_span()
                        .is_some_and(|s| s.touches(self.offset))
                    || element.end_tag_open_offset().is_some_and(|o| o > self.offset);
                if waiting {
                    let needs_bracket = !super::is_followed_by(
                        text,
                        tag_name_end,
                        ScannerState::AfterOpeningEndTag,
                        TokenKind::EndTagClose,
                    );
                    let label = format!("/{tag}");
                    let insert = if needs_bracket {
                        format!("{label}>")
                    } else {
                        label.clone()
                    };
                    self.response.add_completion_item(
                        CompletionItem::new(label.clone(), CompletionItemKind::Property)
                            .with_filter_text(label)
                            .with_edit(range, insert),
                    );
                    return;
                }
            }
            current = candidate.parent();
        }
    }

    /// `$0</name>` right after the `>` of a start tag with no end tag.
    fn collect_auto_close_tag_suggestion(&mut self, tag_close_end: usize, tag: &str) -> bool {
        if !self.request.settings().completion.auto_close_tags {
            return false;
        }
        let has_end_tag = self
            .request
            .node()
            .as_element()
            .is_some_and(|e| e.has_end_tag() || e.is_self_closed());
        if has_end_tag {
            return false;
        }
        let Ok(range) = self
            .document
            .range_of(Span::new(tag_close_end, tag_close_end))
        else {
            return false;
        };
        self.response.add_completion_item(
            CompletionItem::new(format!("</{tag}>"), CompletionItemKind::Property)
                .with_edit(range, format!("$0</{tag}>"))
                .snippet(),
        );
        true
    }

    fn collect_attribute_name_suggestions(&mut self, name_start: usize, name_end: usize) {
        self.request.set_replace_span(Span::new(name_start, name_end));
        let generate_value = !super::is_followed_by(
            self.document.text(),
            name_end,
            ScannerState::AfterAttributeName,
            TokenKind::DelimiterAssign,
        );
        self.participants("on_attribute_name", |p, req, resp| {
            p.on_attribute_name(generate_value, req, resp)
        });
    }

    fn collect_attribute_value_suggestions(&mut self, value_start: usize, value_end: usize) {
        let text = self.document.text();
        let bytes = text.as_bytes();
        let quote = bytes
            .get(value_start)
            .copied()
            .filter(|b| matches!(b, b'"' | b'\''));
        let mut value_prefix = "";
        match quote {
            Some(q) if self.offset > value_start => {
                let content_start = value_start + 1;
                let content_end = if value_end > content_start && bytes.get(value_end - 1) == Some(&q) {
                    value_end - 1
                } else {
                    value_end
                };
                if self.offset <= content_end {
                    self.request
                        .set_quoted_replace_span(Span::new(content_start, content_end));
                    value_prefix = text.get(content_start..self.offset).unwrap_or_default();
                } else {
                    self.request.set_replace_span(Span::new(value_start, value_end));
                }
            }
            _ => self.request.set_replace_span(Span::new(value_start, value_end)),
        }
        self.participants("on_attribute_value", |p, req, resp| {
            p.on_attribute_value(value_prefix, req, resp)
        });
    }

    fn collect_inside_content(&mut self) {
        self.request
            .set_replace_span(Span::new(self.offset, self.offset));
        self.participants("on_xml_content", |p, req, resp| p.on_xml_content(req, resp));
    }

    /// The `<?xml ...?>` declaration, offered at the very start of the document.
    fn collect_prolog_suggestion(&mut self, name_start: usize, name_end: usize) {
        if self.request.node().has_attributes() {
            return;
        }
        let text = self.document.text();
        let rest = text.get(name_end..).unwrap_or_default();
        let line_rest = rest.split('\n').next().unwrap_or_default();
        let trimmed = line_rest.trim_start();
        let skipped = line_rest.len() - trimmed.len();
        let end = if trimmed.starts_with("?>") {
            name_end + skipped + 2
        } else if trimmed.starts_with('>') {
            name_end + skipped + 1
        } else {
            name_end
        };
        let Ok(range) = self.document.range_of(Span::new(name_start, end)) else {
            return;
        };
        self.response.add_completion_item(
            CompletionItem::new("<?xml ... ?>", CompletionItemKind::Property)
                .with_filter_text("xml")
                .with_edit(range, PROLOG_SNIPPET)
                .snippet(),
        );
    }
}
