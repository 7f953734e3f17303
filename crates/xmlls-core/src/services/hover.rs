//! Hover on tag names and attributes.

use std::sync::Arc;

use xmlls_dom::{BadLocation, Document, TokenKind};

use super::tag_name_span;
use crate::cancel::CancelChecker;
use crate::error::ParticipantResult;
use crate::participants::HoverParticipant;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::{HoverRequest, PositionRequest};
use crate::settings::SharedSettings;
use crate::types::{Hover, MarkupContent, MarkupKind, Position};

/// What the cursor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Tag,
    AttributeName,
    AttributeValue,
}

pub struct XmlHover {
    registry: Arc<ExtensionRegistry>,
}

impl XmlHover {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// Hover for the tag name or attribute at `position`. The fragments of
    /// all participants are joined; `None` when none contributed.
    pub fn do_hover(
        &self,
        document: &Document,
        position: Position,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Result<Option<Hover>, BadLocation> {
        let base = PositionRequest::new(document, position, &self.registry)?;
        let offset = base.offset();
        let node = base.node();

        if let Some(attr) = node.as_attr() {
            let (target, span) = match attr.value_span() {
                Some(span) if attr.value_contains_offset(offset) => (Target::AttributeValue, span),
                _ => (Target::AttributeName, attr.name_span()),
            };
            let request = HoverRequest::new(base, document.range_of(span).ok(), true, settings);
            return Ok(self.collect(&request, target, cancel));
        }

        let Some(element) = node.as_element().filter(|e| e.tag_name().is_some()) else {
            return Ok(None);
        };
        let end_tag_open = element
            .end_tag_open_offset()
            .filter(|&o| element.has_end_tag() && offset >= o);
        let (kind, start, open) = match end_tag_open {
            Some(o) => (TokenKind::EndTag, o, false),
            None => (TokenKind::StartTag, element.start(), true),
        };
        let Some(span) = tag_name_span(document.text(), kind, start, offset)
            .filter(|span| span.touches(offset))
        else {
            return Ok(None);
        };
        let request = HoverRequest::new(base, document.range_of(span).ok(), open, settings);
        Ok(self.collect(&request, Target::Tag, cancel))
    }

    fn collect(
        &self,
        request: &HoverRequest<'_>,
        target: Target,
        cancel: &dyn CancelChecker,
    ) -> Option<Hover> {
        let mut fragments = Vec::new();
        for participant in self.registry.hover_participants() {
            if cancel.is_cancelled() {
                break;
            }
            let fragment = isolate("hover", participant.name(), || {
                call(participant.as_ref(), request, target)
            });
            if let Some(Some(fragment)) = fragment
                && !fragment.is_empty()
            {
                fragments.push(fragment);
            }
        }
        if fragments.is_empty() {
            return None;
        }

        let kind = request.markup_kind();
        let separator = match kind {
            MarkupKind::Markdown => "\n\n___\n\n",
            MarkupKind::PlainText => "\n\n",
        };
        Some(Hover {
            contents: MarkupContent::new(kind, fragments.join(separator)),
            range: request.tag_range(),
        })
    }
}

fn call(
    participant: &dyn HoverParticipant,
    request: &HoverRequest<'_>,
    target: Target,
) -> ParticipantResult<Option<String>> {
    match target {
        Target::Tag => participant.on_tag(request),
        Target::AttributeName => participant.on_attribute_name(request),
        Target::AttributeValue => participant.on_attribute_value(request),
    }
}
