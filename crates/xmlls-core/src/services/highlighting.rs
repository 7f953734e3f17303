//! Document highlights.

use std::sync::Arc;

use xmlls_dom::{BadLocation, Document};

use super::tag_name_at;
use crate::cancel::CancelChecker;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::PositionRequest;
use crate::types::{DocumentHighlight, DocumentHighlightKind, Position};

pub struct XmlHighlighting {
    registry: Arc<ExtensionRegistry>,
}

impl XmlHighlighting {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// On a tag name, both names of the start/end tag pair; then the
    /// participants' highlights.
    pub fn find_document_highlights(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<DocumentHighlight>, BadLocation> {
        let request = PositionRequest::new(document, position, &self.registry)?;
        let mut highlights = Vec::new();

        if let Some((element, _, _)) = tag_name_at(document, request.offset()) {
            for span in [element.tag_name_span(), element.end_tag_name_span()]
                .into_iter()
                .flatten()
            {
                highlights.push(DocumentHighlight::new(
                    document.range_of(span)?,
                    DocumentHighlightKind::Read,
                ));
            }
        }

        for participant in self.registry.highlighting_participants() {
            if cancel.is_cancelled() {
                break;
            }
            isolate("highlighting", participant.name(), || {
                participant.find_document_highlights(&request, &mut highlights, cancel)
            });
        }
        Ok(highlights)
    }
}
