//! Document links, e.g. to the grammar a document references.

use std::sync::Arc;

use xmlls_dom::Document;

use crate::registry::{ExtensionRegistry, isolate};
use crate::types::DocumentLink;

pub struct XmlDocumentLink {
    registry: Arc<ExtensionRegistry>,
}

impl XmlDocumentLink {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    pub fn find_document_links(&self, document: &Document) -> Vec<DocumentLink> {
        let mut links = Vec::new();
        for participant in self.registry.document_link_participants() {
            isolate("document_link", participant.name(), || {
                participant.find_document_links(document, &mut links)
            });
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParticipantResult;
    use crate::participants::DocumentLinkParticipant;
    use xmlls_dom::parse;

    struct SystemId;

    impl DocumentLinkParticipant for SystemId {
        fn find_document_links(
            &self,
            document: &Document,
            links: &mut Vec<DocumentLink>,
        ) -> ParticipantResult {
            let Some(doctype) = document.doctype().and_then(|n| n.as_doctype()) else {
                return Ok(());
            };
            if let Some(param) = doctype.system_id_param() {
                links.push(DocumentLink {
                    range: document.range_of(param.span)?,
                    target: doctype.system_id_without_quotes().map(str::to_string),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_links_from_participants() {
        let registry = ExtensionRegistry::new();
        registry.register_document_link_participant(Arc::new(SystemId));
        let service = XmlDocumentLink::new(Arc::new(registry));

        let doc = parse("<!DOCTYPE a SYSTEM \"a.dtd\"><a/>", "file:///links.xml");
        let links = service.find_document_links(&doc);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target.as_deref(), Some("a.dtd"));

        let doc = parse("<a/>", "file:///links.xml");
        assert!(service.find_document_links(&doc).is_empty());
    }
}
