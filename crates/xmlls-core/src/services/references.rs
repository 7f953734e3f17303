//! Find references.

use std::sync::Arc;

use xmlls_dom::{BadLocation, Document};

use crate::cancel::CancelChecker;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::{PositionRequest, ReferenceRequest};
use crate::types::{Location, Position};

pub struct XmlReference {
    registry: Arc<ExtensionRegistry>,
}

impl XmlReference {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    pub fn find_references(
        &self,
        document: &Document,
        position: Position,
        include_declaration: bool,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<Location>, BadLocation> {
        let base = PositionRequest::new(document, position, &self.registry)?;
        let request = ReferenceRequest::new(base, include_declaration);
        let mut locations = Vec::new();
        for participant in self.registry.reference_participants() {
            if cancel.is_cancelled() {
                break;
            }
            isolate("references", participant.name(), || {
                participant.find_reference(&request, &mut locations, cancel)
            });
        }
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::error::ParticipantResult;
    use crate::participants::ReferenceParticipant;
    use xmlls_dom::parse;

    /// Every element with the same tag as the one under the cursor.
    struct SameTag;

    impl ReferenceParticipant for SameTag {
        fn find_reference(
            &self,
            request: &ReferenceRequest<'_>,
            locations: &mut Vec<Location>,
            _cancel: &dyn CancelChecker,
        ) -> ParticipantResult {
            let Some(tag) = request.current_tag() else {
                return Ok(());
            };
            let document = request.document();
            for element in document.elements().filter(|e| e.tag_name() == Some(tag)) {
                if !request.include_declaration() && element.node() == request.node() {
                    continue;
                }
                locations.push(Location::new(document.uri(), document.range_of(element.span())?));
            }
            Ok(())
        }
    }

    #[test]
    fn test_references_fan_out() {
        let registry = ExtensionRegistry::new();
        registry.register_reference_participant(Arc::new(SameTag));
        let service = XmlReference::new(Arc::new(registry));
        let doc = parse("<r><a/><a/><b/></r>", "file:///refs.xml");

        let all = service
            .find_references(&doc, Position::new(0, 4), true, &NeverCancel)
            .unwrap();
        assert_eq!(all.len(), 2);

        let others = service
            .find_references(&doc, Position::new(0, 4), false, &NeverCancel)
            .unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].range.start, Position::new(0, 7));
    }
}
