//! Go to definition.

use std::sync::Arc;

use xmlls_dom::{BadLocation, Document};

use super::tag_name_at;
use crate::cancel::CancelChecker;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::PositionRequest;
use crate::types::{LocationLink, Position};

pub struct XmlDefinition {
    registry: Arc<ExtensionRegistry>,
}

impl XmlDefinition {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// On a tag name, the other tag of the pair; then whatever the
    /// participants that apply to the document resolve.
    pub fn find_definition(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<LocationLink>, BadLocation> {
        let request = PositionRequest::new(document, position, &self.registry)?;
        let mut locations = Vec::new();

        if let Some((element, origin, open)) = tag_name_at(document, request.offset()) {
            let target = if open {
                element.end_tag_name_span()
            } else {
                element.tag_name_span()
            };
            if let Some(target) = target {
                locations.push(LocationLink::new(
                    document.range_of(origin)?,
                    document.uri(),
                    document.range_of(target)?,
                ));
            }
        }

        for participant in self.registry.definition_participants() {
            if cancel.is_cancelled() {
                break;
            }
            if !participant.applies_to(document) {
                continue;
            }
            isolate("definition", participant.name(), || {
                participant.find_definition(&request, &mut locations, cancel)
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
    use crate::participants::DefinitionParticipant;
    use crate::request::DefinitionRequest;
    use crate::types::Range;
    use xmlls_dom::parse;

    fn range(start: u32, end: u32) -> Range {
        Range::new(Position::new(0, start), Position::new(0, end))
    }

    struct OnlyDtd;

    impl DefinitionParticipant for OnlyDtd {
        fn applies_to(&self, document: &Document) -> bool {
            document.is_dtd()
        }

        fn find_definition(
            &self,
            _request: &DefinitionRequest<'_>,
            _locations: &mut Vec<LocationLink>,
            _cancel: &dyn CancelChecker,
        ) -> ParticipantResult {
            panic!("must not be called for XML documents");
        }
    }

    #[test]
    fn test_end_tag_to_start_tag_and_back() {
        let registry = ExtensionRegistry::new();
        registry.register_definition_participant(Arc::new(OnlyDtd));
        let service = XmlDefinition::new(Arc::new(registry));
        let doc = parse("<a><b></b></a>", "file:///def.xml");

        let links = service
            .find_definition(&doc, Position::new(0, 8), &NeverCancel)
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].origin_selection_range, Some(range(8, 9)));
        assert_eq!(links[0].target_range, range(4, 5));
        assert_eq!(links[0].target_uri, "file:///def.xml");

        let links = service
            .find_definition(&doc, Position::new(0, 4), &NeverCancel)
            .unwrap();
        assert_eq!(links[0].target_range, range(8, 9));
    }

    #[test]
    fn test_no_definition_in_content() {
        let service = XmlDefinition::new(Arc::new(ExtensionRegistry::new()));
        let doc = parse("<a>text</a>", "file:///def.xml");
        let links = service
            .find_definition(&doc, Position::new(0, 5), &NeverCancel)
            .unwrap();
        assert!(links.is_empty());
    }
}
