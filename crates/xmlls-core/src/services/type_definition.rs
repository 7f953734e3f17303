//! Go to type definition: the grammar declaration of the node under the cursor.

use std::sync::Arc;

use xmlls_dom::{BadLocation, Document};

use crate::cancel::CancelChecker;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::PositionRequest;
use crate::types::{LocationLink, Position};

pub struct XmlTypeDefinition {
    registry: Arc<ExtensionRegistry>,
}

impl XmlTypeDefinition {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    pub fn find_type_definition(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<LocationLink>, BadLocation> {
        let request = PositionRequest::new(document, position, &self.registry)?;
        let mut locations = Vec::new();
        for participant in self.registry.type_definition_participants() {
            if cancel.is_cancelled() {
                break;
            }
            isolate("type_definition", participant.name(), || {
                participant.find_type_definition(&request, &mut locations, cancel)
            });
        }
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::error::ParticipantResult;
    use crate::participants::TypeDefinitionParticipant;
    use crate::request::TypeDefinitionRequest;
    use crate::types::Range;
    use xmlls_dom::parse;

    /// Points at the start of a fixed grammar and cancels the request.
    struct ToGrammar(CancellationToken);

    impl TypeDefinitionParticipant for ToGrammar {
        fn find_type_definition(
            &self,
            request: &TypeDefinitionRequest<'_>,
            locations: &mut Vec<LocationLink>,
            _cancel: &dyn CancelChecker,
        ) -> ParticipantResult {
            let origin = request.range_of(request.node().span())?;
            locations.push(LocationLink::new(
                origin,
                "file:///grammar.xsd",
                Range::default(),
            ));
            self.0.cancel();
            Ok(())
        }
    }

    #[test]
    fn test_stops_after_cancellation() {
        let token = CancellationToken::new();
        let registry = ExtensionRegistry::new();
        registry.register_type_definition_participant(Arc::new(ToGrammar(token.clone())));
        registry.register_type_definition_participant(Arc::new(ToGrammar(token.clone())));

        let doc = parse("<a/>", "file:///t.xml");
        let links = XmlTypeDefinition::new(Arc::new(registry))
            .find_type_definition(&doc, Position::new(0, 1), &token)
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_uri, "file:///grammar.xsd");
    }
}
