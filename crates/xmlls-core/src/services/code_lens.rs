//! Code lenses, when enabled in the settings.

use std::sync::Arc;

use xmlls_dom::Document;

use crate::cancel::CancelChecker;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::CodeLensRequest;
use crate::settings::SharedSettings;
use crate::types::CodeLens;

pub struct XmlCodeLens {
    registry: Arc<ExtensionRegistry>,
}

impl XmlCodeLens {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    pub fn get_code_lens(
        &self,
        document: &Document,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Vec<CodeLens> {
        let mut lenses = Vec::new();
        if !settings.code_lens.enabled {
            return lenses;
        }
        let request = CodeLensRequest::new(document, &settings.code_lens, &self.registry);
        for participant in self.registry.code_lens_participants() {
            if cancel.is_cancelled() {
                break;
            }
            isolate("code_lens", participant.name(), || {
                participant.do_code_lens(&request, &mut lenses, cancel)
            });
        }
        lenses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::error::ParticipantResult;
    use crate::participants::CodeLensParticipant;
    use crate::types::{Command, Range};
    use xmlls_dom::parse;

    struct Counter;

    impl CodeLensParticipant for Counter {
        fn do_code_lens(
            &self,
            request: &CodeLensRequest<'_>,
            lenses: &mut Vec<CodeLens>,
            _cancel: &dyn CancelChecker,
        ) -> ParticipantResult {
            let count = request.document().elements().count();
            let command = request
                .is_supported_by_client("references")
                .then(|| Command::new(format!("{count} elements"), "xml.show.references"));
            lenses.push(CodeLens {
                range: Range::default(),
                command,
            });
            Ok(())
        }
    }

    #[test]
    fn test_code_lens_gated_by_settings() {
        let registry = ExtensionRegistry::new();
        registry.register_code_lens_participant(Arc::new(Counter));
        let service = XmlCodeLens::new(Arc::new(registry));
        let doc = parse("<a><b/></a>", "file:///lens.xml");

        let mut settings = SharedSettings::default();
        assert!(service.get_code_lens(&doc, &settings, &NeverCancel).is_empty());

        settings.code_lens.enabled = true;
        let lenses = service.get_code_lens(&doc, &settings, &NeverCancel);
        assert_eq!(lenses.len(), 1);
        assert!(lenses[0].command.is_none());

        settings.code_lens.supported_kinds = vec!["references".to_string()];
        let lenses = service.get_code_lens(&doc, &settings, &NeverCancel);
        assert_eq!(lenses[0].command.as_ref().unwrap().title, "2 elements");
    }
}
