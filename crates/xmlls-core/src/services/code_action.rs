//! Code actions: fixes for the diagnostics in the requested range.

use std::sync::Arc;

use xmlls_dom::Document;

use crate::cancel::CancelChecker;
use crate::registry::{ExtensionRegistry, isolate};
use crate::settings::SharedSettings;
use crate::types::{CodeAction, Diagnostic, Range};

pub struct XmlCodeActions {
    registry: Arc<ExtensionRegistry>,
}

impl XmlCodeActions {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// Ask every participant for fixes of each diagnostic touching `range`.
    pub fn do_code_actions(
        &self,
        document: &Document,
        range: Range,
        diagnostics: &[Diagnostic],
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Vec<CodeAction> {
        let participants = self.registry.code_action_participants();
        let mut actions = Vec::new();
        for diagnostic in diagnostics.iter().filter(|d| d.range.intersects(&range)) {
            for participant in &participants {
                if cancel.is_cancelled() {
                    return actions;
                }
                isolate("code_action", participant.name(), || {
                    participant.do_code_action(diagnostic, range, document, &mut actions, settings)
                });
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::error::ParticipantResult;
    use crate::participants::CodeActionParticipant;
    use crate::types::{DiagnosticSeverity, Position};
    use xmlls_dom::parse;

    struct Remove;

    impl CodeActionParticipant for Remove {
        fn do_code_action(
            &self,
            diagnostic: &Diagnostic,
            _range: Range,
            document: &Document,
            actions: &mut Vec<CodeAction>,
            _settings: &SharedSettings,
        ) -> ParticipantResult {
            actions.push(CodeAction::quick_fix(
                format!("Remove '{}'", diagnostic.message),
                diagnostic,
                document.uri(),
                diagnostic.range,
                "",
            ));
            Ok(())
        }
    }

    #[test]
    fn test_only_diagnostics_in_range() {
        let registry = ExtensionRegistry::new();
        registry.register_code_action_participant(Arc::new(Remove));
        let doc = parse("<a>xx yy</a>", "file:///actions.xml");
        let at = |start, end| Range::new(Position::new(0, start), Position::new(0, end));
        let diagnostics = [
            Diagnostic::new(at(3, 5), DiagnosticSeverity::Error, "xx"),
            Diagnostic::new(at(6, 8), DiagnosticSeverity::Error, "yy"),
        ];

        let actions = XmlCodeActions::new(Arc::new(registry)).do_code_actions(
            &doc,
            at(7, 7),
            &diagnostics,
            &SharedSettings::default(),
            &NeverCancel,
        );
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Remove 'yy'");
        assert_eq!(actions[0].kind.as_deref(), Some("quickfix"));
        let edits = &actions[0].edit.as_ref().unwrap().changes["file:///actions.xml"];
        assert_eq!(edits[0].range, at(6, 8));
    }
}
