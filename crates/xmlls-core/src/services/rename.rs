//! Rename.

use std::sync::Arc;

use xmlls_dom::{BadLocation, Document};

use super::tag_name_at;
use crate::registry::{ExtensionRegistry, isolate};
use crate::request::{PositionRequest, RenameRequest};
use crate::types::{Position, TextEdit, WorkspaceEdit};

pub struct XmlRename {
    registry: Arc<ExtensionRegistry>,
}

impl XmlRename {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// Rename the tag pair under the cursor, plus the participants' edits.
    pub fn do_rename(
        &self,
        document: &Document,
        position: Position,
        new_text: &str,
    ) -> Result<WorkspaceEdit, BadLocation> {
        let base = PositionRequest::new(document, position, &self.registry)?;
        let request = RenameRequest::new(base, new_text);
        let mut edits = Vec::new();

        if let Some((element, _, _)) = tag_name_at(document, request.offset()) {
            for span in [element.tag_name_span(), element.end_tag_name_span()]
                .into_iter()
                .flatten()
            {
                edits.push(TextEdit::new(document.range_of(span)?, new_text));
            }
        }

        for participant in self.registry.rename_participants() {
            isolate("rename", participant.name(), || {
                participant.do_rename(&request, &mut edits)
            });
        }

        let mut workspace_edit = WorkspaceEdit::new();
        if !edits.is_empty() {
            workspace_edit.extend(document.uri(), edits);
        }
        Ok(workspace_edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParticipantResult;
    use crate::participants::RenameParticipant;
    use crate::types::Range;
    use xmlls_dom::parse;

    /// Also renames the `ref` attribute values pointing at the tag.
    struct RefValues;

    impl RenameParticipant for RefValues {
        fn do_rename(&self, request: &RenameRequest<'_>, edits: &mut Vec<TextEdit>) -> ParticipantResult {
            let document = request.document();
            let Some(tag) = request.current_tag() else {
                return Ok(());
            };
            for attr in document
                .descendants()
                .flat_map(|n| n.attributes())
                .filter(|a| a.name() == "ref" && a.value() == Some(tag))
            {
                if let Some(span) = attr.value_span() {
                    let inner = xmlls_dom::Span::new(span.start + 1, span.end - 1);
                    edits.push(TextEdit::new(document.range_of(inner)?, request.new_text()));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_rename_tag_pair() {
        let registry = ExtensionRegistry::new();
        registry.register_rename_participant(Arc::new(RefValues));
        let doc = parse("<a><b></b><c ref=\"b\"/></a>", "file:///rename.xml");
        let edit = XmlRename::new(Arc::new(registry))
            .do_rename(&doc, Position::new(0, 8), "item")
            .unwrap();

        let at = |start, end| Range::new(Position::new(0, start), Position::new(0, end));
        let ranges: Vec<Range> = edit.changes["file:///rename.xml"]
            .iter()
            .map(|e| e.range)
            .collect();
        assert_eq!(ranges, vec![at(4, 5), at(8, 9), at(18, 19)]);
        assert!(edit.changes["file:///rename.xml"].iter().all(|e| e.new_text == "item"));
    }

    #[test]
    fn test_nothing_to_rename() {
        let doc = parse("<a>text</a>", "file:///rename.xml");
        let edit = XmlRename::new(Arc::new(ExtensionRegistry::new()))
            .do_rename(&doc, Position::new(0, 5), "x")
            .unwrap();
        assert!(edit.is_empty());
    }
}
