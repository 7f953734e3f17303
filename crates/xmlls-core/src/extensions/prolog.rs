//! Completion inside the `<?xml ... ?>` declaration.
//!
//! The pseudo attributes must appear in the order `version`, `encoding`,
//! `standalone`: without `version` only `version` is offered, and nothing
//! is offered once `standalone` precedes the cursor.

use std::sync::Arc;

use xmlls_dom::NodeRef;

use crate::error::ParticipantResult;
use crate::extension::{InitializeParams, XmlExtension};
use crate::participants::CompletionParticipant;
use crate::registry::ExtensionRegistry;
use crate::request::{CompletionRequest, CompletionResponse};
use crate::types::{CompletionItem, CompletionItemKind};

pub const VERSION: &str = "version";
pub const ENCODING: &str = "encoding";
pub const STANDALONE: &str = "standalone";

pub const VERSIONS: &[&str] = &["1.0", "1.1"];

pub const ENCODINGS: &[&str] = &[
    "UTF-8",
    "UTF-16",
    "ISO-8859-1",
    "Shift_JIS",
    "EUC-JP",
    "EUC-KR",
    "Windows-1251",
    "Windows-1252",
];

pub const STANDALONE_VALUES: &[&str] = &["yes", "no"];

/// Values a pseudo attribute accepts, the first one being the default.
fn values_of(name: &str) -> &'static [&'static str] {
    match name {
        VERSION => VERSIONS,
        ENCODING => ENCODINGS,
        STANDALONE => STANDALONE_VALUES,
        _ => &[],
    }
}

#[derive(Default)]
pub struct PrologExtension {
    completion: Arc<PrologCompletion>,
}

impl PrologExtension {
    pub fn new() -> Self {
        Self::default()
    }
}

impl XmlExtension for PrologExtension {
    fn name(&self) -> &'static str {
        "prolog"
    }

    fn start(&self, _params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        registry.register_completion_participant(self.completion.clone());
        Ok(())
    }

    fn stop(&self, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        let participant: Arc<dyn CompletionParticipant> = self.completion.clone();
        registry.unregister_completion_participant(&participant);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PrologCompletion;

/// The `<?xml` declaration the cursor is in.
fn prolog_at<'a>(request: &CompletionRequest<'a>) -> Option<NodeRef<'a>> {
    let node = request.node();
    node.is_prolog().then_some(node)
}

impl CompletionParticipant for PrologCompletion {
    fn name(&self) -> &'static str {
        "prolog"
    }

    fn on_attribute_name(
        &self,
        generate_value: bool,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) -> ParticipantResult {
        let Some(prolog) = prolog_at(request) else {
            return Ok(());
        };
        let offset = request.offset();
        let standalone_before = prolog
            .attributes()
            .any(|a| a.name() == STANDALONE && a.end() <= offset);
        if standalone_before {
            return Ok(());
        }

        let names: &[&str] = if response.has_attribute(VERSION) {
            &[ENCODING, STANDALONE]
        } else {
            &[VERSION]
        };
        let range = request.replace_range();
        for name in names {
            let insert = if generate_value {
                format!("{name}=\"{}\"", values_of(name)[0])
            } else {
                (*name).to_string()
            };
            response.add_completion_attribute(
                CompletionItem::new(*name, CompletionItemKind::Value)
                    .with_filter_text(*name)
                    .with_edit(range, insert),
            );
        }
        Ok(())
    }

    fn on_attribute_value(
        &self,
        _value_prefix: &str,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) -> ParticipantResult {
        let Some(prolog) = prolog_at(request) else {
            return Ok(());
        };
        let Some(name) = request.current_attribute_name() else {
            return Ok(());
        };
        // A value already given to a duplicate of this attribute is not offered again.
        let offset = request.offset();
        let used: Vec<&str> = prolog
            .attributes()
            .filter(|a| a.name() == name && !a.value_contains_offset(offset))
            .filter_map(|a| a.value())
            .collect();

        let range = request.replace_range();
        for value in values_of(name).iter().filter(|v| !used.contains(v)) {
            let insert = request.insert_attr_value(value);
            response.add_completion_item(
                CompletionItem::new(*value, CompletionItemKind::Value)
                    .with_filter_text(insert.clone())
                    .with_edit(range, insert),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::services::XmlCompletion;
    use crate::settings::SharedSettings;
    use crate::types::{CompletionList, Position};
    use xmlls_dom::parse;

    fn complete(text: &str, character: u32) -> CompletionList {
        let registry = Arc::new(
            ExtensionRegistry::builder()
                .extension(Arc::new(PrologExtension::new()))
                .build(),
        );
        let doc = parse(text, "file:///prolog.xml");
        XmlCompletion::new(registry)
            .do_complete(&doc, Position::new(0, character), &SharedSettings::default(), &NeverCancel)
            .unwrap()
    }

    fn inserts(list: &CompletionList) -> Vec<&str> {
        list.items.iter().map(|i| i.insert_text()).collect()
    }

    #[test]
    fn test_version_first() {
        let list = complete("<?xml ?>\n<root/>", 6);
        assert_eq!(inserts(&list), vec!["version=\"1.0\""]);

        let list = complete("<?xml v?>\n<root/>", 7);
        assert_eq!(inserts(&list), vec!["version=\"1.0\""]);
    }

    #[test]
    fn test_encoding_and_standalone_after_version() {
        let list = complete("<?xml version=\"1.0\" ?>\n<root/>", 20);
        assert_eq!(
            inserts(&list),
            vec!["encoding=\"UTF-8\"", "standalone=\"yes\""]
        );

        let list = complete("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<root/>", 37);
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["standalone"]);
    }

    #[test]
    fn test_nothing_after_standalone() {
        let list = complete("<?xml version=\"1.0\" standalone=\"yes\" ?>\n<root/>", 37);
        assert!(list.items.is_empty());

        let list = complete("<?xml version=\"1.0\"  standalone=\"yes\" ?>\n<root/>", 20);
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["encoding"]);
    }

    #[test]
    fn test_values() {
        let list = complete("<?xml version= ?>\n<root/>", 14);
        assert_eq!(inserts(&list), vec!["\"1.0\"", "\"1.1\""]);

        let list = complete("<?xml standalone= ?>\n<root/>", 17);
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["yes", "no"]);

        let list = complete("<?xml version=\"1.0\" version= ?>\n<root/>", 28);
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["1.1"]);
    }

    #[test]
    fn test_quoted_value_replaces_the_content() {
        let list = complete("<?xml encoding=\"UTF-8\" encoding=\"Win\" ?>\n<root/>", 36);
        let windows = list
            .items
            .iter()
            .find(|i| i.label == "Windows-1252")
            .unwrap();
        let edit = windows.text_edit.as_ref().unwrap();
        assert_eq!(edit.new_text, "Windows-1252");
        assert_eq!(edit.range.start.character, 33);
        assert_eq!(edit.range.end.character, 36);
        assert!(!list.labels().any(|l| l == "UTF-8"));
    }
}
