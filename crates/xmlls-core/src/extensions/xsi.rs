//! Completion and hover for the XML Schema instance attributes.
//!
//! Once an element is in scope of a prefix bound to [`XSI_NS`], its start
//! tag is offered `type` and `nil` under that prefix, and the document
//! element is also offered `schemaLocation` and `noNamespaceSchemaLocation`.
//! A document element without the binding is offered `xmlns:xsi`.

use std::sync::Arc;

use xmlls_dom::{AttrRef, ElementRef};

use crate::contentmodel::generate_attribute_value;
use crate::error::ParticipantResult;
use crate::extension::{InitializeParams, XmlExtension};
use crate::participants::{CompletionParticipant, HoverParticipant};
use crate::registry::ExtensionRegistry;
use crate::request::{CompletionRequest, CompletionResponse, HoverRequest};
use crate::types::{CompletionItem, CompletionItemKind, MarkupContent};

pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

const XMLNS_XSI: &str = "xmlns:xsi";

struct XsiAttribute {
    local_name: &'static str,
    documentation: &'static str,
    values: &'static [&'static str],
    document_element_only: bool,
}

const ATTRIBUTES: &[XsiAttribute] = &[
    XsiAttribute {
        local_name: "type",
        documentation: "Names the type of this element. It must be derived from \
                        the type its declaration gives it.",
        values: &[],
        document_element_only: false,
    },
    XsiAttribute {
        local_name: "nil",
        documentation: "When `true`, this element has no content even though its \
                        declaration is nillable.",
        values: &["true", "false"],
        document_element_only: false,
    },
    XsiAttribute {
        local_name: "schemaLocation",
        documentation: "Pairs of a namespace URI and the location of a schema for \
                        that namespace, separated by whitespace.",
        values: &[],
        document_element_only: true,
    },
    XsiAttribute {
        local_name: "noNamespaceSchemaLocation",
        documentation: "Location of a schema for elements that are in no namespace.",
        values: &[],
        document_element_only: true,
    },
];

fn find(local_name: &str) -> Option<&'static XsiAttribute> {
    ATTRIBUTES.iter().find(|a| a.local_name == local_name)
}

/// The instance attribute `name` refers to on `element`, if its prefix is
/// bound to [`XSI_NS`] there.
fn xsi_attribute(element: ElementRef<'_>, name: &str) -> Option<&'static XsiAttribute> {
    let (prefix, local_name) = name.split_once(':')?;
    if element.namespace_uri_for(Some(prefix)) != Some(XSI_NS) {
        return None;
    }
    find(local_name)
}

fn attr_xsi_attribute(attr: AttrRef<'_>) -> Option<&'static XsiAttribute> {
    xsi_attribute(attr.owner_element()?, attr.name())
}

fn is_document_element(element: ElementRef<'_>) -> bool {
    element.parent_element().is_none()
}

#[derive(Default)]
pub struct XsiExtension {
    participant: Arc<XsiParticipant>,
}

impl XsiExtension {
    pub fn new() -> Self {
        Self::default()
    }
}

impl XmlExtension for XsiExtension {
    fn name(&self) -> &'static str {
        "xsi"
    }

    fn start(&self, _params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        registry.register_completion_participant(self.participant.clone());
        registry.register_hover_participant(self.participant.clone());
        Ok(())
    }

    fn stop(&self, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        let completion: Arc<dyn CompletionParticipant> = self.participant.clone();
        registry.unregister_completion_participant(&completion);
        let hover: Arc<dyn HoverParticipant> = self.participant.clone();
        registry.unregister_hover_participant(&hover);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct XsiParticipant;

impl CompletionParticipant for XsiParticipant {
    fn name(&self) -> &'static str {
        "xsi"
    }

    fn on_attribute_name(
        &self,
        generate_value: bool,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) -> ParticipantResult {
        let Some(element) = request.node().as_element() else {
            return Ok(());
        };
        let range = request.replace_range();
        let document_element = is_document_element(element);

        let Some(prefix) = element.lookup_prefix(XSI_NS) else {
            if document_element {
                let insert = if generate_value {
                    format!("{XMLNS_XSI}=\"{XSI_NS}\"")
                } else {
                    XMLNS_XSI.to_string()
                };
                response.add_completion_attribute(
                    CompletionItem::new(XMLNS_XSI, CompletionItemKind::Value)
                        .with_filter_text(XMLNS_XSI)
                        .with_edit(range, insert),
                );
            }
            return Ok(());
        };

        let settings = request.settings();
        for attribute in ATTRIBUTES {
            if attribute.document_element_only && !document_element {
                continue;
            }
            let name = format!("{prefix}:{}", attribute.local_name);
            let mut item = CompletionItem::new(name.clone(), CompletionItemKind::Value)
                .with_filter_text(name.clone())
                .with_documentation(MarkupContent::new(
                    settings.markup_kind,
                    attribute.documentation,
                ));
            item = if generate_value {
                let values: Vec<String> = attribute.values.iter().map(|v| v.to_string()).collect();
                let value = generate_attribute_value(None, &values, true);
                item.with_edit(range, format!("{name}{value}")).snippet()
            } else {
                item.with_edit(range, name)
            };
            response.add_completion_attribute(item);
        }
        Ok(())
    }

    fn on_attribute_value(
        &self,
        _value_prefix: &str,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) -> ParticipantResult {
        let (Some(element), Some(name)) = (request.parent_element(), request.current_attribute_name())
        else {
            return Ok(());
        };
        let Some(attribute) = xsi_attribute(element, name) else {
            return Ok(());
        };
        let range = request.replace_range();
        for value in attribute.values {
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

impl HoverParticipant for XsiParticipant {
    fn name(&self) -> &'static str {
        "xsi"
    }

    fn on_attribute_name(&self, request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        if !request.settings().hover.documentation {
            return Ok(None);
        }
        Ok(request
            .attribute()
            .and_then(attr_xsi_attribute)
            .map(|attribute| attribute.documentation.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::services::{XmlCompletion, XmlHover};
    use crate::settings::SharedSettings;
    use crate::types::{CompletionList, Position};
    use xmlls_dom::parse;

    const BOUND: &str = "<root xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" >\n  <item />\n</root>";

    fn registry() -> Arc<ExtensionRegistry> {
        Arc::new(
            ExtensionRegistry::builder()
                .extension(Arc::new(XsiExtension::new()))
                .build(),
        )
    }

    fn complete(text: &str, line: u32, character: u32) -> CompletionList {
        let doc = parse(text, "file:///xsi.xml");
        XmlCompletion::new(registry())
            .do_complete(
                &doc,
                Position::new(line, character),
                &SharedSettings::default(),
                &NeverCancel,
            )
            .unwrap()
    }

    #[test]
    fn test_document_element_gets_every_attribute() {
        let list = complete(BOUND, 0, 60);
        assert_eq!(
            list.labels().collect::<Vec<_>>(),
            vec![
                "xsi:type",
                "xsi:nil",
                "xsi:schemaLocation",
                "xsi:noNamespaceSchemaLocation"
            ]
        );
        let nil = list.items.iter().find(|i| i.label == "xsi:nil").unwrap();
        assert_eq!(nil.insert_text(), "xsi:nil=\"${1|true,false|}\"$0");
    }

    #[test]
    fn test_nested_element_gets_type_and_nil() {
        let list = complete(BOUND, 1, 8);
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["xsi:type", "xsi:nil"]);
    }

    #[test]
    fn test_unbound_document_element_gets_the_binding() {
        let list = complete("<root />", 0, 6);
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["xmlns:xsi"]);
        assert_eq!(
            list.items[0].insert_text(),
            "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\""
        );

        let list = complete("<root>\n  <item />\n</root>", 1, 8);
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_other_prefix_and_existing_attributes() {
        let text = "<r xmlns:i=\"http://www.w3.org/2001/XMLSchema-instance\" i:nil=\"true\" />";
        let list = complete(text, 0, 68);
        assert!(list.labels().all(|l| l.starts_with("i:")));
        assert!(!list.labels().any(|l| l == "i:nil"));
    }

    #[test]
    fn test_nil_values() {
        let text = "<r xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:nil=\"\" />";
        let list = complete(text, 0, 66);
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["true", "false"]);
    }

    #[test]
    fn test_hover_on_instance_attribute() {
        let text = "<r xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
                    xsi:noNamespaceSchemaLocation=\"r.xsd\" other:nil=\"x\" />";
        let doc = parse(text, "file:///xsi.xml");
        let hover = |character| {
            XmlHover::new(registry())
                .do_hover(
                    &doc,
                    Position::new(0, character),
                    &SharedSettings::default(),
                    &NeverCancel,
                )
                .unwrap()
        };

        let contents = hover(60).unwrap().contents;
        assert!(contents.value.starts_with("Location of a schema"));
        assert_eq!(hover(96), None);
    }
}
