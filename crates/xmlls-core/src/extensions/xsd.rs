//! XML Schema editing support.
//!
//! In `.xsd` documents, the values of `type`, `base` and `itemType`
//! attributes complete to the named types declared in the schema and to
//! the built-in datatypes, hover shows their documentation, and go to
//! definition jumps to the `name` of the declaring `complexType` or
//! `simpleType`.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use xmlls_dom::{AttrRef, Document, ElementRef, XML_SCHEMA_NS};

use crate::cancel::CancelChecker;
use crate::error::ParticipantResult;
use crate::extension::{InitializeParams, XmlExtension};
use crate::participants::{CompletionParticipant, DefinitionParticipant, HoverParticipant};
use crate::registry::ExtensionRegistry;
use crate::request::{CompletionRequest, CompletionResponse, DefinitionRequest, HoverRequest};
use crate::types::{CompletionItem, CompletionItemKind, LocationLink, MarkupContent};

/// A built-in datatype of XML Schema 1.1.
#[derive(Debug, Clone, Deserialize)]
pub struct DataType {
    pub name: String,
    pub url: String,
}

impl DataType {
    pub fn documentation(&self) -> String {
        format!(
            "**{}**\nSee [documentation]({}) for more information.",
            self.name, self.url
        )
    }
}

static DATA_TYPES: Lazy<Vec<DataType>> = Lazy::new(|| {
    serde_json::from_str(include_str!("datatypes.json")).expect("embedded datatypes are valid JSON")
});

pub fn data_types() -> &'static [DataType] {
    &DATA_TYPES
}

pub fn data_type(name: &str) -> Option<&'static DataType> {
    DATA_TYPES.iter().find(|t| t.name == name)
}

/// Kinds of named types an attribute value may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Complex,
    Simple,
    Both,
}

impl Binding {
    fn accepts(self, type_kind: &str) -> bool {
        match self {
            Self::Complex => type_kind == "complexType",
            Self::Simple => type_kind == "simpleType",
            Self::Both => true,
        }
    }

    fn is_simple(self) -> bool {
        self != Self::Complex
    }
}

fn is_schema_element(element: ElementRef<'_>, local_name: &str) -> bool {
    element.local_name() == Some(local_name) && element.namespace_uri() == Some(XML_SCHEMA_NS)
}

fn binding(attr: AttrRef<'_>) -> Option<Binding> {
    let element = attr.owner_element()?;
    if element.namespace_uri() != Some(XML_SCHEMA_NS) {
        return None;
    }
    match (attr.name(), element.local_name()?) {
        ("type", "element") => Some(Binding::Both),
        ("type", "attribute") | ("itemType", "list") => Some(Binding::Simple),
        ("base", "restriction" | "extension") => {
            match element.parent_element().and_then(|p| p.local_name()) {
                Some("complexContent") => Some(Binding::Complex),
                Some("simpleType") => Some(Binding::Simple),
                _ => Some(Binding::Both),
            }
        }
        _ => None,
    }
}

/// `complexType`/`simpleType` elements with a `name`.
fn named_types(document: &Document) -> impl Iterator<Item = (ElementRef<'_>, AttrRef<'_>)> {
    document.elements().filter_map(|element| {
        let kind = element.local_name()?;
        if !matches!(kind, "complexType" | "simpleType") || !is_schema_element(element, kind) {
            return None;
        }
        Some((element, element.attribute_node("name")?))
    })
}

/// Prefix bound to the schema's `targetNamespace`.
fn target_namespace_prefix(document: &Document) -> Option<&str> {
    let root = document.document_element()?;
    let namespace = root.attribute("targetNamespace")?;
    root.lookup_prefix(namespace)
}

fn type_documentation(element: ElementRef<'_>, name: &str) -> String {
    let kind = if element.local_name() == Some("complexType") {
        "Complex Type"
    } else {
        "Simple Type"
    };
    format!("**{name}**\n - Type: `{kind}`")
}

fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{name}"),
        None => name.to_string(),
    }
}

/// The attribute of the completion request, when it binds to types.
fn bound_attribute<'a>(request: &CompletionRequest<'a>) -> Option<(AttrRef<'a>, Binding)> {
    let element = request.node().as_element()?;
    let attr = element.attribute_node(request.current_attribute_name()?)?;
    Some((attr, binding(attr)?))
}

#[derive(Default)]
pub struct XsdExtension {
    participant: Arc<XsdParticipant>,
}

impl XsdExtension {
    pub fn new() -> Self {
        Self::default()
    }
}

impl XmlExtension for XsdExtension {
    fn name(&self) -> &'static str {
        "xsd"
    }

    fn start(&self, _params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        registry.register_completion_participant(self.participant.clone());
        registry.register_hover_participant(self.participant.clone());
        registry.register_definition_participant(self.participant.clone());
        Ok(())
    }

    fn stop(&self, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        let completion: Arc<dyn CompletionParticipant> = self.participant.clone();
        registry.unregister_completion_participant(&completion);
        let hover: Arc<dyn HoverParticipant> = self.participant.clone();
        registry.unregister_hover_participant(&hover);
        let definition: Arc<dyn DefinitionParticipant> = self.participant.clone();
        registry.unregister_definition_participant(&definition);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct XsdParticipant;

impl CompletionParticipant for XsdParticipant {
    fn name(&self) -> &'static str {
        "xsd"
    }

    fn on_attribute_value(
        &self,
        _value_prefix: &str,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) -> ParticipantResult {
        let document = request.document();
        if !document.is_xsd() {
            return Ok(());
        }
        let Some((_, binding)) = bound_attribute(request) else {
            return Ok(());
        };
        let range = request.replace_range();
        let mut push = |value: String, documentation: String| {
            let insert = request.insert_attr_value(&value);
            response.add_completion_item(
                CompletionItem::new(value, CompletionItemKind::Value)
                    .with_filter_text(insert.clone())
                    .with_edit(range, insert)
                    .with_documentation(MarkupContent::markdown(documentation)),
            );
        };

        let target_prefix = target_namespace_prefix(document);
        for (element, name) in named_types(document) {
            let (Some(kind), Some(name)) = (element.local_name(), name.value()) else {
                continue;
            };
            if binding.accepts(kind) {
                push(qualified(target_prefix, name), type_documentation(element, name));
            }
        }
        if binding.is_simple() {
            let prefix = document.schema_prefix();
            for data_type in data_types() {
                push(qualified(prefix, &data_type.name), data_type.documentation());
            }
        }
        Ok(())
    }
}

/// Local part of a `prefix:name` value.
fn local_part(value: &str) -> (Option<&str>, &str) {
    match value.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, value),
    }
}

impl HoverParticipant for XsdParticipant {
    fn name(&self) -> &'static str {
        "xsd"
    }

    fn on_attribute_value(&self, request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        let document = request.document();
        if !document.is_xsd() {
            return Ok(None);
        }
        let Some(attr) = request.attribute().filter(|a| binding(*a).is_some()) else {
            return Ok(None);
        };
        let Some(value) = attr.value() else {
            return Ok(None);
        };
        let (prefix, local) = local_part(value);
        if prefix == document.schema_prefix()
            && let Some(data_type) = data_type(local)
        {
            return Ok(Some(data_type.documentation()));
        }
        Ok(named_types(document)
            .find(|(_, name)| name.value() == Some(local))
            .map(|(element, _)| type_documentation(element, local)))
    }
}

impl DefinitionParticipant for XsdParticipant {
    fn name(&self) -> &'static str {
        "xsd"
    }

    fn applies_to(&self, document: &Document) -> bool {
        document.is_xsd()
    }

    fn find_definition(
        &self,
        request: &DefinitionRequest<'_>,
        locations: &mut Vec<LocationLink>,
        _cancel: &dyn CancelChecker,
    ) -> ParticipantResult {
        let document = request.document();
        let Some(attr) = request.attribute() else {
            return Ok(());
        };
        let (Some(binding), Some(value), Some(origin)) = (binding(attr), attr.value(), attr.value_span())
        else {
            return Ok(());
        };
        let (_, local) = local_part(value);
        for (element, name) in named_types(document) {
            let (Some(kind), Some(target)) = (element.local_name(), name.value_span()) else {
                continue;
            };
            if name.value() == Some(local) && binding.accepts(kind) {
                locations.push(LocationLink::new(
                    document.range_of(origin)?,
                    document.uri(),
                    document.range_of(target)?,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::services::{XmlCompletion, XmlDefinition, XmlHover};
    use crate::settings::SharedSettings;
    use crate::types::{CompletionList, Position};
    use xmlls_dom::parse;

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:t" targetNamespace="urn:t">
  <xs:complexType name="Card"/>
  <xs:simpleType name="Color"/>
  <xs:element name="a" type=""/>
  <xs:attribute name="b" type=""/>
  <xs:complexType name="Big"><xs:complexContent><xs:extension base=""/></xs:complexContent></xs:complexType>
  <xs:element name="c" type="tns:Card"/>
  <xs:attribute name="d" type="xs:string"/>
</xs:schema>"#;

    fn registry() -> Arc<ExtensionRegistry> {
        Arc::new(
            ExtensionRegistry::builder()
                .extension(Arc::new(XsdExtension::new()))
                .build(),
        )
    }

    /// Position just inside the `n`th empty `""` value.
    fn in_empty_value(n: usize) -> Position {
        let offset = SCHEMA.match_indices("\"\"").nth(n).map(|(i, _)| i).unwrap() + 1;
        parse(SCHEMA, "file:///s.xsd").position_at(offset).unwrap()
    }

    fn complete(position: Position) -> CompletionList {
        let doc = parse(SCHEMA, "file:///s.xsd");
        XmlCompletion::new(registry())
            .do_complete(&doc, position, &SharedSettings::default(), &NeverCancel)
            .unwrap()
    }

    #[test]
    fn test_data_types_table() {
        assert_eq!(data_type("string").map(|t| t.name.as_str()), Some("string"));
        assert!(data_types().len() > 40);
        assert!(data_type("dateTimeStamp").unwrap().url.ends_with("#dateTimeStamp"));
    }

    #[test]
    fn test_element_type_completion() {
        let list = complete(in_empty_value(0));
        let labels: Vec<&str> = list.labels().collect();
        assert_eq!(&labels[..3], &["tns:Card", "tns:Color", "tns:Big"]);
        assert!(labels.contains(&"xs:string"));
        let card = &list.items[0];
        assert_eq!(card.insert_text(), "tns:Card");
    }

    #[test]
    fn test_attribute_type_is_simple_only() {
        let labels: Vec<String> = complete(in_empty_value(1)).labels().map(str::to_string).collect();
        assert_eq!(labels[0], "tns:Color");
        assert!(!labels.iter().any(|l| l == "tns:Card"));
        assert!(labels.iter().any(|l| l == "xs:decimal"));
    }

    #[test]
    fn test_complex_content_base() {
        let labels: Vec<String> = complete(in_empty_value(2)).labels().map(str::to_string).collect();
        assert_eq!(labels, vec!["tns:Card", "tns:Big"]);
    }

    #[test]
    fn test_hover_and_definition() {
        let doc = parse(SCHEMA, "file:///s.xsd");
        let offset = SCHEMA.find("xs:string\"/>").unwrap() + 4;
        let hover = XmlHover::new(registry())
            .do_hover(&doc, doc.position_at(offset).unwrap(), &SharedSettings::default(), &NeverCancel)
            .unwrap()
            .unwrap();
        assert!(hover.contents.value.starts_with("**string**\nSee [documentation]"));

        let offset = SCHEMA.find("tns:Card\"/>").unwrap() + 5;
        let links = XmlDefinition::new(registry())
            .find_definition(&doc, doc.position_at(offset).unwrap(), &NeverCancel)
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_range.start.line, 1);
    }

    #[test]
    fn test_other_documents_are_ignored() {
        let doc = parse(SCHEMA, "file:///s.xml");
        let list = XmlCompletion::new(registry())
            .do_complete(&doc, in_empty_value(0), &SharedSettings::default(), &NeverCancel)
            .unwrap();
        assert!(!list.labels().any(|l| l == "tns:Card"));
    }
}
