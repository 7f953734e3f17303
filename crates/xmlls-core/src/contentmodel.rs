//! Content models: grammar-derived element and attribute declarations.
//!
//! The core never computes a grammar itself. A [`ContentModelProvider`]
//! turns a document (or a file association) into a [`CmDocument`], and
//! features ask the [`ContentModelManager`] component for the declaration
//! that applies to an element.

use std::sync::{Arc, PoisonError, RwLock};

use xmlls_dom::{Document, ElementRef, NodeRef};

use crate::error::{ParticipantError, ParticipantResult};
use crate::registry::{DocumentProvider, call_participant, log_failure};
use crate::settings::FileAssociation;
use crate::types::LocationLink;

/// A loaded grammar.
pub trait CmDocument: Send + Sync {
    /// URI of the grammar file.
    fn uri(&self) -> &str;

    fn has_namespace(&self, namespace: &str) -> bool;

    /// Global element declarations.
    fn elements(&self) -> Vec<Arc<dyn CmElementDeclaration>>;

    /// Declaration of `element`, found by walking from the outermost
    /// ancestor in `namespace` down to `element`.
    fn find_cm_element(
        &self,
        element: ElementRef<'_>,
        namespace: Option<&str>,
    ) -> Option<Arc<dyn CmElementDeclaration>> {
        let mut path = vec![element];
        let mut current = element;
        while let Some(parent) = current.parent_element() {
            if namespace.is_some() && parent.namespace_uri() != namespace {
                break;
            }
            path.push(parent);
            current = parent;
        }

        let mut declaration: Option<Arc<dyn CmElementDeclaration>> = None;
        for element in path.iter().rev() {
            let local_name = element.local_name()?;
            declaration = match &declaration {
                None => self
                    .elements()
                    .into_iter()
                    .find(|e| e.local_name() == local_name),
                Some(parent) => parent.find_cm_element(local_name, namespace),
            };
            if declaration.is_none() {
                // A nested element may still be declared globally.
                return self
                    .elements()
                    .into_iter()
                    .find(|e| Some(e.local_name()) == path.first().and_then(|e| e.local_name()));
            }
        }
        declaration
    }

    /// Location of the type definition of `node`, when the grammar knows it.
    fn find_type_location(&self, _node: NodeRef<'_>) -> Option<LocationLink> {
        None
    }
}

/// An element declaration.
pub trait CmElementDeclaration: Send + Sync {
    fn name(&self) -> &str;

    fn local_name(&self) -> &str {
        let name = self.name();
        name.split_once(':').map_or(name, |(_, local)| local)
    }

    fn attributes(&self) -> Vec<Arc<dyn CmAttributeDeclaration>>;

    /// Allowed child elements.
    fn elements(&self) -> Vec<Arc<dyn CmElementDeclaration>>;

    fn find_cm_attribute(&self, name: &str) -> Option<Arc<dyn CmAttributeDeclaration>> {
        self.attributes().into_iter().find(|a| a.name() == name)
    }

    fn find_cm_element(
        &self,
        tag: &str,
        _namespace: Option<&str>,
    ) -> Option<Arc<dyn CmElementDeclaration>> {
        self.elements()
            .into_iter()
            .find(|e| e.name() == tag || e.local_name() == tag)
    }

    /// Declared `EMPTY`: no content allowed.
    fn is_empty(&self) -> bool;

    fn documentation(&self) -> Option<String>;

    /// URI of the grammar declaring this element.
    fn document_uri(&self) -> Option<&str>;

    /// Values allowed as text content.
    fn enumeration_values(&self) -> Vec<String> {
        Vec::new()
    }
}

/// An attribute declaration.
pub trait CmAttributeDeclaration: Send + Sync {
    fn name(&self) -> &str;

    fn default_value(&self) -> Option<&str>;

    fn enumeration_values(&self) -> Vec<String>;

    fn is_required(&self) -> bool;

    fn documentation(&self) -> Option<String>;

    /// Documentation of one enumerated value.
    fn value_documentation(&self, _value: &str) -> Option<String> {
        None
    }
}

/// Builds [`CmDocument`]s, e.g. from a DTD or an XML Schema.
pub trait ContentModelProvider: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether the document references a grammar this provider understands.
    fn adapts(&self, document: &Document) -> bool;

    /// The grammar referenced by `document`.
    ///
    /// Returns [`ParticipantError::ResourceDownloading`] while a referenced
    /// grammar is not available yet.
    fn model_for(
        &self,
        document: &Document,
        documents: Option<&dyn DocumentProvider>,
    ) -> ParticipantResult<Option<Arc<dyn CmDocument>>>;

    /// The grammar at `system_id`, used for file associations.
    fn model_for_system_id(
        &self,
        _system_id: &str,
        _documents: Option<&dyn DocumentProvider>,
    ) -> ParticipantResult<Option<Arc<dyn CmDocument>>> {
        Ok(None)
    }
}

/// Registry component holding the content model providers.
#[derive(Default)]
pub struct ContentModelManager {
    providers: RwLock<Vec<Arc<dyn ContentModelProvider>>>,
    file_associations: RwLock<Vec<FileAssociation>>,
}

impl std::fmt::Debug for ContentModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers: Vec<&str> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|p| p.name())
            .collect();
        f.debug_struct("ContentModelManager")
            .field("providers", &providers)
            .field("file_associations", &self.file_associations())
            .finish()
    }
}

impl ContentModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_model_provider(&self, provider: Arc<dyn ContentModelProvider>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !providers.iter().any(|p| std::ptr::addr_eq(Arc::as_ptr(p), Arc::as_ptr(&provider))) {
            providers.push(provider);
        }
    }

    pub fn unregister_model_provider(&self, provider: &Arc<dyn ContentModelProvider>) {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| !std::ptr::addr_eq(Arc::as_ptr(p), Arc::as_ptr(provider)));
    }

    fn providers(&self) -> Vec<Arc<dyn ContentModelProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_file_associations(&self, associations: Vec<FileAssociation>) {
        *self
            .file_associations
            .write()
            .unwrap_or_else(PoisonError::into_inner) = associations;
    }

    pub fn file_associations(&self) -> Vec<FileAssociation> {
        self.file_associations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Grammars that apply to `document`.
    ///
    /// A provider that fails is logged and skipped. A pending grammar is
    /// reported as [`ParticipantError::ResourceDownloading`] only when no
    /// other grammar could be loaded.
    pub fn cm_documents(
        &self,
        document: &Document,
        documents: Option<&dyn DocumentProvider>,
    ) -> ParticipantResult<Vec<Arc<dyn CmDocument>>> {
        let mut models: Vec<Arc<dyn CmDocument>> = Vec::new();
        let mut pending: Option<ParticipantError> = None;
        let mut collect = |name: &'static str, result: ParticipantResult<Option<Arc<dyn CmDocument>>>| {
            match result {
                Ok(Some(model)) => {
                    if !models.iter().any(|m| m.uri() == model.uri()) {
                        models.push(model);
                    }
                }
                Ok(None) => {}
                Err(err) if err.is_resource_downloading() => {
                    pending.get_or_insert(err);
                }
                Err(err) => log_failure("model_for", name, &err),
            }
        };

        let providers = self.providers();
        for provider in &providers {
            if provider.adapts(document) {
                collect(
                    provider.name(),
                    call_participant("model_for", provider.name(), || {
                        provider.model_for(document, documents)
                    }),
                );
            }
        }
        for association in self.file_associations() {
            if !association.matches(document.uri()) {
                continue;
            }
            for provider in &providers {
                collect(
                    provider.name(),
                    call_participant("model_for_system_id", provider.name(), || {
                        provider.model_for_system_id(&association.system_id, documents)
                    }),
                );
            }
        }

        match pending {
            Some(err) if models.is_empty() => Err(err),
            _ => Ok(models),
        }
    }

    /// Declaration of `element` in the first grammar that declares it.
    pub fn find_cm_element(
        &self,
        element: ElementRef<'_>,
        documents: Option<&dyn DocumentProvider>,
    ) -> ParticipantResult<Option<Arc<dyn CmElementDeclaration>>> {
        let namespace = element.namespace_uri();
        let models = self.cm_documents(element.owner_document(), documents)?;
        Ok(models
            .iter()
            .find_map(|model| model.find_cm_element(element, namespace)))
    }

    /// Whether `document` references a grammar: a DOCTYPE, an
    /// `xsi:schemaLocation`/`xsi:noNamespaceSchemaLocation` hint, a file
    /// association, or a provider that adapts it.
    pub fn has_grammar(&self, document: &Document) -> bool {
        if document.has_dtd() {
            return true;
        }
        let schema_hint = document.document_element().is_some_and(|root| {
            root.attributes().any(|a| {
                let local = a.name().rsplit(':').next().unwrap_or_default();
                a.name().contains(':')
                    && matches!(local, "schemaLocation" | "noNamespaceSchemaLocation")
            })
        });
        schema_hint
            || self
                .file_associations()
                .iter()
                .any(|a| a.matches(document.uri()))
            || self.providers().iter().any(|p| p.adapts(document))
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Documentation followed by a `Source:` line naming the grammar file.
/// `None` when there is nothing to show.
pub fn generate_documentation(
    documentation: Option<&str>,
    schema_uri: Option<&str>,
    markdown: bool,
) -> Option<String> {
    let mut doc = documentation.unwrap_or_default().to_string();
    if let Some(uri) = schema_uri {
        if !doc.is_empty() {
            doc.push_str("\n\n");
        }
        let file_name = uri.rsplit(['/', '\\']).next().unwrap_or(uri);
        if markdown {
            doc.push_str(&format!("Source: [{file_name}]({uri})"));
        } else {
            doc.push_str(&format!("Source: {file_name}"));
        }
    }
    (!doc.is_empty()).then_some(doc)
}

/// Snippet for an attribute value: a choice over the enumeration, else a
/// placeholder holding the default, else a tab stop. With `with_quote` the
/// result is `="..."$0`, ready to follow an attribute name.
pub fn generate_attribute_value(
    default_value: Option<&str>,
    enumeration: &[String],
    with_quote: bool,
) -> String {
    let value = value_snippet(default_value, enumeration, 1);
    if with_quote {
        format!("=\"{value}\"$0")
    } else {
        value
    }
}

fn value_snippet(default_value: Option<&str>, enumeration: &[String], index: usize) -> String {
    if !enumeration.is_empty() {
        format!("${{{index}|{}|}}", enumeration.join(","))
    } else if let Some(default) = default_value {
        format!("${{{index}:{default}}}")
    } else {
        format!("${index}")
    }
}

/// Snippet inserting an element with its required attributes, after `<`.
pub fn generate_element(
    declaration: &dyn CmElementDeclaration,
    prefix: Option<&str>,
    auto_close: bool,
) -> String {
    let name = match prefix {
        Some(p) => format!("{p}:{}", declaration.local_name()),
        None => declaration.name().to_string(),
    };
    let mut xml = name.clone();
    let mut index = 0;
    for attribute in declaration.attributes().iter().filter(|a| a.is_required()) {
        index += 1;
        let value = value_snippet(
            attribute.default_value(),
            &attribute.enumeration_values(),
            index,
        );
        xml.push_str(&format!(" {}=\"{value}\"", attribute.name()));
    }
    if declaration.is_empty() && auto_close {
        xml.push_str(" />$0");
    } else if auto_close {
        xml.push_str(&format!(">${}</{name}>$0", index + 1));
    } else {
        xml.push_str(">$0");
    }
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmlls_dom::parse;

    struct Attr {
        name: &'static str,
        required: bool,
        values: Vec<String>,
    }

    impl CmAttributeDeclaration for Attr {
        fn name(&self) -> &str {
            self.name
        }
        fn default_value(&self) -> Option<&str> {
            None
        }
        fn enumeration_values(&self) -> Vec<String> {
            self.values.clone()
        }
        fn is_required(&self) -> bool {
            self.required
        }
        fn documentation(&self) -> Option<String> {
            None
        }
    }

    struct Elem {
        name: &'static str,
        children: Vec<Arc<dyn CmElementDeclaration>>,
        attributes: Vec<Arc<dyn CmAttributeDeclaration>>,
        empty: bool,
    }

    impl CmElementDeclaration for Elem {
        fn name(&self) -> &str {
            self.name
        }
        fn attributes(&self) -> Vec<Arc<dyn CmAttributeDeclaration>> {
            self.attributes.clone()
        }
        fn elements(&self) -> Vec<Arc<dyn CmElementDeclaration>> {
            self.children.clone()
        }
        fn is_empty(&self) -> bool {
            self.empty
        }
        fn documentation(&self) -> Option<String> {
            Some(format!("The {} element.", self.name))
        }
        fn document_uri(&self) -> Option<&str> {
            Some("file:///grammar.dtd")
        }
    }

    struct Grammar {
        elements: Vec<Arc<dyn CmElementDeclaration>>,
    }

    impl CmDocument for Grammar {
        fn uri(&self) -> &str {
            "file:///grammar.dtd"
        }
        fn has_namespace(&self, _namespace: &str) -> bool {
            false
        }
        fn elements(&self) -> Vec<Arc<dyn CmElementDeclaration>> {
            self.elements.clone()
        }
    }

    fn leaf(name: &'static str) -> Arc<dyn CmElementDeclaration> {
        Arc::new(Elem {
            name,
            children: Vec::new(),
            attributes: Vec::new(),
            empty: true,
        })
    }

    struct Fixed(Arc<dyn CmDocument>);

    impl ContentModelProvider for Fixed {
        fn adapts(&self, document: &Document) -> bool {
            document.uri().ends_with(".xml")
        }
        fn model_for(
            &self,
            _document: &Document,
            _documents: Option<&dyn DocumentProvider>,
        ) -> ParticipantResult<Option<Arc<dyn CmDocument>>> {
            Ok(Some(self.0.clone()))
        }
    }

    struct Pending;

    impl ContentModelProvider for Pending {
        fn adapts(&self, _document: &Document) -> bool {
            true
        }
        fn model_for(
            &self,
            _document: &Document,
            _documents: Option<&dyn DocumentProvider>,
        ) -> ParticipantResult<Option<Arc<dyn CmDocument>>> {
            Err(ParticipantError::unavailable("Cannot load grammar"))
        }
    }

    fn grammar() -> Arc<dyn CmDocument> {
        let item = leaf("item");
        let list: Arc<dyn CmElementDeclaration> = Arc::new(Elem {
            name: "list",
            children: vec![item.clone()],
            attributes: Vec::new(),
            empty: false,
        });
        Arc::new(Grammar {
            elements: vec![list, item],
        })
    }

    #[test]
    fn test_find_cm_element_walks_the_path() {
        let manager = ContentModelManager::new();
        manager.register_model_provider(Arc::new(Fixed(grammar())));

        let doc = parse("<list><item/><other/></list>", "file:///a.xml");
        let mut elements = doc.elements();
        let list = elements.next().unwrap();
        let item = elements.next().unwrap();
        let other = elements.next().unwrap();

        let decl = manager.find_cm_element(item, None).unwrap().unwrap();
        assert_eq!(decl.name(), "item");
        let decl = manager.find_cm_element(list, None).unwrap().unwrap();
        assert_eq!(decl.elements().len(), 1);
        assert!(manager.find_cm_element(other, None).unwrap().is_none());
    }

    #[test]
    fn test_pending_grammar_is_reported_when_nothing_else_loads() {
        let manager = ContentModelManager::new();
        manager.register_model_provider(Arc::new(Pending));
        let doc = parse("<list/>", "file:///a.xml");
        let err = manager.cm_documents(&doc, None).err().unwrap();
        assert!(err.is_resource_downloading());

        manager.register_model_provider(Arc::new(Fixed(grammar())));
        assert_eq!(manager.cm_documents(&doc, None).unwrap().len(), 1);
    }

    #[test]
    fn test_has_grammar() {
        let manager = ContentModelManager::new();
        let plain = parse("<a/>", "file:///a.txt");
        assert!(!manager.has_grammar(&plain));

        let dtd = parse("<!DOCTYPE a []><a/>", "file:///a.txt");
        assert!(manager.has_grammar(&dtd));

        let xsi = parse(
            "<a xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:noNamespaceSchemaLocation=\"a.xsd\"/>",
            "file:///a.txt",
        );
        assert!(manager.has_grammar(&xsi));

        manager.set_file_associations(vec![FileAssociation {
            pattern: "**/*.txt".to_string(),
            system_id: "file:///a.xsd".to_string(),
        }]);
        assert!(manager.has_grammar(&plain));
    }

    #[test]
    fn test_generate_documentation() {
        assert_eq!(generate_documentation(None, None, true), None);
        assert_eq!(
            generate_documentation(Some("A list."), Some("file:///schemas/list.dtd"), true).unwrap(),
            "A list.\n\nSource: [list.dtd](file:///schemas/list.dtd)"
        );
        assert_eq!(
            generate_documentation(None, Some("file:///schemas/list.dtd"), false).unwrap(),
            "Source: list.dtd"
        );
    }

    #[test]
    fn test_generate_attribute_value() {
        let values = vec!["yes".to_string(), "no".to_string()];
        assert_eq!(generate_attribute_value(None, &values, true), "=\"${1|yes,no|}\"$0");
        assert_eq!(generate_attribute_value(Some("1.0"), &[], false), "${1:1.0}");
        assert_eq!(generate_attribute_value(None, &[], true), "=\"$1\"$0");
    }

    #[test]
    fn test_generate_element() {
        let element = Elem {
            name: "list",
            children: Vec::new(),
            attributes: vec![
                Arc::new(Attr {
                    name: "id",
                    required: true,
                    values: Vec::new(),
                }),
                Arc::new(Attr {
                    name: "kind",
                    required: true,
                    values: vec!["a".to_string(), "b".to_string()],
                }),
                Arc::new(Attr {
                    name: "optional",
                    required: false,
                    values: Vec::new(),
                }),
            ],
            empty: false,
        };
        assert_eq!(
            generate_element(&element, None, true),
            "list id=\"$1\" kind=\"${2|a,b|}\">$3</list>$0"
        );
        assert_eq!(generate_element(&*leaf("br"), None, true), "br />$0");
        assert_eq!(generate_element(&*leaf("br"), None, false), "br>$0");
    }
}
