//! DTD support.
//!
//! A [`DtdContentModelProvider`] turns the internal subset of a document,
//! and the external DTD its DOCTYPE points to, into a content model. The
//! participants navigate between `<!ELEMENT` declarations and the places
//! that reference them: ATTLIST element names and the names used in
//! content models.
//!
//! # Example
//!
//! ```rust
//! use xmlls_core::{NeverCancel, Position, XmlLanguageService};
//!
//! let service = XmlLanguageService::new();
//! service.did_open("file:///dir/list.dtd", "<!ELEMENT list (item*)>\n<!ELEMENT item EMPTY>", 1);
//! let doc = service.did_open(
//!     "file:///dir/a.xml",
//!     "<!DOCTYPE list SYSTEM \"list.dtd\">\n<list>\n  <\n</list>",
//!     1,
//! );
//! let list = service.do_complete(&doc, Position::new(2, 3), &NeverCancel)?;
//! assert!(list.labels().any(|label| label == "item"));
//! # Ok::<(), xmlls_dom::BadLocation>(())
//! ```

use std::sync::Arc;

use url::Url;
use xmlls_dom::{DeclParam, Document, NodeRef, Range, Span, is_dtd_uri};

use crate::cancel::CancelChecker;
use crate::contentmodel::{
    CmAttributeDeclaration, CmDocument, CmElementDeclaration, ContentModelManager,
    ContentModelProvider,
};
use crate::error::{ParticipantError, ParticipantResult};
use crate::extension::{InitializeParams, XmlExtension};
use crate::participants::{
    CodeLensParticipant, DefinitionParticipant, DocumentLinkParticipant, HighlightingParticipant,
    ReferenceParticipant,
};
use crate::registry::{DocumentProvider, ExtensionRegistry};
use crate::request::{CodeLensRequest, DefinitionRequest, HighlightRequest, ReferenceRequest};
use crate::types::{
    CodeLens, Command, DocumentHighlight, DocumentHighlightKind, DocumentLink, Location,
    LocationLink,
};

pub const SHOW_REFERENCES_COMMAND: &str = "xml.show.references";
pub const REFERENCES_KIND: &str = "references";

pub struct DtdExtension {
    provider: Arc<DtdContentModelProvider>,
    navigation: Arc<DtdNavigation>,
    links: Arc<DtdDocumentLink>,
}

impl Default for DtdExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl DtdExtension {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(DtdContentModelProvider),
            navigation: Arc::new(DtdNavigation),
            links: Arc::new(DtdDocumentLink),
        }
    }
}

impl XmlExtension for DtdExtension {
    fn name(&self) -> &'static str {
        "dtd"
    }

    fn start(&self, _params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        match registry.component::<ContentModelManager>() {
            Some(manager) => manager.register_model_provider(self.provider.clone()),
            None => tracing::warn!("no content model manager, DTD grammars are disabled"),
        }
        registry.register_definition_participant(self.navigation.clone());
        registry.register_reference_participant(self.navigation.clone());
        registry.register_code_lens_participant(self.navigation.clone());
        registry.register_highlighting_participant(self.navigation.clone());
        registry.register_document_link_participant(self.links.clone());
        Ok(())
    }

    fn stop(&self, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        if let Some(manager) = registry.component::<ContentModelManager>() {
            let provider: Arc<dyn ContentModelProvider> = self.provider.clone();
            manager.unregister_model_provider(&provider);
        }
        let definition: Arc<dyn DefinitionParticipant> = self.navigation.clone();
        registry.unregister_definition_participant(&definition);
        let references: Arc<dyn ReferenceParticipant> = self.navigation.clone();
        registry.unregister_reference_participant(&references);
        let code_lens: Arc<dyn CodeLensParticipant> = self.navigation.clone();
        registry.unregister_code_lens_participant(&code_lens);
        let highlighting: Arc<dyn HighlightingParticipant> = self.navigation.clone();
        registry.unregister_highlighting_participant(&highlighting);
        let links: Arc<dyn DocumentLinkParticipant> = self.links.clone();
        registry.unregister_document_link_participant(&links);
        Ok(())
    }
}

/// Resolve a system id against the URI of the document referencing it.
///
/// Relative references follow RFC 3986. A Windows drive path such as
/// `C:\dtd\list.dtd` becomes a `file:` URI. `None` when neither the base
/// nor the system id yields a URI.
pub fn resolve_uri(base: &str, system_id: &str) -> Option<String> {
    let system_id = system_id.trim();
    let resolved = if is_drive_path(system_id) {
        Url::parse(&format!("file:///{}", system_id.replace('\\', "/")))
    } else {
        match Url::parse(base) {
            Ok(base) => base.join(system_id),
            Err(_) => Url::parse(system_id),
        }
    };
    match resolved {
        Ok(url) => Some(url.into()),
        Err(error) => {
            tracing::debug!(base, system_id, %error, "cannot resolve system id");
            None
        }
    }
}

fn is_drive_path(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() > 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

/// The external DTD a document points to.
fn external_dtd_uri(document: &Document) -> Option<String> {
    let doctype = document.doctype()?.as_doctype()?;
    if doctype.is_synthetic() {
        return None;
    }
    let system_id = doctype.system_id_without_quotes()?;
    if system_id.is_empty() {
        return None;
    }
    resolve_uri(document.uri(), system_id)
}

// ============================================================================
// Content model
// ============================================================================

#[derive(Debug, Clone)]
struct DtdAttribute {
    name: String,
    default_value: Option<String>,
    values: Vec<String>,
    required: bool,
    documentation: Option<String>,
}

impl CmAttributeDeclaration for DtdAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    fn enumeration_values(&self) -> Vec<String> {
        self.values.clone()
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn documentation(&self) -> Option<String> {
        self.documentation.clone()
    }
}

#[derive(Debug)]
struct DeclaredElement {
    name: String,
    children: Vec<String>,
    attributes: Vec<Arc<DtdAttribute>>,
    empty: bool,
    documentation: Option<String>,
    /// Grammar file named in documentation, `None` for an internal subset.
    source: Option<String>,
    /// Where the `<!ELEMENT` name is declared.
    location: Option<(String, Range)>,
}

/// Declarations of one grammar. Elements refer to their children by name,
/// so recursive content models need no cycles of `Arc`s.
#[derive(Debug, Default)]
struct DtdDecls {
    uri: String,
    elements: Vec<DeclaredElement>,
}

impl DtdDecls {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    /// Add the declarations of `document`. Elements already declared keep
    /// their first declaration, as in XML.
    fn collect(&mut self, document: &Document, source: Option<&str>) {
        let Some(doctype) = document.doctype() else {
            return;
        };
        let mut attlists: Vec<(String, DtdAttribute)> = Vec::new();
        let mut comment: Option<String> = None;

        for node in doctype.children() {
            if node.is_comment() {
                comment = node.content().map(|c| c.trim().to_string());
                continue;
            }
            if node.is_text() && node.content().is_some_and(|t| t.trim().is_empty()) {
                continue;
            }
            let documentation = comment.take().filter(|c| !c.is_empty());
            if let Some(decl) = node.as_element_decl() {
                let (Some(name), Some(param)) = (decl.name(), decl.name_param()) else {
                    continue;
                };
                if self.index_of(name).is_some() {
                    continue;
                }
                let mut children: Vec<String> = Vec::new();
                for child in decl.content_names() {
                    if !children.iter().any(|c| c == child.text()) {
                        children.push(child.text().to_string());
                    }
                }
                self.elements.push(DeclaredElement {
                    name: name.to_string(),
                    children,
                    attributes: Vec::new(),
                    empty: decl.category() == Some("EMPTY"),
                    documentation,
                    source: source.map(str::to_string),
                    location: document
                        .range_of(param.span)
                        .ok()
                        .map(|range| (document.uri().to_string(), range)),
                });
            } else if let Some(decl) = node.as_attlist_decl() {
                let Some(element) = decl.element_name() else {
                    continue;
                };
                for def in decl.definitions() {
                    let Some(name) = def.name() else {
                        continue;
                    };
                    let default_value = def
                        .default_value()
                        .filter(|v| !v.starts_with('#'))
                        .map(|v| v.trim_matches(['"', '\'']).to_string());
                    attlists.push((
                        element.to_string(),
                        DtdAttribute {
                            name: name.to_string(),
                            default_value,
                            values: def.enumeration().into_iter().map(str::to_string).collect(),
                            required: def.is_required(),
                            documentation: documentation.clone(),
                        },
                    ));
                }
            }
        }

        // The first declaration of an attribute is binding, so the internal
        // subset, collected first, overrides the external DTD.
        for (element, attribute) in attlists {
            let Some(index) = self.index_of(&element) else {
                continue;
            };
            let declared = &mut self.elements[index].attributes;
            if !declared.iter().any(|a| a.name == attribute.name) {
                declared.push(Arc::new(attribute));
            }
        }
    }
}

/// An element of a [`DtdDocument`].
#[derive(Debug, Clone)]
struct DtdElement {
    decls: Arc<DtdDecls>,
    index: usize,
}

impl DtdElement {
    fn declared(&self) -> &DeclaredElement {
        &self.decls.elements[self.index]
    }
}

impl CmElementDeclaration for DtdElement {
    fn name(&self) -> &str {
        &self.declared().name
    }

    fn attributes(&self) -> Vec<Arc<dyn CmAttributeDeclaration>> {
        self.declared()
            .attributes
            .iter()
            .map(|a| a.clone() as Arc<dyn CmAttributeDeclaration>)
            .collect()
    }

    fn elements(&self) -> Vec<Arc<dyn CmElementDeclaration>> {
        self.declared()
            .children
            .iter()
            .filter_map(|name| self.decls.index_of(name))
            .map(|index| {
                Arc::new(DtdElement {
                    decls: self.decls.clone(),
                    index,
                }) as Arc<dyn CmElementDeclaration>
            })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.declared().empty
    }

    fn documentation(&self) -> Option<String> {
        self.declared().documentation.clone()
    }

    fn document_uri(&self) -> Option<&str> {
        self.declared().source.as_deref()
    }
}

/// Grammar built from an internal subset and/or an external DTD.
#[derive(Debug)]
pub struct DtdDocument {
    decls: Arc<DtdDecls>,
}

impl DtdDocument {
    fn element(&self, name: &str) -> Option<DtdElement> {
        self.decls.index_of(name).map(|index| DtdElement {
            decls: self.decls.clone(),
            index,
        })
    }
}

impl CmDocument for DtdDocument {
    fn uri(&self) -> &str {
        &self.decls.uri
    }

    fn has_namespace(&self, _namespace: &str) -> bool {
        false
    }

    fn elements(&self) -> Vec<Arc<dyn CmElementDeclaration>> {
        (0..self.decls.elements.len())
            .map(|index| {
                Arc::new(DtdElement {
                    decls: self.decls.clone(),
                    index,
                }) as Arc<dyn CmElementDeclaration>
            })
            .collect()
    }

    fn find_type_location(&self, node: NodeRef<'_>) -> Option<LocationLink> {
        let element = node.as_element()?;
        let origin = node.owner_document().range_of(element.tag_name_span()?).ok()?;
        let declared = self.element(element.tag_name()?)?;
        let (uri, target) = declared.declared().location.clone()?;
        Some(LocationLink::new(origin, uri, target))
    }
}

#[derive(Debug, Default)]
pub struct DtdContentModelProvider;

impl DtdContentModelProvider {
    fn load(
        &self,
        uri: &str,
        documents: Option<&dyn DocumentProvider>,
    ) -> ParticipantResult<Arc<Document>> {
        documents
            .and_then(|d| d.document(uri))
            .ok_or_else(|| ParticipantError::unavailable(format!("Cannot find DTD '{uri}'.")))
    }
}

impl ContentModelProvider for DtdContentModelProvider {
    fn name(&self) -> &'static str {
        "dtd"
    }

    fn adapts(&self, document: &Document) -> bool {
        document.has_dtd() && !document.is_dtd()
    }

    fn model_for(
        &self,
        document: &Document,
        documents: Option<&dyn DocumentProvider>,
    ) -> ParticipantResult<Option<Arc<dyn CmDocument>>> {
        let external = external_dtd_uri(document);
        let mut decls = DtdDecls {
            uri: external.clone().unwrap_or_else(|| document.uri().to_string()),
            elements: Vec::new(),
        };
        decls.collect(document, None);

        if let Some(uri) = external {
            match self.load(&uri, documents) {
                Ok(dtd) => decls.collect(&dtd, Some(&uri)),
                // The internal subset alone is still a grammar.
                Err(err) if decls.elements.is_empty() => return Err(err),
                Err(err) => tracing::debug!(uri = %uri, error = %err, "using the internal subset only"),
            }
        }
        tracing::debug!(uri = %decls.uri, elements = decls.elements.len(), "loaded DTD");
        Ok(Some(Arc::new(DtdDocument {
            decls: Arc::new(decls),
        })))
    }

    fn model_for_system_id(
        &self,
        system_id: &str,
        documents: Option<&dyn DocumentProvider>,
    ) -> ParticipantResult<Option<Arc<dyn CmDocument>>> {
        if !is_dtd_uri(system_id) {
            return Ok(None);
        }
        let dtd = self.load(system_id, documents)?;
        let mut decls = DtdDecls {
            uri: system_id.to_string(),
            elements: Vec::new(),
        };
        decls.collect(&dtd, Some(system_id));
        Ok(Some(Arc::new(DtdDocument {
            decls: Arc::new(decls),
        })))
    }
}

// ============================================================================
// Navigation between declarations and references
// ============================================================================

/// `<!ELEMENT` names, with the declaration's name parameter.
fn element_decls(document: &Document) -> Vec<&DeclParam> {
    document
        .doctype()
        .into_iter()
        .flat_map(|doctype| doctype.children())
        .filter_map(|node| node.as_element_decl())
        .filter_map(|decl| decl.name_param())
        .collect()
}

/// Names referring to an `<!ELEMENT`: ATTLIST element names and the names
/// of content models.
fn element_origins(document: &Document) -> Vec<DeclParam> {
    let mut origins = Vec::new();
    let Some(doctype) = document.doctype() else {
        return origins;
    };
    for node in doctype.children() {
        if let Some(decl) = node.as_attlist_decl() {
            origins.extend(decl.element_name_param().cloned());
        } else if let Some(decl) = node.as_element_decl() {
            origins.extend(decl.content_names());
        }
    }
    origins
}

fn contains(span: Span, offset: usize) -> bool {
    span.start <= offset && offset <= span.end
}

/// The element name under the cursor, on a declaration or a reference.
fn element_name_at(document: &Document, offset: usize) -> Option<String> {
    element_decls(document)
        .into_iter()
        .find(|param| contains(param.span, offset))
        .map(|param| param.text().to_string())
        .or_else(|| {
            element_origins(document)
                .into_iter()
                .find(|param| contains(param.span, offset))
                .map(|param| param.text().to_string())
        })
}

fn applies_to(document: &Document) -> bool {
    document.is_dtd() || document.has_dtd()
}

/// Definition, references, code lens and highlighting of `<!ELEMENT`s.
#[derive(Debug, Default)]
pub struct DtdNavigation;

impl DefinitionParticipant for DtdNavigation {
    fn name(&self) -> &'static str {
        "dtd"
    }

    fn applies_to(&self, document: &Document) -> bool {
        applies_to(document)
    }

    fn find_definition(
        &self,
        request: &DefinitionRequest<'_>,
        locations: &mut Vec<LocationLink>,
        _cancel: &dyn CancelChecker,
    ) -> ParticipantResult {
        let document = request.document();
        let offset = request.offset();
        let Some(origin) = element_origins(document)
            .into_iter()
            .find(|param| contains(param.span, offset))
        else {
            return Ok(());
        };
        if let Some(target) = element_decls(document)
            .into_iter()
            .find(|param| param.text() == origin.text())
        {
            locations.push(LocationLink::new(
                document.range_of(origin.span)?,
                document.uri(),
                document.range_of(target.span)?,
            ));
        }
        Ok(())
    }
}

impl ReferenceParticipant for DtdNavigation {
    fn name(&self) -> &'static str {
        "dtd"
    }

    fn find_reference(
        &self,
        request: &ReferenceRequest<'_>,
        locations: &mut Vec<Location>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult {
        let document = request.document();
        if !applies_to(document) {
            return Ok(());
        }
        let Some(name) = element_name_at(document, request.offset()) else {
            return Ok(());
        };
        if request.include_declaration() {
            for param in element_decls(document).into_iter().filter(|p| p.text() == name) {
                locations.push(Location::new(document.uri(), document.range_of(param.span)?));
            }
        }
        for origin in element_origins(document) {
            if cancel.is_cancelled() {
                break;
            }
            if origin.text() == name {
                locations.push(Location::new(document.uri(), document.range_of(origin.span)?));
            }
        }
        Ok(())
    }
}

impl CodeLensParticipant for DtdNavigation {
    fn name(&self) -> &'static str {
        "dtd"
    }

    fn do_code_lens(
        &self,
        request: &CodeLensRequest<'_>,
        lenses: &mut Vec<CodeLens>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult {
        let document = request.document();
        if !applies_to(document) {
            return Ok(());
        }
        let supported = request.is_supported_by_client(REFERENCES_KIND);
        let origins = element_origins(document);
        for target in element_decls(document) {
            if cancel.is_cancelled() {
                break;
            }
            let count = origins.iter().filter(|o| o.text() == target.text()).count();
            if count == 0 {
                continue;
            }
            let range = document.range_of(target.span)?;
            let title = if count == 1 {
                "1 reference".to_string()
            } else {
                format!("{count} references")
            };
            let command = if supported {
                Command::new(title, SHOW_REFERENCES_COMMAND)
                    .with_argument(serde_json::json!(document.uri()))
                    .with_argument(serde_json::json!(range.start))
            } else {
                Command::new(title, "")
            };
            lenses.push(CodeLens {
                range,
                command: Some(command),
            });
        }
        Ok(())
    }
}

impl HighlightingParticipant for DtdNavigation {
    fn name(&self) -> &'static str {
        "dtd"
    }

    fn find_document_highlights(
        &self,
        request: &HighlightRequest<'_>,
        highlights: &mut Vec<DocumentHighlight>,
        _cancel: &dyn CancelChecker,
    ) -> ParticipantResult {
        let document = request.document();
        if !applies_to(document) {
            return Ok(());
        }
        let Some(name) = element_name_at(document, request.offset()) else {
            return Ok(());
        };
        for param in element_decls(document).into_iter().filter(|p| p.text() == name) {
            highlights.push(DocumentHighlight::new(
                document.range_of(param.span)?,
                DocumentHighlightKind::Write,
            ));
        }
        for origin in element_origins(document).into_iter().filter(|o| o.text() == name) {
            highlights.push(DocumentHighlight::new(
                document.range_of(origin.span)?,
                DocumentHighlightKind::Read,
            ));
        }
        Ok(())
    }
}

/// Link on the system id of the DOCTYPE.
#[derive(Debug, Default)]
pub struct DtdDocumentLink;

impl DocumentLinkParticipant for DtdDocumentLink {
    fn name(&self) -> &'static str {
        "dtd"
    }

    fn find_document_links(
        &self,
        document: &Document,
        links: &mut Vec<DocumentLink>,
    ) -> ParticipantResult {
        let Some(doctype) = document.doctype().and_then(|n| n.as_doctype()) else {
            return Ok(());
        };
        let (Some(param), Some(target)) = (doctype.system_id_param(), external_dtd_uri(document))
        else {
            return Ok(());
        };
        let span = if param.text().len() >= 2 && param.text() != param.unquoted() {
            Span::new(param.span.start + 1, param.span.end - 1)
        } else {
            param.span
        };
        links.push(DocumentLink {
            range: document.range_of(span)?,
            target: Some(target),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::services::{XmlCodeLens, XmlDefinition, XmlDocumentLink, XmlHighlighting, XmlReference};
    use crate::settings::SharedSettings;
    use crate::types::Position;
    use xmlls_dom::parse;

    const DTD: &str = "<!ELEMENT list (item*)>
<!-- An entry. -->
<!ELEMENT item (#PCDATA|item)*>
<!ATTLIST item kind (a|b) #REQUIRED>
<!ATTLIST list title CDATA \"Untitled\">";

    fn registry() -> Arc<ExtensionRegistry> {
        Arc::new(
            ExtensionRegistry::builder()
                .extension(Arc::new(DtdExtension::new()))
                .build(),
        )
    }

    /// Position of the `n`th occurrence of `needle`, plus `delta` characters.
    fn position(text: &str, needle: &str, n: usize, delta: usize) -> Position {
        let offset = text.match_indices(needle).nth(n).map(|(i, _)| i).unwrap() + delta;
        parse(text, "file:///x.dtd").position_at(offset).unwrap()
    }

    #[test]
    fn test_resolve_uri() {
        let resolve = |base, system_id| resolve_uri(base, system_id).unwrap();
        assert_eq!(resolve("file:///dir/a.xml", "list.dtd"), "file:///dir/list.dtd");
        assert_eq!(resolve("file:///dir/sub/a.xml", "../list.dtd"), "file:///dir/list.dtd");
        assert_eq!(resolve("file:///a.xml", "./g/list.dtd"), "file:///g/list.dtd");
        assert_eq!(resolve("file:///a.xml", "../../list.dtd"), "file:///list.dtd");
        assert_eq!(
            resolve("file:///a.xml", "http://example.com/list.dtd"),
            "http://example.com/list.dtd"
        );
    }

    #[test]
    fn test_resolve_uri_absolute_path_and_query() {
        let resolve = |base, system_id| resolve_uri(base, system_id).unwrap();
        assert_eq!(resolve("file:///a/b/doc.xml", "/abs/x.dtd"), "file:///abs/x.dtd");
        assert_eq!(resolve("http://h/p/doc.xml?x=a/b", "x.dtd"), "http://h/p/x.dtd");
        assert_eq!(resolve("http://h/p/q/doc.xml", "../x.dtd"), "http://h/p/x.dtd");
        assert_eq!(resolve("file:///a/doc.xml", "C:\\d\\x.dtd"), "file:///C:/d/x.dtd");
        assert_eq!(resolve("file:///a/doc.xml", " x.dtd "), "file:///a/x.dtd");
    }

    #[test]
    fn test_resolve_uri_without_base() {
        assert_eq!(
            resolve_uri("untitled", "http://example.com/x.dtd").as_deref(),
            Some("http://example.com/x.dtd")
        );
        assert_eq!(resolve_uri("untitled", "x.dtd"), None);
    }

    #[test]
    fn test_declarations() {
        let doc = parse(DTD, "file:///list.dtd");
        let mut decls = DtdDecls::default();
        decls.collect(&doc, Some("file:///list.dtd"));

        let names: Vec<&str> = decls.elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["list", "item"]);
        let item = &decls.elements[1];
        assert_eq!(item.children, vec!["item"]);
        assert_eq!(item.documentation.as_deref(), Some("An entry."));
        assert_eq!(item.attributes[0].values, vec!["a", "b"]);
        assert!(item.attributes[0].required);
        assert_eq!(decls.elements[0].attributes[0].default_value.as_deref(), Some("Untitled"));

        // Recursive content models resolve through the table.
        let model = DtdDocument {
            decls: Arc::new(decls),
        };
        let item = model.element("item").unwrap();
        let nested = item.elements();
        assert_eq!(nested[0].elements()[0].name(), "item");
        assert_eq!(nested[0].document_uri(), Some("file:///list.dtd"));
    }

    #[test]
    fn test_definition_from_content_and_attlist() {
        let doc = parse(DTD, "file:///list.dtd");
        let definition = XmlDefinition::new(registry());

        let links = definition
            .find_definition(&doc, position(DTD, "item*", 0, 1), &NeverCancel)
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_range.start, Position::new(2, 10));

        let links = definition
            .find_definition(&doc, position(DTD, "ATTLIST list", 0, 9), &NeverCancel)
            .unwrap();
        assert_eq!(links[0].target_range.start, Position::new(0, 10));
    }

    #[test]
    fn test_references_and_highlights() {
        let doc = parse(DTD, "file:///list.dtd");
        let on_item = position(DTD, "ELEMENT item", 0, 8);

        let references = XmlReference::new(registry())
            .find_references(&doc, on_item, false, &NeverCancel)
            .unwrap();
        let lines: Vec<u32> = references.iter().map(|l| l.range.start.line).collect();
        assert_eq!(lines, vec![0, 2, 3]);

        let references = XmlReference::new(registry())
            .find_references(&doc, on_item, true, &NeverCancel)
            .unwrap();
        assert_eq!(references.len(), 4);

        let highlights = XmlHighlighting::new(registry())
            .find_document_highlights(&doc, on_item, &NeverCancel)
            .unwrap();
        assert_eq!(highlights[0].kind, DocumentHighlightKind::Write);
        assert_eq!(highlights.len(), 4);
        assert!(highlights[1..].iter().all(|h| h.kind == DocumentHighlightKind::Read));
    }

    #[test]
    fn test_code_lens_counts_references() {
        let doc = parse(DTD, "file:///list.dtd");
        let mut settings = SharedSettings::default();
        settings.code_lens.enabled = true;

        let lenses = XmlCodeLens::new(registry()).get_code_lens(&doc, &settings, &NeverCancel);
        let titles: Vec<&str> = lenses
            .iter()
            .filter_map(|l| l.command.as_ref())
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["1 reference", "3 references"]);
        assert_eq!(lenses[0].command.as_ref().unwrap().command, "");

        settings.code_lens.supported_kinds = vec![REFERENCES_KIND.to_string()];
        let lenses = XmlCodeLens::new(registry()).get_code_lens(&doc, &settings, &NeverCancel);
        let command = lenses[1].command.as_ref().unwrap();
        assert_eq!(command.command, SHOW_REFERENCES_COMMAND);
        assert_eq!(command.arguments.len(), 2);
    }

    #[test]
    fn test_document_link_on_system_id() {
        let doc = parse("<!DOCTYPE list SYSTEM \"list.dtd\">\n<list/>", "file:///dir/a.xml");
        let links = XmlDocumentLink::new(registry()).find_document_links(&doc);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target.as_deref(), Some("file:///dir/list.dtd"));
        assert_eq!(links[0].range.start.character, 23);
        assert_eq!(links[0].range.end.character, 31);
    }

    #[test]
    fn test_plain_documents_are_ignored() {
        let doc = parse("<list><item/></list>", "file:///a.xml");
        let references = XmlReference::new(registry())
            .find_references(&doc, Position::new(0, 8), true, &NeverCancel)
            .unwrap();
        assert!(references.is_empty());
    }
}
