//! Grammar-driven features.
//!
//! The extension registers the [`ContentModelManager`] component, which
//! grammar extensions (such as the DTD one) feed with providers, and the
//! participants that turn the declarations into completion, hover, type
//! definitions and validation. It also reports documents without any
//! grammar, with the severity chosen by `validation.noGrammar`, and
//! proposes quick fixes for the common syntax errors.

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context as _;
use xmlls_dom::{Document, ElementRef, Span};

use crate::cancel::CancelChecker;
use crate::contentmodel::{
    CmDocument, CmElementDeclaration, ContentModelManager, generate_attribute_value,
    generate_documentation, generate_element,
};
use crate::error::ParticipantResult;
use crate::extension::{InitializeParams, SaveContext, XmlExtension};
use crate::participants::{
    CodeActionParticipant, CompletionParticipant, DiagnosticsParticipant, HoverParticipant,
    TypeDefinitionParticipant,
};
use crate::registry::{DocumentProvider, ExtensionRegistry};
use crate::request::{
    CompletionRequest, CompletionResponse, HoverRequest, TypeDefinitionRequest,
};
use crate::services::diagnostics::{
    EQ_REQUIRED_CODE, ETAG_REQUIRED_CODE, OPEN_QUOTE_EXPECTED_CODE, root_start_tag_range,
};
use crate::settings::SharedSettings;
use crate::types::{
    CodeAction, CompletionItem, CompletionItemKind, Diagnostic, DiagnosticSeverity, LocationLink,
    MarkupContent, MarkupKind, Range,
};

pub const NO_GRAMMAR_CODE: &str = "NoGrammarConstraints";
pub const NO_GRAMMAR_MESSAGE: &str =
    "No grammar constraints (DTD or XML Schema) referenced in the document.";
pub const ELEMENT_NOT_DECLARED_CODE: &str = "MSG_ELEMENT_NOT_DECLARED";
pub const REQUIRED_ATTRIBUTE_CODE: &str = "MSG_REQUIRED_ATTRIBUTE_NOT_SPECIFIED";
pub const VALUE_NOT_IN_LIST_CODE: &str = "MSG_ATTRIBUTE_VALUE_NOT_IN_LIST";

/// State shared by the participants of the extension.
struct Shared {
    manager: Arc<ContentModelManager>,
    documents: RwLock<Option<Arc<dyn DocumentProvider>>>,
}

impl Shared {
    fn documents(&self) -> Option<Arc<dyn DocumentProvider>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn find_cm_element(
        &self,
        element: ElementRef<'_>,
    ) -> ParticipantResult<Option<Arc<dyn CmElementDeclaration>>> {
        let documents = self.documents();
        self.manager.find_cm_element(element, documents.as_deref())
    }

    fn cm_documents(&self, document: &Document) -> ParticipantResult<Vec<Arc<dyn CmDocument>>> {
        let documents = self.documents();
        self.manager.cm_documents(document, documents.as_deref())
    }
}

pub struct ContentModelExtension {
    shared: Arc<Shared>,
    settings: RwLock<SharedSettings>,
    completion: Arc<ContentModelCompletion>,
    hover: Arc<ContentModelHover>,
    diagnostics: Arc<ContentModelDiagnostics>,
    type_definition: Arc<ContentModelTypeDefinition>,
    code_actions: Arc<ContentModelCodeActions>,
}

impl Default for ContentModelExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentModelExtension {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            manager: Arc::new(ContentModelManager::new()),
            documents: RwLock::new(None),
        });
        Self {
            completion: Arc::new(ContentModelCompletion {
                shared: shared.clone(),
            }),
            hover: Arc::new(ContentModelHover {
                shared: shared.clone(),
            }),
            diagnostics: Arc::new(ContentModelDiagnostics {
                shared: shared.clone(),
            }),
            type_definition: Arc::new(ContentModelTypeDefinition {
                shared: shared.clone(),
            }),
            code_actions: Arc::new(ContentModelCodeActions),
            settings: RwLock::new(SharedSettings::default()),
            shared,
        }
    }

    pub fn manager(&self) -> &Arc<ContentModelManager> {
        &self.shared.manager
    }

    fn apply_settings(&self, settings: SharedSettings) {
        self.shared
            .manager
            .set_file_associations(settings.file_associations.clone());
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
    }
}

impl XmlExtension for ContentModelExtension {
    fn name(&self) -> &'static str {
        "contentmodel"
    }

    fn start(&self, params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        *self
            .shared
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner) = registry.document_provider();
        self.apply_settings(params.settings.clone());

        registry.register_component(self.shared.manager.clone());
        registry.register_completion_participant(self.completion.clone());
        registry.register_hover_participant(self.hover.clone());
        registry.register_diagnostics_participant(self.diagnostics.clone());
        registry.register_type_definition_participant(self.type_definition.clone());
        registry.register_code_action_participant(self.code_actions.clone());
        Ok(())
    }

    fn stop(&self, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        registry.unregister_component::<ContentModelManager>();
        let completion: Arc<dyn CompletionParticipant> = self.completion.clone();
        registry.unregister_completion_participant(&completion);
        let hover: Arc<dyn HoverParticipant> = self.hover.clone();
        registry.unregister_hover_participant(&hover);
        let diagnostics: Arc<dyn DiagnosticsParticipant> = self.diagnostics.clone();
        registry.unregister_diagnostics_participant(&diagnostics);
        let type_definition: Arc<dyn TypeDefinitionParticipant> = self.type_definition.clone();
        registry.unregister_type_definition_participant(&type_definition);
        let code_actions: Arc<dyn CodeActionParticipant> = self.code_actions.clone();
        registry.unregister_code_action_participant(&code_actions);
        Ok(())
    }

    fn do_save(&self, context: &SaveContext) -> anyhow::Result<()> {
        let current = self
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(settings) = context.settings(&current) {
            self.apply_settings(settings.context("cannot apply file associations")?);
        }
        Ok(())
    }
}

fn markup(settings: &SharedSettings, value: String) -> MarkupContent {
    MarkupContent::new(settings.markup_kind, value)
}

fn is_markdown(settings: &SharedSettings) -> bool {
    settings.markup_kind == MarkupKind::Markdown
}

// ============================================================================
// Completion
// ============================================================================

pub struct ContentModelCompletion {
    shared: Arc<Shared>,
}

impl ContentModelCompletion {
    fn element_items(
        &self,
        declarations: Vec<Arc<dyn CmElementDeclaration>>,
        prefix: Option<&str>,
        open_bracket: bool,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) {
        let settings = request.settings();
        let range = request.replace_range();
        for declaration in declarations {
            let label = match prefix {
                Some(p) => format!("{p}:{}", declaration.local_name()),
                None => declaration.name().to_string(),
            };
            let mut insert =
                generate_element(declaration.as_ref(), prefix, settings.completion.auto_close_tags);
            if open_bracket {
                insert.insert(0, '<');
            }
            let mut item = CompletionItem::new(label.clone(), CompletionItemKind::Property)
                .with_filter_text(if open_bracket { format!("<{label}") } else { label })
                .with_edit(range, insert)
                .snippet();
            if let Some(doc) = generate_documentation(
                declaration.documentation().as_deref(),
                declaration.document_uri(),
                is_markdown(settings),
            ) {
                item = item.with_documentation(markup(settings, doc));
            }
            response.add_completion_item(item);
        }
    }
}

impl CompletionParticipant for ContentModelCompletion {
    fn name(&self) -> &'static str {
        "contentmodel"
    }

    fn on_tag_open(
        &self,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) -> ParticipantResult {
        let node = request.node();
        // The element being typed is not its own parent.
        let parent = match node.as_element() {
            Some(element)
                if element.tag_name().is_none() || element.is_in_start_tag(request.offset()) =>
            {
                element.parent_element()
            }
            Some(element) => Some(element),
            None => node.parent_element(),
        };

        let declarations = match parent {
            Some(parent) => match self.shared.find_cm_element(parent)? {
                Some(declaration) => declaration.elements(),
                None => return Ok(()),
            },
            None => self
                .shared
                .cm_documents(request.document())?
                .iter()
                .flat_map(|model| model.elements())
                .collect(),
        };
        let prefix = parent.and_then(|p| p.prefix());
        self.element_items(declarations, prefix, false, request, response);
        Ok(())
    }

    fn on_xml_content(
        &self,
        request: &CompletionRequest<'_>,
        response: &mut CompletionResponse,
    ) -> ParticipantResult {
        let Some(parent) = request.parent_element() else {
            return Ok(());
        };
        let Some(declaration) = self.shared.find_cm_element(parent)? else {
            return Ok(());
        };
        let range = request.replace_range();
        for value in declaration.enumeration_values() {
            response.add_completion_item(
                CompletionItem::new(value.clone(), CompletionItemKind::Value).with_edit(range, value),
            );
        }
        self.element_items(declaration.elements(), parent.prefix(), true, request, response);
        Ok(())
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
        let Some(declaration) = self.shared.find_cm_element(element)? else {
            return Ok(());
        };
        let settings = request.settings();
        let range = request.replace_range();
        for attribute in declaration.attributes() {
            let name = attribute.name();
            let mut item = CompletionItem::new(name, CompletionItemKind::Value).with_filter_text(name);
            if generate_value {
                let value = generate_attribute_value(
                    attribute.default_value(),
                    &attribute.enumeration_values(),
                    true,
                );
                item = item.with_edit(range, format!("{name}{value}")).snippet();
            } else {
                item = item.with_edit(range, name);
            }
            if let Some(doc) = generate_documentation(
                attribute.documentation().as_deref(),
                declaration.document_uri(),
                is_markdown(settings),
            ) {
                item = item.with_documentation(markup(settings, doc));
            }
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
        let (Some(element), Some(name)) = (request.node().as_element(), request.current_attribute_name())
        else {
            return Ok(());
        };
        let Some(attribute) = self
            .shared
            .find_cm_element(element)?
            .and_then(|declaration| declaration.find_cm_attribute(name))
        else {
            return Ok(());
        };
        let settings = request.settings();
        let range = request.replace_range();
        for value in attribute.enumeration_values() {
            let insert = request.insert_attr_value(&value);
            let mut item = CompletionItem::new(value.clone(), CompletionItemKind::Value)
                .with_filter_text(insert.clone())
                .with_edit(range, insert);
            if let Some(doc) = attribute.value_documentation(&value) {
                item = item.with_documentation(markup(settings, doc));
            }
            response.add_completion_item(item);
        }
        Ok(())
    }
}

// ============================================================================
// Hover
// ============================================================================

pub struct ContentModelHover {
    shared: Arc<Shared>,
}

impl HoverParticipant for ContentModelHover {
    fn name(&self) -> &'static str {
        "contentmodel"
    }

    fn on_tag(&self, request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        if !request.settings().hover.documentation {
            return Ok(None);
        }
        let Some(element) = request.node().as_element() else {
            return Ok(None);
        };
        let Some(declaration) = self.shared.find_cm_element(element)? else {
            return Ok(None);
        };
        Ok(generate_documentation(
            declaration.documentation().as_deref(),
            declaration.document_uri(),
            request.markup_kind() == MarkupKind::Markdown,
        ))
    }

    fn on_attribute_name(&self, request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        if !request.settings().hover.documentation {
            return Ok(None);
        }
        let Some(attr) = request.attribute() else {
            return Ok(None);
        };
        let Some(element) = attr.owner_element() else {
            return Ok(None);
        };
        let Some(declaration) = self.shared.find_cm_element(element)? else {
            return Ok(None);
        };
        let Some(attribute) = declaration.find_cm_attribute(attr.name()) else {
            return Ok(None);
        };
        Ok(generate_documentation(
            attribute.documentation().as_deref(),
            declaration.document_uri(),
            request.markup_kind() == MarkupKind::Markdown,
        ))
    }

    fn on_attribute_value(&self, request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        if !request.settings().hover.documentation {
            return Ok(None);
        }
        let Some(attr) = request.attribute() else {
            return Ok(None);
        };
        let (Some(element), Some(value)) = (attr.owner_element(), attr.value()) else {
            return Ok(None);
        };
        Ok(self
            .shared
            .find_cm_element(element)?
            .and_then(|declaration| declaration.find_cm_attribute(attr.name()))
            .and_then(|attribute| attribute.value_documentation(value)))
    }
}

// ============================================================================
// Type definition
// ============================================================================

pub struct ContentModelTypeDefinition {
    shared: Arc<Shared>,
}

impl TypeDefinitionParticipant for ContentModelTypeDefinition {
    fn name(&self) -> &'static str {
        "contentmodel"
    }

    fn find_type_definition(
        &self,
        request: &TypeDefinitionRequest<'_>,
        locations: &mut Vec<LocationLink>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult {
        let node = request.node();
        if !node.is_element() {
            return Ok(());
        }
        for model in self.shared.cm_documents(request.document())? {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(location) = model.find_type_location(node) {
                locations.push(location);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

pub struct ContentModelDiagnostics {
    shared: Arc<Shared>,
}

impl DiagnosticsParticipant for ContentModelDiagnostics {
    fn name(&self) -> &'static str {
        "contentmodel"
    }

    fn do_diagnostics(
        &self,
        document: &Document,
        diagnostics: &mut Vec<Diagnostic>,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult {
        if document.is_dtd() || document.document_element().is_none() {
            return Ok(());
        }
        if !self.shared.manager.has_grammar(document) {
            if let Some(severity) = settings.validation.no_grammar.severity() {
                diagnostics.push(
                    Diagnostic::new(root_start_tag_range(document), severity, NO_GRAMMAR_MESSAGE)
                        .with_code(NO_GRAMMAR_CODE),
                );
            }
            return Ok(());
        }
        if !settings.validation.schema {
            return Ok(());
        }

        let models = self.shared.cm_documents(document)?;
        if models.is_empty() {
            return Ok(());
        }
        for element in document.elements() {
            if cancel.is_cancelled() {
                break;
            }
            let (Some(tag), Some(span)) = (element.tag_name(), element.tag_name_span()) else {
                continue;
            };
            let namespace = element.namespace_uri();
            let Some(declaration) = models
                .iter()
                .find_map(|model| model.find_cm_element(element, namespace))
            else {
                push(
                    diagnostics,
                    document,
                    span,
                    ELEMENT_NOT_DECLARED_CODE,
                    format!("Element type \"{tag}\" must be declared."),
                );
                continue;
            };
            check_attributes(diagnostics, element, tag, span, declaration.as_ref());
        }
        Ok(())
    }
}

fn check_attributes(
    diagnostics: &mut Vec<Diagnostic>,
    element: ElementRef<'_>,
    tag: &str,
    tag_span: Span,
    declaration: &dyn CmElementDeclaration,
) {
    let document = element.owner_document();
    for attribute in declaration.attributes() {
        let name = attribute.name();
        if attribute.is_required() && !element.has_attribute(name) {
            push(
                diagnostics,
                document,
                tag_span,
                REQUIRED_ATTRIBUTE_CODE,
                format!(
                    "Attribute \"{name}\" is required and must be specified for element type \"{tag}\"."
                ),
            );
        }
    }
    for attr in element.attributes() {
        let (Some(value), Some(span)) = (attr.value(), attr.value_span()) else {
            continue;
        };
        let Some(attribute) = declaration.find_cm_attribute(attr.name()) else {
            continue;
        };
        let allowed = attribute.enumeration_values();
        if !allowed.is_empty() && !allowed.iter().any(|v| v == value) {
            push(
                diagnostics,
                document,
                span,
                VALUE_NOT_IN_LIST_CODE,
                format!(
                    "Attribute \"{}\" with value \"{value}\" must have a value from the list \"{}\".",
                    attr.name(),
                    allowed.join(" ")
                ),
            );
        }
    }
}

fn push(diagnostics: &mut Vec<Diagnostic>, document: &Document, span: Span, code: &str, message: String) {
    if let Ok(range) = document.range_of(span) {
        diagnostics.push(Diagnostic::new(range, DiagnosticSeverity::Error, message).with_code(code));
    }
}

// ============================================================================
// Code actions
// ============================================================================

/// Quick fixes for syntax errors.
#[derive(Debug, Default)]
pub struct ContentModelCodeActions;

impl CodeActionParticipant for ContentModelCodeActions {
    fn name(&self) -> &'static str {
        "contentmodel"
    }

    fn do_code_action(
        &self,
        diagnostic: &Diagnostic,
        _range: Range,
        document: &Document,
        actions: &mut Vec<CodeAction>,
        _settings: &SharedSettings,
    ) -> ParticipantResult {
        let span = document.span_of(diagnostic.range)?;
        let uri = document.uri();
        match diagnostic.code.as_deref() {
            Some(ETAG_REQUIRED_CODE) => {
                let Some(element) = document
                    .find_node_at(span.start)
                    .as_element()
                    .filter(|e| e.tag_name_span() == Some(span))
                else {
                    return Ok(());
                };
                let (Some(tag), Some(close)) = (element.tag_name(), element.start_tag_close_offset())
                else {
                    return Ok(());
                };
                let end = document.range_of(Span::new(element.end(), element.end()))?;
                actions.push(CodeAction::quick_fix(
                    format!("Close with '</{tag}>'"),
                    diagnostic,
                    uri,
                    end,
                    format!("</{tag}>"),
                ));
                if !element.node().has_children() {
                    let bracket = document.range_of(Span::new(close, close + 1))?;
                    actions.push(CodeAction::quick_fix(
                        "Close with '/>'",
                        diagnostic,
                        uri,
                        bracket,
                        "/>",
                    ));
                }
            }
            Some(OPEN_QUOTE_EXPECTED_CODE) => {
                let value = document.text().get(span.start..span.end).unwrap_or_default();
                actions.push(CodeAction::quick_fix(
                    "Insert quotes",
                    diagnostic,
                    uri,
                    diagnostic.range,
                    format!("\"{value}\""),
                ));
            }
            Some(EQ_REQUIRED_CODE) => {
                let end = document.range_of(Span::new(span.end, span.end))?;
                actions.push(CodeAction::quick_fix(
                    "Insert '=\"\"'",
                    diagnostic,
                    uri,
                    end,
                    "=\"\"",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}
