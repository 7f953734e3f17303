//! The language service façade.
//!
//! [`XmlLanguageService`] ties the pieces together for a host (an LSP
//! server, the CLI, a test): it owns the registry with the built-in
//! extensions, the open documents, the current settings, and one instance
//! of every feature service.
//!
//! # Example
//!
//! ```rust
//! use xmlls_core::{NeverCancel, Position, XmlLanguageService};
//!
//! let service = XmlLanguageService::new();
//! let doc = service.did_open("file:///a.xml", "<root><item></root>", 1);
//! let diagnostics = service.do_diagnostics(&doc, &NeverCancel);
//! assert!(diagnostics.iter().any(|d| d.code.as_deref() == Some("ETagRequired")));
//!
//! // Without a grammar there is nothing to say about `root`.
//! let hover = service.do_hover(&doc, Position::new(0, 2), &NeverCancel)?;
//! assert!(hover.is_none());
//! # Ok::<(), xmlls_dom::BadLocation>(())
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use xmlls_dom::{BadLocation, Document};

use crate::cancel::CancelChecker;
use crate::document_store::DocumentStore;
use crate::error::SettingsError;
use crate::extension::{InitializeParams, SaveContext, XmlExtension};
use crate::extensions;
use crate::registry::ExtensionRegistry;
use crate::services::{
    PendingValidation, XmlCodeActions, XmlCodeLens, XmlCompletion, XmlDefinition, XmlDiagnostics,
    XmlDocumentLink, XmlFoldings, XmlHighlighting, XmlHover, XmlReference, XmlRename, XmlSymbols,
    XmlTypeDefinition,
};
use crate::settings::SharedSettings;
use crate::types::{
    AutoCloseTagResponse, CodeAction, CodeLens, CompletionList, Diagnostic, DocumentHighlight,
    DocumentLink, DocumentSymbol, FoldingRange, Hover, Location, LocationLink, Position,
    PublishDiagnostics, Range, SymbolInformation, WorkspaceEdit,
};

pub struct XmlLanguageService {
    registry: Arc<ExtensionRegistry>,
    documents: Arc<DocumentStore>,
    settings: RwLock<SharedSettings>,

    completion: XmlCompletion,
    hover: XmlHover,
    diagnostics: XmlDiagnostics,
    definition: XmlDefinition,
    type_definition: XmlTypeDefinition,
    references: XmlReference,
    code_lens: XmlCodeLens,
    code_actions: XmlCodeActions,
    highlighting: XmlHighlighting,
    rename: XmlRename,
    document_links: XmlDocumentLink,
    symbols: XmlSymbols,
    foldings: XmlFoldings,
}

impl std::fmt::Debug for XmlLanguageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlLanguageService")
            .field("documents", &self.documents.uris())
            .field("initialized", &self.registry.is_initialized())
            .finish_non_exhaustive()
    }
}

impl Default for XmlLanguageService {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlLanguageService {
    /// A service with the built-in extensions (content model, prolog, DTD, XSD).
    pub fn new() -> Self {
        Self::with_extensions(extensions::built_in())
    }

    /// A service with exactly `extensions`, started in the given order.
    pub fn with_extensions(extensions: impl IntoIterator<Item = Arc<dyn XmlExtension>>) -> Self {
        let documents = Arc::new(DocumentStore::new());
        let registry = Arc::new(
            ExtensionRegistry::builder()
                .extensions(extensions)
                .document_provider(documents.clone())
                .build(),
        );
        Self {
            completion: XmlCompletion::new(registry.clone()),
            hover: XmlHover::new(registry.clone()),
            diagnostics: XmlDiagnostics::new(registry.clone()),
            definition: XmlDefinition::new(registry.clone()),
            type_definition: XmlTypeDefinition::new(registry.clone()),
            references: XmlReference::new(registry.clone()),
            code_lens: XmlCodeLens::new(registry.clone()),
            code_actions: XmlCodeActions::new(registry.clone()),
            highlighting: XmlHighlighting::new(registry.clone()),
            rename: XmlRename::new(registry.clone()),
            document_links: XmlDocumentLink::new(registry.clone()),
            symbols: XmlSymbols::new(),
            foldings: XmlFoldings::new(),
            settings: RwLock::new(SharedSettings::default()),
            documents,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.documents
    }

    /// A snapshot of the current settings.
    pub fn settings(&self) -> SharedSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Adopt the client's initial settings. Extensions start lazily, on the
    /// first request.
    pub fn initialize(&self, params: InitializeParams) {
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = params.settings.clone();
        self.registry.initialize(params);
    }

    /// Merge a configuration change over the current settings and notify
    /// the extensions. Invalid settings leave everything unchanged.
    pub fn did_change_configuration(&self, update: Value) -> Result<(), SettingsError> {
        {
            let mut settings = self
                .settings
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let mut merged = settings.clone();
            merged.merge(&update)?;
            *settings = merged;
        }
        self.registry.do_save(SaveContext::SettingsChanged(update));
        Ok(())
    }

    // ========================================================================
    // Documents
    // ========================================================================

    pub fn did_open(&self, uri: impl Into<String>, text: impl Into<String>, version: i32) -> Arc<Document> {
        self.documents.open(uri, text, version)
    }

    /// The re-parsed document, `None` for an unknown URI or a stale version.
    pub fn did_change(&self, uri: &str, text: impl Into<String>, version: i32) -> Option<Arc<Document>> {
        self.documents.change(uri, text, version)
    }

    pub fn did_save(&self, uri: &str) {
        self.registry.do_save(SaveContext::DocumentSaved {
            uri: uri.to_string(),
        });
    }

    pub fn did_close(&self, uri: &str) -> bool {
        self.documents.close(uri)
    }

    pub fn document(&self, uri: &str) -> Option<Arc<Document>> {
        self.documents.get(uri)
    }

    // ========================================================================
    // Features
    // ========================================================================

    pub fn do_complete(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<CompletionList, BadLocation> {
        self.completion
            .do_complete(document, position, &self.settings(), cancel)
    }

    pub fn do_tag_complete(&self, document: &Document, position: Position) -> Result<Option<String>, BadLocation> {
        self.completion
            .do_tag_complete(document, position, &self.settings())
    }

    pub fn do_auto_close(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Option<AutoCloseTagResponse>, BadLocation> {
        self.completion
            .do_auto_close(document, position, &self.settings())
    }

    pub fn do_hover(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<Option<Hover>, BadLocation> {
        self.hover
            .do_hover(document, position, &self.settings(), cancel)
    }

    pub fn do_diagnostics(&self, document: &Document, cancel: &dyn CancelChecker) -> Vec<Diagnostic> {
        self.diagnostics
            .do_diagnostics(document, &self.settings(), cancel)
    }

    pub fn publish_diagnostics(
        &self,
        document: &Document,
        cancel: &dyn CancelChecker,
    ) -> (PublishDiagnostics, Option<PendingValidation>) {
        self.diagnostics
            .publish_diagnostics(document, &self.settings(), cancel)
    }

    pub fn find_definition(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<LocationLink>, BadLocation> {
        self.definition.find_definition(document, position, cancel)
    }

    pub fn find_type_definition(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<LocationLink>, BadLocation> {
        self.type_definition
            .find_type_definition(document, position, cancel)
    }

    pub fn find_references(
        &self,
        document: &Document,
        position: Position,
        include_declaration: bool,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<Location>, BadLocation> {
        self.references
            .find_references(document, position, include_declaration, cancel)
    }

    pub fn get_code_lens(&self, document: &Document, cancel: &dyn CancelChecker) -> Vec<CodeLens> {
        self.code_lens
            .get_code_lens(document, &self.settings(), cancel)
    }

    pub fn do_code_actions(
        &self,
        document: &Document,
        range: Range,
        diagnostics: &[Diagnostic],
        cancel: &dyn CancelChecker,
    ) -> Vec<CodeAction> {
        self.code_actions
            .do_code_actions(document, range, diagnostics, &self.settings(), cancel)
    }

    pub fn find_document_highlights(
        &self,
        document: &Document,
        position: Position,
        cancel: &dyn CancelChecker,
    ) -> Result<Vec<DocumentHighlight>, BadLocation> {
        self.highlighting
            .find_document_highlights(document, position, cancel)
    }

    pub fn do_rename(
        &self,
        document: &Document,
        position: Position,
        new_text: &str,
    ) -> Result<WorkspaceEdit, BadLocation> {
        self.rename.do_rename(document, position, new_text)
    }

    pub fn find_document_links(&self, document: &Document) -> Vec<DocumentLink> {
        self.document_links.find_document_links(document)
    }

    pub fn find_document_symbols(&self, document: &Document, cancel: &dyn CancelChecker) -> Vec<DocumentSymbol> {
        self.symbols
            .find_document_symbols(document, &self.settings(), cancel)
    }

    pub fn find_symbol_informations(
        &self,
        document: &Document,
        cancel: &dyn CancelChecker,
    ) -> Vec<SymbolInformation> {
        self.symbols
            .find_symbol_informations(document, &self.settings(), cancel)
    }

    pub fn get_folding_ranges(&self, document: &Document, cancel: &dyn CancelChecker) -> Vec<FoldingRange> {
        self.foldings
            .get_folding_ranges(document, &self.settings(), cancel)
    }
}
