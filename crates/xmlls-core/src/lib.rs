//! Transport-agnostic XML language service.
//!
//! Features are computed by services that combine what the core knows
//! about XML with the contributions of participants registered by
//! extensions. Nothing here speaks a wire protocol: a host (an LSP server,
//! the `xmlls` CLI, a test) hands documents and positions to an
//! [`XmlLanguageService`] and serializes the results it gets back.
//!
//! - [`ExtensionRegistry`] owns extensions, participants and components,
//!   and starts extensions lazily on the first request.
//! - [`participants`] defines one trait per feature.
//! - [`contentmodel`] abstracts grammars (DTD, XML Schema) behind
//!   declarations that completion, hover and validation query.
//! - [`services`] holds one dispatcher per feature.
//! - [`extensions`] ships the built-in content model, prolog, DTD and XSD
//!   support.
//!
//! # Example
//!
//! ```rust
//! use xmlls_core::{NeverCancel, XmlLanguageService};
//!
//! let service = XmlLanguageService::new();
//! let doc = service.did_open("file:///a.xml", "<root><item></root>", 1);
//! let diagnostics = service.do_diagnostics(&doc, &NeverCancel);
//! assert!(diagnostics.iter().any(|d| d.code.as_deref() == Some("ETagRequired")));
//!
//! let symbols = service.find_document_symbols(&doc, &NeverCancel);
//! assert_eq!(symbols[0].name, "root");
//! ```

pub mod cancel;
pub mod contentmodel;
pub mod document_store;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod language_service;
pub mod participants;
pub mod registry;
pub mod request;
pub mod services;
pub mod settings;
pub mod types;

pub use cancel::{CancelChecker, CancellationToken, NeverCancel};
pub use document_store::DocumentStore;
pub use error::{ParticipantError, ParticipantResult, ResourceFuture, SettingsError};
pub use extension::{InitializeParams, SaveContext, XmlExtension};
pub use language_service::XmlLanguageService;
pub use participants::{
    CodeActionParticipant, CodeLensParticipant, CompletionParticipant, DefinitionParticipant,
    DiagnosticsParticipant, DocumentLinkParticipant, HighlightingParticipant, HoverParticipant,
    ReferenceParticipant, RenameParticipant, TypeDefinitionParticipant,
};
pub use registry::{DocumentProvider, ExtensionRegistry, ExtensionRegistryBuilder};
pub use services::{
    PendingValidation, ValidationOutcome, XmlCodeActions, XmlCodeLens, XmlCompletion,
    XmlDefinition, XmlDiagnostics, XmlDocumentLink, XmlFoldings, XmlHighlighting, XmlHover,
    XmlReference, XmlRename, XmlSymbols, XmlTypeDefinition,
};
pub use settings::SharedSettings;
pub use types::*;
