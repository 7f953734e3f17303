//! Participant traits, one per feature.
//!
//! Participants are registered on the [`crate::ExtensionRegistry`] and
//! called in registration order for every request of their feature. Every
//! method has a no-op default so an implementation only overrides what it
//! contributes. Collections passed in are owned by the caller; participants
//! append to them.
//!
//! Returning an error (or panicking) only drops the failing participant's
//! contribution: the registry logs it and the remaining participants run.

use xmlls_dom::Document;

use crate::cancel::CancelChecker;
use crate::error::ParticipantResult;
use crate::request::{
    CodeLensRequest, CompletionRequest, CompletionResponse, DefinitionRequest, HighlightRequest,
    HoverRequest, ReferenceRequest, RenameRequest, TypeDefinitionRequest,
};
use crate::settings::SharedSettings;
use crate::types::{
    CodeAction, CodeLens, Diagnostic, DocumentHighlight, DocumentLink, Location, LocationLink,
    Range, TextEdit,
};

/// Name used in logs, the implementing type by default.
macro_rules! participant_name {
    () => {
        fn name(&self) -> &'static str {
            std::any::type_name::<Self>()
        }
    };
}

pub trait CompletionParticipant: Send + Sync {
    participant_name!();

    /// After `<`, or on a start tag name.
    fn on_tag_open(
        &self,
        _request: &CompletionRequest<'_>,
        _response: &mut CompletionResponse,
    ) -> ParticipantResult {
        Ok(())
    }

    /// In text content between tags.
    fn on_xml_content(
        &self,
        _request: &CompletionRequest<'_>,
        _response: &mut CompletionResponse,
    ) -> ParticipantResult {
        Ok(())
    }

    /// On an attribute name. `generate_value` is false when the name is
    /// already followed by `=`.
    fn on_attribute_name(
        &self,
        _generate_value: bool,
        _request: &CompletionRequest<'_>,
        _response: &mut CompletionResponse,
    ) -> ParticipantResult {
        Ok(())
    }

    /// In an attribute value; `value_prefix` is the value text before the cursor.
    fn on_attribute_value(
        &self,
        _value_prefix: &str,
        _request: &CompletionRequest<'_>,
        _response: &mut CompletionResponse,
    ) -> ParticipantResult {
        Ok(())
    }
}

/// Contributes markup fragments to a hover. Fragments of all participants
/// are joined in registration order.
pub trait HoverParticipant: Send + Sync {
    participant_name!();

    fn on_tag(&self, _request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        Ok(None)
    }

    fn on_attribute_name(&self, _request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        Ok(None)
    }

    fn on_attribute_value(&self, _request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        Ok(None)
    }
}

pub trait DiagnosticsParticipant: Send + Sync {
    participant_name!();

    /// Append diagnostics for `document`. A
    /// [`crate::ParticipantError::ResourceDownloading`] error is reported to
    /// the client instead of being dropped.
    fn do_diagnostics(
        &self,
        document: &Document,
        diagnostics: &mut Vec<Diagnostic>,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult;
}

pub trait DefinitionParticipant: Send + Sync {
    participant_name!();

    /// Only called when the document matches.
    fn applies_to(&self, _document: &Document) -> bool {
        true
    }

    fn find_definition(
        &self,
        request: &DefinitionRequest<'_>,
        locations: &mut Vec<LocationLink>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult;
}

pub trait TypeDefinitionParticipant: Send + Sync {
    participant_name!();

    fn find_type_definition(
        &self,
        request: &TypeDefinitionRequest<'_>,
        locations: &mut Vec<LocationLink>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult;
}

pub trait ReferenceParticipant: Send + Sync {
    participant_name!();

    fn find_reference(
        &self,
        request: &ReferenceRequest<'_>,
        locations: &mut Vec<Location>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult;
}

pub trait CodeLensParticipant: Send + Sync {
    participant_name!();

    fn do_code_lens(
        &self,
        request: &CodeLensRequest<'_>,
        lenses: &mut Vec<CodeLens>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult;
}

/// Proposes fixes for one diagnostic.
pub trait CodeActionParticipant: Send + Sync {
    participant_name!();

    fn do_code_action(
        &self,
        diagnostic: &Diagnostic,
        range: Range,
        document: &Document,
        actions: &mut Vec<CodeAction>,
        settings: &SharedSettings,
    ) -> ParticipantResult;
}

pub trait HighlightingParticipant: Send + Sync {
    participant_name!();

    fn find_document_highlights(
        &self,
        request: &HighlightRequest<'_>,
        highlights: &mut Vec<DocumentHighlight>,
        cancel: &dyn CancelChecker,
    ) -> ParticipantResult;
}

/// Edits within the requested document; the service keys them by its URI.
pub trait RenameParticipant: Send + Sync {
    participant_name!();

    fn do_rename(&self, request: &RenameRequest<'_>, edits: &mut Vec<TextEdit>)
    -> ParticipantResult;
}

pub trait DocumentLinkParticipant: Send + Sync {
    participant_name!();

    fn find_document_links(
        &self,
        document: &Document,
        links: &mut Vec<DocumentLink>,
    ) -> ParticipantResult;
}
