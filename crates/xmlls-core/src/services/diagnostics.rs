//! Diagnostics.
//!
//! Syntax problems come from the scanner (per-token errors) and from the
//! shape of the tolerant tree (unclosed elements, end tags without a start
//! tag, duplicate or value-less attributes). Grammar problems come from
//! the diagnostics participants.
//!
//! A participant that cannot validate yet because a grammar is still being
//! fetched returns [`ParticipantError::ResourceDownloading`]. Publishing
//! then reports that single condition on the root start tag and hands back
//! a [`PendingValidation`] that completes with the download. Its
//! [`ValidationOutcome`] says whether to revalidate the document or to
//! publish the download failure. Without grammars there is nothing pending:
//!
//! ```rust
//! use std::sync::Arc;
//! use xmlls_core::{ExtensionRegistry, NeverCancel, SharedSettings, XmlDiagnostics};
//!
//! let diagnostics = XmlDiagnostics::new(Arc::new(ExtensionRegistry::new()));
//! let doc = xmlls_dom::parse("<a><b></a>", "file:///a.xml");
//! let (published, pending) =
//!     diagnostics.publish_diagnostics(&doc, &SharedSettings::default(), &NeverCancel);
//! assert!(pending.is_none());
//! assert_eq!(published.uri, "file:///a.xml");
//! assert!(published.diagnostics.iter().any(|d| d.code.as_deref() == Some("ETagRequired")));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use xmlls_dom::{Document, ElementRef, Scanner, Span};

use crate::cancel::CancelChecker;
use crate::error::{ParticipantError, ResourceFuture};
use crate::registry::{ExtensionRegistry, call_participant, log_failure};
use crate::settings::SharedSettings;
use crate::types::{Diagnostic, DiagnosticSeverity, Location, PublishDiagnostics, Range};

/// Code of the diagnostic reported while a grammar is unavailable.
pub const RESOURCE_DOWNLOADING_CODE: &str = "DownloadResourceIssue";

pub const ETAG_REQUIRED_CODE: &str = "ETagRequired";
pub const ETAG_UNMATCHED_CODE: &str = "ETagUnmatched";
pub const ATTRIBUTE_NOT_UNIQUE_CODE: &str = "AttributeNotUnique";
pub const EQ_REQUIRED_CODE: &str = "EqRequiredInAttribute";
pub const OPEN_QUOTE_EXPECTED_CODE: &str = "OpenQuoteExpected";
pub const DOCTYPE_NOT_ALLOWED_CODE: &str = "DoctypeNotAllowed";

pub struct XmlDiagnostics {
    registry: Arc<ExtensionRegistry>,
}

impl XmlDiagnostics {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }

    /// All diagnostics for `document`. A pending grammar download is
    /// dropped here; use [`Self::publish_diagnostics`] to report it.
    pub fn do_diagnostics(
        &self,
        document: &Document,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Vec<Diagnostic> {
        self.collect(document, settings, cancel).0
    }

    pub fn publish_diagnostics(
        &self,
        document: &Document,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> (PublishDiagnostics, Option<PendingValidation>) {
        let uri = document.uri().to_string();
        let (diagnostics, downloading) = self.collect(document, settings, cancel);
        let Some(ParticipantError::ResourceDownloading { message, future }) = downloading else {
            return (PublishDiagnostics::new(uri, diagnostics), None);
        };

        let range = root_start_tag_range(document);
        let severity = if future.is_some() {
            DiagnosticSeverity::Information
        } else {
            DiagnosticSeverity::Error
        };
        tracing::debug!(uri = %uri, pending = future.is_some(), "grammar not available");
        let diagnostic =
            Diagnostic::new(range, severity, message).with_code(RESOURCE_DOWNLOADING_CODE);
        let pending = future.map(|resource| PendingValidation {
            uri: uri.clone(),
            range,
            resource,
        });
        (PublishDiagnostics::new(uri, vec![diagnostic]), pending)
    }

    /// Diagnostics, and the first "resource downloading" error raised.
    fn collect(
        &self,
        document: &Document,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> (Vec<Diagnostic>, Option<ParticipantError>) {
        if !settings.validation.enabled {
            return (Vec::new(), None);
        }
        let mut diagnostics = syntax_diagnostics(document, settings);
        let mut downloading = None;
        for participant in self.registry.diagnostics_participants() {
            if cancel.is_cancelled() {
                break;
            }
            let result = call_participant("diagnostics", participant.name(), || {
                participant.do_diagnostics(document, &mut diagnostics, settings, cancel)
            });
            match result {
                Ok(()) => {}
                Err(err) if err.is_resource_downloading() => {
                    if downloading.is_none() {
                        downloading = Some(err);
                    }
                }
                Err(err) => log_failure("diagnostics", participant.name(), &err),
            }
        }
        (diagnostics, downloading)
    }
}

// ============================================================================
// Built-in syntax diagnostics
// ============================================================================

fn syntax_diagnostics(document: &Document, settings: &SharedSettings) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let scanner = if document.is_dtd() {
        Scanner::for_dtd(document.text())
    } else {
        Scanner::new(document.text())
    };
    for token in scanner {
        if let Some(error) = token.error {
            push(
                &mut diagnostics,
                document,
                Span::new(token.start, token.end),
                format!("{error:?}"),
                error.to_string(),
            );
        }
    }

    if settings.validation.disallow_doc_type_decl
        && !document.is_dtd()
        && let Some(doctype) = document.doctype()
    {
        push(
            &mut diagnostics,
            document,
            doctype.span(),
            DOCTYPE_NOT_ALLOWED_CODE,
            "DOCTYPE is disallowed when the feature \"http://apache.org/xml/features/disallow-doctype-decl\" set to true.".to_string(),
        );
    }

    for element in document.elements() {
        let Some(tag) = element.tag_name() else {
            continue;
        };
        if element.has_start_tag() {
            if !element.is_self_closed() && !element.has_end_tag() {
                push(
                    &mut diagnostics,
                    document,
                    start_tag_span(element),
                    ETAG_REQUIRED_CODE,
                    format!(
                        "The element type \"{tag}\" must be terminated by the matching end-tag \"</{tag}>\"."
                    ),
                );
            }
            check_attributes(&mut diagnostics, document, element, tag);
        } else if let Some(span) = element.end_tag_name_span() {
            push(
                &mut diagnostics,
                document,
                span,
                ETAG_UNMATCHED_CODE,
                format!("The end-tag \"</{tag}>\" does not match any start-tag."),
            );
        }
    }
    diagnostics
}

fn check_attributes(
    diagnostics: &mut Vec<Diagnostic>,
    document: &Document,
    element: ElementRef<'_>,
    tag: &str,
) {
    let mut seen: HashMap<&str, Span> = HashMap::new();
    for attr in element.attributes() {
        let name = attr.name();
        match seen.get(name) {
            Some(&first) => {
                if let Ok(range) = document.range_of(attr.name_span()) {
                    let mut diagnostic = Diagnostic::new(
                        range,
                        DiagnosticSeverity::Error,
                        format!("Attribute \"{name}\" was already specified for element \"{tag}\"."),
                    )
                    .with_code(ATTRIBUTE_NOT_UNIQUE_CODE);
                    if let Ok(first) = document.range_of(first) {
                        diagnostic = diagnostic.with_related(
                            Location::new(document.uri(), first),
                            format!("First \"{name}\" attribute"),
                        );
                    }
                    diagnostics.push(diagnostic);
                }
            }
            None => {
                seen.insert(name, attr.name_span());
            }
        }
        if !attr.has_delimiter() {
            push(
                diagnostics,
                document,
                attr.name_span(),
                EQ_REQUIRED_CODE,
                format!(
                    "Attribute name \"{name}\" associated with an element type \"{tag}\" must be followed by the ' = ' character."
                ),
            );
        } else if !attr.is_quoted() {
            let span = attr.value_span().unwrap_or_else(|| attr.span());
            push(
                diagnostics,
                document,
                span,
                OPEN_QUOTE_EXPECTED_CODE,
                format!(
                    "Open quote is expected for attribute \"{name}\" associated with an element type \"{tag}\"."
                ),
            );
        }
    }
}

fn push(
    diagnostics: &mut Vec<Diagnostic>,
    document: &Document,
    span: Span,
    code: impl Into<String>,
    message: String,
) {
    if let Ok(range) = document.range_of(span) {
        diagnostics.push(Diagnostic::new(range, DiagnosticSeverity::Error, message).with_code(code));
    }
}

/// The start tag name, or the `<` of a nameless start tag.
fn start_tag_span(element: ElementRef<'_>) -> Span {
    element
        .tag_name_span()
        .unwrap_or_else(|| Span::new(element.start(), element.start() + 1))
}

/// Where document-wide diagnostics go: the root element's start tag name.
pub fn root_start_tag_range(document: &Document) -> Range {
    document
        .document_element()
        .map(start_tag_span)
        .and_then(|span| document.range_of(span).ok())
        .unwrap_or_default()
}

// ============================================================================
// Pending validation
// ============================================================================

/// What to do once a grammar download finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The grammar is available; validate `uri` again.
    Revalidate { uri: String },
    /// The download failed; publish this instead.
    Failed(PublishDiagnostics),
}

/// A validation waiting for a grammar download.
pub struct PendingValidation {
    uri: String,
    range: Range,
    resource: ResourceFuture,
}

impl PendingValidation {
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Debug for PendingValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingValidation")
            .field("uri", &self.uri)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl Future for PendingValidation {
    type Output = ValidationOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.resource.as_mut().poll(cx).map(|result| match result {
            Ok(path) => {
                tracing::debug!(uri = %this.uri, path = %path, "grammar downloaded");
                ValidationOutcome::Revalidate {
                    uri: this.uri.clone(),
                }
            }
            Err(message) => {
                let diagnostic = Diagnostic::new(this.range, DiagnosticSeverity::Error, message)
                    .with_code(RESOURCE_DOWNLOADING_CODE);
                ValidationOutcome::Failed(PublishDiagnostics::new(this.uri.clone(), vec![diagnostic]))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::error::ParticipantResult;
    use crate::participants::DiagnosticsParticipant;
    use crate::types::Position;
    use xmlls_dom::parse;

    fn diagnose(registry: ExtensionRegistry, text: &str) -> Vec<Diagnostic> {
        let doc = parse(text, "file:///test.xml");
        XmlDiagnostics::new(Arc::new(registry)).do_diagnostics(
            &doc,
            &SharedSettings::default(),
            &NeverCancel,
        )
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .filter_map(|d| d.code.as_deref())
            .collect()
    }

    fn range(start: u32, end: u32) -> Range {
        Range::new(Position::new(0, start), Position::new(0, end))
    }

    #[test]
    fn test_unclosed_intermediate_element() {
        let diagnostics = diagnose(ExtensionRegistry::new(), "<a><b></a>");
        assert_eq!(codes(&diagnostics), vec![ETAG_REQUIRED_CODE]);
        assert_eq!(diagnostics[0].range, range(4, 5));
        assert_eq!(
            diagnostics[0].message,
            "The element type \"b\" must be terminated by the matching end-tag \"</b>\"."
        );
    }

    #[test]
    fn test_lone_end_tag() {
        let diagnostics = diagnose(ExtensionRegistry::new(), "<a></b>");
        let codes = codes(&diagnostics);
        assert!(codes.contains(&ETAG_UNMATCHED_CODE), "{codes:?}");
        assert!(codes.contains(&ETAG_REQUIRED_CODE), "{codes:?}");
    }

    #[test]
    fn test_attribute_anomalies() {
        let diagnostics = diagnose(ExtensionRegistry::new(), "<a x=\"1\" x=\"2\" z/>");
        assert_eq!(
            codes(&diagnostics),
            vec![ATTRIBUTE_NOT_UNIQUE_CODE, EQ_REQUIRED_CODE]
        );
        assert_eq!(diagnostics[0].range, range(9, 10));
        assert_eq!(diagnostics[0].related_information[0].location.range, range(3, 4));
        assert_eq!(diagnostics[1].range, range(15, 16));
    }

    #[test]
    fn test_scanner_errors_are_reported() {
        let diagnostics = diagnose(ExtensionRegistry::new(), "<a/><!-- open");
        assert_eq!(codes(&diagnostics), vec!["UnterminatedComment"]);
    }

    struct Complains;

    impl DiagnosticsParticipant for Complains {
        fn do_diagnostics(
            &self,
            document: &Document,
            diagnostics: &mut Vec<Diagnostic>,
            _settings: &SharedSettings,
            _cancel: &dyn CancelChecker,
        ) -> ParticipantResult {
            diagnostics.push(Diagnostic::new(
                root_start_tag_range(document),
                DiagnosticSeverity::Warning,
                "complaint",
            ));
            Ok(())
        }
    }

    struct Fails;

    impl DiagnosticsParticipant for Fails {
        fn do_diagnostics(
            &self,
            _document: &Document,
            _diagnostics: &mut Vec<Diagnostic>,
            _settings: &SharedSettings,
            _cancel: &dyn CancelChecker,
        ) -> ParticipantResult {
            Err(anyhow::anyhow!("validator crashed").into())
        }
    }

    /// Reports a grammar that is still downloading.
    struct Downloading(fn() -> ParticipantError);

    impl DiagnosticsParticipant for Downloading {
        fn do_diagnostics(
            &self,
            _document: &Document,
            _diagnostics: &mut Vec<Diagnostic>,
            _settings: &SharedSettings,
            _cancel: &dyn CancelChecker,
        ) -> ParticipantResult {
            Err((self.0)())
        }
    }

    #[test]
    fn test_participants_after_syntax_checks() {
        let registry = ExtensionRegistry::new();
        registry.register_diagnostics_participant(Arc::new(Fails));
        registry.register_diagnostics_participant(Arc::new(Complains));
        let diagnostics = diagnose(registry, "<root>");

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].code.as_deref(), Some(ETAG_REQUIRED_CODE));
        assert_eq!(diagnostics[1].message, "complaint");
        assert_eq!(diagnostics[1].range, range(1, 5));
    }

    #[test]
    fn test_validation_disabled() {
        let registry = ExtensionRegistry::new();
        registry.register_diagnostics_participant(Arc::new(Complains));
        let mut settings = SharedSettings::default();
        settings.validation.enabled = false;
        let doc = parse("<root>", "file:///test.xml");
        let diagnostics =
            XmlDiagnostics::new(Arc::new(registry)).do_diagnostics(&doc, &settings, &NeverCancel);
        assert!(diagnostics.is_empty());
    }

    fn publish(participant: Downloading) -> (PublishDiagnostics, Option<PendingValidation>) {
        let registry = ExtensionRegistry::new();
        registry.register_diagnostics_participant(Arc::new(Complains));
        registry.register_diagnostics_participant(Arc::new(participant));
        let doc = parse("<root><a></root>", "file:///pending.xml");
        XmlDiagnostics::new(Arc::new(registry)).publish_diagnostics(
            &doc,
            &SharedSettings::default(),
            &NeverCancel,
        )
    }

    #[test]
    fn test_download_in_progress_then_revalidate() {
        let (published, pending) = publish(Downloading(|| {
            ParticipantError::downloading(
                "The resource 'http://example.com/grammar.xsd' is downloading.",
                Box::pin(async { Ok("/cache/grammar.xsd".to_string()) }),
            )
        }));

        assert_eq!(published.uri, "file:///pending.xml");
        assert_eq!(published.diagnostics.len(), 1);
        let diagnostic = &published.diagnostics[0];
        assert_eq!(diagnostic.severity, DiagnosticSeverity::Information);
        assert_eq!(diagnostic.range, range(1, 5));
        assert_eq!(diagnostic.code.as_deref(), Some(RESOURCE_DOWNLOADING_CODE));

        let pending = pending.unwrap();
        assert_eq!(pending.uri(), "file:///pending.xml");
        assert_eq!(
            pollster::block_on(pending),
            ValidationOutcome::Revalidate {
                uri: "file:///pending.xml".to_string()
            }
        );
    }

    #[test]
    fn test_download_failure_is_published() {
        let (_, pending) = publish(Downloading(|| {
            ParticipantError::downloading(
                "downloading",
                Box::pin(async { Err("Error while downloading grammar.xsd".to_string()) }),
            )
        }));
        let ValidationOutcome::Failed(published) = pollster::block_on(pending.unwrap()) else {
            panic!("expected a failed download");
        };
        assert_eq!(published.diagnostics.len(), 1);
        assert_eq!(published.diagnostics[0].severity, DiagnosticSeverity::Error);
        assert_eq!(
            published.diagnostics[0].message,
            "Error while downloading grammar.xsd"
        );
    }

    #[test]
    fn test_unavailable_resource_is_an_error() {
        let (published, pending) = publish(Downloading(|| {
            ParticipantError::unavailable("Downloading external resources is disabled.")
        }));
        assert!(pending.is_none());
        assert_eq!(published.diagnostics.len(), 1);
        assert_eq!(published.diagnostics[0].severity, DiagnosticSeverity::Error);
    }
}
