//! Feature services.
//!
//! Each service holds the shared [`crate::ExtensionRegistry`], computes
//! what the core knows by itself (close tags, tag pairs, syntax errors,
//! outline, folding) and fans the request out to the participants of its
//! feature. Participants run in registration order; one that fails is
//! logged and skipped. Services poll the [`crate::CancelChecker`] between
//! participants and return what they have when it fires.

pub mod code_action;
pub mod code_lens;
pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod document_link;
pub mod folding;
pub mod highlighting;
pub mod hover;
pub mod references;
pub mod rename;
pub mod symbols;
pub mod type_definition;

pub use code_action::XmlCodeActions;
pub use code_lens::XmlCodeLens;
pub use completion::XmlCompletion;
pub use definition::XmlDefinition;
pub use diagnostics::{PendingValidation, ValidationOutcome, XmlDiagnostics};
pub use document_link::XmlDocumentLink;
pub use folding::XmlFoldings;
pub use highlighting::XmlHighlighting;
pub use hover::XmlHover;
pub use references::XmlReference;
pub use rename::XmlRename;
pub use symbols::XmlSymbols;
pub use type_definition::XmlTypeDefinition;

use xmlls_dom::{Document, ElementRef, Scanner, ScannerState, Span, TokenKind};

/// Rescan from `start` and return the span of the first `kind` token
/// (`StartTag` or `EndTag`) that ends at or after `offset`.
pub(crate) fn tag_name_span(text: &str, kind: TokenKind, start: usize, offset: usize) -> Option<Span> {
    let mut scanner = Scanner::with_state(text, start, ScannerState::WithinContent);
    let mut token = scanner.scan_token();
    while token != TokenKind::Eos
        && (scanner.token_end() < offset || scanner.token_end() == offset && token != kind)
    {
        token = scanner.scan_token();
    }
    (token == kind && offset <= scanner.token_end())
        .then(|| Span::new(scanner.token_offset(), scanner.token_end()))
}

/// Whether the first token after `offset`, skipping whitespace, is `expected`.
pub(crate) fn is_followed_by(
    text: &str,
    offset: usize,
    state: ScannerState,
    expected: TokenKind,
) -> bool {
    let mut scanner = Scanner::with_state(text, offset, state);
    let mut token = scanner.scan_token();
    while token == TokenKind::Whitespace {
        token = scanner.scan_token();
    }
    token == expected
}

/// The element whose start or end tag name is under `offset`, with the
/// name span that was hit and whether it is the start tag.
pub(crate) fn tag_name_at(document: &Document, offset: usize) -> Option<(ElementRef<'_>, Span, bool)> {
    let element = document.find_node_at(offset).as_element().or_else(|| {
        // At the end of a name the cursor is already past the element's span.
        offset
            .checked_sub(1)
            .and_then(|before| document.find_node_at(before).as_element())
    })?;
    if let Some(span) = element.tag_name_span()
        && span.touches(offset)
    {
        return Some((element, span, true));
    }
    if let Some(span) = element.end_tag_name_span()
        && span.touches(offset)
    {
        return Some((element, span, false));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmlls_dom::parse;

    #[test]
    fn test_tag_name_span() {
        let text = "<root attr='1'><child/></root>";
        assert_eq!(tag_name_span(text, TokenKind::StartTag, 0, 3), Some(Span::new(1, 5)));
        assert_eq!(tag_name_span(text, TokenKind::StartTag, 0, 8), None);
        assert_eq!(tag_name_span(text, TokenKind::EndTag, 23, 26), Some(Span::new(25, 29)));
    }

    #[test]
    fn test_is_followed_by() {
        let text = "<a b  =\"1\">";
        assert!(is_followed_by(text, 4, ScannerState::AfterAttributeName, TokenKind::DelimiterAssign));
        assert!(!is_followed_by(text, 10, ScannerState::WithinTag, TokenKind::DelimiterAssign));
    }

    #[test]
    fn test_tag_name_at() {
        let doc = parse("<root><child></child></root>", "file:///t.xml");
        let (element, span, open) = tag_name_at(&doc, 8).unwrap();
        assert_eq!(element.tag_name(), Some("child"));
        assert_eq!(span, Span::new(7, 12));
        assert!(open);

        let (element, _, open) = tag_name_at(&doc, 16).unwrap();
        assert_eq!(element.tag_name(), Some("child"));
        assert!(!open);

        assert!(tag_name_at(&doc, 0).is_none());
    }
}
