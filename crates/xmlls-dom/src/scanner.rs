//! Tolerant, restartable XML and DTD scanner.
//!
//! The scanner produces one token per call to [`Scanner::scan_token`], tracking
//! its position with a [`ScannerState`]. It never fails: malformed input is
//! tokenized as well as possible and the anomaly is reported through
//! [`Scanner::token_error`].
//!
//! All decisions are made on ASCII bytes, so every token boundary is a
//! UTF-8 character boundary.
//!
//! # Example
//!
//! ```rust
//! use xmlls_dom::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("<a x='1'/>");
//! assert_eq!(scanner.scan_token(), TokenKind::StartTagOpen);
//! assert_eq!(scanner.scan_token(), TokenKind::StartTag);
//! assert_eq!(scanner.token_text(), "a");
//! ```

use crate::error::ScanError;
use crate::token::{ScannerState, Token, TokenKind};

/// Stateful scanner over a borrowed text.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    state: ScannerState,
    token_kind: TokenKind,
    token_offset: usize,
    token_error: Option<ScanError>,
    has_space_after_tag: bool,
    in_prolog: bool,
    in_internal_subset: bool,
    dtd_file: bool,
    finished: bool,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Name characters: ASCII alphanumerics, `_ : - .` and anything non-ASCII.
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'-' | b'.') || b >= 0x80
}

fn is_name_start_byte(b: u8) -> bool {
    is_name_byte(b) && !matches!(b, b'-' | b'.')
}

impl<'a> Scanner<'a> {
    /// Scanner positioned at the start of a document.
    pub fn new(text: &'a str) -> Self {
        Self::with_state(text, 0, ScannerState::WithinContent)
    }

    /// Scanner for a standalone DTD file, starting inside DTD content.
    pub fn for_dtd(text: &'a str) -> Self {
        let mut scanner = Self::with_state(text, 0, ScannerState::DtdWithinContent);
        scanner.dtd_file = true;
        scanner
    }

    /// Scanner restarted at `offset` in the given state.
    ///
    /// Used to rescan a region of an already parsed document, e.g. starting
    /// at an element's `<` to locate its tag name.
    pub fn with_state(text: &'a str, offset: usize, state: ScannerState) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: offset.min(text.len()),
            state,
            token_kind: TokenKind::Unknown,
            token_offset: offset,
            token_error: None,
            has_space_after_tag: false,
            in_prolog: state == ScannerState::WithinPrologAttributes,
            in_internal_subset: false,
            dtd_file: false,
            finished: false,
        }
    }

    /// Scan the next token and return its kind.
    pub fn scan_token(&mut self) -> TokenKind {
        let offset = self.pos;
        let kind = self.internal_scan();
        if kind != TokenKind::Eos && self.pos == offset {
            tracing::warn!(offset, state = ?self.state, "scanner made no progress");
            self.advance_char();
            return self.finish(offset, TokenKind::Unknown, Some(ScanError::UnexpectedCharacter));
        }
        kind
    }

    pub fn token_kind(&self) -> TokenKind {
        self.token_kind
    }

    pub fn token_offset(&self) -> usize {
        self.token_offset
    }

    pub fn token_end(&self) -> usize {
        self.pos
    }

    pub fn token_length(&self) -> usize {
        self.pos - self.token_offset
    }

    pub fn token_text(&self) -> &'a str {
        self.text.get(self.token_offset..self.pos).unwrap_or_default()
    }

    pub fn token_error(&self) -> Option<ScanError> {
        self.token_error
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    /// The last token as a value.
    pub fn token(&self) -> Token {
        Token {
            kind: self.token_kind,
            start: self.token_offset,
            end: self.pos,
            error: self.token_error,
        }
    }

    /// True while the scanner is inside an internal subset or a DTD file.
    pub fn in_dtd_content(&self) -> bool {
        self.dtd_file || self.in_internal_subset
    }

    fn finish(&mut self, offset: usize, kind: TokenKind, error: Option<ScanError>) -> TokenKind {
        self.token_kind = kind;
        self.token_offset = offset;
        self.token_error = error;
        kind
    }

    fn content_state(&self) -> ScannerState {
        if self.in_dtd_content() {
            ScannerState::DtdWithinContent
        } else {
            ScannerState::WithinContent
        }
    }

    fn tag_state(&self) -> ScannerState {
        if self.in_prolog {
            ScannerState::WithinPrologAttributes
        } else {
            ScannerState::WithinTag
        }
    }

    // Byte-level helpers.

    fn eos(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.text.get(self.pos..).and_then(|s| s.chars().next()) {
            self.pos += ch.len_utf8();
        } else {
            self.pos = (self.pos + 1).min(self.bytes.len());
        }
    }

    fn advance_if_byte(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn advance_if(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Like [`Self::advance_if`] but the literal must not be followed by a name character.
    fn advance_if_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        if rest.starts_with(keyword.as_bytes())
            && !rest.get(keyword.len()).copied().is_some_and(is_name_byte)
        {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// Move to the start of `literal`, or to the end of input. Returns whether it was found.
    fn advance_until(&mut self, literal: &str) -> bool {
        match memchr::memmem::find(self.rest(), literal.as_bytes()) {
            Some(idx) => {
                self.pos += idx;
                true
            }
            None => {
                self.pos = self.bytes.len();
                false
            }
        }
    }

    fn advance_until_any(&mut self, stops: &[u8]) -> bool {
        match self.rest().iter().position(|b| stops.contains(b)) {
            Some(idx) => {
                self.pos += idx;
                true
            }
            None => {
                self.pos = self.bytes.len();
                false
            }
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn advance_name(&mut self) -> bool {
        if !self.peek().is_some_and(is_name_start_byte) {
            return false;
        }
        while self.peek().is_some_and(is_name_byte) {
            self.pos += 1;
        }
        true
    }

    /// Consume a quoted literal. The literal ends at the matching quote, or
    /// just before the first byte of `stops`, or at the end of input.
    ///
    /// Returns `None` when no quote is under the cursor, otherwise whether
    /// the literal was terminated.
    fn advance_literal(&mut self, stops: &[u8]) -> Option<bool> {
        let quote = self.peek().filter(|b| matches!(b, b'"' | b'\''))?;
        self.pos += 1;
        let found = self
            .rest()
            .iter()
            .position(|&b| b == quote || stops.contains(&b));
        match found {
            Some(idx) if self.bytes[self.pos + idx] == quote => {
                self.pos += idx + 1;
                Some(true)
            }
            Some(idx) => {
                self.pos += idx;
                Some(false)
            }
            None => {
                self.pos = self.bytes.len();
                Some(false)
            }
        }
    }

    fn internal_scan(&mut self) -> TokenKind {
        use ScannerState as S;
        use TokenKind as T;

        let offset = self.pos;
        if self.eos() {
            return self.finish(offset, T::Eos, None);
        }

        match self.state {
            S::WithinContent => self.scan_content(offset),
            S::WithinComment => {
                if self.advance_if("-->") {
                    self.state = self.content_state();
                    return self.finish(offset, T::EndCommentTag, None);
                }
                let closed = self.advance_until("-->");
                let error = (!closed).then_some(ScanError::UnterminatedComment);
                self.finish(offset, T::Comment, error)
            }
            S::WithinCData => {
                if self.advance_if("]]>") {
                    self.state = self.content_state();
                    return self.finish(offset, T::CDataTagClose, None);
                }
                let closed = self.advance_until("]]>");
                let error = (!closed).then_some(ScanError::UnterminatedCData);
                self.finish(offset, T::CDataContent, error)
            }
            S::AfterOpeningStartTag => {
                if self.advance_name() {
                    self.state = S::WithinTag;
                    self.has_space_after_tag = false;
                    return self.finish(offset, T::StartTag, None);
                }
                if self.skip_whitespace() {
                    return self.finish(
                        offset,
                        T::Whitespace,
                        Some(ScanError::TagNameMustFollowBracket),
                    );
                }
                self.state = S::WithinTag;
                self.has_space_after_tag = false;
                self.internal_scan()
            }
            S::WithinTag | S::WithinPrologAttributes => self.scan_within_tag(offset),
            S::AfterAttributeName => {
                if self.skip_whitespace() {
                    self.has_space_after_tag = true;
                    return self.finish(offset, T::Whitespace, None);
                }
                if self.advance_if_byte(b'=') {
                    self.state = S::BeforeAttributeValue;
                    return self.finish(offset, T::DelimiterAssign, None);
                }
                self.state = self.tag_state();
                self.internal_scan()
            }
            S::BeforeAttributeValue => self.scan_attribute_value(offset),
            S::AfterOpeningEndTag => {
                if self.advance_name() {
                    self.state = S::WithinEndTag;
                    return self.finish(offset, T::EndTag, None);
                }
                if self.skip_whitespace() {
                    return self.finish(
                        offset,
                        T::Whitespace,
                        Some(ScanError::TagNameMustFollowBracket),
                    );
                }
                self.state = S::WithinEndTag;
                self.internal_scan()
            }
            S::WithinEndTag => {
                if self.skip_whitespace() {
                    return self.finish(offset, T::Whitespace, None);
                }
                if self.advance_if_byte(b'>') {
                    self.state = S::WithinContent;
                    return self.finish(offset, T::EndTagClose, None);
                }
                if self.peek() == Some(b'<') {
                    self.state = S::WithinContent;
                    return self.internal_scan();
                }
                self.advance_until_any(b"<>");
                self.finish(offset, T::Unknown, Some(ScanError::ClosingBracketExpected))
            }
            S::AfterPIOpen => {
                if offset == 2 && self.is_prolog_name() {
                    self.pos += 3;
                    self.state = S::WithinPrologAttributes;
                    self.in_prolog = true;
                    self.has_space_after_tag = false;
                    return self.finish(offset, T::PrologName, None);
                }
                if self.advance_name() {
                    self.state = S::WithinPI;
                    return self.finish(offset, T::PIName, None);
                }
                self.state = S::WithinPI;
                self.internal_scan()
            }
            S::WithinPI => {
                if self.skip_whitespace() {
                    return self.finish(offset, T::Whitespace, None);
                }
                if self.advance_if("?>") {
                    self.state = self.content_state();
                    return self.finish(offset, T::PIEnd, None);
                }
                let closed = self.advance_until("?>");
                let error = (!closed).then_some(ScanError::UnterminatedProcessingInstruction);
                self.finish(offset, T::PIContent, error)
            }
            S::DtdWithinContent => self.scan_dtd_content(offset),
            _ if self.is_doctype_state() => self.scan_doctype(offset),
            _ => self.scan_declaration(offset),
        }
    }

    fn scan_content(&mut self, offset: usize) -> TokenKind {
        use ScannerState as S;
        use TokenKind as T;

        if self.advance_if_byte(b'<') {
            if self.advance_if("!--") {
                self.state = S::WithinComment;
                return self.finish(offset, T::StartCommentTag, None);
            }
            if self.advance_if("![CDATA[") {
                self.state = S::WithinCData;
                return self.finish(offset, T::CDataTagOpen, None);
            }
            if self.advance_if("!DOCTYPE") {
                self.state = S::DtdWithinDoctype;
                return self.finish(offset, T::DtdStartDoctypeTag, None);
            }
            if self.advance_if_byte(b'/') {
                self.state = S::AfterOpeningEndTag;
                return self.finish(offset, T::EndTagOpen, None);
            }
            if self.advance_if_byte(b'?') {
                self.state = S::AfterPIOpen;
                return self.finish(offset, T::StartPrologOrPI, None);
            }
            self.state = S::AfterOpeningStartTag;
            return self.finish(offset, T::StartTagOpen, None);
        }
        self.advance_until_any(b"<");
        self.finish(offset, T::Content, None)
    }

    /// `xml` followed by whitespace, `?`, or the end of input.
    fn is_prolog_name(&self) -> bool {
        self.rest().starts_with(b"xml")
            && self
                .peek_at(3)
                .is_none_or(|b| is_whitespace(b) || b == b'?')
    }

    fn scan_within_tag(&mut self, offset: usize) -> TokenKind {
        use ScannerState as S;
        use TokenKind as T;

        if self.skip_whitespace() {
            self.has_space_after_tag = true;
            return self.finish(offset, T::Whitespace, None);
        }
        if self.in_prolog && self.advance_if("?>") {
            self.in_prolog = false;
            self.state = self.content_state();
            return self.finish(offset, T::PrologEnd, None);
        }
        if self.has_space_after_tag && self.advance_name() {
            self.state = S::AfterAttributeName;
            self.has_space_after_tag = false;
            return self.finish(offset, T::AttributeName, None);
        }
        if !self.in_prolog {
            if self.advance_if("/>") {
                self.state = S::WithinContent;
                return self.finish(offset, T::StartTagSelfClose, None);
            }
            if self.advance_if_byte(b'>') {
                self.state = S::WithinContent;
                return self.finish(offset, T::StartTagClose, None);
            }
        }
        if self.peek() == Some(b'<') {
            self.in_prolog = false;
            self.state = self.content_state();
            return self.internal_scan();
        }
        self.advance_char();
        self.has_space_after_tag = false;
        self.finish(offset, T::Unknown, Some(ScanError::UnexpectedCharacterInTag))
    }

    fn scan_attribute_value(&mut self, offset: usize) -> TokenKind {
        use TokenKind as T;

        if self.skip_whitespace() {
            return self.finish(offset, T::Whitespace, None);
        }
        if let Some(quote) = self.peek().filter(|b| matches!(b, b'"' | b'\'')) {
            self.pos += 1;
            let rest = self.rest();
            let stop = rest.iter().position(|&b| b == quote || b == b'<');
            let error = match stop {
                Some(idx) if rest[idx] == quote => {
                    self.pos += idx + 1;
                    None
                }
                other => {
                    // No closing quote before the next tag: end the value
                    // before the first `>` so the tag can still be closed.
                    let limit = other.unwrap_or(rest.len());
                    let end = rest[..limit]
                        .iter()
                        .position(|&b| b == b'>')
                        .unwrap_or(limit);
                    self.pos += end;
                    Some(ScanError::UnterminatedAttributeValue)
                }
            };
            self.state = self.tag_state();
            self.has_space_after_tag = false;
            return self.finish(offset, T::AttributeValue, error);
        }

        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !is_whitespace(b) && !matches!(b, b'"' | b'\'' | b'`' | b'=' | b'<' | b'>'))
        {
            self.pos += 1;
        }
        // `<a href=http://x/>`: the slash belongs to the self-closing tag.
        if self.peek() == Some(b'>') && self.pos > start + 1 && self.bytes[self.pos - 1] == b'/' {
            self.pos -= 1;
        }
        if self.pos > start && !(self.pos == start + 1 && self.bytes[start] == b'/') {
            self.state = self.tag_state();
            self.has_space_after_tag = false;
            return self.finish(offset, T::AttributeValue, None);
        }
        self.pos = start;
        self.state = self.tag_state();
        self.has_space_after_tag = false;
        self.internal_scan()
    }

    // DTD sub-grammar.

    fn is_doctype_state(&self) -> bool {
        use ScannerState as S;
        matches!(
            self.state,
            S::DtdWithinDoctype
                | S::DtdAfterDoctypeName
                | S::DtdAfterDoctypePublic
                | S::DtdAfterDoctypeSystem
                | S::DtdAfterDoctypePublicId
                | S::DtdAfterDoctypeIds
                | S::DtdAfterInternalSubset
        )
    }

    fn scan_doctype(&mut self, offset: usize) -> TokenKind {
        use ScannerState as S;
        use TokenKind as T;

        if self.skip_whitespace() {
            return self.finish(offset, T::Whitespace, None);
        }
        if self.state != S::DtdAfterInternalSubset && self.advance_if_byte(b'[') {
            self.in_internal_subset = true;
            self.state = S::DtdWithinContent;
            return self.finish(offset, T::DtdStartInternalSubset, None);
        }
        if self.advance_if_byte(b'>') {
            self.in_internal_subset = false;
            self.state = S::WithinContent;
            return self.finish(offset, T::DtdEndDoctypeTag, None);
        }
        if self.peek() == Some(b'<') {
            self.in_internal_subset = false;
            self.state = S::WithinContent;
            return self.internal_scan();
        }

        let state = self.state;
        match state {
            S::DtdWithinDoctype if self.advance_name() => {
                self.state = S::DtdAfterDoctypeName;
                self.finish(offset, T::DtdDoctypeName, None)
            }
            S::DtdAfterDoctypeName if self.advance_if_keyword("PUBLIC") => {
                self.state = S::DtdAfterDoctypePublic;
                self.finish(offset, T::DtdDocTypeKindPublic, None)
            }
            S::DtdAfterDoctypeName if self.advance_if_keyword("SYSTEM") => {
                self.state = S::DtdAfterDoctypeSystem;
                self.finish(offset, T::DtdDocTypeKindSystem, None)
            }
            S::DtdAfterDoctypePublic => match self.advance_literal(b"<>[") {
                Some(closed) => {
                    self.state = S::DtdAfterDoctypePublicId;
                    let error = (!closed).then_some(ScanError::UnterminatedLiteral);
                    self.finish(offset, T::DtdDoctypePublicId, error)
                }
                None => self.unrecognized(offset),
            },
            S::DtdAfterDoctypePublicId | S::DtdAfterDoctypeSystem => {
                match self.advance_literal(b"<>[") {
                    Some(closed) => {
                        self.state = S::DtdAfterDoctypeIds;
                        let error = (!closed).then_some(ScanError::UnterminatedLiteral);
                        self.finish(offset, T::DtdDoctypeSystemId, error)
                    }
                    None => self.unrecognized(offset),
                }
            }
            _ => self.unrecognized(offset),
        }
    }

    fn scan_dtd_content(&mut self, offset: usize) -> TokenKind {
        use ScannerState as S;
        use TokenKind as T;

        if self.skip_whitespace() {
            return self.finish(offset, T::Whitespace, None);
        }
        if self.in_internal_subset && self.advance_if_byte(b']') {
            self.in_internal_subset = false;
            self.state = S::DtdAfterInternalSubset;
            return self.finish(offset, T::DtdEndInternalSubset, None);
        }
        let starts = [
            ("<!ELEMENT", S::DtdWithinElement, T::DtdStartElement),
            ("<!ATTLIST", S::DtdWithinAttlist, T::DtdStartAttlist),
            ("<!ENTITY", S::DtdWithinEntity, T::DtdStartEntity),
            ("<!NOTATION", S::DtdWithinNotation, T::DtdStartNotation),
            ("<!--", S::WithinComment, T::StartCommentTag),
            ("<?", S::AfterPIOpen, T::StartPrologOrPI),
        ];
        for (literal, state, kind) in starts {
            if self.advance_if(literal) {
                self.state = state;
                return self.finish(offset, kind, None);
            }
        }
        // A start or end tag inside an unterminated internal subset ends the DOCTYPE.
        if self.in_internal_subset
            && self.peek() == Some(b'<')
            && self
                .peek_at(1)
                .is_some_and(|b| b == b'/' || is_name_start_byte(b))
        {
            self.in_internal_subset = false;
            self.state = S::WithinContent;
            return self.internal_scan();
        }
        self.advance_if_byte(b'<');
        let stops: &[u8] = if self.in_internal_subset { b"<]" } else { b"<" };
        self.advance_until_any(stops);
        self.finish(offset, T::Content, None)
    }

    /// Shared handling of whitespace and the end of a markup declaration.
    fn scan_declaration_end(&mut self, offset: usize) -> Option<TokenKind> {
        use ScannerState as S;
        use TokenKind as T;

        if self.skip_whitespace() {
            return Some(self.finish(offset, T::Whitespace, None));
        }
        if self.advance_if_byte(b'>') {
            self.state = S::DtdWithinContent;
            return Some(self.finish(offset, T::DtdEndTag, None));
        }
        let subset_end = self.in_internal_subset && self.peek() == Some(b']');
        if self.peek() == Some(b'<') || subset_end {
            self.state = S::DtdWithinContent;
            return Some(self.internal_scan());
        }
        None
    }

    fn unrecognized(&mut self, offset: usize) -> TokenKind {
        let stops: &[u8] = if self.is_doctype_state() {
            b"<>["
        } else if self.in_internal_subset {
            b"<>]"
        } else {
            b"<>"
        };
        self.advance_until_any(stops);
        if self.pos == offset {
            self.advance_char();
        }
        self.finish(
            offset,
            TokenKind::DtdUnrecognizedParameters,
            Some(ScanError::UnrecognizedParameters),
        )
    }

    fn literal_token(&mut self, offset: usize, kind: TokenKind, stops: &[u8]) -> Option<TokenKind> {
        let closed = self.advance_literal(stops)?;
        let error = (!closed).then_some(ScanError::UnterminatedLiteral);
        Some(self.finish(offset, kind, error))
    }

    fn scan_declaration(&mut self, offset: usize) -> TokenKind {
        use ScannerState as S;
        use TokenKind as T;

        if let Some(kind) = self.scan_declaration_end(offset) {
            return kind;
        }

        let state = self.state;
        match state {
            // <!ELEMENT name category | (content)>
            S::DtdWithinElement if self.advance_name() => {
                self.state = S::DtdAfterElementName;
                self.finish(offset, T::DtdElementDeclName, None)
            }
            S::DtdAfterElementName => {
                if self.advance_if_byte(b'(') {
                    self.state = S::DtdWithinElementContent;
                    return self.finish(offset, T::DtdStartElementContent, None);
                }
                if ["EMPTY", "ANY"].iter().any(|kw| self.advance_if_keyword(kw)) {
                    self.state = S::DtdAfterElementContent;
                    return self.finish(offset, T::DtdElementCategory, None);
                }
                self.unrecognized(offset)
            }
            S::DtdWithinElementContent => {
                if self.advance_if_byte(b')') {
                    if self.peek().is_some_and(|b| matches!(b, b'?' | b'*' | b'+')) {
                        self.pos += 1;
                    }
                    self.state = S::DtdAfterElementContent;
                    return self.finish(offset, T::DtdEndElementContent, None);
                }
                let mut depth = 0usize;
                while let Some(b) = self.peek() {
                    match b {
                        b'(' => depth += 1,
                        b')' if depth == 0 => break,
                        b')' => depth -= 1,
                        b'<' | b'>' => break,
                        _ => {}
                    }
                    self.pos += 1;
                }
                if self.pos == offset {
                    self.state = S::DtdAfterElementContent;
                    return self.internal_scan();
                }
                self.finish(offset, T::DtdElementContent, None)
            }

            // <!ATTLIST element (name type default)*>
            S::DtdWithinAttlist if self.advance_name() => {
                self.state = S::DtdAttlistAttributeName;
                self.finish(offset, T::DtdAttlistElementName, None)
            }
            S::DtdAttlistAttributeName if self.advance_name() => {
                self.state = S::DtdAttlistAttributeType;
                self.finish(offset, T::DtdAttlistAttributeName, None)
            }
            S::DtdAttlistAttributeType => {
                let matched = if self.peek() == Some(b'(') {
                    self.advance_group();
                    true
                } else if self.advance_if_keyword("NOTATION") {
                    let after_keyword = self.pos;
                    self.skip_whitespace();
                    if self.peek() == Some(b'(') {
                        self.advance_group();
                    } else {
                        self.pos = after_keyword;
                    }
                    true
                } else {
                    self.advance_name()
                };
                if matched {
                    self.state = S::DtdAttlistAttributeValue;
                    return self.finish(offset, T::DtdAttlistAttributeType, None);
                }
                self.unrecognized(offset)
            }
            S::DtdAttlistAttributeValue => {
                let mut error = None;
                let matched = if self.advance_if_keyword("#FIXED") {
                    let after_keyword = self.pos;
                    self.skip_whitespace();
                    match self.advance_literal(b"<>") {
                        Some(closed) => error = (!closed).then_some(ScanError::UnterminatedLiteral),
                        None => self.pos = after_keyword,
                    }
                    true
                } else if self.advance_if_keyword("#REQUIRED") || self.advance_if_keyword("#IMPLIED") {
                    true
                } else if let Some(closed) = self.advance_literal(b"<>") {
                    error = (!closed).then_some(ScanError::UnterminatedLiteral);
                    true
                } else {
                    false
                };
                if matched {
                    self.state = S::DtdAttlistAttributeName;
                    return self.finish(offset, T::DtdAttlistAttributeValue, error);
                }
                self.unrecognized(offset)
            }

            // <!ENTITY [%] name ("value" | PUBLIC "pub" "sys" | SYSTEM "sys")>
            S::DtdWithinEntity => {
                if self.peek() == Some(b'%') && self.peek_at(1).is_some_and(is_whitespace) {
                    self.pos += 1;
                    return self.finish(offset, T::DtdEntityPercent, None);
                }
                if self.advance_name() {
                    self.state = S::DtdAfterEntityName;
                    return self.finish(offset, T::DtdEntityName, None);
                }
                self.unrecognized(offset)
            }
            S::DtdAfterEntityName => {
                if self.advance_if_keyword("PUBLIC") {
                    self.state = S::DtdAfterEntityPublic;
                    return self.finish(offset, T::DtdEntityKindPublic, None);
                }
                if self.advance_if_keyword("SYSTEM") {
                    self.state = S::DtdAfterEntitySystem;
                    return self.finish(offset, T::DtdEntityKindSystem, None);
                }
                if let Some(kind) = self.literal_token(offset, T::DtdEntityValue, b"") {
                    self.state = S::DtdAfterEntityValue;
                    return kind;
                }
                self.unrecognized(offset)
            }
            S::DtdAfterEntityPublic => {
                if let Some(kind) = self.literal_token(offset, T::DtdEntityPublicId, b"<>") {
                    self.state = S::DtdAfterEntityPublicId;
                    return kind;
                }
                self.unrecognized(offset)
            }
            S::DtdAfterEntityPublicId | S::DtdAfterEntitySystem => {
                if let Some(kind) = self.literal_token(offset, T::DtdEntitySystemId, b"<>") {
                    self.state = S::DtdAfterEntityValue;
                    return kind;
                }
                self.unrecognized(offset)
            }

            // <!NOTATION name (PUBLIC "pub" ["sys"] | SYSTEM "sys")>
            S::DtdWithinNotation if self.advance_name() => {
                self.state = S::DtdAfterNotationName;
                self.finish(offset, T::DtdNotationName, None)
            }
            S::DtdAfterNotationName => {
                if self.advance_if_keyword("PUBLIC") {
                    self.state = S::DtdAfterNotationPublic;
                    return self.finish(offset, T::DtdNotationKindPublic, None);
                }
                if self.advance_if_keyword("SYSTEM") {
                    self.state = S::DtdAfterNotationSystem;
                    return self.finish(offset, T::DtdNotationKindSystem, None);
                }
                self.unrecognized(offset)
            }
            S::DtdAfterNotationPublic => {
                if let Some(kind) = self.literal_token(offset, T::DtdNotationPublicId, b"<>") {
                    self.state = S::DtdAfterNotationPublicId;
                    return kind;
                }
                self.unrecognized(offset)
            }
            S::DtdAfterNotationPublicId | S::DtdAfterNotationSystem => {
                if let Some(kind) = self.literal_token(offset, T::DtdNotationSystemId, b"<>") {
                    self.state = S::DtdAfterNotationIds;
                    return kind;
                }
                self.unrecognized(offset)
            }

            _ => self.unrecognized(offset),
        }
    }

    /// Consume a parenthesized group up to and including its `)`.
    fn advance_group(&mut self) {
        self.pos += 1;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'(' => depth += 1,
                b')' if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                b')' => depth -= 1,
                b'<' | b'>' => return,
                _ => {}
            }
            self.pos += 1;
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields every token including the final [`TokenKind::Eos`].
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        if self.scan_token() == TokenKind::Eos {
            self.finished = true;
        }
        Some(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind as T;

    fn kinds(text: &str) -> Vec<(TokenKind, &str)> {
        let mut scanner = Scanner::new(text);
        let mut out = Vec::new();
        loop {
            let kind = scanner.scan_token();
            if kind == T::Eos {
                break;
            }
            out.push((kind, scanner.token_text()));
        }
        out
    }

    fn dump(text: &str) -> String {
        Scanner::new(text)
            .map(|t| format!("{:?} {}..{}", t.kind, t.start, t.end))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_simple_element() {
        insta::assert_snapshot!(dump("<a>text</a>"), @r"
        StartTagOpen 0..1
        StartTag 1..2
        StartTagClose 2..3
        Content 3..7
        EndTagOpen 7..9
        EndTag 9..10
        EndTagClose 10..11
        Eos 11..11
        ");
    }

    #[test]
    fn test_attributes() {
        assert_eq!(
            kinds("<a x=1 y=\"2\" z >"),
            vec![
                (T::StartTagOpen, "<"),
                (T::StartTag, "a"),
                (T::Whitespace, " "),
                (T::AttributeName, "x"),
                (T::DelimiterAssign, "="),
                (T::AttributeValue, "1"),
                (T::Whitespace, " "),
                (T::AttributeName, "y"),
                (T::DelimiterAssign, "="),
                (T::AttributeValue, "\"2\""),
                (T::Whitespace, " "),
                (T::AttributeName, "z"),
                (T::Whitespace, " "),
                (T::StartTagClose, ">"),
            ]
        );
    }

    #[test]
    fn test_self_closing_with_unquoted_url() {
        assert_eq!(
            kinds("<a href=http://x/>"),
            vec![
                (T::StartTagOpen, "<"),
                (T::StartTag, "a"),
                (T::Whitespace, " "),
                (T::AttributeName, "href"),
                (T::DelimiterAssign, "="),
                (T::AttributeValue, "http://x"),
                (T::StartTagSelfClose, "/>"),
            ]
        );
    }

    #[test]
    fn test_unterminated_quote_stops_before_next_tag() {
        let mut scanner = Scanner::new("<a x=\"1 <b>");
        let mut value = None;
        while scanner.scan_token() != T::Eos {
            if scanner.token_kind() == T::AttributeValue {
                value = Some((scanner.token_text(), scanner.token_error()));
            }
        }
        assert_eq!(
            value,
            Some(("\"1 ", Some(ScanError::UnterminatedAttributeValue)))
        );
        assert_eq!(
            kinds("<a x=\"1 <b>")[6..].iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![T::StartTagOpen, T::StartTag, T::StartTagClose]
        );
    }

    #[test]
    fn test_unterminated_quote_stops_at_tag_close() {
        let tokens = kinds("<a x=\"1>text");
        assert_eq!(tokens[5], (T::AttributeValue, "\"1"));
        assert_eq!(tokens[6], (T::StartTagClose, ">"));
        assert_eq!(tokens[7], (T::Content, "text"));
    }

    #[test]
    fn test_quoted_value_may_contain_gt() {
        let tokens = kinds("<a x='a>b'/>");
        assert_eq!(tokens[5], (T::AttributeValue, "'a>b'"));
        assert_eq!(tokens[6], (T::StartTagSelfClose, "/>"));
    }

    #[test]
    fn test_comment_and_cdata() {
        assert_eq!(
            kinds("<!-- c --><![CDATA[x<y]]>"),
            vec![
                (T::StartCommentTag, "<!--"),
                (T::Comment, " c "),
                (T::EndCommentTag, "-->"),
                (T::CDataTagOpen, "<![CDATA["),
                (T::CDataContent, "x<y"),
                (T::CDataTagClose, "]]>"),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        let mut scanner = Scanner::new("<!-- open <a>");
        assert_eq!(scanner.scan_token(), T::StartCommentTag);
        assert_eq!(scanner.scan_token(), T::Comment);
        assert_eq!(scanner.token_text(), " open <a>");
        assert_eq!(scanner.token_error(), Some(ScanError::UnterminatedComment));
        assert_eq!(scanner.scan_token(), T::Eos);
    }

    #[test]
    fn test_prolog_and_processing_instruction() {
        assert_eq!(
            kinds("<?xml version=\"1.0\"?><?pi data ?>"),
            vec![
                (T::StartPrologOrPI, "<?"),
                (T::PrologName, "xml"),
                (T::Whitespace, " "),
                (T::AttributeName, "version"),
                (T::DelimiterAssign, "="),
                (T::AttributeValue, "\"1.0\""),
                (T::PrologEnd, "?>"),
                (T::StartPrologOrPI, "<?"),
                (T::PIName, "pi"),
                (T::Whitespace, " "),
                (T::PIContent, "data "),
                (T::PIEnd, "?>"),
            ]
        );
    }

    #[test]
    fn test_xml_pi_not_at_start_is_generic() {
        let tokens = kinds(" <?xml version='1.0'?>");
        assert_eq!(tokens[2], (T::PIName, "xml"));
    }

    #[test]
    fn test_end_tag_errors() {
        let mut scanner = Scanner::new("</ a>");
        assert_eq!(scanner.scan_token(), T::EndTagOpen);
        assert_eq!(scanner.scan_token(), T::Whitespace);
        assert_eq!(
            scanner.token_error(),
            Some(ScanError::TagNameMustFollowBracket)
        );
        assert_eq!(scanner.scan_token(), T::EndTag);
        assert_eq!(scanner.scan_token(), T::EndTagClose);
    }

    #[test]
    fn test_unexpected_character_in_tag() {
        let mut scanner = Scanner::new("<a \"b\">");
        let mut errors = Vec::new();
        while scanner.scan_token() != T::Eos {
            if let Some(err) = scanner.token_error() {
                errors.push(err);
            }
        }
        assert_eq!(
            errors,
            vec![
                ScanError::UnexpectedCharacterInTag,
                ScanError::UnexpectedCharacterInTag,
                ScanError::UnexpectedCharacterInTag
            ]
        );
    }

    #[test]
    fn test_doctype_public() {
        assert_eq!(
            kinds("<!DOCTYPE root PUBLIC \"-//X\" \"sys.dtd\">"),
            vec![
                (T::DtdStartDoctypeTag, "<!DOCTYPE"),
                (T::Whitespace, " "),
                (T::DtdDoctypeName, "root"),
                (T::Whitespace, " "),
                (T::DtdDocTypeKindPublic, "PUBLIC"),
                (T::Whitespace, " "),
                (T::DtdDoctypePublicId, "\"-//X\""),
                (T::Whitespace, " "),
                (T::DtdDoctypeSystemId, "\"sys.dtd\""),
                (T::DtdEndDoctypeTag, ">"),
            ]
        );
    }

    #[test]
    fn test_internal_subset() {
        let text = "<!DOCTYPE a [\n<!ELEMENT a (#PCDATA|b)*>\n<!ATTLIST a id ID #REQUIRED v CDATA #FIXED \"1\">\n<!ENTITY % e \"<b/>\">\n<!NOTATION n SYSTEM \"x\">\n]>";
        let tokens: Vec<_> = kinds(text)
            .into_iter()
            .filter(|(k, _)| *k != T::Whitespace)
            .collect();
        assert_eq!(
            tokens,
            vec![
                (T::DtdStartDoctypeTag, "<!DOCTYPE"),
                (T::DtdDoctypeName, "a"),
                (T::DtdStartInternalSubset, "["),
                (T::DtdStartElement, "<!ELEMENT"),
                (T::DtdElementDeclName, "a"),
                (T::DtdStartElementContent, "("),
                (T::DtdElementContent, "#PCDATA|b"),
                (T::DtdEndElementContent, ")*"),
                (T::DtdEndTag, ">"),
                (T::DtdStartAttlist, "<!ATTLIST"),
                (T::DtdAttlistElementName, "a"),
                (T::DtdAttlistAttributeName, "id"),
                (T::DtdAttlistAttributeType, "ID"),
                (T::DtdAttlistAttributeValue, "#REQUIRED"),
                (T::DtdAttlistAttributeName, "v"),
                (T::DtdAttlistAttributeType, "CDATA"),
                (T::DtdAttlistAttributeValue, "#FIXED \"1\""),
                (T::DtdEndTag, ">"),
                (T::DtdStartEntity, "<!ENTITY"),
                (T::DtdEntityPercent, "%"),
                (T::DtdEntityName, "e"),
                (T::DtdEntityValue, "\"<b/>\""),
                (T::DtdEndTag, ">"),
                (T::DtdStartNotation, "<!NOTATION"),
                (T::DtdNotationName, "n"),
                (T::DtdNotationKindSystem, "SYSTEM"),
                (T::DtdNotationSystemId, "\"x\""),
                (T::DtdEndTag, ">"),
                (T::DtdEndInternalSubset, "]"),
                (T::DtdEndDoctypeTag, ">"),
            ]
        );
    }

    #[test]
    fn test_dtd_file_mode() {
        let mut scanner = Scanner::for_dtd("<!ELEMENT note EMPTY>\n<!-- c -->");
        let tokens: Vec<_> = std::iter::from_fn(|| {
            let kind = scanner.scan_token();
            (kind != T::Eos).then(|| (kind, scanner.token_text()))
        })
        .filter(|(k, _)| *k != T::Whitespace)
        .collect();
        assert_eq!(
            tokens,
            vec![
                (T::DtdStartElement, "<!ELEMENT"),
                (T::DtdElementDeclName, "note"),
                (T::DtdElementCategory, "EMPTY"),
                (T::DtdEndTag, ">"),
                (T::StartCommentTag, "<!--"),
                (T::Comment, " c "),
                (T::EndCommentTag, "-->"),
            ]
        );
    }

    #[test]
    fn test_unrecognized_dtd_parameters() {
        let mut scanner = Scanner::for_dtd("<!ELEMENT a EMPTY junk>");
        let mut seen = Vec::new();
        while scanner.scan_token() != T::Eos {
            seen.push((scanner.token_kind(), scanner.token_text()));
        }
        assert!(seen.contains(&(T::DtdUnrecognizedParameters, "junk")));
        assert_eq!(seen.last(), Some(&(T::DtdEndTag, ">")));
    }

    #[test]
    fn test_declaration_interrupted_by_next_declaration() {
        let tokens: Vec<_> = kinds("<!DOCTYPE a [<!ELEMENT a <!ELEMENT b EMPTY>]><a/>")
            .into_iter()
            .map(|(k, _)| k)
            .filter(|k| *k != T::Whitespace)
            .collect();
        assert_eq!(
            tokens,
            vec![
                T::DtdStartDoctypeTag,
                T::DtdDoctypeName,
                T::DtdStartInternalSubset,
                T::DtdStartElement,
                T::DtdElementDeclName,
                T::DtdStartElement,
                T::DtdElementDeclName,
                T::DtdElementCategory,
                T::DtdEndTag,
                T::DtdEndInternalSubset,
                T::DtdEndDoctypeTag,
                T::StartTagOpen,
                T::StartTag,
                T::StartTagSelfClose,
            ]
        );
    }

    #[test]
    fn test_restart_with_state() {
        let text = "<root><child attr='v'></child></root>";
        let mut scanner = Scanner::with_state(text, 6, ScannerState::WithinContent);
        assert_eq!(scanner.scan_token(), T::StartTagOpen);
        assert_eq!(scanner.token_offset(), 6);
        assert_eq!(scanner.scan_token(), T::StartTag);
        assert_eq!(scanner.token_text(), "child");
    }

    #[test]
    fn test_tokens_cover_input() {
        let text = "<?xml version='1.0'?>\n<!DOCTYPE r [<!ENTITY x 'é'>]>\n<r a='ü'>héllo<!--c--><x/></r>";
        let tokens: Vec<Token> = Scanner::new(text).collect();
        let mut expected = 0;
        for token in &tokens {
            assert_eq!(token.start, expected, "gap before {:?}", token.kind);
            assert!(text.is_char_boundary(token.end));
            expected = token.end;
        }
        assert_eq!(expected, text.len());
        assert_eq!(tokens.last().map(|t| t.kind), Some(T::Eos));
    }

    #[test]
    fn test_manual_scanning_then_iteration() {
        let mut scanner = Scanner::new("<!DOCTYPE r SYSTEM 'r.dtd'><r/>");
        assert_eq!(scanner.scan_token(), T::DtdStartDoctypeTag);
        assert_eq!(scanner.scan_token(), T::Whitespace);
        assert_eq!(scanner.scan_token(), T::DtdDoctypeName);
        let rest: Vec<TokenKind> = scanner.map(|t| t.kind).collect();
        assert_eq!(rest.first(), Some(&T::Whitespace));
        assert!(rest.contains(&T::DtdDocTypeKindSystem));
        assert!(rest.contains(&T::DtdDoctypeSystemId));
        assert_eq!(rest.last(), Some(&T::Eos));
    }
}
