//! Token kinds and scanner states.

use crate::error::ScanError;
use serde::Serialize;

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    StartCommentTag,
    Comment,
    EndCommentTag,
    CDataTagOpen,
    CDataContent,
    CDataTagClose,
    StartTagOpen,
    StartTagClose,
    StartTagSelfClose,
    StartTag,
    EndTagOpen,
    EndTagClose,
    EndTag,
    DelimiterAssign,
    AttributeName,
    AttributeValue,
    StartPrologOrPI,
    PrologName,
    PIName,
    PIContent,
    PIEnd,
    PrologEnd,
    Content,
    Whitespace,
    Unknown,
    Eos,

    // DOCTYPE
    DtdStartDoctypeTag,
    DtdDoctypeName,
    DtdDocTypeKindPublic,
    DtdDocTypeKindSystem,
    DtdDoctypePublicId,
    DtdDoctypeSystemId,
    DtdEndDoctypeTag,
    DtdStartInternalSubset,
    DtdEndInternalSubset,

    // <!ELEMENT
    DtdStartElement,
    DtdElementDeclName,
    DtdElementCategory,
    DtdStartElementContent,
    DtdElementContent,
    DtdEndElementContent,

    // <!ATTLIST
    DtdStartAttlist,
    DtdAttlistElementName,
    DtdAttlistAttributeName,
    DtdAttlistAttributeType,
    DtdAttlistAttributeValue,

    // <!ENTITY
    DtdStartEntity,
    DtdEntityPercent,
    DtdEntityName,
    DtdEntityValue,
    DtdEntityKindPublic,
    DtdEntityKindSystem,
    DtdEntityPublicId,
    DtdEntitySystemId,

    // <!NOTATION
    DtdStartNotation,
    DtdNotationName,
    DtdNotationKindPublic,
    DtdNotationKindSystem,
    DtdNotationPublicId,
    DtdNotationSystemId,

    DtdUnrecognizedParameters,
    DtdEndTag,
}

impl TokenKind {
    /// True for every token produced by the DTD sub-grammar.
    pub fn is_dtd(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            DtdStartDoctypeTag
                | DtdDoctypeName
                | DtdDocTypeKindPublic
                | DtdDocTypeKindSystem
                | DtdDoctypePublicId
                | DtdDoctypeSystemId
                | DtdEndDoctypeTag
                | DtdStartInternalSubset
                | DtdEndInternalSubset
                | DtdStartElement
                | DtdElementDeclName
                | DtdElementCategory
                | DtdStartElementContent
                | DtdElementContent
                | DtdEndElementContent
                | DtdStartAttlist
                | DtdAttlistElementName
                | DtdAttlistAttributeName
                | DtdAttlistAttributeType
                | DtdAttlistAttributeValue
                | DtdStartEntity
                | DtdEntityPercent
                | DtdEntityName
                | DtdEntityValue
                | DtdEntityKindPublic
                | DtdEntityKindSystem
                | DtdEntityPublicId
                | DtdEntitySystemId
                | DtdStartNotation
                | DtdNotationName
                | DtdNotationKindPublic
                | DtdNotationKindSystem
                | DtdNotationPublicId
                | DtdNotationSystemId
                | DtdUnrecognizedParameters
                | DtdEndTag
        )
    }
}

/// Scanner state between two tokens.
///
/// Exposed so that a caller can restart a scan in the middle of a document
/// (for instance at the start of a tag) with [`crate::Scanner::with_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerState {
    WithinContent,
    AfterOpeningStartTag,
    AfterOpeningEndTag,
    WithinTag,
    WithinEndTag,
    AfterAttributeName,
    BeforeAttributeValue,
    WithinComment,
    WithinCData,
    AfterPIOpen,
    WithinPI,
    WithinPrologAttributes,

    DtdWithinDoctype,
    DtdAfterDoctypeName,
    DtdAfterDoctypePublic,
    DtdAfterDoctypeSystem,
    DtdAfterDoctypePublicId,
    DtdAfterDoctypeIds,
    DtdAfterInternalSubset,
    DtdWithinContent,

    DtdWithinElement,
    DtdAfterElementName,
    DtdWithinElementContent,
    DtdAfterElementContent,

    DtdWithinAttlist,
    DtdAttlistAttributeName,
    DtdAttlistAttributeType,
    DtdAttlistAttributeValue,

    DtdWithinEntity,
    DtdAfterEntityName,
    DtdAfterEntityPublic,
    DtdAfterEntitySystem,
    DtdAfterEntityPublicId,
    DtdAfterEntityValue,

    DtdWithinNotation,
    DtdAfterNotationName,
    DtdAfterNotationPublic,
    DtdAfterNotationSystem,
    DtdAfterNotationPublicId,
    DtdAfterNotationIds,
}

/// A token with its byte span and optional anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    #[serde(skip)]
    pub error: Option<ScanError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtd_kinds() {
        assert!(TokenKind::DtdStartDoctypeTag.is_dtd());
        assert!(TokenKind::DtdEndTag.is_dtd());
        assert!(!TokenKind::StartTagOpen.is_dtd());
        assert!(!TokenKind::Eos.is_dtd());
    }
}
