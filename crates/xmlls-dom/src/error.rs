//! Error types for scanning and position conversion.
//!
//! Nothing in the scanner or the DOM builder fails: malformed input is
//! reported per token through [`ScanError`] and the tree is always built.
//! The only fallible operations are conversions between byte offsets and
//! line/character positions, which report [`BadLocation`].

use thiserror::Error;

/// A position or offset that does not denote a location in the document.
///
/// This is expected for stale positions sent by an editor while the text
/// is being changed, so callers are required to handle it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadLocation {
    #[error("line {line} is out of range (document has {line_count} lines)")]
    LineOutOfRange { line: u32, line_count: usize },

    #[error("character {character} is out of range on line {line}")]
    CharacterOutOfRange { line: u32, character: u32 },

    #[error("offset {offset} is out of range (document length is {length})")]
    OffsetOutOfRange { offset: usize, length: usize },

    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

/// Anomaly attached to a single token by the scanner.
///
/// The messages match the wording editors show for these problems.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanError {
    #[error("Tag name must directly follow the open bracket.")]
    TagNameMustFollowBracket,

    #[error("Unexpected character in tag.")]
    UnexpectedCharacterInTag,

    #[error("Closing bracket expected.")]
    ClosingBracketExpected,

    #[error("Comment is not closed.")]
    UnterminatedComment,

    #[error("CDATA section is not closed.")]
    UnterminatedCData,

    #[error("Processing instruction is not closed.")]
    UnterminatedProcessingInstruction,

    #[error("Attribute value is not closed.")]
    UnterminatedAttributeValue,

    #[error("Quoted literal is not closed.")]
    UnterminatedLiteral,

    #[error("Unrecognized parameters in declaration.")]
    UnrecognizedParameters,

    #[error("Unexpected character.")]
    UnexpectedCharacter,
}
