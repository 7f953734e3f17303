//! Tolerant, source-mapped XML and DTD parsing.
//!
//! This crate turns XML text into a tree that represents the document as
//! typed, including incomplete and malformed constructs. Every node keeps
//! the byte offsets of its tags, names, and values, so editor features can
//! map a cursor back to the markup under it.
//!
//! - [`Scanner`] is a restartable tokenizer over XML and DTD markup.
//! - [`parse`] builds a [`Document`] from the token stream.
//! - [`NodeRef`], [`ElementRef`] and [`AttrRef`] navigate the tree.
//! - [`LineIndex`] converts between byte offsets and LSP positions.
//!
//! # Example
//!
//! ```rust
//! use xmlls_dom::parse;
//!
//! let doc = parse("<root><child a=\"1\"/></root>", "file:///doc.xml");
//! let root = doc.document_element().unwrap();
//! assert_eq!(root.tag_name(), Some("root"));
//!
//! let node = doc.find_node_at(8);
//! assert_eq!(node.node_name(), Some("child"));
//! assert_eq!(node.attribute("a"), Some("1"));
//! ```

pub mod document;
pub mod dtd;
pub mod error;
pub mod node;
pub mod parser;
pub mod position;
pub mod scanner;
pub mod token;

pub use document::{Document, XML_SCHEMA_NS, is_dtd_uri};
pub use dtd::{
    AttlistDecl, AttlistDef, DeclParam, DocumentType, ElementDecl, EntityDecl, ExternalIdKind,
    NotationDecl,
};
pub use error::{BadLocation, ScanError};
pub use node::{
    Attr, AttrRef, Element, ElementRef, Leaf, NodeId, NodeKind, NodeRef, ProcessingInstruction,
};
pub use parser::parse;
pub use position::{LineIndex, Position, Range, Span};
pub use scanner::Scanner;
pub use token::{ScannerState, Token, TokenKind};
