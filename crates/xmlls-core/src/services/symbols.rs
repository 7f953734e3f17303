//! Document symbols for the outline.
//!
//! Elements become `Field` symbols (`Object` when they have child
//! elements), processing instructions and the prolog `Property`, the
//! DOCTYPE a `Struct` holding its internal subset, and DTD declarations
//! `Key` (ELEMENT), `Constant` (one per ATTLIST attribute) or `Variable`
//! (ENTITY, NOTATION). In a DTD file the declarations are top-level.
//!
//! # Example
//!
//! ```rust
//! use xmlls_core::{NeverCancel, SharedSettings, XmlSymbols};
//!
//! let doc = xmlls_dom::parse("<root><item/></root>", "file:///a.xml");
//! let symbols =
//!     XmlSymbols::new().find_document_symbols(&doc, &SharedSettings::default(), &NeverCancel);
//! assert_eq!(symbols[0].name, "root");
//! assert_eq!(symbols[0].children[0].name, "item");
//! ```

use xmlls_dom::{Document, NodeRef, Span};

use crate::cancel::CancelChecker;
use crate::settings::SharedSettings;
use crate::types::{DocumentSymbol, Location, SymbolInformation, SymbolKind};

#[derive(Debug, Default)]
pub struct XmlSymbols;

impl XmlSymbols {
    pub fn new() -> Self {
        Self
    }

    /// Hierarchical symbols, empty when symbols are disabled or the
    /// document is excluded.
    pub fn find_document_symbols(
        &self,
        document: &Document,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Vec<DocumentSymbol> {
        let mut symbols = Vec::new();
        if !settings.symbols.enabled || settings.symbols.is_excluded(document.uri()) {
            return symbols;
        }
        collect_children(document.root(), &mut symbols, cancel);
        symbols
    }

    /// The same symbols, flattened, each naming its container.
    pub fn find_symbol_informations(
        &self,
        document: &Document,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Vec<SymbolInformation> {
        let mut informations = Vec::new();
        for symbol in self.find_document_symbols(document, settings, cancel) {
            flatten(symbol, None, document.uri(), &mut informations);
        }
        informations
    }
}

fn collect_children(node: NodeRef<'_>, symbols: &mut Vec<DocumentSymbol>, cancel: &dyn CancelChecker) {
    for child in node.children() {
        if cancel.is_cancelled() {
            return;
        }
        push_symbols(child, symbols, cancel);
    }
}

fn push_symbols(node: NodeRef<'_>, symbols: &mut Vec<DocumentSymbol>, cancel: &dyn CancelChecker) {
    let document = node.owner_document();
    let Ok(range) = document.range_of(node.span()) else {
        return;
    };
    let selection = |span: Option<Span>| {
        span.and_then(|s| document.range_of(s).ok())
            .unwrap_or(range)
    };

    if let Some(element) = node.as_element() {
        let mut children = Vec::new();
        collect_children(node, &mut children, cancel);
        let kind = if element.child_elements().next().is_some() {
            SymbolKind::Object
        } else {
            SymbolKind::Field
        };
        let name = element.tag_name().unwrap_or("?");
        symbols.push(
            DocumentSymbol::new(name, kind, range, selection(element.tag_name_span()))
                .with_children(children),
        );
    } else if let Some(pi) = node.as_processing_instruction() {
        let name = pi.target().unwrap_or("?");
        symbols.push(DocumentSymbol::new(
            name,
            SymbolKind::Property,
            range,
            selection(pi.target_span()),
        ));
    } else if let Some(doctype) = node.as_doctype() {
        let mut children = Vec::new();
        collect_children(node, &mut children, cancel);
        if doctype.is_synthetic() {
            symbols.extend(children);
        } else {
            let name = format!("DOCTYPE:{}", doctype.name().unwrap_or_default());
            let name_span = doctype.name_param().map(|p| p.span);
            symbols.push(
                DocumentSymbol::new(name, SymbolKind::Struct, range, selection(name_span))
                    .with_children(children),
            );
        }
    } else if let Some(decl) = node.as_element_decl() {
        if let Some(name) = decl.name() {
            let span = decl.name_param().map(|p| p.span);
            symbols.push(DocumentSymbol::new(name, SymbolKind::Key, range, selection(span)));
        }
    } else if let Some(decl) = node.as_attlist_decl() {
        for def in decl.definitions() {
            let Some(name) = def.name() else {
                continue;
            };
            let span = def.name_param().map(|p| p.span);
            let mut symbol = DocumentSymbol::new(name, SymbolKind::Constant, range, selection(span));
            if let Some(element_name) = decl.element_name() {
                symbol = symbol.with_detail(element_name);
            }
            symbols.push(symbol);
        }
    } else if let Some(decl) = node.as_entity_decl() {
        if let Some(name) = decl.name() {
            let span = decl.name_param().map(|p| p.span);
            symbols.push(DocumentSymbol::new(name, SymbolKind::Variable, range, selection(span)));
        }
    } else if let Some(decl) = node.as_notation_decl()
        && let Some(name) = decl.name()
    {
        let span = decl.name_param().map(|p| p.span);
        symbols.push(DocumentSymbol::new(name, SymbolKind::Variable, range, selection(span)));
    }
}

fn flatten(
    symbol: DocumentSymbol,
    container: Option<&str>,
    uri: &str,
    informations: &mut Vec<SymbolInformation>,
) {
    informations.push(SymbolInformation {
        name: symbol.name.clone(),
        kind: symbol.kind,
        location: Location::new(uri, symbol.range),
        container_name: container.map(str::to_string),
    });
    for child in symbol.children {
        flatten(child, Some(&symbol.name), uri, informations);
    }
}
