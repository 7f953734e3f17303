//! Open documents, parsed once per change.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use xmlls_dom::{Document, parse};

use crate::registry::DocumentProvider;

#[derive(Debug)]
struct Entry {
    version: i32,
    document: Arc<Document>,
}

/// In-memory store of the documents opened by the client.
///
/// Documents are parsed when opened or changed and shared as
/// `Arc<Document>`, so a request keeps working on the version it started
/// with while the store moves on. The store is a [`DocumentProvider`],
/// which lets extensions resolve references to other open documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<String, Entry>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace a document.
    pub fn open(&self, uri: impl Into<String>, text: impl Into<String>, version: i32) -> Arc<Document> {
        let uri = uri.into();
        let document = Arc::new(parse(text, uri.clone()));
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                uri,
                Entry {
                    version,
                    document: document.clone(),
                },
            );
        document
    }

    /// Replace the text of an open document. Stale versions are ignored.
    pub fn change(&self, uri: &str, text: impl Into<String>, version: i32) -> Option<Arc<Document>> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = documents.get_mut(uri)?;
        if version < entry.version {
            tracing::debug!(uri, version, current = entry.version, "ignoring stale change");
            return None;
        }
        entry.version = version;
        entry.document = Arc::new(parse(text, uri));
        Some(entry.document.clone())
    }

    pub fn close(&self, uri: &str) -> bool {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
            .is_some()
    }

    pub fn get(&self, uri: &str) -> Option<Arc<Document>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .map(|e| e.document.clone())
    }

    pub fn version(&self, uri: &str) -> Option<i32> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .map(|e| e.version)
    }

    /// URIs of the open documents, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        uris.sort();
        uris
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentProvider for DocumentStore {
    fn document(&self, uri: &str) -> Option<Arc<Document>> {
        self.get(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_change_close() {
        let store = DocumentStore::new();
        assert!(store.is_empty());

        store.open("file:///a.xml", "<a/>", 1);
        assert!(store.contains("file:///a.xml"));
        assert_eq!(store.version("file:///a.xml"), Some(1));
        let first = store.get("file:///a.xml").unwrap();

        let changed = store.change("file:///a.xml", "<b/>", 2).unwrap();
        assert_eq!(changed.document_element().unwrap().tag_name(), Some("b"));
        // The earlier snapshot is unaffected.
        assert_eq!(first.document_element().unwrap().tag_name(), Some("a"));

        assert!(store.change("file:///a.xml", "<c/>", 1).is_none());
        assert!(store.change("file:///missing.xml", "<c/>", 1).is_none());

        assert_eq!(store.uris(), vec!["file:///a.xml".to_string()]);
        assert!(store.close("file:///a.xml"));
        assert!(!store.close("file:///a.xml"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_is_a_document_provider() {
        let store = DocumentStore::new();
        store.open("file:///grammar.dtd", "<!ELEMENT a EMPTY>", 0);
        let provider: &dyn DocumentProvider = &store;
        let doc = provider.document("file:///grammar.dtd").unwrap();
        assert!(doc.is_dtd());
        assert!(provider.document("file:///other.dtd").is_none());
    }
}
