//! In-memory document store

use crate::types::Document;
use std::sync::Arc;

/// Read-only collection of loaded documents.
///
/// Built once and never mutated, so it can be shared across concurrent
/// queries behind an `Arc`.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Arc<Document>>,
}

pub type SharedDocumentStore = Arc<DocumentStore>;

impl DocumentStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into_iter().map(Arc::new).collect(),
        }
    }

    /// All documents in load order
    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl From<Vec<Document>> for DocumentStore {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_preserves_load_order() {
        let store = DocumentStore::new(vec![
            Document::new("first", "b.md"),
            Document::new("second", "a.md"),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.documents()[0].text, "first");
        assert_eq!(store.documents()[1].text, "second");
    }
}
