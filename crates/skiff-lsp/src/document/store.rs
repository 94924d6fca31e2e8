use dashmap::DashMap;
use skiff_syntax::SourceText;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Document;

/// Open documents, keyed by canonical filesystem path so overlay lookups
/// during analysis agree with the URIs the client sends.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<PathBuf, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    pub fn open(&self, path: PathBuf, uri: String, version: i32, content: String) {
        self.documents
            .insert(path, Document::new(uri, version, content));
    }

    pub fn update(&self, path: &Path, version: i32, content: String) -> bool {
        if let Some(mut doc) = self.documents.get_mut(path) {
            doc.update(version, content);
            true
        } else {
            false
        }
    }

    pub fn close(&self, path: &Path) -> Option<Document> {
        self.documents.remove(path).map(|(_, doc)| doc)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    /// Snapshot of the open text for a path. Cheap to clone; analysis
    /// holds the snapshot so later edits cannot shift its offsets.
    pub fn text(&self, path: &Path) -> Option<SourceText> {
        self.documents.get(path).map(|doc| doc.text.clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn with_document_mut<F, R>(&self, path: &Path, f: F) -> Option<R>
    where
        F: FnOnce(&mut Document) -> R,
    {
        self.documents.get_mut(path).map(|mut doc| f(&mut doc))
    }
}

pub type SharedDocumentStore = Arc<DocumentStore>;
