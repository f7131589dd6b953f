use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::{Document, DocumentId, DocumentKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("document {0} not found")]
    NotFound(DocumentId),
}

#[derive(Default)]
struct Inner {
    next_id: DocumentId,
    documents: HashMap<DocumentId, Document>,
}

#[derive(Default)]
pub struct ContentRepository {
    inner: RwLock<Inner>,
}

impl ContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, kind: DocumentKind, title: &str, body: &str, author: &str) -> Document {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let document = Document {
            id: inner.next_id,
            kind,
            title: title.to_string(),
            body: body.to_string(),
            author: author.to_string(),
            meta: HashMap::new(),
        };
        inner.documents.insert(document.id, document.clone());
        document
    }

    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.inner.read().documents.get(&id).cloned()
    }

    pub fn exists(&self, id: DocumentId) -> bool {
        self.inner.read().documents.contains_key(&id)
    }

    /// Raw write. Never dispatches save hooks.
    pub fn update_body(&self, id: DocumentId, body: String) -> Result<(), ContentError> {
        let mut inner = self.inner.write();
        let document = inner
            .documents
            .get_mut(&id)
            .ok_or(ContentError::NotFound(id))?;
        document.body = body;
        Ok(())
    }

    pub fn update_title(&self, id: DocumentId, title: String) -> Result<(), ContentError> {
        let mut inner = self.inner.write();
        let document = inner
            .documents
            .get_mut(&id)
            .ok_or(ContentError::NotFound(id))?;
        document.title = title;
        Ok(())
    }

    pub fn meta(&self, id: DocumentId, key: &str) -> Option<String> {
        self.inner
            .read()
            .documents
            .get(&id)
            .and_then(|d| d.meta.get(key).cloned())
    }

    pub fn set_meta(&self, id: DocumentId, key: &str, value: &str) -> Result<(), ContentError> {
        let mut inner = self.inner.write();
        let document = inner
            .documents
            .get_mut(&id)
            .ok_or(ContentError::NotFound(id))?;
        document.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
