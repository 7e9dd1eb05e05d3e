use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentPatch, IndexError, NoteDocument, NoteFilter, SearchIndex};

/// In-process index for single-node setups and tests.
///
/// Text queries match when every whitespace-separated term occurs,
/// case-insensitively, in the title, body or attachment text.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    docs: RwLock<HashMap<String, NoteDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<NoteDocument> {
        self.docs.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn matches(doc: &NoteDocument, filter: &NoteFilter) -> bool {
    match filter {
        NoteFilter::MatchAll => true,
        NoteFilter::Notebook(id) => doc.notebook == id.to_string(),
        NoteFilter::Text(query) => {
            let haystack = format!(
                "{}\n{}\n{}",
                doc.title,
                doc.body,
                doc.attachment_content.as_deref().unwrap_or_default()
            )
            .to_lowercase();
            query
                .split_whitespace()
                .all(|term| haystack.contains(&term.to_lowercase()))
        }
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn put_document(&self, id: &str, doc: &NoteDocument) -> Result<(), IndexError> {
        self.docs.write().await.insert(id.to_owned(), doc.clone());
        Ok(())
    }

    async fn patch_document(&self, id: &str, patch: &DocumentPatch) -> Result<(), IndexError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| IndexError::MissingDocument(id.to_owned()))?;
        if let Some(title) = &patch.title {
            doc.title = title.clone();
        }
        if let Some(body) = &patch.body {
            doc.body = body.clone();
        }
        if let Some(updated_at) = patch.updated_at {
            doc.updated_at = updated_at;
        }
        Ok(())
    }

    async fn drop_all(&self) -> Result<(), IndexError> {
        self.docs.write().await.clear();
        Ok(())
    }

    async fn search(&self, filter: &NoteFilter) -> Result<Vec<String>, IndexError> {
        let docs = self.docs.read().await;
        let mut hits: Vec<&NoteDocument> = docs.values().filter(|d| matches(d, filter)).collect();
        hits.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(hits.into_iter().map(|d| d.id.clone()).collect())
    }
}
