//! In-memory document store for one session.
//!
//! Every mutation publishes a fresh snapshot. Records that a mutation does not
//! touch are carried over by `Arc`, so consumers can compare identity across
//! snapshots, and a snapshot already handed out never changes.

use crate::error::{FolioError, Result};
use crate::models::{Document, Origin};
use std::collections::HashSet;
use std::sync::Arc;

pub type Snapshot = Arc<Vec<Arc<Document>>>;

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Snapshot,
    selected: Option<String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot of the collection.
    pub fn documents(&self) -> Snapshot {
        self.documents.clone()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.documents.iter().find(|doc| doc.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.iter().any(|doc| doc.id == id)
    }

    pub fn add_document(&mut self, document: Document) -> Result<Arc<Document>> {
        if self.contains(&document.id) {
            return Err(FolioError::DuplicateId(document.id));
        }
        let document = Arc::new(document);
        let mut next = Vec::with_capacity(self.documents.len() + 1);
        next.extend(self.documents.iter().cloned());
        next.push(document.clone());
        self.documents = Arc::new(next);
        Ok(document)
    }

    /// Select a stored document. Unknown ids leave the current selection alone.
    pub fn select(&mut self, id: &str) -> Result<()> {
        if !self.contains(id) {
            return Err(FolioError::DocumentNotFound(id.to_string()));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Selected id, if it still refers to a stored document.
    pub fn selected_id(&self) -> Option<&str> {
        self.selected
            .as_deref()
            .filter(|id| self.contains(id))
    }

    pub fn selected_document(&self) -> Option<Arc<Document>> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn update_summary(&mut self, id: &str, summary: &str) -> Result<Arc<Document>> {
        self.update_document(id, |doc| {
            doc.summary = summary.to_string();
            Ok(())
        })
    }

    /// Copy-on-write update of one record. The closure may reject the change,
    /// in which case the snapshot is left as it was.
    pub(crate) fn update_document<F>(&mut self, id: &str, apply: F) -> Result<Arc<Document>>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        let index = self
            .documents
            .iter()
            .position(|doc| doc.id == id)
            .ok_or_else(|| FolioError::DocumentNotFound(id.to_string()))?;

        let mut updated = Document::clone(&self.documents[index]);
        apply(&mut updated)?;
        let updated = Arc::new(updated);

        let mut next: Vec<Arc<Document>> = self.documents.iter().cloned().collect();
        next[index] = updated.clone();
        self.documents = Arc::new(next);
        Ok(updated)
    }

    /// Swap the whole remote subset for `remote`, keeping local records by
    /// identity. Locals come first in their existing order, then remotes in
    /// listing order. Returns the number of remote records kept.
    pub fn replace_remote(&mut self, remote: Vec<Document>) -> usize {
        let locals: Vec<Arc<Document>> = self
            .documents
            .iter()
            .filter(|doc| doc.origin == Origin::Local)
            .cloned()
            .collect();

        let mut seen: HashSet<String> = locals.iter().map(|doc| doc.id.clone()).collect();
        let mut next = locals;
        let mut kept = 0;

        for mut doc in remote {
            if !seen.insert(doc.id.clone()) {
                tracing::warn!(id = %doc.id, "Dropping remote document with duplicate id");
                continue;
            }
            doc.origin = Origin::Remote;
            next.push(Arc::new(doc));
            kept += 1;
        }

        self.documents = Arc::new(next);
        if self.selected.as_deref().is_some_and(|id| !self.contains(id)) {
            self.selected = None;
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteFile;

    fn remote(id: &str) -> Document {
        let file = RemoteFile {
            id: id.to_string(),
            name: format!("{}.pdf", id),
            web_view_link: Some(format!("https://drive.google.com/file/d/{}/view", id)),
            shared: None,
        };
        Document::from_remote(&file, "user-1")
    }

    fn local(id: &str) -> Document {
        let mut doc = Document::local(&format!("{}.pdf", id));
        doc.id = id.to_string();
        doc
    }

    fn ids(store: &DocumentStore) -> Vec<String> {
        store.documents().iter().map(|d| d.id.clone()).collect()
    }

    #[test]
    fn test_add_document_appends_in_order() {
        let mut store = DocumentStore::new();
        store.add_document(local("a")).unwrap();
        store.add_document(remote("b")).unwrap();
        assert_eq!(ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_add_document_rejects_duplicate_id() {
        let mut store = DocumentStore::new();
        store.add_document(local("a")).unwrap();
        let err = store.add_document(remote("a")).unwrap_err();
        assert!(matches!(err, FolioError::DuplicateId(id) if id == "a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_select_unknown_keeps_previous_selection() {
        let mut store = DocumentStore::new();
        store.add_document(local("a")).unwrap();
        store.select("a").unwrap();

        let err = store.select("missing").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.selected_id(), Some("a"));
        assert_eq!(store.selected_document().unwrap().id, "a");
    }

    #[test]
    fn test_selected_document_none_without_selection() {
        let mut store = DocumentStore::new();
        store.add_document(local("a")).unwrap();
        assert!(store.selected_document().is_none());
        store.select("a").unwrap();
        store.clear_selection();
        assert!(store.selected_id().is_none());
    }

    #[test]
    fn test_update_summary_replaces_only_target() {
        let mut store = DocumentStore::new();
        store.add_document(local("a")).unwrap();
        store.add_document(local("b")).unwrap();
        let before = store.documents();

        store.update_summary("b", "short version").unwrap();

        let after = store.documents();
        assert_eq!(after[1].summary, "short version");
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        // Old snapshot is untouched
        assert_eq!(before[1].summary, "");
    }

    #[test]
    fn test_update_summary_unknown_id() {
        let mut store = DocumentStore::new();
        let err = store.update_summary("nope", "x").unwrap_err();
        assert!(matches!(err, FolioError::DocumentNotFound(_)));
    }

    #[test]
    fn test_failed_update_leaves_snapshot() {
        let mut store = DocumentStore::new();
        store.add_document(local("a")).unwrap();
        let before = store.documents();
        let result = store.update_document("a", |_| Err(FolioError::EmptyNote));
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &store.documents()));
    }

    #[test]
    fn test_replace_remote_keeps_locals_by_identity() {
        let mut store = DocumentStore::new();
        store.add_document(local("L1")).unwrap();
        store.select("L1").unwrap();
        let l1 = store.get("L1").unwrap();

        let kept = store.replace_remote(vec![remote("R1"), remote("R2")]);

        assert_eq!(kept, 2);
        assert_eq!(ids(&store), vec!["L1", "R1", "R2"]);
        assert!(Arc::ptr_eq(&l1, &store.get("L1").unwrap()));
        assert_eq!(store.selected_id(), Some("L1"));
    }

    #[test]
    fn test_replace_remote_places_locals_first() {
        let mut store = DocumentStore::new();
        store.add_document(remote("R0")).unwrap();
        store.add_document(local("L1")).unwrap();
        store.add_document(local("L2")).unwrap();

        store.replace_remote(vec![remote("R1")]);

        assert_eq!(ids(&store), vec!["L1", "L2", "R1"]);
    }

    #[test]
    fn test_replace_remote_drops_colliding_ids() {
        let mut store = DocumentStore::new();
        store.add_document(local("X")).unwrap();

        let kept = store.replace_remote(vec![remote("X"), remote("R1"), remote("R1")]);

        assert_eq!(kept, 1);
        assert_eq!(ids(&store), vec!["X", "R1"]);
        assert!(store.get("X").unwrap().is_local());
    }

    #[test]
    fn test_selection_degrades_when_document_disappears() {
        let mut store = DocumentStore::new();
        store.add_document(remote("R1")).unwrap();
        store.select("R1").unwrap();

        store.replace_remote(vec![remote("R2")]);

        assert!(store.selected_id().is_none());
        assert!(store.selected_document().is_none());
    }
}
