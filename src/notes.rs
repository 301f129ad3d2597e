//! Per-document note list.

use crate::error::{FolioError, Result};
use crate::models::Note;
use crate::store::DocumentStore;
use chrono::Utc;

/// Trim note content, rejecting empty or whitespace-only input.
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(FolioError::EmptyNote);
    }
    Ok(trimmed.to_string())
}

impl DocumentStore {
    /// Append a note to a document's list.
    pub fn add_note(&mut self, document_id: &str, content: &str) -> Result<Note> {
        let content = validate_content(content)?;
        let note = Note::new(content);
        let added = note.clone();
        self.update_document(document_id, move |doc| {
            doc.notes.push(note);
            Ok(())
        })?;
        Ok(added)
    }

    pub fn update_note(&mut self, document_id: &str, note_id: &str, content: &str) -> Result<Note> {
        let content = validate_content(content)?;
        let mut updated = None;
        self.update_document(document_id, |doc| {
            let note = doc
                .notes
                .iter_mut()
                .find(|n| n.id == note_id)
                .ok_or_else(|| FolioError::NoteNotFound(note_id.to_string()))?;
            note.content = content;
            note.updated_at = Utc::now();
            updated = Some(note.clone());
            Ok(())
        })?;
        updated.ok_or_else(|| FolioError::NoteNotFound(note_id.to_string()))
    }

    /// Remove a note. Deleting a note that is not there is a no-op and returns `false`.
    pub fn delete_note(&mut self, document_id: &str, note_id: &str) -> Result<bool> {
        let has_note = self
            .get(document_id)
            .ok_or_else(|| FolioError::DocumentNotFound(document_id.to_string()))?
            .notes
            .iter()
            .any(|n| n.id == note_id);
        if !has_note {
            return Ok(false);
        }

        self.update_document(document_id, |doc| {
            doc.notes.retain(|n| n.id != note_id);
            Ok(())
        })?;
        Ok(true)
    }
}
