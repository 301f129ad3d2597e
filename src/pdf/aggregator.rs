//! Collects per-page text as pages finish rendering, in any order, and
//! yields the joined document text exactly once per load.

use crate::error::{FolioError, Result};

#[derive(Debug, Default)]
pub struct TextAggregator {
    slots: Vec<Option<String>>,
    reported: usize,
    completed: bool,
}

impl TextAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_pages(&self) -> usize {
        self.slots.len()
    }

    pub fn reported_pages(&self) -> usize {
        self.reported
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Start a new document, abandoning any unfinished one.
    ///
    /// A document with no pages completes immediately with empty text.
    pub fn on_document_load(&mut self, expected: usize) -> Option<String> {
        self.slots = vec![None; expected];
        self.reported = 0;
        self.completed = false;

        if expected == 0 {
            self.completed = true;
            return Some(String::new());
        }
        None
    }

    /// Record the text of a 1-based page. Returns the full text on the call
    /// that fills the last empty slot, and `None` on every other call.
    pub fn on_page_ready(&mut self, page: usize, text: impl Into<String>) -> Result<Option<String>> {
        let expected = self.slots.len();
        if page == 0 || page > expected {
            return Err(FolioError::InvalidPage { page, expected });
        }

        let slot = &mut self.slots[page - 1];
        if slot.is_none() {
            self.reported += 1;
        }
        *slot = Some(text.into());

        if self.completed || self.reported < expected {
            return Ok(None);
        }

        self.completed = true;
        let full_text = self
            .slots
            .iter()
            .map(|s| s.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Some(full_text))
    }
}
