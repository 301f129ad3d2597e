//! PDF text extraction wrapper
//!
//! Wraps the pdf-extract crate. Encrypted, scanned or corrupted PDFs come
//! back as extraction errors rather than panics.

use super::{PageRenderer, RenderEvent};
use crate::error::{FolioError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Renderer backed by `pdf-extract`. Parsing runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct PdfTextRenderer;

impl PdfTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// Extract the text of every page, one string per page.
pub fn extract_pages(pdf_bytes: &[u8]) -> Result<Vec<String>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| FolioError::Extraction(e.to_string()))?;
    Ok(pages.iter().map(|page| normalize_page_text(page)).collect())
}

/// Collapse runs of whitespace (including line breaks) into single spaces.
pub fn normalize_page_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl PageRenderer for PdfTextRenderer {
    async fn render(&self, bytes: Vec<u8>, events: mpsc::Sender<RenderEvent>) -> Result<()> {
        let pages = tokio::task::spawn_blocking(move || extract_pages(&bytes))
            .await
            .map_err(|e| FolioError::Extraction(format!("extraction task failed: {}", e)))??;

        tracing::debug!(pages = pages.len(), "PDF parsed");

        if events
            .send(RenderEvent::DocumentLoaded { page_count: pages.len() })
            .await
            .is_err()
        {
            return Ok(());
        }

        for (index, text) in pages.into_iter().enumerate() {
            let event = RenderEvent::PageText { page: index + 1, text };
            if events.send(event).await.is_err() {
                // Collector finished or went away
                break;
            }
        }
        Ok(())
    }
}
