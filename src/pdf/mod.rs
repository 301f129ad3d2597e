//! Page rendering and text extraction.
//!
//! A renderer reports the page count once, then the text of each page in
//! whatever order pages finish. `collect_text` drains those events into a
//! [`TextAggregator`] and resolves with the whole document's text.

pub mod aggregator;
pub mod renderer;

pub use aggregator::TextAggregator;

use crate::error::{FolioError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Event emitted by a renderer for one document load.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    DocumentLoaded { page_count: usize },
    PageText { page: usize, text: String },
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `bytes`, sending events until every page has been reported.
    async fn render(&self, bytes: Vec<u8>, events: mpsc::Sender<RenderEvent>) -> Result<()>;
}

/// Feed render events into an aggregator until the text is complete.
///
/// Invalid page numbers are logged and skipped. A second `DocumentLoaded`
/// restarts aggregation. If the channel closes before completion the
/// extraction fails.
pub async fn collect_text(mut events: mpsc::Receiver<RenderEvent>) -> Result<String> {
    let mut aggregator = TextAggregator::new();
    let mut loaded = false;

    while let Some(event) = events.recv().await {
        let done = match event {
            RenderEvent::DocumentLoaded { page_count } => {
                loaded = true;
                aggregator.on_document_load(page_count)
            }
            RenderEvent::PageText { page, text } if loaded => {
                match aggregator.on_page_ready(page, text) {
                    Ok(done) => done,
                    Err(e) => {
                        tracing::warn!("Skipping page event: {}", e);
                        None
                    }
                }
            }
            RenderEvent::PageText { page, .. } => {
                tracing::warn!(page, "Page text arrived before the page count; ignoring");
                None
            }
        };
        if let Some(text) = done {
            return Ok(text);
        }
    }

    Err(FolioError::Extraction(format!(
        "renderer stopped after {}/{} pages",
        aggregator.reported_pages(),
        aggregator.expected_pages()
    )))
}

/// Run `renderer` over `bytes` and return the document text.
pub async fn extract_text(renderer: &dyn PageRenderer, bytes: Vec<u8>) -> Result<String> {
    let (tx, rx) = mpsc::channel(64);
    let (rendered, text) = tokio::join!(renderer.render(bytes, tx), collect_text(rx));
    // The collector's error is more specific unless the renderer itself failed.
    rendered?;
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sends a scripted list of events.
    struct ScriptedRenderer(Vec<RenderEvent>);

    #[async_trait]
    impl PageRenderer for ScriptedRenderer {
        async fn render(&self, _bytes: Vec<u8>, events: mpsc::Sender<RenderEvent>) -> Result<()> {
            for event in self.0.clone() {
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    fn page(page: usize, text: &str) -> RenderEvent {
        RenderEvent::PageText { page, text: text.to_string() }
    }

    #[tokio::test]
    async fn test_extract_text_out_of_order() {
        let renderer = ScriptedRenderer(vec![
            RenderEvent::DocumentLoaded { page_count: 3 },
            page(3, "c"),
            page(1, "a"),
            page(2, "b"),
        ]);
        let text = extract_text(&renderer, Vec::new()).await.unwrap();
        assert_eq!(text, "a\nb\nc");
    }

    #[tokio::test]
    async fn test_extract_text_skips_invalid_pages() {
        let renderer = ScriptedRenderer(vec![
            RenderEvent::DocumentLoaded { page_count: 1 },
            page(7, "stray"),
            page(1, "real"),
        ]);
        assert_eq!(extract_text(&renderer, Vec::new()).await.unwrap(), "real");
    }

    #[tokio::test]
    async fn test_extract_text_reload_restarts() {
        let renderer = ScriptedRenderer(vec![
            RenderEvent::DocumentLoaded { page_count: 2 },
            page(1, "old"),
            RenderEvent::DocumentLoaded { page_count: 1 },
            page(1, "new"),
        ]);
        assert_eq!(extract_text(&renderer, Vec::new()).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_extract_text_incomplete_fails() {
        let renderer = ScriptedRenderer(vec![
            RenderEvent::DocumentLoaded { page_count: 2 },
            page(1, "a"),
        ]);
        let err = extract_text(&renderer, Vec::new()).await.unwrap_err();
        assert!(matches!(err, FolioError::Extraction(msg) if msg.contains("1/2")));
    }

    #[tokio::test]
    async fn test_extract_text_empty_document() {
        let renderer = ScriptedRenderer(vec![RenderEvent::DocumentLoaded { page_count: 0 }]);
        assert_eq!(extract_text(&renderer, Vec::new()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_page_before_load_is_ignored() {
        let renderer = ScriptedRenderer(vec![
            page(1, "early"),
            RenderEvent::DocumentLoaded { page_count: 1 },
            page(1, "late"),
        ]);
        assert_eq!(extract_text(&renderer, Vec::new()).await.unwrap(), "late");
    }
}
