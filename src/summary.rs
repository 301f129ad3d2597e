//! Gate for AI summaries: a summary can only be requested once a document's
//! text has been extracted and an API key is configured.

use crate::error::{FolioError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, RwLock};

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, credential: &str, text: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryAvailability {
    Ready,
    NoText,
    MissingCredential,
}

pub struct SummaryTrigger {
    summarizer: Arc<dyn Summarizer>,
    credential: RwLock<Option<String>>,
}

impl SummaryTrigger {
    pub fn new(summarizer: Arc<dyn Summarizer>, credential: Option<String>) -> Self {
        Self {
            summarizer,
            credential: RwLock::new(credential.filter(|c| !c.is_empty())),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    fn credential(&self) -> Option<String> {
        self.credential.read().ok().and_then(|c| c.clone())
    }

    pub fn set_credential(&self, credential: Option<String>) -> Result<()> {
        *self.credential.write().map_err(|_| FolioError::StatePoisoned)? =
            credential.filter(|c| !c.is_empty());
        Ok(())
    }

    pub fn availability(&self, text: Option<&str>) -> SummaryAvailability {
        match text {
            None => SummaryAvailability::NoText,
            Some(t) if t.trim().is_empty() => SummaryAvailability::NoText,
            Some(_) if !self.has_credential() => SummaryAvailability::MissingCredential,
            Some(_) => SummaryAvailability::Ready,
        }
    }

    /// Summarize `text`. `document_id` only labels errors and logs.
    pub async fn generate(&self, document_id: &str, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(FolioError::NoExtractedText(document_id.to_string()));
        }
        let credential = self.credential().ok_or(FolioError::MissingCredential)?;

        tracing::info!(document = document_id, chars = text.len(), "Generating summary");
        match self.summarizer.summarize(&credential, text).await {
            Ok(summary) => Ok(summary),
            Err(e @ FolioError::SummaryFailed(_)) => Err(e),
            Err(e) => Err(FolioError::SummaryFailed(e.to_string())),
        }
    }
}
