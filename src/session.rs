//! A reading session: the document store plus everything that feeds it.
//!
//! `Session` owns the store, the sync controller, the summary trigger, the
//! blob registry for local uploads and the cache of extracted text. The
//! collaborators (identity, drive, renderer, summarizer) are injected at
//! construction. Locks are never held across an `.await`; each store change
//! is a single snapshot swap.

use crate::error::{FolioError, Result};
use crate::identity::Identity;
use crate::models::{Document, Note, Origin, User};
use crate::pdf::{self, PageRenderer};
use crate::settings::{ApiKeyStatus, SettingsStore};
use crate::storage::RemoteStorage;
use crate::store::{DocumentStore, Snapshot};
use crate::summary::{Summarizer, SummaryAvailability, SummaryTrigger};
use crate::sync::{SyncController, SyncReport};
use crate::utils::looks_like_pdf;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct Session {
    store: RwLock<DocumentStore>,
    sync: SyncController,
    summary: SummaryTrigger,
    settings: Arc<SettingsStore>,
    identity: Arc<dyn Identity>,
    storage: Arc<dyn RemoteStorage>,
    renderer: Arc<dyn PageRenderer>,
    blobs: RwLock<HashMap<String, Arc<Vec<u8>>>>,
    extracted: RwLock<HashMap<String, String>>,
    sharing: Mutex<HashSet<String>>,
}

/// Removes a document id from the share guard when the share ends.
struct ShareGuard<'a> {
    sharing: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for ShareGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut sharing) = self.sharing.lock() {
            sharing.remove(&self.id);
        }
    }
}

impl Session {
    pub fn new(
        settings: Arc<SettingsStore>,
        identity: Arc<dyn Identity>,
        storage: Arc<dyn RemoteStorage>,
        renderer: Arc<dyn PageRenderer>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let summary = SummaryTrigger::new(summarizer, settings.api_key());
        Self {
            store: RwLock::new(DocumentStore::new()),
            sync: SyncController::new(),
            summary,
            settings,
            identity,
            storage,
            renderer,
            blobs: RwLock::new(HashMap::new()),
            extracted: RwLock::new(HashMap::new()),
            sharing: Mutex::new(HashSet::new()),
        }
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, DocumentStore>> {
        self.store.read().map_err(|_| FolioError::StatePoisoned)
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, DocumentStore>> {
        self.store.write().map_err(|_| FolioError::StatePoisoned)
    }

    fn document(&self, id: &str) -> Result<Arc<Document>> {
        self.read_store()?
            .get(id)
            .ok_or_else(|| FolioError::DocumentNotFound(id.to_string()))
    }

    // ==================== Identity ====================

    pub fn current_user(&self) -> Option<User> {
        self.identity.current_user()
    }

    /// Sign in, then sync with the drive. A failed sync is logged, not returned.
    pub async fn sign_in(&self) -> Result<User> {
        let user = self.identity.sign_in().await?;
        match self.sync().await {
            Ok(_) => {}
            Err(e) if e.is_guard() => {}
            Err(e) => tracing::warn!("Initial sync after sign-in failed: {}", e),
        }
        Ok(user)
    }

    /// Sign out. Documents already in the session stay.
    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await
    }

    // ==================== Documents ====================

    pub fn documents(&self) -> Result<Snapshot> {
        Ok(self.read_store()?.documents())
    }

    pub fn get(&self, id: &str) -> Result<Arc<Document>> {
        self.document(id)
    }

    pub fn selected_id(&self) -> Result<Option<String>> {
        Ok(self.read_store()?.selected_id().map(str::to_string))
    }

    pub fn selected_document(&self) -> Result<Option<Arc<Document>>> {
        Ok(self.read_store()?.selected_document())
    }

    pub fn select(&self, id: &str) -> Result<Arc<Document>> {
        let mut store = self.write_store()?;
        store.select(id)?;
        store
            .get(id)
            .ok_or_else(|| FolioError::DocumentNotFound(id.to_string()))
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.write_store()?.clear_selection();
        Ok(())
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    pub async fn sync(&self) -> Result<SyncReport> {
        let user = self.identity.current_user().ok_or(FolioError::NotSignedIn)?;
        let report = self.sync.sync(self.storage.as_ref(), &self.store, &user.id).await?;
        self.prune_extracted()?;
        Ok(report)
    }

    /// Drop cached text for documents that are no longer in the store.
    fn prune_extracted(&self) -> Result<()> {
        let store = self.read_store()?;
        let mut extracted = self.extracted.write().map_err(|_| FolioError::StatePoisoned)?;
        extracted.retain(|id, _| store.contains(id));
        Ok(())
    }

    /// Add a PDF. Signed in, it goes to the drive; otherwise it stays in this
    /// session only. Either way the new document becomes the selection.
    pub async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<Arc<Document>> {
        if !looks_like_pdf(&bytes) {
            return Err(FolioError::NotPdf(name.to_string()));
        }

        let document = match self.identity.current_user() {
            Some(user) => {
                let file = self.storage.upload(bytes, name).await?;
                tracing::info!(id = %file.id, name, "Uploaded PDF to Drive");
                Document::from_remote(&file, &user.id)
            }
            None => {
                let document = Document::local(name);
                self.blobs
                    .write()
                    .map_err(|_| FolioError::StatePoisoned)?
                    .insert(document.id.clone(), Arc::new(bytes));
                tracing::info!(id = %document.id, name, "Added local PDF");
                document
            }
        };

        let id = document.id.clone();
        let remote = !document.is_local();
        let added = {
            let mut store = self.write_store()?;
            let added = match store.add_document(document) {
                Ok(added) => added,
                // A sync that finished during the upload already listed the file
                Err(FolioError::DuplicateId(_)) if remote => store
                    .get(&id)
                    .ok_or_else(|| FolioError::DocumentNotFound(id.clone()))?,
                Err(e) => return Err(e),
            };
            store.select(&id)?;
            added
        };
        if let Ok(mut extracted) = self.extracted.write() {
            extracted.remove(&id);
        }
        Ok(added)
    }

    /// Raw PDF bytes for a document.
    pub async fn load_content(&self, id: &str) -> Result<Vec<u8>> {
        let document = self.document(id)?;
        match document.origin {
            Origin::Local => {
                let blobs = self.blobs.read().map_err(|_| FolioError::StatePoisoned)?;
                blobs
                    .get(id)
                    .map(|b| b.as_ref().clone())
                    .ok_or_else(|| FolioError::DocumentNotFound(id.to_string()))
            }
            Origin::Remote => self.storage.download(id).await,
        }
    }

    // ==================== Text and summaries ====================

    /// Render the document and cache its full text.
    pub async fn extract_text(&self, id: &str) -> Result<String> {
        let bytes = self.load_content(id).await?;
        let text = pdf::extract_text(self.renderer.as_ref(), bytes).await?;
        tracing::info!(document = id, chars = text.len(), "Text extracted");
        self.extracted
            .write()
            .map_err(|_| FolioError::StatePoisoned)?
            .insert(id.to_string(), text.clone());
        Ok(text)
    }

    pub fn extracted_text(&self, id: &str) -> Option<String> {
        self.extracted.read().ok()?.get(id).cloned()
    }

    pub fn summary_availability(&self, id: &str) -> Result<SummaryAvailability> {
        self.document(id)?;
        Ok(self.summary.availability(self.extracted_text(id).as_deref()))
    }

    /// Ask the summarizer for a summary of the extracted text and store it.
    pub async fn generate_summary(&self, id: &str) -> Result<Arc<Document>> {
        self.document(id)?;
        let text = self
            .extracted_text(id)
            .ok_or_else(|| FolioError::NoExtractedText(id.to_string()))?;
        let summary = self.summary.generate(id, &text).await?;
        // The document may have gone away while the summary was generated
        self.write_store()?.update_summary(id, &summary)
    }

    /// Manual summary edit.
    pub fn set_summary(&self, id: &str, summary: &str) -> Result<Arc<Document>> {
        self.write_store()?.update_summary(id, summary)
    }

    // ==================== Notes ====================

    pub fn add_note(&self, document_id: &str, content: &str) -> Result<Note> {
        self.write_store()?.add_note(document_id, content)
    }

    pub fn update_note(&self, document_id: &str, note_id: &str, content: &str) -> Result<Note> {
        self.write_store()?.update_note(document_id, note_id, content)
    }

    pub fn delete_note(&self, document_id: &str, note_id: &str) -> Result<bool> {
        self.write_store()?.delete_note(document_id, note_id)
    }

    // ==================== Sharing ====================

    /// Make a drive document readable by link. One share per document at a time.
    pub async fn share(&self, id: &str) -> Result<String> {
        let document = self.document(id)?;
        if document.is_local() {
            return Err(FolioError::NotRemote(id.to_string()));
        }

        {
            let mut sharing = self.sharing.lock().map_err(|_| FolioError::StatePoisoned)?;
            if !sharing.insert(id.to_string()) {
                return Err(FolioError::ShareAlreadyRunning(id.to_string()));
            }
        }
        let _guard = ShareGuard { sharing: &self.sharing, id: id.to_string() };

        let link = self.storage.share(id).await?;
        tracing::info!(document = id, "Shared file");
        Ok(link)
    }

    // ==================== API key ====================

    pub fn api_key_status(&self) -> ApiKeyStatus {
        self.settings.api_key_status()
    }

    /// Save the key and hand the effective key to the summary trigger.
    pub fn set_api_key(&self, key: &str) -> Result<ApiKeyStatus> {
        self.settings.set_api_key(key)?;
        self.summary.set_credential(self.settings.api_key())?;
        Ok(self.settings.api_key_status())
    }

    pub fn clear_api_key(&self) -> Result<ApiKeyStatus> {
        self.set_api_key("")
    }
}
