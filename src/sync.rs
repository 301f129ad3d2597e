//! Drive reconciliation.
//!
//! A sync fetches the remote listing and swaps the store's remote subset for
//! it in one snapshot transition. Local documents are never touched. Only one
//! sync runs at a time; a second request while one is in flight returns
//! `SyncAlreadyRunning` without doing anything.

use crate::error::{FolioError, Result};
use crate::models::{Document, RemoteFile};
use crate::storage::RemoteStorage;
use crate::store::DocumentStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub local: usize,
    pub remote: usize,
}

#[derive(Default)]
pub struct SyncController {
    in_flight: AtomicBool,
    last_listing: RwLock<Vec<RemoteFile>>,
}

/// Clears the in-flight flag when the sync ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Listing used by the last successful sync.
    pub fn last_listing(&self) -> Vec<RemoteFile> {
        self.last_listing.read().map(|l| l.clone()).unwrap_or_default()
    }

    pub async fn sync(
        &self,
        storage: &dyn RemoteStorage,
        store: &RwLock<DocumentStore>,
        user_id: &str,
    ) -> Result<SyncReport> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Sync requested while another is running");
            return Err(FolioError::SyncAlreadyRunning);
        }
        let _guard = InFlight(&self.in_flight);

        let start = Instant::now();
        tracing::info!("Syncing with Drive");

        let files = storage.list().await.map_err(|e| {
            tracing::error!("Failed to sync with Drive: {}", e);
            FolioError::SyncFailed(e.to_string())
        })?;

        let remote: Vec<Document> = files
            .iter()
            .map(|file| Document::from_remote(file, user_id))
            .collect();

        let report = {
            let mut store = store.write().map_err(|_| FolioError::StatePoisoned)?;
            let remote = store.replace_remote(remote);
            SyncReport { local: store.len() - remote, remote }
        };

        if let Ok(mut last) = self.last_listing.write() {
            *last = files;
        }

        tracing::info!(
            local = report.local,
            remote = report.remote,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Drive sync finished"
        );
        Ok(report)
    }
}
