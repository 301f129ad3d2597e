//! Fake collaborators shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use folio_lib::identity::Identity;
use folio_lib::pdf::{PageRenderer, RenderEvent};
use folio_lib::settings::SettingsStore;
use folio_lib::storage::RemoteStorage;
use folio_lib::summary::Summarizer;
use folio_lib::{FolioError, RemoteFile, Result, Session, User};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, Notify};

pub const PDF: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";

pub fn remote_file(id: &str) -> RemoteFile {
    RemoteFile {
        id: id.to_string(),
        name: format!("{}.pdf", id),
        web_view_link: Some(format!("https://drive.google.com/file/d/{}/view", id)),
        shared: None,
    }
}

// ==================== Identity ====================

#[derive(Default)]
pub struct FakeIdentity {
    user: RwLock<Option<User>>,
    pub popup_blocked: AtomicBool,
}

impl FakeIdentity {
    pub fn user() -> User {
        User {
            id: "user-1".to_string(),
            email: "reader@example.com".to_string(),
            name: "Reader".to_string(),
            created_at: chrono::Utc::now(),
        }
    }
}

#[async_trait]
impl Identity for FakeIdentity {
    fn current_user(&self) -> Option<User> {
        self.user.read().unwrap().clone()
    }

    async fn sign_in(&self) -> Result<User> {
        if self.popup_blocked.load(Ordering::SeqCst) {
            return Err(FolioError::PopupBlocked);
        }
        let user = Self::user();
        *self.user.write().unwrap() = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.user.write().unwrap() = None;
        Ok(())
    }

    async fn bearer_token(&self) -> Result<String> {
        self.current_user()
            .map(|_| "token".to_string())
            .ok_or(FolioError::NotSignedIn)
    }
}

// ==================== Drive ====================

#[derive(Default)]
pub struct FakeDrive {
    pub files: Mutex<Vec<RemoteFile>>,
    pub contents: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_list: Mutex<bool>,
    pub share_gate: Option<Arc<Notify>>,
    pub share_entered: Arc<Notify>,
    pub share_calls: AtomicUsize,
    pub upload_gate: Option<Arc<Notify>>,
    pub upload_entered: Arc<Notify>,
    pub next_id: AtomicUsize,
}

impl FakeDrive {
    pub fn with_files(files: Vec<RemoteFile>) -> Self {
        let drive = Self::default();
        *drive.files.lock().unwrap() = files;
        drive
    }
}

#[async_trait]
impl RemoteStorage for FakeDrive {
    async fn list(&self) -> Result<Vec<RemoteFile>> {
        if *self.fail_list.lock().unwrap() {
            return Err(FolioError::Network("HTTP 500".to_string()));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<RemoteFile> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let file = RemoteFile {
            id: format!("up-{}", n),
            name: name.to_string(),
            web_view_link: Some(format!("https://drive.google.com/file/d/up-{}/view", n)),
            shared: Some(false),
        };
        self.contents.lock().unwrap().insert(file.id.clone(), bytes);
        self.files.lock().unwrap().push(file.clone());
        self.upload_entered.notify_one();
        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        Ok(file)
    }

    async fn share(&self, id: &str) -> Result<String> {
        self.share_calls.fetch_add(1, Ordering::SeqCst);
        self.share_entered.notify_one();
        if let Some(gate) = &self.share_gate {
            gate.notified().await;
        }
        Ok(format!("https://drive.google.com/file/d/{}/view", id))
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        self.contents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| FolioError::DownloadFailed(format!("no file {}", id)))
    }
}

// ==================== Renderer ====================

/// Reports a fixed set of pages in reverse order.
pub struct FakeRenderer {
    pub pages: Vec<String>,
}

impl FakeRenderer {
    pub fn new(pages: &[&str]) -> Self {
        Self { pages: pages.iter().map(|p| p.to_string()).collect() }
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, _bytes: Vec<u8>, events: mpsc::Sender<RenderEvent>) -> Result<()> {
        let page_count = self.pages.len();
        if events.send(RenderEvent::DocumentLoaded { page_count }).await.is_err() {
            return Ok(());
        }
        for (i, text) in self.pages.iter().enumerate().rev() {
            let event = RenderEvent::PageText { page: i + 1, text: text.clone() };
            if events.send(event).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

// ==================== Summarizer ====================

#[derive(Default)]
pub struct FakeSummarizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, _credential: &str, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Summary of {} lines", text.lines().count()))
    }
}

// ==================== Session ====================

pub struct Harness {
    pub session: Arc<Session>,
    pub identity: Arc<FakeIdentity>,
    pub drive: Arc<FakeDrive>,
    pub summarizer: Arc<FakeSummarizer>,
    pub dir: tempfile::TempDir,
}

pub fn harness(drive: FakeDrive, pages: &[&str]) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let settings = Arc::new(SettingsStore::open_with_env_key(dir.path(), None));
    let identity = Arc::new(FakeIdentity::default());
    let drive = Arc::new(drive);
    let summarizer = Arc::new(FakeSummarizer::default());
    let session = Arc::new(Session::new(
        settings,
        identity.clone(),
        drive.clone(),
        Arc::new(FakeRenderer::new(pages)),
        summarizer.clone(),
    ));
    Harness { session, identity, drive, summarizer, dir }
}
