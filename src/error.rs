//! Error type shared by the session core, the service clients and the HTTP layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FolioError {
    // Validation
    #[error("Note content is empty")]
    EmptyNote,
    #[error("Page {page} is out of range (document has {expected} pages)")]
    InvalidPage { page: usize, expected: usize },
    #[error("'{0}' is not a PDF file")]
    NotPdf(String),

    // Lookups
    #[error("Document '{0}' not found")]
    DocumentNotFound(String),
    #[error("Document '{0}' already exists")]
    DuplicateId(String),
    #[error("Note '{0}' not found")]
    NoteNotFound(String),
    #[error("No document selected")]
    NoSelection,
    #[error("Document '{0}' is not stored on the drive")]
    NotRemote(String),
    #[error("No extracted text for document '{0}'")]
    NoExtractedText(String),

    // Concurrency guards
    #[error("A drive sync is already running")]
    SyncAlreadyRunning,
    #[error("Document '{0}' is already being shared")]
    ShareAlreadyRunning(String),

    // Identity
    #[error("Sign-in popup was blocked")]
    PopupBlocked,
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
    #[error("Not signed in")]
    NotSignedIn,

    // Remote storage
    #[error("Network error: {0}")]
    Network(String),
    #[error("Drive sync failed: {0}")]
    SyncFailed(String),
    #[error("Failed to upload file to Drive: {0}")]
    UploadFailed(String),
    #[error("Failed to share file: {0}")]
    ShareFailed(String),
    #[error("Failed to download file from Drive: {0}")]
    DownloadFailed(String),

    // Summaries and extraction
    #[error("OpenAI API key not set")]
    MissingCredential,
    #[error("Failed to generate summary: {0}")]
    SummaryFailed(String),
    #[error("PDF text extraction failed: {0}")]
    Extraction(String),

    // Settings and state
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("Session state lock poisoned")]
    StatePoisoned,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FolioError {
    /// Errors that leave state untouched and that callers may ignore.
    pub fn is_guard(&self) -> bool {
        matches!(self, FolioError::SyncAlreadyRunning | FolioError::ShareAlreadyRunning(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FolioError::DocumentNotFound(_)
                | FolioError::NoteNotFound(_)
                | FolioError::NoSelection
                | FolioError::NoExtractedText(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
