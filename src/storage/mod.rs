//! Remote file store the session syncs against.

pub mod drive;

use crate::error::Result;
use crate::models::RemoteFile;
use async_trait::async_trait;

pub use drive::DriveClient;

/// Cloud storage for PDF files. Every call is authenticated on its own and
/// may fail independently of the others.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// All PDF files visible to the signed-in user.
    async fn list(&self) -> Result<Vec<RemoteFile>>;

    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<RemoteFile>;

    /// Make the file readable by anyone with the link and return that link.
    async fn share(&self, id: &str) -> Result<String>;

    async fn download(&self, id: &str) -> Result<Vec<u8>>;
}
