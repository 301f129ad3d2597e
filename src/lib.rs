pub mod ai_client;
pub mod error;
pub mod http_server;
pub mod identity;
pub mod models;
pub mod notes;
pub mod pdf;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;
pub mod summary;
pub mod sync;
pub mod utils;

pub use error::{FolioError, Result};
pub use models::{Document, Note, Origin, RemoteFile, User};
pub use session::Session;
pub use store::{DocumentStore, Snapshot};
