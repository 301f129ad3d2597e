use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Build a note from already-validated content.
    pub(crate) fn new(content: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One PDF tracked by the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub url: String,              // webViewLink for drive files, blob:<id> for local ones
    pub summary: String,
    pub notes: Vec<Note>,
    #[serde(rename = "userId")]
    pub user_id: String,          // Empty for local documents
    pub origin: Origin,
}

impl Document {
    /// Local document kept only in this session's blob registry.
    pub fn local(name: &str) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            url: format!("blob:{}", id),
            id,
            name: name.to_string(),
            summary: String::new(),
            notes: Vec::new(),
            user_id: String::new(),
            origin: Origin::Local,
        }
    }

    pub fn from_remote(file: &RemoteFile, user_id: &str) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            url: file.web_view_link.clone().unwrap_or_default(),
            summary: String::new(),
            notes: Vec::new(),
            user_id: user_id.to_string(),
            origin: Origin::Remote,
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

/// A file entry as returned by the drive listing and upload endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "webViewLink", default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub shared: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
