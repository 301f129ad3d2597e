//! Google Drive v3 client
//!
//! Lists, uploads, shares and downloads PDF files on behalf of the signed-in
//! user. The bearer token is fetched from the identity provider on every
//! call, so a sign-out takes effect immediately.

use super::RemoteStorage;
use crate::error::{FolioError, Result};
use crate::identity::Identity;
use crate::models::RemoteFile;
use crate::settings::Settings;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const PDF_QUERY: &str = "mimeType='application/pdf'";
const FILE_FIELDS: &str = "id,name,webViewLink,shared";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Serialize)]
struct Permission {
    #[serde(rename = "type")]
    kind: &'static str,
    role: &'static str,
}

#[derive(Debug, Serialize)]
struct UploadMetadata<'a> {
    name: &'a str,
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct LinkOnly {
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

pub struct DriveClient {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    identity: Arc<dyn Identity>,
}

impl DriveClient {
    pub fn new(identity: Arc<dyn Identity>, settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| FolioError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: settings.drive_api_base.trim_end_matches('/').to_string(),
            upload_base: settings.drive_upload_base.trim_end_matches('/').to_string(),
            identity,
        })
    }

    async fn token(&self) -> Result<String> {
        self.identity.bearer_token().await
    }
}

/// Read the body of a failed response into an error message.
async fn api_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("Drive API error {}: {}", status, body)
}

#[async_trait]
impl RemoteStorage for DriveClient {
    async fn list(&self) -> Result<Vec<RemoteFile>> {
        let token = self.token().await?;
        let fields = format!("files({})", FILE_FIELDS);
        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .query(&[("q", PDF_QUERY), ("fields", fields.as_str()), ("spaces", "drive")])
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FolioError::Network(format!("Drive list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FolioError::Network(api_error(response).await));
        }

        let list: FileList = response
            .json()
            .await
            .map_err(|e| FolioError::Network(format!("Failed to parse Drive listing: {}", e)))?;
        tracing::debug!(files = list.files.len(), "Drive listing fetched");
        Ok(list.files)
    }

    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<RemoteFile> {
        let token = self.token().await?;
        let metadata = serde_json::to_string(&UploadMetadata {
            name,
            mime_type: "application/pdf",
        })
        .map_err(|e| FolioError::UploadFailed(e.to_string()))?;

        let metadata_part = Part::text(metadata)
            .mime_str("application/json")
            .map_err(|e| FolioError::UploadFailed(e.to_string()))?;
        let file_part = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| FolioError::UploadFailed(e.to_string()))?;
        let form = Form::new().part("metadata", metadata_part).part("file", file_part);

        let response = self
            .client
            .post(format!("{}/files", self.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FolioError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FolioError::UploadFailed(api_error(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| FolioError::UploadFailed(format!("Failed to parse upload response: {}", e)))
    }

    async fn share(&self, id: &str) -> Result<String> {
        let token = self.token().await?;
        let response = self
            .client
            .post(format!("{}/files/{}/permissions", self.api_base, id))
            .bearer_auth(&token)
            .json(&Permission { kind: "anyone", role: "reader" })
            .send()
            .await
            .map_err(|e| FolioError::ShareFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FolioError::ShareFailed(api_error(response).await));
        }

        let response = self
            .client
            .get(format!("{}/files/{}", self.api_base, id))
            .query(&[("fields", "webViewLink")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| FolioError::ShareFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FolioError::ShareFailed(api_error(response).await));
        }

        let link: LinkOnly = response
            .json()
            .await
            .map_err(|e| FolioError::ShareFailed(format!("Failed to parse file metadata: {}", e)))?;
        link.web_view_link
            .ok_or_else(|| FolioError::ShareFailed(format!("No link returned for '{}'", id)))
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        let token = self.token().await?;
        let response = self
            .client
            .get(format!("{}/files/{}", self.api_base, id))
            .query(&[("alt", "media")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| FolioError::DownloadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FolioError::DownloadFailed(api_error(response).await));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FolioError::DownloadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
