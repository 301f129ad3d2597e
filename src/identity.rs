//! Identity provider seam.
//!
//! The session only needs to know whether someone is signed in and to get a
//! bearer token for the drive. The OAuth dance itself happens elsewhere;
//! [`TokenIdentity`] accepts an access token obtained out of band and
//! checks it against the Google userinfo endpoint on sign-in.

use crate::error::{FolioError, Result};
use crate::models::User;
use crate::settings::Settings;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::RwLock;
use std::time::Duration;

pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[async_trait]
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<User>;

    async fn sign_in(&self) -> Result<User>;

    async fn sign_out(&self) -> Result<()>;

    /// Token for the storage provider. Fails with `NotSignedIn` when signed out.
    async fn bearer_token(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
}

pub struct TokenIdentity {
    client: reqwest::Client,
    userinfo_url: String,
    access_token: Option<String>,
    user: RwLock<Option<User>>,
}

impl TokenIdentity {
    pub fn new(access_token: Option<String>, settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| FolioError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            userinfo_url: settings.userinfo_url.clone(),
            access_token: access_token.filter(|t| !t.is_empty()),
            user: RwLock::new(None),
        })
    }

    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }
}

#[async_trait]
impl Identity for TokenIdentity {
    fn current_user(&self) -> Option<User> {
        self.user.read().ok().and_then(|u| u.clone())
    }

    async fn sign_in(&self) -> Result<User> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| FolioError::AuthFailed("no drive access token configured".to_string()))?;

        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FolioError::AuthFailed(format!("userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(FolioError::AuthFailed(format!("token rejected ({})", status)));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| FolioError::AuthFailed(format!("bad userinfo response: {}", e)))?;

        let user = User {
            id: info.sub,
            email: info.email,
            name: info.name,
            created_at: chrono::Utc::now(),
        };

        *self.user.write().map_err(|_| FolioError::StatePoisoned)? = Some(user.clone());
        tracing::info!(user = %user.email, "Signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.user.write().map_err(|_| FolioError::StatePoisoned)? = None;
        tracing::info!("Signed out");
        Ok(())
    }

    async fn bearer_token(&self) -> Result<String> {
        if self.current_user().is_none() {
            return Err(FolioError::NotSignedIn);
        }
        self.access_token.clone().ok_or(FolioError::NotSignedIn)
    }
}
