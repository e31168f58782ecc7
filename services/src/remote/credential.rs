//! Access credential for Google Drive, loaded once and refreshed on demand.

use super::traits::CredentialProvider;
use super::types::CredentialError;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A token is treated as expired this many seconds before its actual expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

/// An OAuth "authorized user" credential, as written by the bootstrap tool.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(alias = "access_token")]
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl Credential {
    pub fn from_json(bytes: &[u8]) -> Result<Self, CredentialError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decodes the base64-encoded JSON blob carried in `GOOGLE_TOKEN`.
    pub fn from_base64(blob: &str) -> Result<Self, CredentialError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(blob.trim())?;
        Self::from_json(&bytes)
    }

    /// Loads the credential from the environment blob, falling back to the
    /// token file when the blob is absent or unusable.
    pub fn load(env_blob: Option<&str>, token_file: &Path) -> Result<Self, CredentialError> {
        if let Some(blob) = env_blob {
            match Self::from_base64(blob) {
                Ok(credential) => {
                    info!("Credential loaded from GOOGLE_TOKEN");
                    return Ok(credential);
                }
                Err(e) => warn!(error = %e, "Failed to decode GOOGLE_TOKEN, trying token file"),
            }
        }

        if token_file.exists() {
            let credential = Self::from_json(&std::fs::read(token_file)?)?;
            info!(path = %token_file.display(), "Credential loaded from token file");
            return Ok(credential);
        }

        Err(CredentialError::Missing(token_file.display().to_string()))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// Holds one credential for the process and refreshes it against its
/// `token_uri` when it expires.
#[derive(Clone)]
pub struct OAuthCredentialProvider {
    credential: Arc<Mutex<Credential>>,
    client: reqwest::Client,
}

impl OAuthCredentialProvider {
    pub fn new(credential: Credential, client: reqwest::Client) -> Self {
        Self {
            credential: Arc::new(Mutex::new(credential)),
            client,
        }
    }

    async fn refresh_locked(&self, credential: &mut Credential) -> Result<bool, CredentialError> {
        let now = Utc::now();
        if !credential.is_expired(now) {
            return Ok(false);
        }

        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            credential.refresh_token.as_deref(),
            credential.client_id.as_deref(),
            credential.client_secret.as_deref(),
        ) else {
            return Err(CredentialError::NotRefreshable);
        };

        let response = self
            .client
            .post(&credential.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CredentialError::Refresh {
                status: status.as_u16(),
                message,
            });
        }

        let refreshed: TokenResponse = response.json().await?;
        credential.token = refreshed.access_token;
        credential.expiry = refreshed
            .expires_in
            .map(|seconds| now + Duration::seconds(seconds));
        if let Some(token) = refreshed.refresh_token {
            credential.refresh_token = Some(token);
        }

        info!(expiry = ?credential.expiry, "Access token refreshed");
        Ok(true)
    }
}

impl CredentialProvider for OAuthCredentialProvider {
    async fn get(&self) -> Result<Credential, CredentialError> {
        let mut credential = self.credential.lock().await;
        self.refresh_locked(&mut credential).await?;
        Ok(credential.clone())
    }

    async fn refresh_if_expired(&self) -> Result<bool, CredentialError> {
        let mut credential = self.credential.lock().await;
        self.refresh_locked(&mut credential).await
    }
}
