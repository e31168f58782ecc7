//! Google Drive v3 implementation of the remote gateway.

use super::credential::OAuthCredentialProvider;
use super::traits::{CredentialProvider, RemoteFileGateway};
use super::types::{RemoteError, RemoteFile};
use crate::cache::staging_file;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const DEFAULT_DRIVE_ROOT: &str = "https://www.googleapis.com";
const MULTIPART_BOUNDARY: &str = "reservations-upload-boundary";
const DOCUMENT_MIME: &str = "application/json";

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// Talks to the Drive REST API with credentials from `C`.
#[derive(Clone)]
pub struct DriveGateway<C = OAuthCredentialProvider> {
    client: reqwest::Client,
    credentials: C,
    root: String,
}

impl<C: CredentialProvider> DriveGateway<C> {
    pub fn new(client: reqwest::Client, credentials: C) -> Self {
        Self::with_root(client, credentials, DEFAULT_DRIVE_ROOT)
    }

    /// Points the gateway at another API root, e.g. a local mock server.
    pub fn with_root(client: reqwest::Client, credentials: C, root: impl Into<String>) -> Self {
        let root = root.into().trim_end_matches('/').to_owned();
        Self {
            client,
            credentials,
            root,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.root)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.root)
    }

    async fn bearer(&self) -> Result<String, RemoteError> {
        Ok(self.credentials.get().await?.token)
    }
}

/// Quotes a value for use inside a Drive search query string literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Maps non-success statuses to errors; `what` names the object for 404s.
async fn check_status(response: Response, what: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(what.to_owned()));
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Builds a `multipart/related` body: JSON metadata part, then media part.
fn multipart_related(metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{MULTIPART_BOUNDARY}\r\nContent-Type: {DOCUMENT_MIME}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

impl<C: CredentialProvider> RemoteFileGateway for DriveGateway<C> {
    async fn find_by_name(
        &self,
        name: &str,
        folder_id: &str,
    ) -> Result<Option<String>, RemoteError> {
        let token = self.bearer().await?;
        let query = format!(
            "name = '{}' and '{}' in parents and trashed = false",
            escape_query_value(name),
            escape_query_value(folder_id)
        );

        let response = self
            .client
            .get(self.files_url())
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("spaces", "drive"),
            ])
            .send()
            .await?;
        let list: FileList = check_status(response, folder_id).await?.json().await?;

        let found = list.files.into_iter().next().map(|file| file.id);
        debug!(name, folder_id, found = ?found, "Looked up remote document");
        Ok(found)
    }

    async fn create(
        &self,
        local_path: &Path,
        name: &str,
        folder_id: &str,
    ) -> Result<RemoteFile, RemoteError> {
        let content = tokio::fs::read(local_path).await?;
        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id],
            "mimeType": DOCUMENT_MIME,
        });

        let token = self.bearer().await?;
        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(multipart_related(&metadata, &content))
            .send()
            .await?;
        let file: RemoteFile = check_status(response, name).await?.json().await?;

        info!(id = %file.id, name, folder_id, "Remote document created");
        Ok(file)
    }

    async fn update(&self, object_id: &str, local_path: &Path) -> Result<RemoteFile, RemoteError> {
        let content = tokio::fs::read(local_path).await?;

        let token = self.bearer().await?;
        let response = self
            .client
            .patch(format!("{}/{}", self.upload_url(), object_id))
            .bearer_auth(token)
            .query(&[("uploadType", "media"), ("fields", "id,name")])
            .header(reqwest::header::CONTENT_TYPE, DOCUMENT_MIME)
            .body(content)
            .send()
            .await?;
        let file: RemoteFile = check_status(response, object_id).await?.json().await?;

        info!(id = %file.id, "Remote document updated");
        Ok(file)
    }

    async fn download(&self, object_id: &str, local_path: &Path) -> Result<u64, RemoteError> {
        let token = self.bearer().await?;
        let response = self
            .client
            .get(format!("{}/{}", self.files_url(), object_id))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let mut response = check_status(response, object_id).await?;
        let total = response.content_length();

        // Chunks go to a staging file, so a broken stream keeps the old cache
        // and the staging file is removed on the early return.
        let staged = staging_file(local_path)?;
        let mut file = tokio::fs::File::create(&staged).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            debug!(object_id, written, total = ?total, "Download progress");
        }
        file.flush().await?;
        drop(file);
        staged.persist(local_path).map_err(|e| e.error)?;

        info!(object_id, bytes = written, path = %local_path.display(), "Download complete");
        Ok(written)
    }
}
