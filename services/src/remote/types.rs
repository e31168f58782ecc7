//! Remote storage types.

use std::fmt;

/// How a deployment addresses its remote copy of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// A fixed, stable object id.
    FileId(String),
    /// An object looked up by name inside a folder.
    Named { folder_id: String, name: String },
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileId(id) => write!(f, "file {id}"),
            Self::Named { folder_id, name } => write!(f, "{name} in folder {folder_id}"),
        }
    }
}

/// A remote object as reported by the storage service.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RemoteFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl RemoteFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The remote action a successful sync performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSync {
    /// Remote content replaced the local cache.
    Downloaded { id: String, bytes: u64 },
    /// A new remote object was created from the local cache.
    Created { id: String },
    /// An existing remote object was overwritten with the local cache.
    Updated { id: String },
}

/// Error type for credential loading and refresh.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No credential found in GOOGLE_TOKEN or {0}")]
    Missing(String),

    #[error("Credential blob is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Credential JSON is invalid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read credential file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential expired and cannot be refreshed")]
    NotRefreshable,

    #[error("Token refresh rejected with status {status}: {message}")]
    Refresh { status: u16, message: String },

    #[error("Token refresh request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Error type for remote gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Credential unavailable: {0}")]
    Credential(#[from] CredentialError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Remote API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected remote response: {0}")]
    InvalidResponse(String),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote storage unavailable: {0}")]
    Unavailable(String),
}
