//! Remote storage trait definitions.

use super::credential::Credential;
use super::types::{CredentialError, RemoteError, RemoteFile, RemoteSync};
use crate::cache::LocalCacheStore;
use std::future::Future;
use std::path::Path;

/// Generic interface for the remote object store holding the document.
///
/// See [module documentation](super) for the sync flows built on top of it.
pub trait RemoteFileGateway: Clone + Send + Sync + 'static {
    /// Returns the id of the first non-trashed object named `name` in `folder_id`.
    fn find_by_name(
        &self,
        name: &str,
        folder_id: &str,
    ) -> impl Future<Output = Result<Option<String>, RemoteError>> + Send;

    fn create(
        &self,
        local_path: &Path,
        name: &str,
        folder_id: &str,
    ) -> impl Future<Output = Result<RemoteFile, RemoteError>> + Send;

    fn update(
        &self,
        object_id: &str,
        local_path: &Path,
    ) -> impl Future<Output = Result<RemoteFile, RemoteError>> + Send;

    /// Writes the object's content to `local_path`, returning the byte count.
    fn download(
        &self,
        object_id: &str,
        local_path: &Path,
    ) -> impl Future<Output = Result<u64, RemoteError>> + Send;

    /// Downloads the named object if it exists (remote wins); otherwise
    /// uploads the local document, creating it empty first if needed.
    fn ensure_remote_exists(
        &self,
        name: &str,
        folder_id: &str,
        local_path: &Path,
    ) -> impl Future<Output = Result<RemoteSync, RemoteError>> + Send {
        async move {
            match self.find_by_name(name, folder_id).await? {
                Some(id) => {
                    let bytes = self.download(&id, local_path).await?;
                    Ok(RemoteSync::Downloaded { id, bytes })
                }
                None => {
                    LocalCacheStore::new(local_path).ensure_exists().await?;
                    let file = self.create(local_path, name, folder_id).await?;
                    Ok(RemoteSync::Created { id: file.id })
                }
            }
        }
    }
}

/// Source of the access credential for the remote store.
pub trait CredentialProvider: Clone + Send + Sync + 'static {
    /// Returns a currently valid credential, refreshing it first if needed.
    fn get(&self) -> impl Future<Output = Result<Credential, CredentialError>> + Send;

    /// Refreshes the held credential if it has expired. Returns whether a
    /// refresh happened.
    fn refresh_if_expired(&self) -> impl Future<Output = Result<bool, CredentialError>> + Send;
}
