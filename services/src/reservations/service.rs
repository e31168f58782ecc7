//! Load/save orchestration over the local cache and the remote copy.

use super::document::ReservationDocument;
use crate::cache::LocalCacheStore;
use crate::remote::{RemoteError, RemoteFileGateway, RemoteSync, RemoteTarget};
use std::io;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Result of the remote half of a load or save.
#[derive(Debug)]
pub enum SyncOutcome {
    /// No remote target is configured.
    Disabled,
    Synced(RemoteSync),
    /// The remote call failed; the local copy was used as-is.
    Failed(RemoteError),
}

impl SyncOutcome {
    fn from_result(result: Result<RemoteSync, RemoteError>, action: &str) -> Self {
        match result {
            Ok(sync) => {
                info!(action, sync = ?sync, "Remote sync succeeded");
                Self::Synced(sync)
            }
            Err(e) => {
                warn!(action, error = %e, "Remote sync failed, continuing with local data");
                Self::Failed(e)
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A freshly loaded document and how the remote reconciliation went.
#[derive(Debug)]
pub struct Loaded {
    pub document: ReservationDocument,
    pub sync: SyncOutcome,
}

/// Error type for the local side of the service. Remote failures never
/// surface here.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Local reservation cache unavailable: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone)]
struct Remote<G> {
    gateway: G,
    target: RemoteTarget,
}

/// Provides load/save of the reservation document. The local cache is
/// authoritative for each request; the remote copy is best-effort.
#[derive(Clone)]
pub struct ReservationService<G> {
    store: LocalCacheStore,
    remote: Option<Remote<G>>,
    // Serializes every access that reads or replaces the cache file.
    write_lock: Arc<Mutex<()>>,
}

impl<G: RemoteFileGateway> ReservationService<G> {
    /// A service that only uses the local cache.
    pub fn new(store: LocalCacheStore) -> Self {
        Self {
            store,
            remote: None,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_remote(store: LocalCacheStore, gateway: G, target: RemoteTarget) -> Self {
        info!(remote = %target, "Remote sync enabled");
        Self {
            store,
            remote: Some(Remote { gateway, target }),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn local(&self) -> &LocalCacheStore {
        &self.store
    }

    /// Refreshes the local cache from the remote when possible, then reads it.
    pub async fn load(&self) -> Result<Loaded, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.load_locked().await
    }

    /// Writes the document locally, then pushes it to the remote when possible.
    pub async fn save(&self, document: &ReservationDocument) -> Result<SyncOutcome, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.save_locked(document).await
    }

    /// Loads, mutates and saves while holding the service's lock, so
    /// concurrent requests within this process do not overwrite each other.
    pub async fn apply<F, R>(&self, mutate: F) -> Result<(R, SyncOutcome), StoreError>
    where
        F: FnOnce(&mut ReservationDocument) -> R + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let Loaded { mut document, .. } = self.load_locked().await?;
        let result = mutate(&mut document);
        let sync = self.save_locked(&document).await?;
        Ok((result, sync))
    }

    // Callers hold `write_lock`: pulls and pushes both touch the cache file.
    async fn load_locked(&self) -> Result<Loaded, StoreError> {
        self.store.ensure_exists().await?;
        let sync = self.pull().await;
        let document = self.store.read().await;
        Ok(Loaded { document, sync })
    }

    async fn save_locked(&self, document: &ReservationDocument) -> Result<SyncOutcome, StoreError> {
        self.store.ensure_exists().await?;
        self.store.write(document).await?;
        info!(count = document.len(), "Reservations saved locally");
        Ok(self.push().await)
    }

    async fn pull(&self) -> SyncOutcome {
        let Some(remote) = &self.remote else {
            return SyncOutcome::Disabled;
        };
        let path = self.store.path();

        let result = match &remote.target {
            RemoteTarget::FileId(id) => remote
                .gateway
                .download(id, path)
                .await
                .map(|bytes| RemoteSync::Downloaded {
                    id: id.clone(),
                    bytes,
                }),
            RemoteTarget::Named { folder_id, name } => {
                remote
                    .gateway
                    .ensure_remote_exists(name, folder_id, path)
                    .await
            }
        };
        SyncOutcome::from_result(result, "download")
    }

    async fn push(&self) -> SyncOutcome {
        let Some(remote) = &self.remote else {
            return SyncOutcome::Disabled;
        };
        let path = self.store.path();

        let result = match &remote.target {
            RemoteTarget::FileId(id) => remote
                .gateway
                .update(id, path)
                .await
                .map(|file| RemoteSync::Updated { id: file.id }),
            RemoteTarget::Named { folder_id, name } => {
                match remote.gateway.find_by_name(name, folder_id).await {
                    Ok(Some(id)) => remote
                        .gateway
                        .update(&id, path)
                        .await
                        .map(|file| RemoteSync::Updated { id: file.id }),
                    Ok(None) => remote
                        .gateway
                        .create(path, name, folder_id)
                        .await
                        .map(|file| RemoteSync::Created { id: file.id }),
                    Err(e) => Err(e),
                }
            }
        };
        SyncOutcome::from_result(result, "upload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockRemoteGateway, RemoteFile};
    use crate::reservations::RecordPayload;
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;

    const FOLDER: &str = "folder-1";
    const NAME: &str = "reservas.json";

    fn store_in(dir: &tempfile::TempDir) -> LocalCacheStore {
        LocalCacheStore::new(dir.path().join("data").join("reservas_temp.json"))
    }

    fn named() -> RemoteTarget {
        RemoteTarget::Named {
            folder_id: FOLDER.to_owned(),
            name: NAME.to_owned(),
        }
    }

    fn payload(raw: &str) -> RecordPayload {
        RecordPayload::from_slice(raw.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn local_only_load_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let service = ReservationService::<MockRemoteGateway>::new(store_in(&dir));

        let loaded = service.load().await.unwrap();

        assert!(loaded.document.is_empty());
        assert!(matches!(loaded.sync, SyncOutcome::Disabled));
        assert!(service.local().path().exists());
    }

    #[tokio::test]
    async fn load_heals_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.ensure_exists().await.unwrap();
        std::fs::write(store.path(), "garbage").unwrap();
        let service = ReservationService::<MockRemoteGateway>::new(store);

        assert_eq!(
            service.load().await.unwrap().document,
            ReservationDocument::default()
        );
    }

    #[tokio::test]
    async fn load_by_id_takes_remote_content() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = MockRemoteGateway::new();
        gateway.insert_with_id(
            "file-9",
            NAME,
            FOLDER,
            json!({"reservations": [{"data": "2024-05-05"}]}).to_string(),
        );
        let service = ReservationService::with_remote(
            store_in(&dir),
            gateway,
            RemoteTarget::FileId("file-9".to_owned()),
        );

        let loaded = service.load().await.unwrap();

        assert_eq!(loaded.document.len(), 1);
        assert!(matches!(
            loaded.sync,
            SyncOutcome::Synced(RemoteSync::Downloaded { .. })
        ));
    }

    #[tokio::test]
    async fn load_by_name_establishes_remote_copy() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = MockRemoteGateway::new();
        let service = ReservationService::with_remote(store_in(&dir), gateway.clone(), named());

        let loaded = service.load().await.unwrap();

        assert!(matches!(
            loaded.sync,
            SyncOutcome::Synced(RemoteSync::Created { .. })
        ));
        assert!(
            gateway
                .find_by_name(NAME, FOLDER)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn failing_remote_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.ensure_exists().await.unwrap();
        let mut local = ReservationDocument::default();
        local.add_records(payload(r#"{"data": "2024-01-01"}"#));
        store.write(&local).await.unwrap();

        let service = ReservationService::with_remote(store, MockRemoteGateway::failing(), named());

        let loaded = service.load().await.unwrap();
        assert_eq!(loaded.document, local);
        assert!(loaded.sync.is_failed());

        let sync = service.save(&loaded.document).await.unwrap();
        assert!(sync.is_failed());
        assert_eq!(service.local().read().await, local);
    }

    #[tokio::test]
    async fn save_creates_then_updates_named_object() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = MockRemoteGateway::new();
        let service = ReservationService::with_remote(store_in(&dir), gateway.clone(), named());

        let mut document = ReservationDocument::default();
        document.add_records(payload(r#"{"data": "2024-01-01"}"#));
        let first = service.save(&document).await.unwrap();
        let SyncOutcome::Synced(RemoteSync::Created { id }) = first else {
            panic!("expected a created object, got {first:?}");
        };

        document.add_records(payload(r#"{"data": "2024-01-02"}"#));
        let second = service.save(&document).await.unwrap();
        let SyncOutcome::Synced(RemoteSync::Updated { id: updated }) = &second else {
            panic!("expected an updated object, got {second:?}");
        };
        assert_eq!(*updated, id);

        let remote: ReservationDocument =
            serde_json::from_slice(&gateway.content(&id).unwrap()).unwrap();
        assert_eq!(remote, document);
        assert_eq!(gateway.len(), 1);
    }

    #[tokio::test]
    async fn save_by_id_reports_missing_remote_object() {
        let dir = tempfile::tempdir().unwrap();
        let service = ReservationService::with_remote(
            store_in(&dir),
            MockRemoteGateway::new(),
            RemoteTarget::FileId("missing".to_owned()),
        );

        let sync = service
            .save(&ReservationDocument::default())
            .await
            .unwrap();
        assert!(matches!(sync, SyncOutcome::Failed(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_of_load_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let service = ReservationService::<MockRemoteGateway>::new(store_in(&dir));
        let mut document = ReservationDocument::default();
        document.add_records(payload(
            r#"[
                {"data": "2024-01-01", "idRepeticao": "g1"},
                {"data": "2024-01-08", "idRepeticao": "g1"}
            ]"#,
        ));
        service.save(&document).await.unwrap();

        service.save(&service.load().await.unwrap().document).await.unwrap();
        let first = std::fs::read(service.local().path()).unwrap();
        service.save(&service.load().await.unwrap().document).await.unwrap();
        let second = std::fs::read(service.local().path()).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn concurrent_applies_do_not_lose_writes() {
        let dir = tempfile::tempdir().unwrap();
        let service = ReservationService::<MockRemoteGateway>::new(store_in(&dir));

        let mut handles = Vec::new();
        for day in 1..=8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let record = payload(&format!(r#"{{"data": "2024-01-0{day}"}}"#));
                service
                    .apply(|document| document.add_records(record))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(service.load().await.unwrap().document.len(), 8);
    }

    /// Delays every update so a concurrent read can land mid-save.
    #[derive(Clone)]
    struct SlowUpdateGateway {
        inner: MockRemoteGateway,
        delay: Duration,
    }

    impl RemoteFileGateway for SlowUpdateGateway {
        async fn find_by_name(
            &self,
            name: &str,
            folder_id: &str,
        ) -> Result<Option<String>, RemoteError> {
            self.inner.find_by_name(name, folder_id).await
        }

        async fn create(
            &self,
            local_path: &Path,
            name: &str,
            folder_id: &str,
        ) -> Result<RemoteFile, RemoteError> {
            self.inner.create(local_path, name, folder_id).await
        }

        async fn update(
            &self,
            object_id: &str,
            local_path: &Path,
        ) -> Result<RemoteFile, RemoteError> {
            tokio::time::sleep(self.delay).await;
            self.inner.update(object_id, local_path).await
        }

        async fn download(&self, object_id: &str, local_path: &Path) -> Result<u64, RemoteError> {
            self.inner.download(object_id, local_path).await
        }
    }

    #[tokio::test]
    async fn load_during_slow_push_keeps_new_record() {
        let dir = tempfile::tempdir().unwrap();
        let inner = MockRemoteGateway::new();
        inner.insert(NAME, FOLDER, json!({"reservations": []}).to_string());
        let gateway = SlowUpdateGateway {
            inner: inner.clone(),
            delay: Duration::from_millis(200),
        };
        let service = ReservationService::with_remote(store_in(&dir), gateway, named());

        let writer = {
            let service = service.clone();
            let record = payload(r#"{"data": "2024-03-01"}"#);
            tokio::spawn(async move {
                service
                    .apply(|document| document.add_records(record))
                    .await
                    .unwrap();
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let reader = {
            let service = service.clone();
            tokio::spawn(async move { service.load().await.unwrap() })
        };

        writer.await.unwrap();
        let seen = reader.await.unwrap();
        assert_eq!(seen.document.len(), 1);
        assert_eq!(service.load().await.unwrap().document.len(), 1);
    }
}
