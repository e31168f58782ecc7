//! Mock remote gateway for testing.

use super::traits::RemoteFileGateway;
use super::types::{RemoteError, RemoteFile};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory mock implementation of `RemoteFileGateway` for testing.
///
/// Clones share state. When set to fail, every call returns
/// `RemoteError::Unavailable` before touching any state.
#[derive(Clone, Default)]
pub struct MockRemoteGateway {
    objects: Arc<RwLock<HashMap<String, MockObject>>>,
    next_id: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicU64>,
}

#[derive(Clone)]
struct MockObject {
    name: String,
    folder_id: String,
    content: Vec<u8>,
}

impl MockRemoteGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every call fails.
    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.set_failing(true);
        gateway
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of gateway calls made so far, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Seeds an object and returns its id.
    pub fn insert(&self, name: &str, folder_id: &str, content: impl Into<Vec<u8>>) -> String {
        let id = self.generate_id();
        self.insert_with_id(&id, name, folder_id, content);
        id
    }

    pub fn insert_with_id(
        &self,
        id: &str,
        name: &str,
        folder_id: &str,
        content: impl Into<Vec<u8>>,
    ) {
        self.objects.write().expect("lock poisoned").insert(
            id.to_owned(),
            MockObject {
                name: name.to_owned(),
                folder_id: folder_id.to_owned(),
                content: content.into(),
            },
        );
    }

    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(id)
            .map(|object| object.content.clone())
    }

    fn generate_id(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("object-{id}")
    }

    fn begin_call(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable(
                "mock gateway set to fail".to_owned(),
            ));
        }
        Ok(())
    }
}

impl RemoteFileGateway for MockRemoteGateway {
    async fn find_by_name(
        &self,
        name: &str,
        folder_id: &str,
    ) -> Result<Option<String>, RemoteError> {
        self.begin_call()?;
        let objects = self.objects.read().expect("lock poisoned");
        let mut matches: Vec<&String> = objects
            .iter()
            .filter(|(_, object)| object.name == name && object.folder_id == folder_id)
            .map(|(id, _)| id)
            .collect();
        matches.sort();
        Ok(matches.first().map(|id| (*id).clone()))
    }

    async fn create(
        &self,
        local_path: &Path,
        name: &str,
        folder_id: &str,
    ) -> Result<RemoteFile, RemoteError> {
        self.begin_call()?;
        let content = tokio::fs::read(local_path).await?;
        let id = self.insert(name, folder_id, content);
        Ok(RemoteFile::new(id, name))
    }

    async fn update(&self, object_id: &str, local_path: &Path) -> Result<RemoteFile, RemoteError> {
        self.begin_call()?;
        let content = tokio::fs::read(local_path).await?;
        let mut objects = self.objects.write().expect("lock poisoned");
        let object = objects
            .get_mut(object_id)
            .ok_or_else(|| RemoteError::NotFound(object_id.to_owned()))?;
        object.content = content;
        Ok(RemoteFile::new(object_id, object.name.clone()))
    }

    async fn download(&self, object_id: &str, local_path: &Path) -> Result<u64, RemoteError> {
        self.begin_call()?;
        let content = self
            .content(object_id)
            .ok_or_else(|| RemoteError::NotFound(object_id.to_owned()))?;
        tokio::fs::write(local_path, &content).await?;
        Ok(content.len() as u64)
    }
}
