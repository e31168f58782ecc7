//! Local JSON cache of the reservation document.

use crate::reservations::ReservationDocument;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;

/// The on-disk copy of the reservation document.
///
/// Reads never fail: an unreadable or malformed file yields the empty document.
/// Writes replace the whole file.
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    path: PathBuf,
}

impl LocalCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and, if the file is absent, writes the
    /// empty document. Safe to call repeatedly.
    pub async fn ensure_exists(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        if !fs::try_exists(&self.path).await? {
            tracing::info!(path = %self.path.display(), "Creating empty reservation cache");
            self.write(&ReservationDocument::default()).await?;
        }

        Ok(())
    }

    pub async fn read(&self) -> ReservationDocument {
        match fs::read(&self.path).await {
            Ok(bytes) => ReservationDocument::from_slice_or_default(&bytes),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read reservation cache, using an empty document"
                );
                ReservationDocument::default()
            }
        }
    }

    pub async fn write(&self, document: &ReservationDocument) -> io::Result<()> {
        let text = serde_json::to_string_pretty(document)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let staged = staging_file(&self.path)?;
        fs::write(&staged, text).await?;
        staged.persist(&self.path)?;
        Ok(())
    }
}

/// Creates a uniquely named staging file next to `path`, e.g.
/// `data/.reservas.json.a1B2c3.tmp`. It is deleted on drop unless persisted.
pub(crate) fn staging_file(path: &Path) -> io::Result<TempPath> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut prefix = OsString::from(".");
    if let Some(name) = path.file_name() {
        prefix.push(name);
        prefix.push(".");
    }

    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}
