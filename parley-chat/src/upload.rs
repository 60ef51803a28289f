//! Staging area for files attached to a chat message
//!
//! An upload is written to the shared upload directory under a unique name and
//! handed out as an [`UploadedFile`] guard. Dropping the guard removes the file,
//! so every exit path of a request cleans up after itself.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 text")]
    NotText { path: PathBuf },
}

/// Directory uploads are staged in
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Use `root`, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| UploadError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a fresh unique name
    pub async fn store(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadedFile, UploadError> {
        let file_name = match original_name.and_then(safe_extension) {
            Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let path = self.root.join(file_name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| UploadError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(
            path = %path.display(),
            original_name = ?original_name,
            size = bytes.len(),
            "Stored uploaded file"
        );

        Ok(UploadedFile {
            path,
            original_name: original_name.map(str::to_string),
            size: bytes.len() as u64,
        })
    }
}

fn safe_extension(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 16)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// A staged upload. The file is removed when this value is dropped.
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
    original_name: Option<String>,
    size: u64,
}

impl UploadedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the whole file as UTF-8 text
    pub async fn read_text(&self) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| UploadError::Io {
                path: self.path.clone(),
                source,
            })?;

        String::from_utf8(bytes).map_err(|_| UploadError::NotText {
            path: self.path.clone(),
        })
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let result = tokio::fs::remove_file(&path).await;
                    log_removal(&path, result);
                });
            }
            Err(_) => {
                let result = std::fs::remove_file(&path);
                log_removal(&path, result);
            }
        }
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!(path = %path.display(), "Removed uploaded file"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove uploaded file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_until_removed(path: &Path) {
        for _ in 0..50 {
            if !path.exists() {
                return;
            }
            // removal runs on the blocking pool, which a paused clock does not wait for
            std::thread::sleep(Duration::from_millis(10));
            tokio::task::yield_now().await;
        }
        panic!("{} was not removed", path.display());
    }

    #[tokio::test]
    async fn test_store_and_read_text() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path().join("uploads")).unwrap();

        let file = uploads.store(Some("notes.txt"), b"lorem ipsum").await.unwrap();
        assert!(file.path().starts_with(uploads.path()));
        assert_eq!(file.path().extension().unwrap(), "txt");
        assert_eq!(file.original_name(), Some("notes.txt"));
        assert_eq!(file.size(), 11);
        assert_eq!(file.read_text().await.unwrap(), "lorem ipsum");
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path()).unwrap();

        let a = uploads.store(Some("same.txt"), b"a").await.unwrap();
        let b = uploads.store(Some("same.txt"), b"b").await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_not_text() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path()).unwrap();

        let file = uploads.store(Some("blob.bin"), &[0xff, 0xfe, 0x00]).await.unwrap();
        assert!(matches!(
            file.read_text().await,
            Err(UploadError::NotText { .. })
        ));
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path()).unwrap();

        let file = uploads.store(None, b"temporary").await.unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());

        drop(file);
        wait_until_removed(&path).await;
    }

    #[test]
    fn test_drop_outside_runtime_removes_synchronously() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path()).unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let file = runtime
            .block_on(uploads.store(Some("a.txt"), b"x"))
            .unwrap();
        let path = file.path().to_path_buf();
        drop(runtime);

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_unsafe_extensions_are_dropped() {
        assert_eq!(safe_extension("report.md"), Some("md"));
        assert_eq!(safe_extension("../../etc/passwd"), None);
        assert_eq!(safe_extension("weird.t/xt"), None);
        assert_eq!(safe_extension("noext"), None);
    }
}
