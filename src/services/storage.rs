//! File storage for uploaded images

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `content` under the owner's key and return the stored reference
    async fn save(
        &self,
        content: Vec<u8>,
        file_name: Option<String>,
        owner_key: String,
    ) -> AppResult<String>;

    /// Bytes behind a stored reference, `None` when it cannot be read
    async fn read(&self, reference: String) -> Option<Vec<u8>>;
}

/// Stores files on local disk under `<root>/users/<owner_key>/`
#[derive(Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn extension_of(file_name: Option<&str>) -> Option<String> {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(
        &self,
        content: Vec<u8>,
        file_name: Option<String>,
        owner_key: String,
    ) -> AppResult<String> {
        if content.is_empty() {
            return Err(AppError::Validation(vec!["File is empty".to_string()]));
        }
        if owner_key.is_empty() || !owner_key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Internal(format!("Invalid storage key: {}", owner_key)));
        }

        let dir = self.root.join("users").join(&owner_key);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to create folder {}: {}", dir.display(), e))
            })?;

        let name = match extension_of(file_name.as_deref()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let target = dir.join(name);

        tokio::fs::write(&target, &content)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to write {}: {}", target.display(), e))
            })?;

        tracing::info!("File saved to {}", target.display());
        Ok(target.to_string_lossy().into_owned())
    }

    async fn read(&self, reference: String) -> Option<Vec<u8>> {
        if reference.is_empty() {
            return None;
        }
        match tokio::fs::read(&reference).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("No file found in the path {}: {}", reference, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let reference = storage
            .save(vec![1, 2, 3], Some("cover.PNG".to_string()), "7".to_string())
            .await
            .unwrap();

        assert!(reference.ends_with(".png"));
        assert!(Path::new(&reference).starts_with(dir.path().join("users").join("7")));
        assert_eq!(storage.read(reference).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let missing = dir.path().join("nothing.jpg").to_string_lossy().into_owned();
        assert!(storage.read(missing).await.is_none());
        assert!(storage.read(String::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        assert_err!(storage.save(Vec::new(), None, "7".to_string()).await);
    }

    #[test]
    fn test_extension_is_sanitized() {
        assert_eq!(extension_of(Some("a.JPG")), Some("jpg".to_string()));
        assert_eq!(extension_of(Some("noext")), None);
        assert_eq!(extension_of(Some("evil.p/ng")), None);
        assert_eq!(extension_of(None), None);
    }
}
