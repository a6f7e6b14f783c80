use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ServiceError;

/// Content-addressed blob store for uploaded dataset files.
///
/// Bytes live on local disk under `{root}/{dataset_id}/{signature}`;
/// the database keeps the metadata row. Identity is the SHA-256 of the
/// content, so a byte-identical re-upload lands on the same path.
#[derive(Clone)]
pub struct BlobStorage {
    root: PathBuf,
}

impl BlobStorage {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Hex SHA-256 signature of the uploaded bytes.
    pub fn signature(content: &[u8]) -> String {
        format!("{:x}", Sha256::digest(content))
    }

    pub async fn store(
        &self,
        dataset_id: i32,
        signature: &str,
        content: &[u8],
    ) -> Result<String, ServiceError> {
        let dir = self.root.join(dataset_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(signature);
        tokio::fs::write(&path, content).await?;
        info!(
            "Stored {} bytes for dataset {} at {}",
            content.len(),
            dataset_id,
            path.display()
        );

        Ok(path.to_string_lossy().into_owned())
    }

    /// Drop a stored blob, used when the metadata insert is rejected.
    pub async fn remove(&self, storage_path: &str) -> Result<(), ServiceError> {
        if Path::new(storage_path).exists() {
            tokio::fs::remove_file(storage_path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signature_is_stable_for_identical_content() {
        let a = BlobStorage::signature(b"col1,col2\n1,2\n");
        let b = BlobStorage::signature(b"col1,col2\n1,2\n");
        let c = BlobStorage::signature(b"col1,col2\n3,4\n");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn store_and_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BlobStorage::new(dir.path()).await.unwrap();

        let content = b"hello";
        let signature = BlobStorage::signature(content);
        let path = storage.store(42, &signature, content).await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), content);

        storage.remove(&path).await.unwrap();
        assert!(!Path::new(&path).exists());

        // Removing an already-absent blob is not an error.
        storage.remove(&path).await.unwrap();
    }
}
