use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::StorageError;
use super::traits::MediaStore;
use crate::media::MediaKind;

/// Local-disk media store.
///
/// Layout: `{root}/{listing_id}/{photo|video}/{opaque_id}.{ext}`
pub struct FilesystemMediaStore {
    root: PathBuf,
}

impl FilesystemMediaStore {
    /// Create a new store, creating the root directory if needed.
    pub async fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn listing_dir(&self, listing_id: i32) -> PathBuf {
        self.root.join(listing_id.to_string())
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_directory(
        &self,
        listing_id: i32,
        kind: MediaKind,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.listing_dir(listing_id).join(kind.as_str());
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn save(
        &self,
        listing_id: i32,
        kind: MediaKind,
        filename: &str,
        data: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let dir = self.ensure_directory(listing_id, kind).await?;
        let final_path = dir.join(filename);
        // Written next to the target and renamed so a reader never sees a partial file.
        let temp_path = dir.join(format!(".{filename}.part"));

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            drop(file);
            fs::rename(&temp_path, &final_path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(final_path)
    }

    async fn read(
        &self,
        listing_id: i32,
        kind: MediaKind,
        filename: &str,
    ) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve_path(listing_id, kind, filename);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, listing_id: i32, kind: MediaKind, filename: &str) -> bool {
        let path = self.resolve_path(listing_id, kind, filename);
        match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::error!(path = %path.display(), "Error deleting media file: {e}");
                false
            }
        }
    }

    async fn remove_listing(&self, listing_id: i32) -> bool {
        let dir = self.listing_dir(listing_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::error!(
                    path = %dir.display(),
                    "Error removing listing media directory: {e}"
                );
                false
            }
        }
    }
}
