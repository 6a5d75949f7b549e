use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::StorageError;
use crate::media::MediaKind;

/// Per-listing media storage.
///
/// Files are addressed by `(listing_id, kind, filename)` and laid out as
/// `{root}/{listing_id}/{kind}/{filename}`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Base directory all listing folders live under.
    fn root(&self) -> &Path;

    /// Compose the path of a stored file. Performs no I/O.
    fn resolve_path(&self, listing_id: i32, kind: MediaKind, filename: &str) -> PathBuf {
        self.root()
            .join(listing_id.to_string())
            .join(kind.as_str())
            .join(filename)
    }

    /// Create `{root}/{listing_id}/{kind}` if it does not exist yet.
    async fn ensure_directory(
        &self,
        listing_id: i32,
        kind: MediaKind,
    ) -> Result<PathBuf, StorageError>;

    /// Write `data` under a generated filename and return the final path.
    async fn save(
        &self,
        listing_id: i32,
        kind: MediaKind,
        filename: &str,
        data: &[u8],
    ) -> Result<PathBuf, StorageError>;

    /// Read a stored file back.
    async fn read(
        &self,
        listing_id: i32,
        kind: MediaKind,
        filename: &str,
    ) -> Result<Vec<u8>, StorageError>;

    /// Remove a stored file.
    ///
    /// Returns `true` if a file was removed. A missing file yields `false`;
    /// any other OS error is logged and also yields `false`.
    async fn delete(&self, listing_id: i32, kind: MediaKind, filename: &str) -> bool;

    /// Remove everything stored for a listing. Same error policy as [`MediaStore::delete`].
    async fn remove_listing(&self, listing_id: i32) -> bool;
}
