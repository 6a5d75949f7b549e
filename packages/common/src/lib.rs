pub mod config;
pub mod media;
pub mod storage;

pub use config::StorageConfig;
pub use media::{Classification, ClassifyError, MediaKind};
pub use storage::{FilesystemMediaStore, MediaStore, StorageError};
