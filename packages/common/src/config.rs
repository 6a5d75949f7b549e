use std::path::PathBuf;

use serde::Deserialize;

/// Media storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory uploaded media is written under. Default: "./media".
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// Largest accepted single upload, in bytes. Default: 64 MiB.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_max_file_size() -> u64 {
    64 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            max_file_size: default_max_file_size(),
        }
    }
}
