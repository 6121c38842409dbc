use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing the persisted settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}
