use std::path::PathBuf;
use thiserror::Error;

/// Export failures. The trial log is never touched, so a failed export can
/// simply be retried.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("participant id {0:?} has no usable characters")]
    EmptyParticipantId(String),
}
