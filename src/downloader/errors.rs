// Error types for the download job orchestrator

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Request rejected before any job state changed (empty URL)
    #[error("{0}")]
    Validation(String),

    /// A job is already downloading; only one runs at a time
    #[error("a download is already in progress")]
    JobInProgress,

    /// Output directory could not be created
    #[error("cannot prepare output directory {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// yt-dlp binary not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Fatal failure reported by the retrieval engine
    #[error("{0}")]
    Engine(String),
}

impl DownloadError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether this error ends a running job (as opposed to rejecting a request)
    pub fn is_fatal_to_job(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::ToolNotFound(_) | Self::Engine(_)
        )
    }
}

// Engine collaborators report failures as free text
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        if s.contains("No such file") || s.contains("command not found") {
            return Self::ToolNotFound(s);
        }
        Self::Engine(s)
    }
}
