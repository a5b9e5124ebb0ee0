// Output location resolution

use std::path::PathBuf;
use std::sync::Arc;

use super::errors::{DownloadError, Result};
use crate::config::DownloaderConfig;

/// Filename template for collection items; the index keeps ordering and avoids collisions
pub const PLAYLIST_TEMPLATE: &str = "%(playlist_index)s-%(title)s.%(ext)s";
/// Filename template for single items
pub const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Platform-specific storage root
pub trait PlatformStorage: Send + Sync {
    /// Name of the storage strategy (for logging)
    fn name(&self) -> &'static str;

    fn base_storage_dir(&self) -> Result<PathBuf>;
}

/// Desktop: the user's download directory
pub struct DesktopStorage;

impl PlatformStorage for DesktopStorage {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn base_storage_dir(&self) -> Result<PathBuf> {
        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .ok_or_else(|| {
                DownloadError::storage(
                    "~/Downloads",
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no home directory for the current user",
                    ),
                )
            })
    }
}

/// Sandboxed platforms (mobile): an app-private root handed over by the host
pub struct AppPrivateStorage {
    root: PathBuf,
}

impl AppPrivateStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PlatformStorage for AppPrivateStorage {
    fn name(&self) -> &'static str {
        "app-private"
    }

    fn base_storage_dir(&self) -> Result<PathBuf> {
        Ok(self.root.clone())
    }
}

/// Where a job writes its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub output_dir: PathBuf,
    /// Output directory joined with the filename template
    pub output_template: String,
}

pub struct PathResolver {
    storage: Arc<dyn PlatformStorage>,
    app_subdir: String,
}

impl PathResolver {
    pub fn new(storage: Arc<dyn PlatformStorage>, app_subdir: impl Into<String>) -> Self {
        Self {
            storage,
            app_subdir: app_subdir.into(),
        }
    }

    /// Configured storage root if any, desktop downloads otherwise
    pub fn from_config(config: &DownloaderConfig) -> Self {
        let storage: Arc<dyn PlatformStorage> = match &config.storage_root {
            Some(root) => Arc::new(AppPrivateStorage::new(root.clone())),
            None => Arc::new(DesktopStorage),
        };
        Self::new(storage, config.app_subdir.clone())
    }

    /// Compute and create the output directory for a job.
    ///
    /// Creation is idempotent. Failures are reported as [`DownloadError::Storage`]
    /// and never retried.
    pub fn resolve(&self, is_playlist: bool) -> Result<ResolvedOutput> {
        let base = self.storage.base_storage_dir()?;
        let output_dir = base.join(&self.app_subdir);

        std::fs::create_dir_all(&output_dir)
            .map_err(|e| DownloadError::storage(&output_dir, e))?;

        let template = if is_playlist {
            PLAYLIST_TEMPLATE
        } else {
            SINGLE_TEMPLATE
        };
        let output_template = output_dir.join(template).to_string_lossy().to_string();

        tracing::debug!(
            storage = self.storage.name(),
            dir = %output_dir.display(),
            is_playlist,
            "Resolved output location"
        );

        Ok(ResolvedOutput {
            output_dir,
            output_template,
        })
    }
}
