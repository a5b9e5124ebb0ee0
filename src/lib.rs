pub mod config;
pub mod downloader;
#[cfg(feature = "tauri")]
pub mod tauri_app;

pub use config::{DownloaderConfig, NetworkConfig};
pub use downloader::{
    ui_bridge, DownloadError, JobController, JobPhase, JobRequest, JobState, MediaEngine,
    Presenter, UiHandle, UiLoop, YtDlpEngine,
};
