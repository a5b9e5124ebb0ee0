// Downloader module - single-job orchestration around an external retrieval engine

pub mod backends;
pub mod bridge;
pub mod controller;
pub mod diagnostics;
pub mod errors;
pub mod models;
pub mod paths;
pub mod progress;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_helpers;

#[cfg(test)]
mod tests;

pub use backends::YtDlpEngine;
pub use bridge::{ui_bridge, UiHandle, UiLoop, UiMessage};
pub use controller::JobController;
pub use errors::{DownloadError, Result};
pub use models::{JobOptions, JobPhase, JobRequest, JobState, JobUpdate, PostProcessor};
pub use paths::{AppPrivateStorage, DesktopStorage, PathResolver, PlatformStorage};
pub use progress::{EngineEvent, ProgressAggregator};
pub use traits::{MediaEngine, Presenter};
