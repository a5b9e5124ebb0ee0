// Collaborator seams: the retrieval engine and the presentation layer

use super::errors::DownloadError;
use super::models::{JobOptions, JobState};
use super::progress::EngineEvent;

/// Media retrieval engine.
///
/// `download` blocks the calling thread for the whole job and reports
/// progress through `hook`, synchronously and one event at a time.
/// Per-item failures are reported as `EngineEvent::Error`; an `Err` return
/// means the job as a whole failed.
pub trait MediaEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    fn download(
        &self,
        url: &str,
        options: &JobOptions,
        hook: &mut dyn FnMut(EngineEvent),
    ) -> Result<(), DownloadError>;
}

/// Presentation layer callbacks.
///
/// Only ever invoked from the UI loop, so implementations may assume a single
/// thread and need no locking of their own.
pub trait Presenter: Send + 'static {
    fn on_progress(&mut self, percent: f32, message: &str);

    /// Open an error surface. Any previous surface has already been dismissed.
    fn show_error(&mut self, message: &str);

    fn dismiss_error(&mut self) {}

    fn set_start_enabled(&mut self, enabled: bool);

    /// Full job state after each applied update
    fn on_job_state(&mut self, _state: &JobState) {}
}
