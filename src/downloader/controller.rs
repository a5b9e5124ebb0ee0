// Job controller: validation, lifecycle and the background worker

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use super::bridge::UiHandle;
use super::diagnostics::diagnose_error;
use super::errors::{DownloadError, Result};
use super::models::{JobOptions, JobPhase, JobRequest, JobUpdate, PostProcessor};
use super::paths::{PathResolver, PlatformStorage, ResolvedOutput};
use super::progress::{EngineEvent, ProgressAggregator};
use super::traits::MediaEngine;
use crate::config::DownloaderConfig;

pub const EMPTY_URL_MESSAGE: &str = "Please enter a valid YouTube URL";

const STARTING_PERCENT: f32 = 5.0;
const DOWNLOADING_PERCENT: f32 = 10.0;

/// Runs at most one download job at a time.
///
/// `start` must be called from within a Tokio runtime; the job itself runs on
/// the blocking pool and reports back exclusively through the [`UiHandle`].
pub struct JobController {
    config: Arc<DownloaderConfig>,
    resolver: Arc<PathResolver>,
    engine: Arc<dyn MediaEngine>,
    ui: UiHandle,
    phase: Arc<Mutex<JobPhase>>,
}

impl JobController {
    pub fn new(config: DownloaderConfig, engine: Arc<dyn MediaEngine>, ui: UiHandle) -> Self {
        let resolver = PathResolver::from_config(&config);
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            engine,
            ui,
            phase: Arc::new(Mutex::new(JobPhase::Idle)),
        }
    }

    /// Replace the platform storage root (e.g. an app-private directory on mobile)
    pub fn with_storage(mut self, storage: Arc<dyn PlatformStorage>) -> Self {
        self.resolver = Arc::new(PathResolver::new(storage, self.config.app_subdir.clone()));
        self
    }

    /// Controller-side phase; the UI keeps its own mirror in `JobState`
    pub fn phase(&self) -> JobPhase {
        *lock_phase(&self.phase)
    }

    pub fn is_busy(&self) -> bool {
        !self.phase().accepts_start()
    }

    /// Validate and launch a job.
    ///
    /// An empty URL is rejected with [`DownloadError::Validation`] and an error
    /// surface; a start while another job runs is rejected with
    /// [`DownloadError::JobInProgress`]. In both cases job state is untouched.
    pub fn start(&self, request: JobRequest) -> Result<JoinHandle<()>> {
        let mut phase = lock_phase(&self.phase);
        if !phase.accepts_start() {
            tracing::warn!(url = %request.url.trim(), phase = ?*phase, "Start requested while a job is running");
            return Err(DownloadError::JobInProgress);
        }
        let previous = std::mem::replace(&mut *phase, JobPhase::Validating);

        let url = request.url.trim();
        if url.is_empty() {
            *phase = previous;
            tracing::debug!("Rejecting empty URL");
            self.ui.show_error(EMPTY_URL_MESSAGE);
            return Err(DownloadError::Validation(EMPTY_URL_MESSAGE.to_string()));
        }

        let request = JobRequest {
            url: url.to_string(),
            ..request
        };
        *phase = JobPhase::Downloading;
        drop(phase);

        tracing::info!(
            url = %request.url,
            is_audio = request.is_audio,
            is_playlist = request.is_playlist,
            engine = self.engine.name(),
            "Download job accepted"
        );

        self.ui.disable_start();
        self.ui.post(JobUpdate::Reset {
            percent: STARTING_PERCENT,
            message: "Starting download...".to_string(),
        });

        let worker = JobWorker {
            request,
            config: Arc::clone(&self.config),
            resolver: Arc::clone(&self.resolver),
            engine: Arc::clone(&self.engine),
            ui: self.ui.clone(),
        };
        let guard = JobGuard {
            phase: Arc::clone(&self.phase),
            ui: self.ui.clone(),
            outcome: JobPhase::Failed,
        };

        Ok(tokio::task::spawn_blocking(move || {
            let mut guard = guard;
            guard.outcome = worker.run();
        }))
    }
}

fn lock_phase(phase: &Mutex<JobPhase>) -> MutexGuard<'_, JobPhase> {
    phase.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Re-opens the entry point however the worker exits
struct JobGuard {
    phase: Arc<Mutex<JobPhase>>,
    ui: UiHandle,
    outcome: JobPhase,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        // Held across the post so a new job's disable can't overtake this enable
        let mut phase = lock_phase(&self.phase);
        self.ui.enable_start();
        *phase = self.outcome;
    }
}

struct JobWorker {
    request: JobRequest,
    config: Arc<DownloaderConfig>,
    resolver: Arc<PathResolver>,
    engine: Arc<dyn MediaEngine>,
    ui: UiHandle,
}

impl JobWorker {
    fn run(self) -> JobPhase {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute())).unwrap_or_else(|_| {
            Err(DownloadError::Engine(format!(
                "{} engine stopped unexpectedly",
                self.engine.name()
            )))
        });

        match outcome {
            Ok(failed) if failed.is_empty() => {
                tracing::info!(url = %self.request.url, "Download completed");
                self.ui.post(JobUpdate::Finished {
                    phase: JobPhase::Completed,
                    percent: 100.0,
                    message: "Download completed!".to_string(),
                });
                JobPhase::Completed
            }
            Ok(failed) => {
                tracing::warn!(
                    url = %self.request.url,
                    failed = failed.len(),
                    "Download finished with failed items"
                );
                let listing = failed
                    .iter()
                    .map(|title| format!("❌ {}", title))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.ui.post(JobUpdate::Finished {
                    phase: JobPhase::PartiallyFailed,
                    percent: 100.0,
                    message: format!("Some videos failed:\n{}", listing),
                });
                JobPhase::PartiallyFailed
            }
            Err(e) => {
                let text = e.to_string();
                let hint = match diagnose_error(&text) {
                    Some(reason) => {
                        tracing::error!(
                            url = %self.request.url,
                            error = %text,
                            reason = ?reason,
                            retryable = reason.is_retryable(),
                            permanent = reason.is_permanent(),
                            "Download failed"
                        );
                        format!("\n⚠️ Detected: {}", reason.description())
                    }
                    None => {
                        tracing::error!(url = %self.request.url, error = %text, "Download failed");
                        String::new()
                    }
                };
                self.ui.post(JobUpdate::Finished {
                    phase: JobPhase::Failed,
                    percent: 0.0,
                    message: format!("Error: {}{}", text, hint),
                });
                self.ui.show_error(text);
                JobPhase::Failed
            }
        }
    }

    /// Returns the titles of items that failed without aborting the job
    fn execute(&self) -> Result<Vec<String>> {
        let resolved = self.resolver.resolve(self.request.is_playlist)?;
        let options = build_options(&self.request, resolved, &self.config);

        self.ui.post(JobUpdate::Progress {
            percent: DOWNLOADING_PERCENT,
            message: "Downloading...".to_string(),
        });

        let mut aggregator = ProgressAggregator::new(DOWNLOADING_PERCENT);
        let ui = self.ui.clone();
        let mut hook = |event: EngineEvent| {
            if let Some(out) = aggregator.on_event(event) {
                ui.post(out.into());
            }
        };
        self.engine.download(&self.request.url, &options, &mut hook)?;

        Ok(aggregator.failed_items().to_vec())
    }
}

fn build_options(
    request: &JobRequest,
    resolved: ResolvedOutput,
    config: &DownloaderConfig,
) -> JobOptions {
    let post_processors = if request.is_audio {
        vec![PostProcessor::ExtractAudio {
            codec: config.audio_codec.clone(),
            quality: config.audio_quality.clone(),
        }]
    } else {
        Vec::new()
    };

    JobOptions {
        output_dir: resolved.output_dir,
        output_template: resolved.output_template,
        format_selector: request.format_selector().to_string(),
        is_playlist: request.is_playlist,
        ignore_errors: request.is_playlist,
        post_processors,
    }
}
