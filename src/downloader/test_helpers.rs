//! Shared test doubles for the engine and presentation seams.

use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::config::DownloaderConfig;
use crate::downloader::bridge::{ui_bridge, UiLoop};
use crate::downloader::controller::JobController;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{JobOptions, JobState};
use crate::downloader::progress::EngineEvent;
use crate::downloader::traits::{MediaEngine, Presenter};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PresenterCall {
    Progress(f32, String),
    ShowError(String),
    DismissError,
    StartEnabled(bool),
}

/// Presenter that records every callback
#[derive(Debug, Default)]
pub(crate) struct RecordingPresenter {
    calls: Vec<PresenterCall>,
    states: Vec<JobState>,
    open_errors: usize,
}

impl RecordingPresenter {
    pub(crate) fn calls(&self) -> &[PresenterCall] {
        &self.calls
    }

    pub(crate) fn states(&self) -> &[JobState] {
        &self.states
    }

    pub(crate) fn open_errors(&self) -> usize {
        self.open_errors
    }

    pub(crate) fn progress_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PresenterCall::Progress(..)))
            .count()
    }

    pub(crate) fn errors_shown(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PresenterCall::ShowError(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn on_progress(&mut self, percent: f32, message: &str) {
        self.calls
            .push(PresenterCall::Progress(percent, message.to_string()));
    }

    fn show_error(&mut self, message: &str) {
        self.open_errors += 1;
        self.calls.push(PresenterCall::ShowError(message.to_string()));
    }

    fn dismiss_error(&mut self) {
        self.open_errors -= 1;
        self.calls.push(PresenterCall::DismissError);
    }

    fn set_start_enabled(&mut self, enabled: bool) {
        self.calls.push(PresenterCall::StartEnabled(enabled));
    }

    fn on_job_state(&mut self, state: &JobState) {
        self.states.push(state.clone());
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ScriptStep {
    Emit(EngineEvent),
    /// Block until the test releases the engine
    WaitForRelease,
    Fail(String),
}

/// Engine replaying a fixed script of events
pub(crate) struct ScriptedEngine {
    steps: Vec<ScriptStep>,
    release: Mutex<Option<Receiver<()>>>,
    invocations: Mutex<Vec<(String, JobOptions)>>,
}

impl ScriptedEngine {
    pub(crate) fn new(steps: Vec<ScriptStep>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            release: Mutex::new(None),
            invocations: Mutex::new(Vec::new()),
        })
    }

    /// Engine whose `WaitForRelease` steps block until the returned sender fires
    pub(crate) fn gated(steps: Vec<ScriptStep>) -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = channel();
        let engine = Arc::new(Self {
            steps,
            release: Mutex::new(Some(rx)),
            invocations: Mutex::new(Vec::new()),
        });
        (engine, tx)
    }

    pub(crate) fn invocations(&self) -> Vec<(String, JobOptions)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl MediaEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn download(
        &self,
        url: &str,
        options: &JobOptions,
        hook: &mut dyn FnMut(EngineEvent),
    ) -> Result<(), DownloadError> {
        self.invocations
            .lock()
            .unwrap()
            .push((url.to_string(), options.clone()));

        for step in &self.steps {
            match step {
                ScriptStep::Emit(event) => hook(event.clone()),
                ScriptStep::WaitForRelease => {
                    if let Some(rx) = self.release.lock().unwrap().as_ref() {
                        let _ = rx.recv();
                    }
                }
                ScriptStep::Fail(text) => return Err(DownloadError::Engine(text.clone())),
            }
        }
        Ok(())
    }
}

/// Controller wired to a scripted engine, storing into a temp directory.
/// Keep the returned `TempDir` alive for the duration of the test.
pub(crate) fn create_test_controller(
    engine: Arc<ScriptedEngine>,
) -> (JobController, UiLoop<RecordingPresenter>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let (controller, ui) = create_controller_in(temp_dir.path(), engine);
    (controller, ui, temp_dir)
}

/// Controller around any engine, storing under `root`
pub(crate) fn create_controller_in(
    root: &Path,
    engine: Arc<dyn MediaEngine>,
) -> (JobController, UiLoop<RecordingPresenter>) {
    let config = DownloaderConfig::default().with_storage_root(Some(root.to_path_buf()));
    let (handle, ui) = ui_bridge(RecordingPresenter::default());
    (JobController::new(config, engine, handle), ui)
}

/// Write an executable shell script standing in for yt-dlp
#[cfg(unix)]
pub(crate) fn write_fake_ytdlp(dir: &Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-yt-dlp");
    std::fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}
