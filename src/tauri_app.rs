// Tauri front-end adapter
//
// Progress, errors and entry-point state are pushed to the webview as events;
// the webview starts jobs through the `start_download` command.

use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager, Runtime, State};

use crate::config::DownloaderConfig;
use crate::downloader::{ui_bridge, JobController, JobRequest, JobState, Presenter, YtDlpEngine};

/// Download progress information
#[derive(Debug, Clone, Serialize)]
pub struct DownloadProgress {
    pub percent: f32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadControls {
    pub start_enabled: bool,
}

pub struct TauriPresenter<R: Runtime> {
    app_handle: AppHandle<R>,
}

impl<R: Runtime> TauriPresenter<R> {
    pub fn new(app_handle: AppHandle<R>) -> Self {
        Self { app_handle }
    }

    fn emit<S: Serialize + Clone>(&self, event: &str, payload: S) {
        if let Err(e) = self.app_handle.emit(event, payload) {
            tracing::warn!(event, error = %e, "Failed to emit event to webview");
        }
    }
}

impl<R: Runtime> Presenter for TauriPresenter<R> {
    fn on_progress(&mut self, percent: f32, message: &str) {
        self.emit(
            "download-progress",
            DownloadProgress {
                percent,
                status: message.to_string(),
            },
        );
    }

    fn show_error(&mut self, message: &str) {
        self.emit("download-error", message.to_string());
    }

    fn dismiss_error(&mut self) {
        self.emit("download-error-dismissed", ());
    }

    fn set_start_enabled(&mut self, enabled: bool) {
        self.emit(
            "download-controls",
            DownloadControls {
                start_enabled: enabled,
            },
        );
    }

    fn on_job_state(&mut self, state: &JobState) {
        self.emit("download-state", state.clone());
    }
}

#[tauri::command]
pub async fn start_download(
    url: String,
    is_audio: bool,
    controller: State<'_, JobController>,
) -> Result<(), String> {
    controller
        .start(JobRequest::new(url, is_audio))
        .map(|_job| ())
        .map_err(|e| e.to_string())
}

/// Register the controller and start the UI loop on the app's async runtime
pub fn setup<R: Runtime>(
    app: &mut tauri::App<R>,
    config: DownloaderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(YtDlpEngine::new(&config));
    tracing::info!(bin = engine.binary(), "Using yt-dlp engine");

    let (handle, ui) = ui_bridge(TauriPresenter::new(app.handle().clone()));
    app.manage(JobController::new(config, engine, handle));
    tauri::async_runtime::spawn(ui.run());
    Ok(())
}

/// Builder with the downloader wired in; finish with `.run(tauri::generate_context!())`
pub fn builder(config: DownloaderConfig) -> tauri::Builder<tauri::Wry> {
    tauri::Builder::default()
        .setup(move |app| setup(app, config))
        .invoke_handler(tauri::generate_handler![start_download])
}
