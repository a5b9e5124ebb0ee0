// Terminal front-end: `media-downloader <url> [--audio] [--playlist] [--config <file>]`

use std::process::ExitCode;
use std::sync::Arc;

use media_downloader_lib::{
    ui_bridge, DownloaderConfig, JobController, JobPhase, JobRequest, JobState, Presenter,
    YtDlpEngine,
};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct TerminalPresenter {
    last_phase: JobPhase,
}

impl Presenter for TerminalPresenter {
    fn on_progress(&mut self, percent: f32, message: &str) {
        println!("[{:>5.1}%] {}", percent, message);
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("Error: {}", message);
    }

    fn set_start_enabled(&mut self, enabled: bool) {
        tracing::debug!(enabled, "Start entry point toggled");
    }

    fn on_job_state(&mut self, state: &JobState) {
        self.last_phase = state.phase;
    }
}

struct Args {
    url: String,
    is_audio: bool,
    is_playlist: bool,
    config: Option<String>,
}

fn parse_args() -> Option<Args> {
    let mut url = None;
    let mut is_audio = false;
    let mut is_playlist = false;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--audio" => is_audio = true,
            "--playlist" => is_playlist = true,
            "--config" => config = Some(args.next()?),
            _ if url.is_none() => url = Some(arg),
            _ => return None,
        }
    }

    Some(Args {
        url: url?,
        is_audio,
        is_playlist,
        config,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args() else {
        eprintln!("Usage: media-downloader <url> [--audio] [--playlist] [--config <file>]");
        return ExitCode::from(2);
    };

    let config = match &args.config {
        Some(path) => match DownloaderConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(2);
            }
        },
        None => DownloaderConfig::from_env(),
    };

    let engine = Arc::new(YtDlpEngine::new(&config));
    tracing::info!(bin = engine.binary(), "Using yt-dlp engine");

    let (handle, ui) = ui_bridge(TerminalPresenter::default());
    let ui_task = tokio::spawn(ui.run());
    let controller = JobController::new(config, engine, handle);

    let mut request = JobRequest::new(args.url, args.is_audio);
    if args.is_playlist {
        request = request.with_playlist(true);
    }

    let outcome = match controller.start(request) {
        Ok(job) => job.await.map_err(|e| (e.to_string(), true)),
        // Rejected requests never reached the engine
        Err(e) => Err((e.to_string(), e.is_fatal_to_job())),
    };

    // The UI loop ends once the last handle (held by the controller) is gone
    drop(controller);
    let presenter = match ui_task.await {
        Ok(presenter) => presenter,
        Err(e) => {
            tracing::error!(error = %e, "UI loop failed");
            return ExitCode::FAILURE;
        }
    };

    match (outcome, presenter.last_phase) {
        (Ok(()), JobPhase::Completed) => ExitCode::SUCCESS,
        (Ok(()), JobPhase::PartiallyFailed) => ExitCode::from(3),
        (Err((e, false)), _) => {
            tracing::warn!(error = %e, "Download request rejected");
            ExitCode::from(2)
        }
        (Err((e, true)), _) => {
            tracing::error!(error = %e, "Download could not run");
            ExitCode::FAILURE
        }
        _ => ExitCode::FAILURE,
    }
}
