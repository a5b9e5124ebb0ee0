use std::sync::Arc;
use std::time::Duration;

use super::bridge::UiLoop;
use super::controller::{JobController, EMPTY_URL_MESSAGE};
use super::errors::DownloadError;
use super::models::{JobPhase, JobRequest, PostProcessor};
use super::paths::AppPrivateStorage;
use super::progress::{EngineEvent, FINISHED_PERCENT};
use super::test_helpers::{
    create_test_controller, PresenterCall, RecordingPresenter, ScriptStep, ScriptedEngine,
};


const SINGLE_URL: &str = "https://www.youtube.com/watch?v=abc123";
const PLAYLIST_URL: &str = "https://www.youtube.com/playlist?list=PL0123";

fn downloading(percent: f32) -> ScriptStep {
    ScriptStep::Emit(EngineEvent::Downloading { percent })
}

fn finished() -> ScriptStep {
    ScriptStep::Emit(EngineEvent::Finished)
}

fn item_error(title: &str) -> ScriptStep {
    ScriptStep::Emit(EngineEvent::Error {
        item: title.to_string(),
    })
}

/// Drain the UI loop until `done` holds, failing after a couple of seconds
async fn drain_until(
    ui: &mut UiLoop<RecordingPresenter>,
    done: impl Fn(&UiLoop<RecordingPresenter>) -> bool,
) {
    for _ in 0..200 {
        ui.drain();
        if done(ui) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached, state: {:?}", ui.state());
}
