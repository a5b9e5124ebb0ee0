// UI bridge: worker -> presentation context
//
// Any thread may hold a `UiHandle` and post messages. A single `UiLoop` owns the
// receiving end and is the only place presentation callbacks run, in the exact
// order messages were posted.

use tokio::sync::mpsc;

use super::models::{JobState, JobUpdate};
use super::traits::Presenter;

#[derive(Debug, Clone, PartialEq)]
pub enum UiMessage {
    Job(JobUpdate),
    SetStartEnabled(bool),
    ShowError(String),
}

/// Sending side of the bridge; cheap to clone, usable from any thread
#[derive(Debug, Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl UiHandle {
    pub fn post(&self, update: JobUpdate) {
        self.send(UiMessage::Job(update));
    }

    pub fn enable_start(&self) {
        self.send(UiMessage::SetStartEnabled(true));
    }

    pub fn disable_start(&self) {
        self.send(UiMessage::SetStartEnabled(false));
    }

    pub fn show_error(&self, message: impl Into<String>) {
        self.send(UiMessage::ShowError(message.into()));
    }

    fn send(&self, message: UiMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("UI loop is gone, dropping update");
        }
    }
}

/// Create a connected handle/loop pair around a presenter
pub fn ui_bridge<P: Presenter>(presenter: P) -> (UiHandle, UiLoop<P>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let ui_loop = UiLoop {
        rx,
        presenter,
        state: JobState::default(),
        start_enabled: true,
        error_open: false,
    };
    (UiHandle { tx }, ui_loop)
}

/// Receiving side of the bridge, driven on the presentation context
pub struct UiLoop<P: Presenter> {
    rx: mpsc::UnboundedReceiver<UiMessage>,
    presenter: P,
    state: JobState,
    start_enabled: bool,
    error_open: bool,
}

impl<P: Presenter> UiLoop<P> {
    /// Deliver messages until every `UiHandle` is dropped, then hand the presenter back
    pub async fn run(mut self) -> P {
        while let Some(message) = self.rx.recv().await {
            self.dispatch(message);
        }
        self.presenter
    }

    /// Deliver everything queued so far without waiting (for frame-driven UIs).
    /// Returns the number of messages delivered.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.dispatch(message);
            delivered += 1;
        }
        delivered
    }

    /// Close the current error surface, if any (the user acknowledged it)
    pub fn dismiss_error(&mut self) {
        if self.error_open {
            self.presenter.dismiss_error();
            self.error_open = false;
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn start_enabled(&self) -> bool {
        self.start_enabled
    }

    pub fn error_open(&self) -> bool {
        self.error_open
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    fn dispatch(&mut self, message: UiMessage) {
        match message {
            UiMessage::Job(update) => {
                self.state.apply(&update);
                if !matches!(update, JobUpdate::ItemFailed { .. }) {
                    self.presenter
                        .on_progress(self.state.percent, &self.state.status_message);
                }
                self.presenter.on_job_state(&self.state);
            }
            UiMessage::SetStartEnabled(enabled) => {
                self.start_enabled = enabled;
                self.presenter.set_start_enabled(enabled);
            }
            UiMessage::ShowError(text) => {
                self.dismiss_error();
                self.presenter.show_error(&text);
                self.error_open = true;
            }
        }
    }
}
