// Common data models for download jobs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// yt-dlp format selector for audio jobs: compact m4a first, then any audio
pub const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

/// yt-dlp format selector for video jobs: mp4 video + m4a audio, then best available
pub const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// A user submission. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub url: String,
    pub is_audio: bool,
    pub is_playlist: bool,
}

impl JobRequest {
    /// Build a request, deriving playlist mode from the URL shape
    pub fn new(url: impl Into<String>, is_audio: bool) -> Self {
        let url = url.into();
        let is_playlist = looks_like_playlist(&url);
        Self {
            url,
            is_audio,
            is_playlist,
        }
    }

    pub fn with_playlist(mut self, is_playlist: bool) -> Self {
        self.is_playlist = is_playlist;
        self
    }

    pub fn format_selector(&self) -> &'static str {
        if self.is_audio {
            AUDIO_FORMAT
        } else {
            VIDEO_FORMAT
        }
    }
}

/// Only explicit playlist pages; a `watch?v=..&list=..` share link is one video
fn looks_like_playlist(url: &str) -> bool {
    url.contains("playlist")
}

/// Post-download processing step requested from the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostProcessor {
    /// Transcode to an audio-only file (FFmpeg extract audio)
    ExtractAudio { codec: String, quality: String },
}

/// Engine invocation options, computed once per job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    pub output_dir: PathBuf,
    /// Full output path template (directory joined with the filename pattern)
    pub output_template: String,
    pub format_selector: String,
    pub is_playlist: bool,
    /// Keep going after per-item failures
    pub ignore_errors: bool,
    pub post_processors: Vec<PostProcessor>,
}

/// Job lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Idle,
    Validating,
    Downloading,
    Completed,
    PartiallyFailed,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyFailed | Self::Failed)
    }

    /// Whether a new job may be accepted from this phase
    pub fn accepts_start(&self) -> bool {
        matches!(self, Self::Idle) || self.is_terminal()
    }
}

/// Update produced on the worker and delivered to the presentation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobUpdate {
    /// New job accepted: clears the previous job's state
    Reset { percent: f32, message: String },
    Progress { percent: f32, message: String },
    ItemFailed { title: String },
    /// Terminal outcome of the job
    Finished {
        phase: JobPhase,
        percent: f32,
        message: String,
    },
}

/// Display state of the current job, as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub phase: JobPhase,
    pub percent: f32,
    pub status_message: String,
    pub failed_items: Vec<String>,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            phase: JobPhase::Idle,
            percent: 0.0,
            status_message: "Ready to download...".to_string(),
            failed_items: Vec::new(),
        }
    }
}

impl JobState {
    pub fn apply(&mut self, update: &JobUpdate) {
        match update {
            JobUpdate::Reset { percent, message } => {
                self.phase = JobPhase::Downloading;
                self.percent = *percent;
                self.status_message = message.clone();
                self.failed_items.clear();
            }
            JobUpdate::Progress { percent, message } => {
                self.percent = *percent;
                self.status_message = message.clone();
            }
            JobUpdate::ItemFailed { title } => {
                self.failed_items.push(title.clone());
            }
            JobUpdate::Finished {
                phase,
                percent,
                message,
            } => {
                self.phase = *phase;
                self.percent = *percent;
                self.status_message = message.clone();
            }
        }
    }
}
