use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use crate::config::{DownloaderConfig, NetworkConfig};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{JobOptions, PostProcessor};
use crate::downloader::progress::{EngineEvent, UNKNOWN_ITEM};
use crate::downloader::traits::MediaEngine;

/// Machine-readable progress line: `[progress]<status>|<percent>|<id>|<title>`
const PROGRESS_TEMPLATE: &str = "download:[progress]%(progress.status)s|%(progress._percent_str)s|%(info.id)s|%(info.title)s";
const PROGRESS_PREFIX: &str = "[progress]";

/// Drives the `yt-dlp` executable
pub struct YtDlpEngine {
    ytdlp_bin: String,
    network: NetworkConfig,
}

impl YtDlpEngine {
    pub fn new(config: &DownloaderConfig) -> Self {
        Self {
            ytdlp_bin: config.engine_binary.clone().unwrap_or_else(find_ytdlp),
            network: config.network.clone(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.ytdlp_bin
    }

    fn build_args(&self, url: &str, options: &JobOptions) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            options.format_selector.clone(),
            "-o".to_string(),
            options.output_template.clone(),
            "--newline".to_string(),
            "--quiet".to_string(),
            "--progress".to_string(),
            "--no-warnings".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
        ];

        args.push(if options.is_playlist {
            "--yes-playlist".to_string()
        } else {
            "--no-playlist".to_string()
        });
        args.push(if options.ignore_errors {
            "--ignore-errors".to_string()
        } else {
            "--abort-on-error".to_string()
        });

        for processor in &options.post_processors {
            match processor {
                PostProcessor::ExtractAudio { codec, quality } => {
                    args.extend([
                        "-x".to_string(),
                        "--audio-format".to_string(),
                        codec.clone(),
                        "--audio-quality".to_string(),
                        format!("{}K", quality),
                    ]);
                }
            }
        }

        args.extend(self.network.engine_args());
        args.push(url.to_string());
        args
    }
}

impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn download(
        &self,
        url: &str,
        options: &JobOptions,
        hook: &mut dyn FnMut(EngineEvent),
    ) -> Result<(), DownloadError> {
        let args = self.build_args(url, options);
        tracing::debug!(bin = %self.ytdlp_bin, ?args, "Starting yt-dlp");

        let mut child = Command::new(&self.ytdlp_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    DownloadError::ToolNotFound(format!("{}: {}", self.ytdlp_bin, e))
                }
                _ => DownloadError::Engine(format!("Failed to start yt-dlp: {}", e)),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Engine("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Engine("Failed to capture stderr".to_string()))?;

        // Both pipes feed one channel so the hook sees one event at a time on this thread
        let (tx, rx) = mpsc::channel();
        spawn_reader(stdout, Stream::Stdout, tx.clone());
        spawn_reader(stderr, Stream::Stderr, tx);

        let playlist_id = playlist_id(url);
        let mut tracker = ItemTracker::default();
        let mut fatal_lines = Vec::new();
        let mut last_stderr = String::new();

        for (stream, line) in rx {
            match parse_line(stream, &line) {
                Some(EngineLine::Progress { id, title, event }) => {
                    for item in tracker.started(id, title) {
                        hook(EngineEvent::Error { item });
                    }
                    hook(event);
                }
                Some(EngineLine::ItemError { item, message }) => {
                    let per_item = options.ignore_errors
                        && item != UNKNOWN_ITEM
                        && playlist_id.as_deref() != Some(item.as_str());
                    if !per_item {
                        fatal_lines.push(message);
                    } else if let Some(item) = tracker.failed(item, message) {
                        hook(EngineEvent::Error { item });
                    }
                }
                Some(EngineLine::Diagnostic(text)) => {
                    tracing::debug!(line = %text, "yt-dlp");
                    last_stderr = text;
                }
                None => {}
            }
        }

        // Errors before any item started belong to the job (network, extraction...)
        let item_failures = tracker.reported;
        let fatal_lines: Vec<String> = tracker
            .into_unattributed()
            .into_iter()
            .chain(fatal_lines)
            .collect();

        let status = child
            .wait()
            .map_err(|e| DownloadError::Engine(format!("Process error: {}", e)))?;

        if status.success() {
            return Ok(());
        }
        // With --ignore-errors yt-dlp still exits non-zero when any item failed
        if options.ignore_errors && item_failures > 0 && fatal_lines.is_empty() {
            tracing::debug!(item_failures, "yt-dlp reported item failures only");
            return Ok(());
        }

        let summary = if !fatal_lines.is_empty() {
            fatal_lines.join("\n")
        } else if !last_stderr.is_empty() {
            last_stderr
        } else {
            format!("yt-dlp exited with {}", status)
        };
        Err(summary.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    stream: Stream,
    tx: mpsc::Sender<(Stream, String)>,
) {
    std::thread::spawn(move || {
        for line in BufReader::new(pipe).lines().map_while(Result::ok) {
            if tx.send((stream, line)).is_err() {
                break;
            }
        }
    });
}

/// Playlist id from a `list=` query parameter; errors naming it are about the whole job
fn playlist_id(url: &str) -> Option<String> {
    lazy_static! {
        static ref LIST_RE: Regex = Regex::new(r"[?&]list=([^&#]+)").unwrap();
    }
    LIST_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Which items yt-dlp actually started, and their titles
#[derive(Debug, Default)]
struct ItemTracker {
    any_started: bool,
    titles: HashMap<String, String>,
    /// Item errors seen before the first item started: (id, line)
    pending: Vec<(String, String)>,
    reported: usize,
}

impl ItemTracker {
    /// Note a progress line. Returns held-back failures that now count as per-item.
    fn started(&mut self, id: String, title: String) -> Vec<String> {
        self.any_started = true;
        if !title.is_empty() && title != "NA" {
            self.titles.insert(id, title);
        }
        let held = std::mem::take(&mut self.pending);
        held.into_iter().map(|(id, _)| self.report(id)).collect()
    }

    /// Name to report for a failed item, or `None` while no item has started yet
    fn failed(&mut self, id: String, line: String) -> Option<String> {
        if self.any_started {
            Some(self.report(id))
        } else {
            self.pending.push((id, line));
            None
        }
    }

    fn report(&mut self, id: String) -> String {
        self.reported += 1;
        self.titles.get(&id).cloned().unwrap_or(id)
    }

    fn into_unattributed(self) -> Vec<String> {
        self.pending.into_iter().map(|(_, line)| line).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EngineLine {
    Progress {
        id: String,
        title: String,
        event: EngineEvent,
    },
    /// `ERROR:` line, attributed to an item when yt-dlp names one
    ItemError { item: String, message: String },
    Diagnostic(String),
}

fn parse_line(stream: Stream, line: &str) -> Option<EngineLine> {
    lazy_static! {
        // ERROR: [youtube] dQw4w9WgXcQ: Video unavailable
        static ref ITEM_ERROR_RE: Regex = Regex::new(r"^ERROR:\s*\[[^\]]+\]\s*([^:\s]+):").unwrap();
    }

    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let mut fields = rest.splitn(4, '|');
        let status = fields.next().unwrap_or_default().trim();
        let percent = fields.next().unwrap_or("0.0%");
        let id = fields.next().unwrap_or_default().trim();
        let title = fields.next().unwrap_or_default().trim();
        let raw = json!({
            "status": status,
            "_percent_str": percent,
            "info_dict": { "id": id, "title": title },
        });
        return Some(EngineLine::Progress {
            id: id.to_string(),
            title: title.to_string(),
            event: EngineEvent::from_hook(&raw),
        });
    }

    if line.starts_with("ERROR:") {
        let item = ITEM_ERROR_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_ITEM.to_string());
        return Some(EngineLine::ItemError {
            item,
            message: line.to_string(),
        });
    }

    match stream {
        Stream::Stderr => Some(EngineLine::Diagnostic(line.to_string())),
        Stream::Stdout => None,
    }
}

#[cfg(not(windows))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/opt/homebrew/bin/yt-dlp",
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
];
#[cfg(windows)]
const INSTALL_LOCATIONS: &[&str] = &[];

#[cfg(not(windows))]
const PATH_LOOKUP: &str = "which";
#[cfg(windows)]
const PATH_LOOKUP: &str = "where";

/// Locate yt-dlp: well-known install prefixes, then a PATH lookup, then the bare name
fn find_ytdlp() -> String {
    if let Some(path) = INSTALL_LOCATIONS
        .iter()
        .find(|path| std::path::Path::new(path).is_file())
    {
        return path.to_string();
    }

    Command::new(PATH_LOOKUP)
        .arg("yt-dlp")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| {
            // `where` may list several matches, one per line
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "yt-dlp".to_string())
}
