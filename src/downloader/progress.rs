// Progress aggregation
//
// The engine reports loosely-typed hook payloads. They are mapped into
// `EngineEvent` at the boundary, then folded by `ProgressAggregator` into
// job-level updates and a list of failed items.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::models::JobUpdate;

/// Milestone for "item downloaded, post-processing may still run"
pub const FINISHED_PERCENT: f32 = 95.0;

/// Placeholder title when the engine does not name the failing item
pub const UNKNOWN_ITEM: &str = "Unknown";

/// Engine hook event
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Downloading { percent: f32 },
    Error { item: String },
    Finished,
    /// Status this version does not model; ignored
    Unknown { status: String },
}

impl EngineEvent {
    /// Map a raw hook payload (`{"status": ..., "_percent_str": ..., "info_dict": {"title": ...}}`)
    pub fn from_hook(raw: &Value) -> Self {
        let status = raw["status"].as_str().unwrap_or_default();
        match status {
            "downloading" => Self::Downloading {
                percent: parse_percent(raw["_percent_str"].as_str().unwrap_or("0.0%")),
            },
            "error" => Self::Error {
                item: item_title(raw).unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
            },
            "finished" => Self::Finished,
            other => Self::Unknown {
                status: other.to_string(),
            },
        }
    }
}

fn item_title(raw: &Value) -> Option<String> {
    raw["info_dict"]["title"]
        .as_str()
        .or_else(|| raw["title"].as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Parse yt-dlp percent strings such as `" 42.5%"` (possibly colored).
/// Anything unparsable reads as 0.
pub fn parse_percent(raw: &str) -> f32 {
    lazy_static! {
        static ref ANSI_RE: Regex = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
        static ref NUMBER_RE: Regex = Regex::new(r"(\d+(?:\.\d+)?)").unwrap();
    }

    let clean = ANSI_RE.replace_all(raw, "");
    NUMBER_RE
        .captures(&clean)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

/// Job-level progress derived from one engine event
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUpdate {
    pub percent: f32,
    pub message: String,
}

/// A failed item within a multi-item job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated {
    Update(NormalizedUpdate),
    Failure(FailureRecord),
}

impl From<Aggregated> for JobUpdate {
    fn from(aggregated: Aggregated) -> Self {
        match aggregated {
            Aggregated::Update(NormalizedUpdate { percent, message }) => {
                JobUpdate::Progress { percent, message }
            }
            Aggregated::Failure(FailureRecord { title }) => JobUpdate::ItemFailed { title },
        }
    }
}

/// Folds engine events into job progress.
///
/// Percent follows the item currently downloading but never moves backwards
/// within a job.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    percent: f32,
    failed_items: Vec<String>,
}

impl ProgressAggregator {
    pub fn new(starting_percent: f32) -> Self {
        Self {
            percent: starting_percent,
            failed_items: Vec::new(),
        }
    }

    pub fn on_event(&mut self, event: EngineEvent) -> Option<Aggregated> {
        match event {
            EngineEvent::Downloading { percent } => {
                self.percent = self.percent.max(percent);
                Some(Aggregated::Update(NormalizedUpdate {
                    percent: self.percent,
                    message: format!("Downloading: {}%", percent as u32),
                }))
            }
            EngineEvent::Error { item } => {
                // Named items are recorded once; unnamed ones cannot be told apart
                if item != UNKNOWN_ITEM && self.failed_items.contains(&item) {
                    return None;
                }
                tracing::warn!(item = %item, "Item failed, continuing job");
                self.failed_items.push(item.clone());
                Some(Aggregated::Failure(FailureRecord { title: item }))
            }
            EngineEvent::Finished => {
                self.percent = self.percent.max(FINISHED_PERCENT);
                Some(Aggregated::Update(NormalizedUpdate {
                    percent: self.percent,
                    message: "Download finished...".to_string(),
                }))
            }
            EngineEvent::Unknown { status } => {
                tracing::debug!(status = %status, "Ignoring unmodelled engine status");
                None
            }
        }
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    pub fn failed_items(&self) -> &[String] {
        &self.failed_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_hook_maps_statuses() {
        assert_eq!(
            EngineEvent::from_hook(&json!({"status": "downloading", "_percent_str": " 50.0%"})),
            EngineEvent::Downloading { percent: 50.0 }
        );
        assert_eq!(
            EngineEvent::from_hook(&json!({"status": "error", "info_dict": {"title": "Track 3"}})),
            EngineEvent::Error {
                item: "Track 3".to_string()
            }
        );
        assert_eq!(
            EngineEvent::from_hook(&json!({"status": "error"})),
            EngineEvent::Error {
                item: UNKNOWN_ITEM.to_string()
            }
        );
        assert_eq!(
            EngineEvent::from_hook(&json!({"status": "finished"})),
            EngineEvent::Finished
        );
        assert_eq!(
            EngineEvent::from_hook(&json!({"status": "processing"})),
            EngineEvent::Unknown {
                status: "processing".to_string()
            }
        );
    }

    #[test]
    fn test_missing_percent_reads_as_zero() {
        assert_eq!(
            EngineEvent::from_hook(&json!({"status": "downloading"})),
            EngineEvent::Downloading { percent: 0.0 }
        );
    }

    #[test]
    fn test_parse_percent_variants() {
        assert_eq!(parse_percent("42.5%"), 42.5);
        assert_eq!(parse_percent("  7%"), 7.0);
        assert_eq!(parse_percent("\x1b[0;94m 63.1%\x1b[0m"), 63.1);
        assert_eq!(parse_percent("N/A"), 0.0);
        assert_eq!(parse_percent("250%"), 100.0);
    }

    #[test]
    fn test_downloading_forwards_item_percent() {
        let mut agg = ProgressAggregator::new(10.0);
        let out = agg.on_event(EngineEvent::Downloading { percent: 50.0 });
        assert_eq!(
            out,
            Some(Aggregated::Update(NormalizedUpdate {
                percent: 50.0,
                message: "Downloading: 50%".to_string(),
            }))
        );
    }

    #[test]
    fn test_percent_never_goes_backwards() {
        let mut agg = ProgressAggregator::new(10.0);
        agg.on_event(EngineEvent::Downloading { percent: 80.0 });
        agg.on_event(EngineEvent::Finished);
        assert_eq!(agg.percent(), FINISHED_PERCENT);

        // Next playlist item starts from zero
        let out = agg.on_event(EngineEvent::Downloading { percent: 3.0 });
        match out {
            Some(Aggregated::Update(update)) => {
                assert_eq!(update.percent, FINISHED_PERCENT);
                assert_eq!(update.message, "Downloading: 3%");
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn test_finished_maps_to_milestone() {
        let mut agg = ProgressAggregator::new(10.0);
        let out = agg.on_event(EngineEvent::Finished);
        assert_eq!(
            out,
            Some(Aggregated::Update(NormalizedUpdate {
                percent: FINISHED_PERCENT,
                message: "Download finished...".to_string(),
            }))
        );
    }

    #[test]
    fn test_errors_recorded_once_per_item() {
        let mut agg = ProgressAggregator::new(10.0);
        let first = agg.on_event(EngineEvent::Error {
            item: "Track 3".to_string(),
        });
        let again = agg.on_event(EngineEvent::Error {
            item: "Track 3".to_string(),
        });
        agg.on_event(EngineEvent::Error {
            item: UNKNOWN_ITEM.to_string(),
        });
        agg.on_event(EngineEvent::Error {
            item: UNKNOWN_ITEM.to_string(),
        });

        assert!(matches!(first, Some(Aggregated::Failure(_))));
        assert_eq!(again, None);
        assert_eq!(agg.failed_items(), ["Track 3", UNKNOWN_ITEM, UNKNOWN_ITEM]);
    }

    #[test]
    fn test_error_does_not_change_percent() {
        let mut agg = ProgressAggregator::new(10.0);
        agg.on_event(EngineEvent::Downloading { percent: 40.0 });
        agg.on_event(EngineEvent::Error {
            item: "Track 3".to_string(),
        });
        assert_eq!(agg.percent(), 40.0);
    }

    #[test]
    fn test_unknown_status_ignored() {
        let mut agg = ProgressAggregator::new(10.0);
        assert_eq!(
            agg.on_event(EngineEvent::Unknown {
                status: "post_process".to_string()
            }),
            None
        );
        assert_eq!(agg.percent(), 10.0);
    }

    #[test]
    fn test_aggregated_into_job_update() {
        let update: JobUpdate = Aggregated::Failure(FailureRecord {
            title: "Track 3".to_string(),
        })
        .into();
        assert_eq!(
            update,
            JobUpdate::ItemFailed {
                title: "Track 3".to_string()
            }
        );
    }
}
