// Failure diagnostics
//
// Classifies engine failure text so logs and status messages can say *why*
// a job failed (access denied, private item, throttling...).

use serde::{Deserialize, Serialize};

/// Recognised reasons a site refused a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// DRM-protected or paid content; cannot be downloaded at all
    DrmProtected,

    /// Private item requiring authorization
    PrivateVideo,

    /// Item deleted or unavailable
    VideoUnavailable,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Geographic restriction
    GeoBlocked,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Bot detection triggered
    BotDetection,

    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// Network timeout (soft IP block or outage)
    NetworkTimeout,

    /// The engine does not know how to handle the URL
    UnsupportedUrl,
}

impl BlockingReason {
    /// Check if trying again later might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden | Self::NetworkTimeout | Self::RateLimited | Self::BotDetection
        )
    }

    /// Check if this is a permanent restriction (no workaround)
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::UnsupportedUrl
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::DrmProtected => "DRM-protected content",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by the site",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTimeout => "Network timeout",
            Self::UnsupportedUrl => "Unsupported URL",
        }
    }
}

/// Analyze error message and return blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    // Check patterns in order of specificity

    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("requires purchase")
        || lower.contains("this video requires payment")
    {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return Some(BlockingReason::UnsupportedUrl);
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("sign in if you've been granted access")
    {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("age-restricted") || lower.contains("sign in to confirm your age") {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("not available in your country") || lower.contains("blocked in your country")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("confirm you're not a bot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
    {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timeout") || lower.contains("timed out") {
        return Some(BlockingReason::NetworkTimeout);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnose_common_failures() {
        assert_eq!(
            diagnose_error("ERROR: [youtube] abc: Private video. Sign in if you've been granted access"),
            Some(BlockingReason::PrivateVideo)
        );
        assert_eq!(
            diagnose_error("ERROR: Unsupported URL: https://example.com/"),
            Some(BlockingReason::UnsupportedUrl)
        );
        assert_eq!(
            diagnose_error("HTTP Error 429: Too Many Requests"),
            Some(BlockingReason::RateLimited)
        );
        assert_eq!(
            diagnose_error("ERROR: unable to download video data: HTTP Error 403: Forbidden"),
            Some(BlockingReason::Http403Forbidden)
        );
        assert_eq!(
            diagnose_error("<urlopen error timed out>"),
            Some(BlockingReason::NetworkTimeout)
        );
    }

    #[test]
    fn test_unrecognised_text() {
        assert_eq!(diagnose_error("something odd happened"), None);
    }

    #[test]
    fn test_reason_predicates() {
        assert!(BlockingReason::RateLimited.is_retryable());
        assert!(!BlockingReason::RateLimited.is_permanent());
        assert!(BlockingReason::UnsupportedUrl.is_permanent());
        assert!(!BlockingReason::DrmProtected.is_retryable());
    }
}
