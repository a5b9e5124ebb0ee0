//! Downloader configuration
//!
//! Everything here has a sensible default so `DownloaderConfig::default()` works
//! out of the box. Values can be overlaid from a JSON file or from environment
//! variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the storage root
pub const ENV_STORAGE_ROOT: &str = "MEDIA_DOWNLOADER_DIR";
/// Environment variable pointing at a specific yt-dlp executable
pub const ENV_ENGINE_BINARY: &str = "YTDLP_PATH";
/// Environment variable carrying a proxy URL for the engine
pub const ENV_PROXY: &str = "MEDIA_DOWNLOADER_PROXY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Directory created under the storage root for all downloads
    pub app_subdir: String,
    /// Replaces the platform storage root when set
    pub storage_root: Option<PathBuf>,
    /// yt-dlp executable; discovered on the system when unset
    pub engine_binary: Option<String>,
    /// Codec for audio-only jobs
    pub audio_codec: String,
    /// Audio bitrate in kbps for audio-only jobs
    pub audio_quality: String,
    pub network: NetworkConfig,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            app_subdir: "YTDownloads".to_string(),
            storage_root: None,
            engine_binary: None,
            audio_codec: "mp3".to_string(),
            audio_quality: "192".to_string(),
            network: NetworkConfig::default(),
        }
    }
}

impl DownloaderConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overlaid with `MEDIA_DOWNLOADER_*` / `YTDLP_PATH` variables
    pub fn from_env() -> Self {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty(ENV_STORAGE_ROOT) {
            self.storage_root = Some(PathBuf::from(dir));
        }
        if let Some(bin) = non_empty(ENV_ENGINE_BINARY) {
            self.engine_binary = Some(bin);
        }
        if let Some(proxy) = non_empty(ENV_PROXY) {
            self.network.proxy = Some(proxy);
        }
        self
    }

    pub fn with_storage_root(mut self, root: Option<PathBuf>) -> Self {
        self.storage_root = root;
        self
    }

    pub fn with_app_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.app_subdir = subdir.into();
        self
    }

    pub fn with_engine_binary(mut self, binary: Option<String>) -> Self {
        self.engine_binary = binary;
        self
    }
}

/// Network configuration for the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Socket timeout in seconds
    pub socket_timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            socket_timeout: Some(30),
        }
    }
}

impl NetworkConfig {
    /// Proxy and timeout arguments for yt-dlp
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        if let Some(timeout) = self.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(timeout.to_string());
        }

        args
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
