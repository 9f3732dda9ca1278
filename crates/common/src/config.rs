//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LiverecError, LiverecResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Recording engine settings.
    pub recording: RecordingConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Telegram bot credentials, if notifications go to Telegram.
    pub telegram: Option<TelegramConfig>,

    /// Post-processing settings.
    pub converter: ConverterConfig,
}

/// Which strategy the mode controller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Record once if the target is live right now.
    #[default]
    Single,
    /// Keep checking one target and record whenever it goes live.
    Polling,
    /// Record every live follower of the configured account.
    FanOut,
}

/// Recording engine parameters. Read-only once the controller starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub mode: RecordingMode,

    /// Minutes between liveness checks in polling and fan-out modes.
    pub poll_interval_mins: u64,

    /// Optional cap on a single recording, in seconds.
    pub duration_secs: Option<u64>,

    /// Length of one output segment, in seconds.
    pub segment_duration_secs: u64,

    /// Root directory; each target gets its own subdirectory.
    pub output_dir: PathBuf,

    /// Send lifecycle notifications.
    pub notifications: bool,

    /// Raw capture file suffix, appended after the timestamp.
    pub raw_extension: String,

    /// In-memory buffer size before a flush to disk, in bytes.
    pub buffer_threshold: usize,

    /// Pause before retrying after a transient stream error, in seconds.
    pub transient_retry_delay_secs: u64,

    /// Cooldown after a lost connection, in seconds.
    pub connection_cooldown_secs: u64,

    /// Spacing between starting two follower recordings, in milliseconds.
    pub follower_spacing_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "liverec=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Container conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Remux finished segments with ffmpeg.
    pub enabled: bool,

    /// ffmpeg executable name or path.
    pub ffmpeg_path: String,

    /// Delete the raw capture after a successful conversion.
    pub remove_raw: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            mode: RecordingMode::Single,
            poll_interval_mins: 5,
            duration_secs: None,
            segment_duration_secs: 30 * 60,
            output_dir: PathBuf::from("."),
            notifications: false,
            raw_extension: "flv.mp4".to_string(),
            buffer_threshold: 512 * 1024,
            transient_retry_delay_secs: 2,
            connection_cooldown_secs: 2 * 60,
            follower_spacing_ms: 2500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffmpeg_path: "ffmpeg".to_string(),
            remove_raw: true,
        }
    }
}

impl RecordingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_mins * 60)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }

    pub fn segment_duration(&self) -> Duration {
        Duration::from_secs(self.segment_duration_secs)
    }

    pub fn transient_retry_delay(&self) -> Duration {
        Duration::from_secs(self.transient_retry_delay_secs)
    }

    pub fn connection_cooldown(&self) -> Duration {
        Duration::from_secs(self.connection_cooldown_secs)
    }

    pub fn follower_spacing(&self) -> Duration {
        Duration::from_millis(self.follower_spacing_ms)
    }

    /// Directory holding every segment recorded for `handle`.
    ///
    /// Handles come from remote data, so anything that is not a single
    /// plain path component is rejected.
    pub fn target_dir(&self, handle: &str) -> LiverecResult<PathBuf> {
        if handle.is_empty()
            || handle == "."
            || handle == ".."
            || handle.contains(['/', '\\', '\0'])
        {
            return Err(LiverecError::unexpected(format!(
                "handle {handle:?} is not usable as a directory name"
            )));
        }
        Ok(self.output_dir.join(handle))
    }

    /// Reject values that would make the engine spin or never flush.
    pub fn validate(&self) -> LiverecResult<()> {
        if self.segment_duration_secs == 0 {
            return Err(LiverecError::config("segment duration must be positive"));
        }
        if self.poll_interval_mins == 0 && self.mode != RecordingMode::Single {
            return Err(LiverecError::config("poll interval must be at least one minute"));
        }
        if self.buffer_threshold == 0 {
            return Err(LiverecError::config("buffer threshold must be positive"));
        }
        if self.raw_extension.is_empty()
            || self.raw_extension.contains(['_', '/', '\\'])
        {
            return Err(LiverecError::config(
                "raw extension must be non-empty and contain no '_' or path separators",
            ));
        }
        if self.duration_secs == Some(0) {
            return Err(LiverecError::config("duration must be positive when set"));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> LiverecResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("liverec").join("config.json")
}
