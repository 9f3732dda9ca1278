//! Clock and timing utilities for recording sessions.
//!
//! A recording is anchored to a monotonic epoch taken when the session
//! starts streaming. A second epoch tracks the current segment and is
//! reset on every rotation. Both are `tokio::time::Instant`, so paused
//! test runtimes drive them deterministically.
//!
//! Wall-clock strings are only used for file names and notifications.

use std::time::Duration;

use tokio::time::Instant;

/// Timestamp layout used in segment file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Timestamp layout used in human-facing messages.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Monotonic timers for one recording session.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// The instant the current segment was opened.
    segment_epoch: Instant,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            epoch: now,
            segment_epoch: now,
        }
    }

    /// Time since recording start.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Time since the current segment was opened.
    pub fn segment_elapsed(&self) -> Duration {
        self.segment_epoch.elapsed()
    }

    /// Start timing a new segment.
    pub fn reset_segment(&mut self) {
        self.segment_epoch = Instant::now();
    }

    /// Whether `limit` has been reached since recording start.
    pub fn reached(&self, limit: Option<Duration>) -> bool {
        limit.is_some_and(|limit| self.elapsed() >= limit)
    }

    /// Whether the current segment has run for at least `limit`.
    pub fn segment_reached(&self, limit: Duration) -> bool {
        self.segment_elapsed() >= limit
    }
}

/// Local time formatted for segment file names.
pub fn file_timestamp() -> String {
    chrono::Local::now().format(FILE_TIMESTAMP_FORMAT).to_string()
}

/// Local time formatted for notifications.
pub fn display_timestamp() -> String {
    chrono::Local::now()
        .format(DISPLAY_TIMESTAMP_FORMAT)
        .to_string()
}
