//! Retry and backoff policy.
//!
//! Decisions are a pure function of the error kind and the running
//! strategy. Concrete delays are looked up in [`RecordingConfig`] so the
//! policy table itself stays free of tuning constants.

use std::time::Duration;

use liverec_common::config::{RecordingConfig, RecordingMode};
use liverec_common::error::ErrorKind;
use tokio_util::sync::CancellationToken;

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Try again right away.
    Immediate,
    /// Wait the short transient-error pause.
    ShortPause,
    /// Wait the long connection cooldown.
    Cooldown,
    /// Wait one poll interval.
    PollInterval,
    /// Do not retry; surface the error to the caller.
    Propagate,
}

impl RetryAction {
    /// Delay before the retry, or `None` when the error propagates.
    pub fn delay(self, config: &RecordingConfig) -> Option<Duration> {
        match self {
            Self::Immediate => Some(Duration::ZERO),
            Self::ShortPause => Some(config.transient_retry_delay()),
            Self::Cooldown => Some(config.connection_cooldown()),
            Self::PollInterval => Some(config.poll_interval()),
            Self::Propagate => None,
        }
    }
}

/// Strategy-level decision: should the mode controller try this target
/// again later?
pub fn decide(kind: ErrorKind, mode: RecordingMode) -> RetryAction {
    match (mode, kind) {
        (RecordingMode::Single, _) => RetryAction::Propagate,
        (_, ErrorKind::TargetNotLive | ErrorKind::LiveUrlUnresolvable) => RetryAction::PollInterval,
        (_, ErrorKind::ConnectionLost) => RetryAction::Cooldown,
        (_, ErrorKind::TransientStreamError) => RetryAction::ShortPause,
        (_, ErrorKind::UnexpectedFailure) => RetryAction::Immediate,
    }
}

/// Session-level decision: should a running recording task reopen its
/// stream, and after how long?
pub fn decide_in_stream(kind: ErrorKind, mode: RecordingMode) -> RetryAction {
    match (kind, mode) {
        (ErrorKind::TransientStreamError, _) => RetryAction::ShortPause,
        (ErrorKind::ConnectionLost, RecordingMode::Polling) => RetryAction::Cooldown,
        (ErrorKind::ConnectionLost, _) => RetryAction::ShortPause,
        _ => RetryAction::Propagate,
    }
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `false` when cancelled.
pub async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
