//! Recording task: one capture session, end to end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use liverec_common::clock::{display_timestamp, RecordingClock};
use liverec_common::config::{RecordingConfig, RecordingMode};
use liverec_common::error::{LiverecError, LiverecResult};
use liverec_platform_core::{ChunkStream, LiveSource, PostProcessor, Target};
use tokio_util::sync::CancellationToken;

use crate::notify::Notifications;
use crate::retry::{self, sleep_or_cancel};
use crate::writer::{SegmentHandoff, SegmentWriter};

/// Collaborators shared by every task a controller starts.
#[derive(Clone)]
pub struct TaskServices {
    pub source: Arc<dyn LiveSource>,
    pub post_processor: Arc<dyn PostProcessor>,
    pub notifications: Notifications,
}

/// State of a recording task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but not started.
    Idle,
    /// Confirming the target is live and resolving its stream.
    CheckingLive,
    /// Pumping chunks into the current segment.
    Streaming,
    /// Closing one segment and opening the next.
    Rotating,
    /// Finished, for any reason.
    Stopped,
}

/// Why a task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DurationReached,
    Offline,
    Failed,
}

/// Outcome of a finished task.
#[derive(Debug, Clone)]
pub struct RecordingReport {
    pub target: Target,
    pub reason: StopReason,
    /// Segments handed to post-processing, oldest first.
    pub segments: Vec<PathBuf>,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Drives one capture of one target.
///
/// The task owns its writer and timers exclusively. It runs once: a second
/// call to [`RecordingTask::run`] is rejected.
pub struct RecordingTask {
    target: Target,
    config: Arc<RecordingConfig>,
    services: TaskServices,
    cancel: CancellationToken,
    state: TaskState,
    report: Option<RecordingReport>,
}

impl RecordingTask {
    pub fn new(
        target: Target,
        config: Arc<RecordingConfig>,
        services: TaskServices,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            config,
            services,
            cancel,
            state: TaskState::Idle,
            report: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Report of the finished run, including failed ones.
    pub fn report(&self) -> Option<&RecordingReport> {
        self.report.as_ref()
    }

    /// Check liveness, record until a stop condition, then close and hand
    /// off the final segment.
    ///
    /// Fails without touching the disk when the target is not live or has
    /// no playable URL.
    pub async fn run(&mut self) -> LiverecResult<RecordingReport> {
        if self.state != TaskState::Idle {
            return Err(LiverecError::unexpected("recording task already ran"));
        }

        self.state = TaskState::CheckingLive;
        let url = match self.check_live().await {
            Ok(url) => url,
            Err(e) => {
                self.state = TaskState::Stopped;
                return Err(e);
            }
        };

        let handoff = SegmentHandoff {
            post_processor: self.services.post_processor.clone(),
            notifications: self.services.notifications.clone(),
        };
        let created = match self.config.target_dir(&self.target.handle) {
            Ok(dir) => {
                SegmentWriter::create(
                    dir,
                    self.target.handle.clone(),
                    self.config.raw_extension.clone(),
                    self.config.buffer_threshold,
                    handoff,
                )
                .await
            }
            Err(e) => Err(e),
        };
        let mut writer = match created {
            Ok(writer) => writer,
            Err(e) => {
                tracing::error!(user = %self.target, error = %e, "Failed to open output");
                self.state = TaskState::Stopped;
                return Err(e);
            }
        };

        let mut clock = RecordingClock::start();
        tracing::info!(user = %self.target, "Started recording");
        self.services
            .notifications
            .recording_started(&self.target.handle, &display_timestamp())
            .await;

        self.state = TaskState::Streaming;
        let outcome = self.stream(&mut writer, &mut clock, url).await;
        self.state = TaskState::Stopped;

        let closed = writer.close().await;
        let last = match &closed {
            Ok(last) => last.clone(),
            Err(_) => writer.segments().last().cloned(),
        };
        self.services
            .notifications
            .recording_finished(&self.target.handle, &display_timestamp(), last.as_deref())
            .await;

        let reason = match &outcome {
            Ok(reason) => *reason,
            Err(_) => StopReason::Failed,
        };
        let report = RecordingReport {
            target: self.target.clone(),
            reason,
            segments: writer.segments().to_vec(),
            bytes_written: writer.total_bytes(),
            elapsed: clock.elapsed(),
        };
        self.report = Some(report.clone());

        match outcome {
            Ok(reason) => {
                closed?;
                tracing::info!(
                    user = %self.target,
                    ?reason,
                    segments = report.segments.len(),
                    bytes = report.bytes_written,
                    "Recording stopped"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    tracing::warn!(user = %self.target, error = %close_err, "Final close failed");
                }
                tracing::error!(user = %self.target, error = %e, "Recording failed");
                Err(e)
            }
        }
    }

    async fn check_live(&self) -> LiverecResult<String> {
        let source = &self.services.source;
        if !source.is_live(&self.target.room_id).await? {
            tracing::info!(user = %self.target, "Target is not live");
            return Err(LiverecError::not_live(&self.target.handle));
        }
        match source.playable_url(&self.target.room_id).await? {
            Some(url) => Ok(url),
            None => Err(LiverecError::url_unresolvable(&self.target.handle)),
        }
    }

    async fn stream(
        &mut self,
        writer: &mut SegmentWriter,
        clock: &mut RecordingClock,
        mut url: String,
    ) -> LiverecResult<StopReason> {
        let mode = self.config.mode;

        'session: loop {
            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(StopReason::Cancelled),
                opened = self.services.source.open_stream(&url) => opened,
            };
            let mut chunks: ChunkStream = match opened {
                Ok(chunks) => chunks,
                Err(e) => {
                    if !self.pause_before_reopen(e, mode).await? {
                        return Ok(StopReason::Cancelled);
                    }
                    if !self.still_live().await {
                        tracing::info!(user = %self.target, "Broadcast ended");
                        return Ok(StopReason::Offline);
                    }
                    continue 'session;
                }
            };

            loop {
                let next = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Ok(StopReason::Cancelled),
                    next = chunks.next() => next,
                };

                match next {
                    Some(Ok(chunk)) => {
                        writer.write(&chunk).await?;
                        if let Some(reason) = self.check_limits(writer, clock).await? {
                            return Ok(reason);
                        }
                    }
                    Some(Err(e)) => {
                        if !self.pause_before_reopen(e, mode).await? {
                            return Ok(StopReason::Cancelled);
                        }
                        continue 'session;
                    }
                    None => {
                        let room = &self.target.room_id;
                        if !self.services.source.is_live(room).await? {
                            tracing::info!(user = %self.target, "Broadcast ended");
                            return Ok(StopReason::Offline);
                        }
                        match self.services.source.playable_url(room).await? {
                            Some(next_url) => url = next_url,
                            None => return Ok(StopReason::Offline),
                        }
                        tracing::debug!(user = %self.target, "Stream ended while live, reopening");
                        continue 'session;
                    }
                }
            }
        }
    }

    /// Wait out a failed open or read before reopening the stream.
    ///
    /// Returns `Ok(false)` when cancelled, and the error itself when it is
    /// not worth retrying.
    async fn pause_before_reopen(
        &self,
        err: LiverecError,
        mode: RecordingMode,
    ) -> LiverecResult<bool> {
        let Some(delay) = retry::decide_in_stream(err.kind(), mode).delay(&self.config) else {
            return Err(err);
        };
        tracing::warn!(
            user = %self.target,
            error = %err,
            delay_secs = delay.as_secs_f64(),
            "Stream interrupted, retrying"
        );
        Ok(sleep_or_cancel(&self.cancel, delay).await)
    }

    /// Liveness for the reopen path; a failed check counts as live.
    async fn still_live(&self) -> bool {
        match self.services.source.is_live(&self.target.room_id).await {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(user = %self.target, error = %e, "Live check failed");
                true
            }
        }
    }

    /// Cancellation, then total duration, then segment duration.
    async fn check_limits(
        &mut self,
        writer: &mut SegmentWriter,
        clock: &mut RecordingClock,
    ) -> LiverecResult<Option<StopReason>> {
        if self.cancel.is_cancelled() {
            return Ok(Some(StopReason::Cancelled));
        }
        if clock.reached(self.config.max_duration()) {
            tracing::info!(user = %self.target, "Duration limit reached");
            return Ok(Some(StopReason::DurationReached));
        }
        if !clock.segment_reached(self.config.segment_duration()) {
            return Ok(None);
        }

        self.state = TaskState::Rotating;
        let next = writer.rotate().await?;
        tracing::debug!(user = %self.target, path = %next.display(), "Segment rotated");
        clock.reset_segment();
        self.state = TaskState::Streaming;

        match self.services.source.is_live(&self.target.room_id).await {
            Ok(true) => Ok(None),
            Ok(false) => {
                tracing::info!(user = %self.target, "Broadcast ended");
                Ok(Some(StopReason::Offline))
            }
            Err(e) => {
                tracing::warn!(user = %self.target, error = %e, "Live check after rotation failed");
                Ok(None)
            }
        }
    }
}
