//! Mode controller: picks a recording strategy and keeps it running.

use std::sync::Arc;

use liverec_common::config::{RecordingConfig, RecordingMode};
use liverec_common::error::{LiverecError, LiverecResult};
use liverec_platform_core::{FollowerDirectory, Target};
use tokio_util::sync::CancellationToken;

use crate::retry::{self, sleep_or_cancel, RetryAction};
use crate::session::{RecordingReport, RecordingTask, TaskServices};
use crate::supervisor::FanOutSupervisor;

/// How the operator identified the target. At least one field is needed
/// outside fan-out mode.
#[derive(Debug, Clone, Default)]
pub struct TargetRequest {
    pub user: Option<String>,
    pub room_id: Option<String>,
    pub url: Option<String>,
}

/// Runs single-shot, polling, or fan-out recording.
pub struct ModeController {
    config: Arc<RecordingConfig>,
    services: TaskServices,
    followers: Option<Arc<dyn FollowerDirectory>>,
    cancel: CancellationToken,
}

impl ModeController {
    /// Validates `config`; it is read-only from here on.
    pub fn new(config: RecordingConfig, services: TaskServices) -> LiverecResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            services,
            followers: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_followers(mut self, directory: Arc<dyn FollowerDirectory>) -> Self {
        self.followers = Some(directory);
        self
    }

    /// Token that stops every strategy and the tasks it started.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn mode(&self) -> RecordingMode {
        self.config.mode
    }

    /// Run the configured strategy until it finishes or is cancelled.
    pub async fn run(&self, request: TargetRequest) -> LiverecResult<()> {
        self.check_region(&request).await?;

        match self.config.mode {
            RecordingMode::Single => {
                let target = self.resolve_target(request).await?;
                self.run_single(target).await.map(|_| ())
            }
            RecordingMode::Polling => {
                // The room is looked up on every poll, so an offline target
                // only needs its handle here.
                let (handle, _) = self.resolve_handle(request).await?;
                self.run_polling(&handle).await
            }
            RecordingMode::FanOut => self.run_fan_out().await,
        }
    }

    /// Record `target` once; fails if it is not live right now.
    pub async fn run_single(&self, target: Target) -> LiverecResult<RecordingReport> {
        RecordingTask::new(
            target,
            self.config.clone(),
            self.services.clone(),
            self.cancel.child_token(),
        )
        .run()
        .await
    }

    /// Keep recording `handle` every time it goes live.
    ///
    /// The room is looked up again before every attempt, since a new
    /// broadcast gets a new room.
    pub async fn run_polling(&self, handle: &str) -> LiverecResult<()> {
        let mode = RecordingMode::Polling;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let err = match self.poll_once(handle).await {
                Ok(_) => continue,
                Err(e) => e,
            };

            let action = retry::decide(err.kind(), mode);
            let Some(delay) = action.delay(&self.config) else {
                return Err(err);
            };
            if err.kind().is_expected() {
                tracing::info!(
                    user = %handle,
                    minutes = self.config.poll_interval_mins,
                    "Not live, waiting before next check"
                );
            } else {
                tracing::warn!(user = %handle, error = %err, ?action, "Recording attempt failed");
            }

            if !sleep_or_cancel(&self.cancel, delay).await {
                break;
            }
        }
        tracing::info!(user = %handle, "Polling stopped");
        Ok(())
    }

    /// Watch the follower list and record every live follower.
    pub async fn run_fan_out(&self) -> LiverecResult<()> {
        let directory = self
            .followers
            .clone()
            .ok_or_else(|| LiverecError::config("follower mode needs a follower directory"))?;
        let account_id = directory
            .account_id()
            .await?
            .ok_or_else(|| LiverecError::config("follower mode needs an account id"))?;

        let mut supervisor = FanOutSupervisor::new(
            self.config.clone(),
            self.services.clone(),
            self.cancel.clone(),
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let delay = match directory.list_followers(&account_id).await {
                Ok(followers) => {
                    let started = supervisor.run_pass(&followers).await;
                    tracing::info!(
                        followers = followers.len(),
                        started,
                        active = supervisor.active_count(),
                        "Discovery pass complete"
                    );
                    self.config.poll_interval()
                }
                Err(e) => {
                    let delay = match retry::decide(e.kind(), RecordingMode::FanOut) {
                        RetryAction::Cooldown => self.config.connection_cooldown(),
                        _ => self.config.poll_interval(),
                    };
                    tracing::warn!(
                        error = %e,
                        delay_secs = delay.as_secs(),
                        "Failed to list followers"
                    );
                    delay
                }
            };

            if !sleep_or_cancel(&self.cancel, delay).await {
                break;
            }
        }

        supervisor.shutdown().await;
        tracing::info!("Follower recording stopped");
        Ok(())
    }

    async fn poll_once(&self, handle: &str) -> LiverecResult<RecordingReport> {
        let room_id = self
            .services
            .source
            .room_for_handle(handle)
            .await?
            .ok_or_else(|| LiverecError::not_live(handle))?;
        self.run_single(Target::new(handle, room_id)).await
    }

    /// Fill in whichever of handle and room id the request left out.
    async fn resolve_target(&self, request: TargetRequest) -> LiverecResult<Target> {
        let (handle, room_id) = self.resolve_handle(request).await?;
        let room_id = match room_id {
            Some(room_id) => room_id,
            None => self
                .services
                .source
                .room_for_handle(&handle)
                .await?
                .ok_or_else(|| LiverecError::not_live(&handle))?,
        };
        Ok(Target::new(handle, room_id))
    }

    /// The target's handle, plus the room id when the request carried one.
    async fn resolve_handle(
        &self,
        request: TargetRequest,
    ) -> LiverecResult<(String, Option<String>)> {
        let source = &self.services.source;
        let (mut handle, mut room_id) = (request.user, request.room_id);

        if let Some(url) = request.url.as_deref() {
            let (h, r) = source.resolve_url(url).await?;
            tracing::debug!(url, handle = %h, room = %r, "Resolved target url");
            handle = Some(h);
            room_id = Some(r);
        }

        let handle = match (handle, room_id.as_deref()) {
            (Some(handle), _) => handle,
            (None, Some(room_id)) => source.handle_for_room(room_id).await?,
            (None, None) => {
                return Err(LiverecError::config(
                    "a user, room id, or url is required",
                ))
            }
        };
        Ok((handle, room_id))
    }

    /// Region restrictions only matter when the platform must be queried
    /// to find the room.
    async fn check_region(&self, request: &TargetRequest) -> LiverecResult<()> {
        let needs_lookup = request.room_id.is_none() || self.config.mode != RecordingMode::Single;
        if needs_lookup && self.services.source.is_region_blocked().await? {
            return Err(LiverecError::region_blocked(
                "the platform is not available from this network region",
            ));
        }
        Ok(())
    }
}
