//! Fan-out supervisor: one recording task per live follower.

use std::collections::HashMap;
use std::sync::Arc;

use liverec_common::config::RecordingConfig;
use liverec_common::error::LiverecResult;
use liverec_platform_core::{Follower, Target};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::retry::sleep_or_cancel;
use crate::session::{RecordingReport, RecordingTask, TaskServices};

struct ActiveTask {
    handle: String,
    cancel: CancellationToken,
    join: JoinHandle<LiverecResult<RecordingReport>>,
}

/// Owns the set of running follower recordings, keyed by account id.
///
/// Only the discovery loop mutates the set. Tasks report completion
/// through their join handles, which are checked at the start of each
/// pass.
pub struct FanOutSupervisor {
    config: Arc<RecordingConfig>,
    services: TaskServices,
    cancel: CancellationToken,
    active: HashMap<String, ActiveTask>,
}

impl FanOutSupervisor {
    pub fn new(
        config: Arc<RecordingConfig>,
        services: TaskServices,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            services,
            cancel,
            active: HashMap::new(),
        }
    }

    /// Number of tasks in the active set, finished or not.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether a task for `account_id` is currently running.
    pub fn is_active(&self, account_id: &str) -> bool {
        self.active
            .get(account_id)
            .is_some_and(|task| !task.join.is_finished())
    }

    /// One discovery pass over `followers`.
    ///
    /// Finished tasks are reaped first. Followers already recording are
    /// skipped; the rest are probed and started if live. Probe failures
    /// are logged and skipped. Returns the number of tasks started.
    pub async fn run_pass(&mut self, followers: &[Follower]) -> usize {
        self.reap().await;

        let mut started = 0;
        for follower in followers {
            if self.cancel.is_cancelled() {
                break;
            }
            if self.active.contains_key(&follower.account_id) {
                tracing::debug!(user = %follower.handle, "Already recording");
                continue;
            }

            let Some(room_id) = self.probe(follower).await else {
                continue;
            };

            self.start(follower, room_id);
            started += 1;

            if !sleep_or_cancel(&self.cancel, self.config.follower_spacing()).await {
                break;
            }
        }
        started
    }

    /// Drop finished tasks from the active set and log how they ended.
    pub async fn reap(&mut self) -> usize {
        let finished: Vec<String> = self
            .active
            .iter()
            .filter(|(_, task)| task.join.is_finished())
            .map(|(account_id, _)| account_id.clone())
            .collect();

        for account_id in &finished {
            let Some(task) = self.active.remove(account_id) else {
                continue;
            };
            match task.join.await {
                Ok(Ok(report)) => tracing::info!(
                    user = %task.handle,
                    reason = ?report.reason,
                    segments = report.segments.len(),
                    "Follower recording finished"
                ),
                Ok(Err(e)) if e.kind().is_expected() => {
                    tracing::info!(user = %task.handle, error = %e, "Follower went offline before recording")
                }
                Ok(Err(e)) => {
                    tracing::warn!(user = %task.handle, error = %e, "Follower recording failed")
                }
                Err(e) => tracing::error!(user = %task.handle, error = %e, "Follower task panicked"),
            }
        }
        finished.len()
    }

    /// Cancel every running task and wait for each to close its output.
    pub async fn shutdown(&mut self) {
        for task in self.active.values() {
            task.cancel.cancel();
        }
        for (_, task) in self.active.drain() {
            if let Err(e) = task.join.await {
                tracing::error!(user = %task.handle, error = %e, "Follower task panicked");
            }
        }
    }

    /// Room id of a follower that is live right now.
    async fn probe(&self, follower: &Follower) -> Option<String> {
        let source = &self.services.source;
        let room_id = match source.room_for_handle(&follower.handle).await {
            Ok(Some(room_id)) => room_id,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(user = %follower.handle, error = %e, "Room lookup failed");
                return None;
            }
        };
        match source.is_live(&room_id).await {
            Ok(true) => Some(room_id),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(user = %follower.handle, error = %e, "Live check failed");
                None
            }
        }
    }

    fn start(&mut self, follower: &Follower, room_id: String) {
        let target =
            Target::new(follower.handle.clone(), room_id).with_account_id(follower.account_id.clone());
        let cancel = self.cancel.child_token();
        let mut task = RecordingTask::new(
            target,
            self.config.clone(),
            self.services.clone(),
            cancel.clone(),
        );

        tracing::info!(user = %follower.handle, "Follower is live, starting recording");
        let join = tokio::spawn(async move { task.run().await });
        self.active.insert(
            follower.account_id.clone(),
            ActiveTask {
                handle: follower.handle.clone(),
                cancel,
                join,
            },
        );
    }
}
