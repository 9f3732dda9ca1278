//! Liverec platform core contracts.
//!
//! This crate contains the data structures and traits the recording engine
//! uses to talk to the outside world, without coupling it to a concrete
//! streaming platform, converter, or messaging service.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use liverec_common::error::LiverecResult;

/// Lazy sequence of raw stream chunks, in arrival order.
pub type ChunkStream = BoxStream<'static, LiverecResult<Bytes>>;

/// Who is being recorded.
///
/// Immutable once a recording task has been started for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Display handle, also used for directory and file names.
    pub handle: String,
    /// Opaque room/session identifier on the platform.
    pub room_id: String,
    /// Stable account id; set for followers discovered in fan-out mode.
    pub account_id: Option<String>,
}

impl Target {
    pub fn new(handle: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            room_id: room_id.into(),
            account_id: None,
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.handle)
    }
}

/// One entry of a follower list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Follower {
    pub handle: String,
    /// Key used to deduplicate recordings across discovery passes.
    pub account_id: String,
}

impl Follower {
    pub fn new(handle: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            account_id: account_id.into(),
        }
    }
}

/// Resolves broadcasts and streams their bytes.
#[async_trait::async_trait]
pub trait LiveSource: Send + Sync {
    /// Resolve a share/profile URL into `(handle, room_id)`.
    async fn resolve_url(&self, url: &str) -> LiverecResult<(String, String)>;

    /// Look up the handle owning a room.
    async fn handle_for_room(&self, room_id: &str) -> LiverecResult<String>;

    /// Current room for a handle, if the platform knows one.
    async fn room_for_handle(&self, handle: &str) -> LiverecResult<Option<String>>;

    /// Whether the room is broadcasting right now.
    async fn is_live(&self, room_id: &str) -> LiverecResult<bool>;

    /// Playable URL for a live room, if one can be resolved.
    async fn playable_url(&self, room_id: &str) -> LiverecResult<Option<String>>;

    /// Open the raw byte stream behind a playable URL.
    ///
    /// The stream ends when the source ends; it may yield
    /// `TransientStream` or `ConnectionLost` errors mid-way.
    async fn open_stream(&self, url: &str) -> LiverecResult<ChunkStream>;

    /// Whether the platform refuses service from this network region.
    async fn is_region_blocked(&self) -> LiverecResult<bool> {
        Ok(false)
    }
}

/// Supplies the accounts watched in fan-out mode.
#[async_trait::async_trait]
pub trait FollowerDirectory: Send + Sync {
    /// Account whose follower list is watched.
    async fn account_id(&self) -> LiverecResult<Option<String>>;

    /// Current followers, in platform order.
    async fn list_followers(&self, account_id: &str) -> LiverecResult<Vec<Follower>>;
}

/// Converts finished raw captures into a playable container.
///
/// Fire-and-forget: implementations must return promptly and do the
/// work in the background.
pub trait PostProcessor: Send + Sync {
    fn convert(&self, raw_path: PathBuf);
}

/// Best-effort message sink.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> LiverecResult<()>;
}

/// Post-processor that leaves raw files untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepRaw;

impl PostProcessor for KeepRaw {
    fn convert(&self, _raw_path: PathBuf) {}
}

/// Where the converted container for a raw capture ends up.
///
/// `alice_2026-01-01_12-00-00_flv.mp4` becomes `alice_2026-01-01_12-00-00.mp4`.
pub fn converted_path(raw_path: &Path) -> PathBuf {
    let name = raw_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let converted = match name.rsplit_once('_') {
        Some((stem, _)) => format!("{stem}.mp4"),
        None => format!("{name}.mp4"),
    };
    raw_path.with_file_name(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_path_drops_raw_suffix() {
        let raw = Path::new("/rec/alice/alice_2026-01-01_12-00-00_flv.mp4");
        assert_eq!(
            converted_path(raw),
            PathBuf::from("/rec/alice/alice_2026-01-01_12-00-00.mp4")
        );
        let collided = Path::new("/rec/alice/alice_2026-01-01_12-00-00-1_flv.mp4");
        assert_eq!(
            converted_path(collided),
            PathBuf::from("/rec/alice/alice_2026-01-01_12-00-00-1.mp4")
        );
    }

    #[test]
    fn test_target_display_uses_handle() {
        let target = Target::new("alice", "7300").with_account_id("MS4w");
        assert_eq!(target.to_string(), "@alice");
        assert_eq!(target.account_id.as_deref(), Some("MS4w"));
    }
}
