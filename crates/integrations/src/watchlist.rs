//! Watch list: a JSON object mapping handles to stream URLs.
//!
//! ```json
//! { "alice": "https://cdn.example/live/alice.flv" }
//! ```
//!
//! The file is read on every lookup so it can be edited while recording.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use liverec_common::error::{LiverecError, LiverecResult};
use liverec_platform_core::{Follower, FollowerDirectory};

/// Handle → stream URL entries backed by a JSON file.
#[derive(Debug, Clone)]
pub struct Watchlist {
    path: PathBuf,
}

impl Watchlist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries, sorted by handle.
    pub async fn entries(&self) -> LiverecResult<BTreeMap<String, String>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            LiverecError::config(format!(
                "failed to read watch list {}: {e}",
                self.path.display()
            ))
        })?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)?;
        Ok(entries)
    }

    pub async fn url_for(&self, handle: &str) -> LiverecResult<Option<String>> {
        Ok(self.entries().await?.remove(handle))
    }

    pub async fn handle_for(&self, url: &str) -> LiverecResult<Option<String>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .find(|(_, u)| u == url)
            .map(|(handle, _)| handle))
    }
}

/// Follower directory where every watch-list handle is a follower.
///
/// The account id of each follower is its handle.
#[derive(Debug, Clone)]
pub struct WatchlistDirectory {
    watchlist: Watchlist,
}

impl WatchlistDirectory {
    pub fn new(watchlist: Watchlist) -> Self {
        Self { watchlist }
    }
}

#[async_trait::async_trait]
impl FollowerDirectory for WatchlistDirectory {
    async fn account_id(&self) -> LiverecResult<Option<String>> {
        Ok(Some(self.watchlist.path().display().to_string()))
    }

    async fn list_followers(&self, _account_id: &str) -> LiverecResult<Vec<Follower>> {
        Ok(self
            .watchlist
            .entries()
            .await?
            .into_keys()
            .map(|handle| Follower::new(handle.clone(), handle))
            .collect())
    }
}
