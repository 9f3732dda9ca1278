//! Live source for plain HTTP(S) streams.
//!
//! A room id is the direct stream URL. Handles map to URLs through an
//! optional watch list; without one, the handle is derived from the last
//! path segment of the URL.

use std::time::Duration;

use futures_util::StreamExt;
use liverec_common::error::{LiverecError, LiverecResult};
use liverec_platform_core::{ChunkStream, LiveSource};
use reqwest::{Client, Url};

use crate::watchlist::Watchlist;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpLiveSource {
    client: Client,
    watchlist: Option<Watchlist>,
}

impl HttpLiveSource {
    pub fn new(watchlist: Option<Watchlist>) -> LiverecResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("liverec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LiverecError::config(format!("failed to build http client: {e}")))?;
        Ok(Self { client, watchlist })
    }

    async fn handle_for_url(&self, url: &str) -> LiverecResult<String> {
        if let Some(list) = &self.watchlist {
            if let Some(handle) = list.handle_for(url).await? {
                return Ok(handle);
            }
        }
        handle_from_url(url)
            .ok_or_else(|| LiverecError::unexpected(format!("cannot derive a handle from {url}")))
    }
}

#[async_trait::async_trait]
impl LiveSource for HttpLiveSource {
    async fn resolve_url(&self, url: &str) -> LiverecResult<(String, String)> {
        if !is_stream_url(url) {
            return Err(LiverecError::config(format!("not an http(s) url: {url}")));
        }
        let handle = self.handle_for_url(url).await?;
        Ok((handle, url.to_string()))
    }

    async fn handle_for_room(&self, room_id: &str) -> LiverecResult<String> {
        self.handle_for_url(room_id).await
    }

    async fn room_for_handle(&self, handle: &str) -> LiverecResult<Option<String>> {
        match &self.watchlist {
            Some(list) => list.url_for(handle).await,
            None => Ok(None),
        }
    }

    async fn is_live(&self, room_id: &str) -> LiverecResult<bool> {
        if !is_stream_url(room_id) {
            return Ok(false);
        }
        let response = self
            .client
            .get(room_id)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        tracing::debug!(url = room_id, status = %response.status(), "Live check");
        Ok(response.status().is_success())
    }

    async fn playable_url(&self, room_id: &str) -> LiverecResult<Option<String>> {
        Ok(is_stream_url(room_id).then(|| room_id.to_string()))
    }

    async fn open_stream(&self, url: &str) -> LiverecResult<ChunkStream> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LiverecError::unexpected(format!(
                "stream request returned {status}"
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

/// Classify an HTTP failure for the retry policy.
pub fn map_reqwest_error(e: reqwest::Error) -> LiverecError {
    if e.is_connect() {
        LiverecError::connection_lost(e.to_string())
    } else if e.is_timeout() || e.is_body() || e.is_decode() {
        LiverecError::transient(e.to_string())
    } else {
        LiverecError::unexpected(e.to_string())
    }
}

/// `https://cdn.example/live/alice.flv` → `alice`; falls back to the host.
pub fn handle_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let from_path = parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|segment| segment.split('.').next().unwrap_or(segment).to_string())
        .filter(|name| !name.is_empty());
    from_path.or_else(|| parsed.host_str().map(str::to_string))
}

fn is_stream_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::TestServer;
    use liverec_common::error::ErrorKind;

    #[test]
    fn test_handle_from_url() {
        assert_eq!(
            handle_from_url("https://cdn.test/live/alice.flv").as_deref(),
            Some("alice")
        );
        assert_eq!(
            handle_from_url("https://cdn.test/live/bob/").as_deref(),
            Some("bob")
        );
        assert_eq!(handle_from_url("https://cdn.test/").as_deref(), Some("cdn.test"));
        assert_eq!(handle_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn test_live_status_follows_http_status() {
        let server = TestServer::start(vec![(200, b"x".to_vec()), (404, Vec::new())]).await;
        let source = HttpLiveSource::new(None).unwrap();
        let url = server.url("/live/alice.flv");

        assert!(source.is_live(&url).await.unwrap());
        assert!(!source.is_live(&url).await.unwrap());
        assert!(!source.is_live("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_stream_yields_body() {
        let body = b"FLV\x01 payload bytes".to_vec();
        let server = TestServer::start(vec![(200, body.clone())]).await;
        let source = HttpLiveSource::new(None).unwrap();

        let mut stream = source.open_stream(&server.url("/live/alice.flv")).await.unwrap();
        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, body);
        assert!(server.requests()[0].starts_with("GET /live/alice.flv"));
    }

    #[tokio::test]
    async fn test_open_stream_rejects_error_status() {
        let server = TestServer::start(vec![(503, Vec::new())]).await;
        let source = HttpLiveSource::new(None).unwrap();
        let err = source
            .open_stream(&server.url("/live/alice.flv"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::UnexpectedFailure);
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_lost() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpLiveSource::new(None).unwrap();
        let err = source
            .is_live(&format!("http://{addr}/live.flv"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionLost);
    }

    #[tokio::test]
    async fn test_watchlist_maps_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.json");
        std::fs::write(&path, r#"{ "studio": "https://cdn.test/x/stream-7.flv" }"#).unwrap();
        let source = HttpLiveSource::new(Some(Watchlist::new(path))).unwrap();

        assert_eq!(
            source.room_for_handle("studio").await.unwrap().as_deref(),
            Some("https://cdn.test/x/stream-7.flv")
        );
        let (handle, room) = source
            .resolve_url("https://cdn.test/x/stream-7.flv")
            .await
            .unwrap();
        assert_eq!(handle, "studio");
        assert_eq!(room, "https://cdn.test/x/stream-7.flv");
        assert_eq!(source.room_for_handle("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_http_room_has_no_playable_url() {
        let source = HttpLiveSource::new(None).unwrap();
        assert_eq!(source.playable_url("7300").await.unwrap(), None);
        assert!(source.resolve_url("ftp://cdn.test/a.flv").await.is_err());
    }
}
