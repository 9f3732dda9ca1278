//! In-memory collaborators for engine tests.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use liverec_common::error::{ErrorKind, LiverecError, LiverecResult};
use liverec_platform_core::{
    ChunkStream, Follower, FollowerDirectory, LiveSource, Notifier, PostProcessor,
};

/// Counts conversions instead of running them.
#[derive(Default)]
pub struct RecordingPostProcessor {
    converted: Mutex<Vec<PathBuf>>,
}

impl RecordingPostProcessor {
    pub fn converted(&self) -> Vec<PathBuf> {
        self.converted.lock().unwrap().clone()
    }
}

impl PostProcessor for RecordingPostProcessor {
    fn convert(&self, raw_path: PathBuf) {
        self.converted.lock().unwrap().push(raw_path);
    }
}

/// Collects messages; optionally fails every delivery after recording it.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> LiverecResult<()> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            return Err(LiverecError::notification("bot offline"));
        }
        Ok(())
    }
}

/// One scripted stream event.
#[derive(Debug, Clone)]
pub enum Step {
    Chunk(Bytes),
    Wait(Duration),
    Fail(ErrorKind),
}

impl Step {
    pub fn chunk(data: &'static [u8]) -> Self {
        Self::Chunk(Bytes::from_static(data))
    }

    pub fn wait_secs(secs: u64) -> Self {
        Self::Wait(Duration::from_secs(secs))
    }
}

pub fn error_for(kind: ErrorKind) -> LiverecError {
    match kind {
        ErrorKind::TargetNotLive => LiverecError::not_live("fake"),
        ErrorKind::LiveUrlUnresolvable => LiverecError::url_unresolvable("fake"),
        ErrorKind::TransientStreamError => LiverecError::transient("connection reset by peer"),
        ErrorKind::ConnectionLost => LiverecError::connection_lost("remote closed"),
        ErrorKind::UnexpectedFailure => LiverecError::unexpected("malformed response"),
    }
}

struct Script {
    steps: Vec<Step>,
    hang: bool,
}

enum Opening {
    Stream(Script),
    Refuse(ErrorKind),
}

struct Room {
    live: bool,
    url: Option<String>,
    streams: VecDeque<Opening>,
    opens: usize,
}

#[derive(Default)]
struct SourceState {
    rooms: HashMap<String, Room>,
    handles: HashMap<String, String>,
    urls: HashMap<String, String>,
    room_lookup_failures: VecDeque<ErrorKind>,
    live_checks: usize,
    region_blocked: bool,
}

/// Scripted live source.
///
/// Every `open_stream` consumes one scripted stream (or refusal) for the
/// room. When the last finite stream of a room ends, the room goes offline.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<SourceState>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&self, handle: &str, room_id: &str) {
        let url = format!("https://cdn.test/{room_id}.flv");
        let mut state = self.state.lock().unwrap();
        state.handles.insert(handle.to_string(), room_id.to_string());
        state.urls.insert(url.clone(), room_id.to_string());
        state.rooms.insert(
            room_id.to_string(),
            Room {
                live: true,
                url: Some(url),
                streams: VecDeque::new(),
                opens: 0,
            },
        );
    }

    pub fn set_live(&self, room_id: &str, live: bool) {
        if let Some(room) = self.state.lock().unwrap().rooms.get_mut(room_id) {
            room.live = live;
        }
    }

    pub fn clear_url(&self, room_id: &str) {
        if let Some(room) = self.state.lock().unwrap().rooms.get_mut(room_id) {
            room.url = None;
        }
    }

    pub fn push_stream(&self, room_id: &str, steps: Vec<Step>) {
        self.push(room_id, steps, false);
    }

    /// A stream that stays open after its steps, keeping the room live.
    pub fn push_hanging_stream(&self, room_id: &str, steps: Vec<Step>) {
        self.push(room_id, steps, true);
    }

    /// Queue an `open_stream` failure behind the streams already scripted.
    pub fn refuse_open(&self, room_id: &str, kind: ErrorKind) {
        if let Some(room) = self.state.lock().unwrap().rooms.get_mut(room_id) {
            room.streams.push_back(Opening::Refuse(kind));
        }
    }

    pub fn block_region(&self) {
        self.state.lock().unwrap().region_blocked = true;
    }

    pub fn fail_next_room_lookup(&self, kind: ErrorKind) {
        self.state
            .lock()
            .unwrap()
            .room_lookup_failures
            .push_back(kind);
    }

    pub fn opens(&self, room_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .rooms
            .get(room_id)
            .map(|r| r.opens)
            .unwrap_or(0)
    }

    pub fn live_checks(&self) -> usize {
        self.state.lock().unwrap().live_checks
    }

    fn push(&self, room_id: &str, steps: Vec<Step>, hang: bool) {
        if let Some(room) = self.state.lock().unwrap().rooms.get_mut(room_id) {
            room.streams.push_back(Opening::Stream(Script { steps, hang }));
        }
    }
}

#[async_trait::async_trait]
impl LiveSource for FakeSource {
    async fn resolve_url(&self, url: &str) -> LiverecResult<(String, String)> {
        let state = self.state.lock().unwrap();
        let room = state
            .urls
            .get(url)
            .cloned()
            .ok_or_else(|| LiverecError::unexpected(format!("unknown url {url}")))?;
        let handle = state
            .handles
            .iter()
            .find(|(_, r)| **r == room)
            .map(|(h, _)| h.clone())
            .unwrap_or_default();
        Ok((handle, room))
    }

    async fn handle_for_room(&self, room_id: &str) -> LiverecResult<String> {
        self.state
            .lock()
            .unwrap()
            .handles
            .iter()
            .find(|(_, r)| r.as_str() == room_id)
            .map(|(h, _)| h.clone())
            .ok_or_else(|| LiverecError::unexpected(format!("unknown room {room_id}")))
    }

    async fn room_for_handle(&self, handle: &str) -> LiverecResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        if let Some(kind) = state.room_lookup_failures.pop_front() {
            return Err(error_for(kind));
        }
        Ok(state.handles.get(handle).cloned())
    }

    async fn is_live(&self, room_id: &str) -> LiverecResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.live_checks += 1;
        Ok(state.rooms.get(room_id).map(|r| r.live).unwrap_or(false))
    }

    async fn playable_url(&self, room_id: &str) -> LiverecResult<Option<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .rooms
            .get(room_id)
            .and_then(|r| r.url.clone()))
    }

    async fn is_region_blocked(&self) -> LiverecResult<bool> {
        Ok(self.state.lock().unwrap().region_blocked)
    }

    async fn open_stream(&self, url: &str) -> LiverecResult<ChunkStream> {
        let mut state = self.state.lock().unwrap();
        let room_id = state
            .urls
            .get(url)
            .cloned()
            .ok_or_else(|| LiverecError::unexpected(format!("unknown url {url}")))?;
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| LiverecError::unexpected("room vanished"))?;
        room.opens += 1;

        let script = match room.streams.pop_front() {
            Some(Opening::Stream(script)) => script,
            Some(Opening::Refuse(kind)) => return Err(error_for(kind)),
            None => {
                room.live = false;
                return Ok(futures_util::stream::empty().boxed());
            }
        };

        let shared = self.state.clone();
        let hang = script.hang;
        let steps = script.steps.into_iter();
        let stream = futures_util::stream::unfold(steps, move |mut steps| {
            let shared = shared.clone();
            let room_id = room_id.clone();
            async move {
                loop {
                    match steps.next() {
                        Some(Step::Wait(d)) => tokio::time::sleep(d).await,
                        Some(Step::Chunk(b)) => return Some((Ok(b), steps)),
                        Some(Step::Fail(kind)) => return Some((Err(error_for(kind)), steps)),
                        None if hang => return None,
                        None => {
                            let mut state = shared.lock().unwrap();
                            if let Some(room) = state.rooms.get_mut(&room_id) {
                                if room.streams.is_empty() {
                                    room.live = false;
                                }
                            }
                            return None;
                        }
                    }
                }
            }
        });

        if hang {
            Ok(stream.chain(futures_util::stream::pending()).boxed())
        } else {
            Ok(stream.boxed())
        }
    }
}

/// Static follower directory, or one whose listing always fails.
pub struct FakeDirectory {
    account: Option<String>,
    followers: Mutex<Vec<Follower>>,
    failure: Option<ErrorKind>,
    calls: Arc<Mutex<usize>>,
}

impl FakeDirectory {
    pub fn new(account: Option<&str>, followers: Vec<Follower>) -> Self {
        Self {
            account: account.map(str::to_string),
            followers: Mutex::new(followers),
            failure: None,
            calls: Arc::default(),
        }
    }

    pub fn failing(account: &str, kind: ErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::new(Some(account), Vec::new())
        }
    }

    /// Shared counter of `list_followers` calls.
    pub fn calls(&self) -> Arc<Mutex<usize>> {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl FollowerDirectory for FakeDirectory {
    async fn account_id(&self) -> LiverecResult<Option<String>> {
        Ok(self.account.clone())
    }

    async fn list_followers(&self, _account_id: &str) -> LiverecResult<Vec<Follower>> {
        *self.calls.lock().unwrap() += 1;
        if let Some(kind) = self.failure {
            return Err(error_for(kind));
        }
        Ok(self.followers.lock().unwrap().clone())
    }
}

/// Read every file in order and concatenate the contents.
pub fn concat_files(paths: &[PathBuf]) -> Vec<u8> {
    paths
        .iter()
        .flat_map(|p| std::fs::read(p).unwrap())
        .collect()
}
