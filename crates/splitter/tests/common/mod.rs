//! In-memory playlist service and clock for engine tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use playlist_splitter::quota::QUOTA_EXCEEDED_PHRASE;
use playlist_splitter::api::PrivacyStatus;
use playlist_splitter::{ApiError, CheckpointStore, Clock, PlaylistApi, RemoteItem, SplitConfig};

pub const SOURCE_ID: &str = "PLsource";
pub const SOURCE_NAME: &str = "WSC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Find(String),
    List(String),
    Create(String),
    Add { playlist_id: String, video_id: String },
    Remove(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Add { .. } | Self::Remove(_))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    membership_id: String,
    video_id: String,
    title: String,
}

#[derive(Debug, Default)]
struct RemotePlaylist {
    title: String,
    privacy: PrivacyStatus,
    entries: Vec<Entry>,
}

#[derive(Default)]
struct Inner {
    playlists: BTreeMap<String, RemotePlaylist>,
    next_id: u64,
    calls: Vec<Call>,
    failing_adds: HashMap<String, String>,
    failing_removes: HashSet<String>,
    failing_create: Option<String>,
    /// Error returned by every add once the OAuth grant is revoked.
    revoked: Option<String>,
    /// Calls left before a single quota error is returned.
    quota_after: Option<usize>,
    unauthorized: bool,
}

/// Cheaply clonable handle to one shared fake service.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    /// A service holding the source playlist with `count` videos.
    pub fn with_source(count: usize) -> Self {
        let api = Self::default();
        api.inner.lock().playlists.insert(
            SOURCE_ID.to_string(),
            RemotePlaylist {
                title: SOURCE_NAME.to_string(),
                ..RemotePlaylist::default()
            },
        );
        api.append_to_source(0..count);
        api
    }

    pub fn append_to_source(&self, range: std::ops::Range<usize>) {
        let mut inner = self.inner.lock();
        let source = inner.playlists.get_mut(SOURCE_ID).expect("source playlist");
        for i in range {
            source.entries.push(Entry {
                membership_id: format!("src-{i}"),
                video_id: format!("vid-{i}"),
                title: format!("Video {i}"),
            });
        }
    }

    pub fn fail_add(&self, video_id: &str, message: &str) {
        self.inner
            .lock()
            .failing_adds
            .insert(video_id.to_string(), message.to_string());
    }

    pub fn fail_remove(&self, membership_id: &str) {
        self.inner
            .lock()
            .failing_removes
            .insert(membership_id.to_string());
    }

    /// Lets `calls` more calls through, then answers one with a quota error.
    pub fn exhaust_quota_after(&self, calls: usize) {
        self.inner.lock().quota_after = Some(calls);
    }

    pub fn fail_create(&self, message: &str) {
        self.inner.lock().failing_create = Some(message.to_string());
    }

    /// Every later add fails the way a rejected token refresh does.
    pub fn revoke_grant(&self) {
        self.inner.lock().revoked =
            Some("token refresh rejected (status 400): invalid_grant".to_string());
    }

    pub fn reject_credentials(&self) {
        self.inner.lock().unauthorized = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn adds_of(&self, video_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Add { video_id: v, .. } if v == video_id))
            .count()
    }

    /// Titles and sizes of every playlist other than the source.
    pub fn created_playlists(&self) -> Vec<(String, usize)> {
        let mut created: Vec<_> = self
            .inner
            .lock()
            .playlists
            .iter()
            .filter(|(id, _)| id.as_str() != SOURCE_ID)
            .map(|(_, p)| (p.title.clone(), p.entries.len()))
            .collect();
        created.sort();
        created
    }

    pub fn privacy_of(&self, title: &str) -> Option<PrivacyStatus> {
        self.inner
            .lock()
            .playlists
            .values()
            .find(|p| p.title == title)
            .map(|p| p.privacy)
    }

    pub fn source_len(&self) -> usize {
        self.inner.lock().playlists[SOURCE_ID].entries.len()
    }

    pub fn playlist_video_ids(&self, playlist_id: &str) -> Vec<String> {
        self.inner.lock().playlists[playlist_id]
            .entries
            .iter()
            .map(|e| e.video_id.clone())
            .collect()
    }

    fn enter(&self, call: Call) -> Result<parking_lot::MutexGuard<'_, Inner>, ApiError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        if inner.unauthorized {
            return Err(ApiError::service(401, "Invalid Credentials"));
        }
        let remaining = inner.quota_after;
        match remaining {
            Some(0) => {
                inner.quota_after = None;
                Err(ApiError::Service {
                    status: 403,
                    message: format!("{QUOTA_EXCEEDED_PHRASE} your quota."),
                    reason: Some("quotaExceeded".to_string()),
                })
            }
            Some(n) => {
                inner.quota_after = Some(n - 1);
                Ok(inner)
            }
            None => Ok(inner),
        }
    }
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

#[async_trait]
impl PlaylistApi for FakeApi {
    async fn find_playlist_by_name(&self, name: &str) -> Result<Option<String>, ApiError> {
        let inner = self.enter(Call::Find(name.to_string()))?;
        Ok(inner
            .playlists
            .iter()
            .find(|(_, p)| p.title == name)
            .map(|(id, _)| id.clone()))
    }

    async fn list_items(&self, playlist_id: &str) -> Result<Vec<RemoteItem>, ApiError> {
        let inner = self.enter(Call::List(playlist_id.to_string()))?;
        let playlist = inner
            .playlists
            .get(playlist_id)
            .ok_or_else(|| ApiError::service(404, "Playlist not found."))?;
        Ok(playlist
            .entries
            .iter()
            .map(|e| RemoteItem {
                video_id: e.video_id.clone(),
                membership_id: e.membership_id.clone(),
                title: e.title.clone(),
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        title: &str,
        _description: &str,
        privacy: PrivacyStatus,
    ) -> Result<String, ApiError> {
        let mut inner = self.enter(Call::Create(title.to_string()))?;
        if let Some(message) = &inner.failing_create {
            return Err(ApiError::service(403, message.clone()));
        }
        let id = inner.next_id("PL");
        inner.playlists.insert(
            id.clone(),
            RemotePlaylist {
                title: title.to_string(),
                privacy,
                entries: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn add_item(&self, playlist_id: &str, video_id: &str) -> Result<String, ApiError> {
        let mut inner = self.enter(Call::Add {
            playlist_id: playlist_id.to_string(),
            video_id: video_id.to_string(),
        })?;
        if let Some(message) = &inner.revoked {
            return Err(ApiError::Auth(message.clone()));
        }
        if let Some(message) = inner.failing_adds.get(video_id) {
            return Err(ApiError::service(404, message.clone()));
        }
        let membership_id = inner.next_id("item");
        let entry = Entry {
            membership_id: membership_id.clone(),
            video_id: video_id.to_string(),
            title: String::new(),
        };
        inner
            .playlists
            .get_mut(playlist_id)
            .ok_or_else(|| ApiError::service(404, "Playlist not found."))?
            .entries
            .push(entry);
        Ok(membership_id)
    }

    async fn remove_item(&self, membership_id: &str) -> Result<(), ApiError> {
        let mut inner = self.enter(Call::Remove(membership_id.to_string()))?;
        if inner.failing_removes.contains(membership_id) {
            return Err(ApiError::service(404, "Playlist item not found."));
        }
        for playlist in inner.playlists.values_mut() {
            playlist.entries.retain(|e| e.membership_id != membership_id);
        }
        Ok(())
    }
}

/// Clock whose sleeps advance time instantly.
pub struct ManualClock {
    now: Mutex<f64>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn at(now: f64) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration.as_secs_f64());
    }
}

pub fn store_at(path: &Path, clock: &Arc<ManualClock>) -> CheckpointStore {
    CheckpointStore::with_clock(path, clock.clone())
}

pub fn config(target_size: usize) -> SplitConfig {
    SplitConfig {
        source_playlist: SOURCE_NAME.to_string(),
        new_playlist_name: "WSC-split".to_string(),
        target_size,
        ..SplitConfig::default()
    }
}
