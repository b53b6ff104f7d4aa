//! Checkpointed entities: videos, the playlists they are split into, and
//! the run state that ties them together.

use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::RemoteItem;

/// Migration status of a single video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    /// Not yet added to its destination playlist.
    #[default]
    Pending,
    /// Added to its destination playlist.
    Success,
    /// The last remote operation on this video failed; see `error_message`.
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Whether the video has been through a migration attempt.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video tracked by the checkpoint.
///
/// `id` is the stable video identity. The `*_with_playlist` fields are
/// playlist item identities, i.e. the membership of the video in a specific
/// playlist, and are what the remote API needs to remove a video again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub id_with_playlist: Option<String>,
    #[serde(default)]
    pub previous_id_with_playlist: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub previous_playlist_id: Option<String>,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default)]
    pub error_message: String,
}

impl Video {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            id_with_playlist: None,
            previous_id_with_playlist: None,
            title: None,
            playlist_id: None,
            previous_playlist_id: None,
            status: VideoStatus::Pending,
            error_message: String::new(),
        }
    }

    /// Builds a pending video from an entry of a remote playlist listing.
    pub fn from_remote(item: RemoteItem, playlist_id: &str) -> Self {
        Self {
            id_with_playlist: Some(item.membership_id),
            title: Some(item.title),
            playlist_id: Some(playlist_id.to_string()),
            ..Self::new(item.video_id)
        }
    }

    /// Title for display, falling back to the video id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    pub fn is_pending(&self) -> bool {
        self.status == VideoStatus::Pending
    }

    /// Records a successful insert into `playlist_id`, shifting the current
    /// membership into the `previous_*` fields.
    pub fn mark_migrated(&mut self, playlist_id: &str, membership_id: String) {
        self.previous_id_with_playlist = self.id_with_playlist.take();
        self.id_with_playlist = Some(membership_id);
        self.previous_playlist_id = self.playlist_id.take();
        self.playlist_id = Some(playlist_id.to_string());
        self.status = VideoStatus::Success;
    }

    /// Records the removal of the previous membership.
    pub fn mark_retired(&mut self) {
        self.previous_playlist_id = None;
        self.previous_id_with_playlist = None;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = VideoStatus::Error;
        self.error_message = message.into();
    }
}

/// A destination playlist. `id` stays `None` until it is created remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Playlist {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub videos: Vec<Video>,
}

impl Playlist {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            videos: Vec::new(),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.videos.iter().any(Video::is_pending)
    }
}

/// Severity of a persisted progress log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    fn tag(&self) -> &'static str {
        match self {
            Self::Info => "[INFO]",
            Self::Error => "[ERROR]",
        }
    }
}

/// The checkpoint document for one splitting campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunState {
    /// Epoch seconds of the most recent save.
    pub last_run_time: f64,
    pub quota_exceeded: bool,
    pub playlists: Vec<Playlist>,
    pub progress_logs: Vec<String>,
}

impl RunState {
    pub fn videos(&self) -> impl Iterator<Item = &Video> {
        self.playlists.iter().flat_map(|p| p.videos.iter())
    }

    pub fn has_playlists(&self) -> bool {
        !self.playlists.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.videos().any(Video::is_pending)
    }

    pub fn contains_video(&self, video_id: &str) -> bool {
        self.videos().any(|v| v.id == video_id)
    }

    pub fn log_info(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{}", message);
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_error(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        error!("{}", message);
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.progress_logs
            .push(format!("{:<7} {} | {}", level.tag(), timestamp, message));
    }
}
