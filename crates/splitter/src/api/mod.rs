//! Remote playlist API abstraction.
//!
//! The engine only talks to [`PlaylistApi`]; [`YouTubeClient`] is the
//! production implementation over the YouTube Data API v3.

mod auth;
mod youtube;

use async_trait::async_trait;
use thiserror::Error;

pub use auth::{Credentials, TokenProvider};
pub use youtube::{PrivacyStatus, YouTubeClient};

/// Errors returned by a remote playlist call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Structured error returned by the provider.
    #[error("{message} (status {status})")]
    Service {
        status: u16,
        message: String,
        reason: Option<String>,
    },

    /// The OAuth token could not be obtained or refreshed.
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
            reason: None,
        }
    }

    /// Provider message for structured errors, the display text otherwise.
    pub fn message(&self) -> String {
        match self {
            Self::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// One entry of a playlist listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub video_id: String,
    /// Identity of the playlist item (the video's membership in the playlist).
    pub membership_id: String,
    pub title: String,
}

/// Operations the splitter needs from the remote service.
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    /// Id of the caller's playlist titled `name`, if any.
    async fn find_playlist_by_name(&self, name: &str) -> Result<Option<String>, ApiError>;

    /// Every item of a playlist, across all pages.
    async fn list_items(&self, playlist_id: &str) -> Result<Vec<RemoteItem>, ApiError>;

    /// Creates a playlist with the given visibility and returns its id.
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<String, ApiError>;

    /// Adds a video to a playlist and returns the new membership id.
    async fn add_item(&self, playlist_id: &str, video_id: &str) -> Result<String, ApiError>;

    /// Removes a playlist membership.
    async fn remove_item(&self, membership_id: &str) -> Result<(), ApiError>;
}
