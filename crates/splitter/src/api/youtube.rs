//! YouTube Data API v3 implementation of [`PlaylistApi`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{ApiError, PlaylistApi, RemoteItem, TokenProvider};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const PAGE_SIZE: &str = "50";

/// Visibility of newly created playlists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown privacy status: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemResource {
    id: String,
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    #[serde(default)]
    title: String,
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// Turns a non-success response body into [`ApiError::Service`].
pub(crate) fn parse_error_body(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ApiError::Service {
            status,
            message: envelope.error.message,
            reason: envelope.error.errors.into_iter().find_map(|e| e.reason),
        },
        Err(_) => ApiError::service(status, body.trim()),
    }
}

/// Client for the playlist endpoints of the YouTube Data API.
pub struct YouTubeClient {
    client: Client,
    tokens: TokenProvider,
    base_url: Url,
}

impl YouTubeClient {
    pub fn new(client: Client, tokens: TokenProvider) -> Self {
        Self {
            client,
            tokens,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("static base url is valid"),
        }
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Decode(format!("invalid endpoint {path}: {e}")))?;
        let token = self.tokens.bearer().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "YouTube API error");
        Err(parse_error_body(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let body = Self::send(builder).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Follows `nextPageToken` until the listing is exhausted.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut builder = self
                .request(Method::GET, path)
                .await?
                .query(query)
                .query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token.as_str())]);
            }

            let page: Page<T> = Self::send_json(builder).await?;
            items.extend(page.items);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl PlaylistApi for YouTubeClient {
    async fn find_playlist_by_name(&self, name: &str) -> Result<Option<String>, ApiError> {
        let playlists: Vec<PlaylistResource> = self
            .list_all("playlists", &[("part", "snippet"), ("mine", "true")])
            .await?;
        Ok(playlists
            .into_iter()
            .find(|p| p.snippet.title == name)
            .map(|p| p.id))
    }

    async fn list_items(&self, playlist_id: &str) -> Result<Vec<RemoteItem>, ApiError> {
        let items: Vec<PlaylistItemResource> = self
            .list_all(
                "playlistItems",
                &[("part", "id,snippet"), ("playlistId", playlist_id)],
            )
            .await?;
        Ok(items
            .into_iter()
            .map(|item| RemoteItem {
                video_id: item.snippet.resource_id.video_id,
                membership_id: item.id,
                title: item.snippet.title,
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<String, ApiError> {
        let body = json!({
            "snippet": {
                "title": title,
                "description": description,
                "defaultLanguage": "en",
            },
            "status": { "privacyStatus": privacy.as_str() },
        });
        let builder = self
            .request(Method::POST, "playlists")
            .await?
            .query(&[("part", "snippet,status")])
            .json(&body);
        let created: Created = Self::send_json(builder).await?;
        Ok(created.id)
    }

    async fn add_item(&self, playlist_id: &str, video_id: &str) -> Result<String, ApiError> {
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "youtube#video", "videoId": video_id },
            },
        });
        let builder = self
            .request(Method::POST, "playlistItems")
            .await?
            .query(&[("part", "snippet")])
            .json(&body);
        let created: Created = Self::send_json(builder).await?;
        Ok(created.id)
    }

    async fn remove_item(&self, membership_id: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::DELETE, "playlistItems")
            .await?
            .query(&[("id", membership_id)]);
        Self::send(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_quota_error() {
        let body = r#"{
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your <a href=\"/youtube/v3/getting-started#quota\">quota</a>.",
                "errors": [{"message": "...", "domain": "youtube.quota", "reason": "quotaExceeded"}]
            }
        }"#;

        match parse_error_body(403, body) {
            ApiError::Service {
                status,
                message,
                reason,
            } => {
                assert_eq!(status, 403);
                assert!(message.starts_with("The request cannot be completed"));
                assert_eq!(reason.as_deref(), Some("quotaExceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unstructured_body_becomes_message() {
        let err = parse_error_body(502, "  Bad Gateway\n");
        assert_eq!(err.message(), "Bad Gateway");
    }

    #[test]
    fn decodes_playlist_item_page() {
        let body = r#"{
            "nextPageToken": "CAUQAA",
            "items": [{
                "id": "UExtZW1iZXI",
                "snippet": {"title": "Intro", "resourceId": {"kind": "youtube#video", "videoId": "dQw4w9WgXcQ"}}
            }]
        }"#;
        let page: Page<PlaylistItemResource> = serde_json::from_str(body).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        assert_eq!(page.items[0].snippet.resource_id.video_id, "dQw4w9WgXcQ");
        assert_eq!(page.items[0].id, "UExtZW1iZXI");
    }

    #[test]
    fn empty_page_has_no_items() {
        let page: Page<PlaylistResource> = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn privacy_status_parses_case_insensitively() {
        assert_eq!("Unlisted".parse::<PrivacyStatus>(), Ok(PrivacyStatus::Unlisted));
        assert!("secret".parse::<PrivacyStatus>().is_err());
    }
}
