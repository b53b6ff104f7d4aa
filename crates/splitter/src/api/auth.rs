//! OAuth credentials for the YouTube Data API.
//!
//! The interactive consent flow is not handled here: the credential file must
//! already carry either an access token or a refresh token.

use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ApiError;
use crate::error::{Result, SplitterError};

const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the provider-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A pre-issued bearer token, used as is.
    AccessToken(String),
    /// An OAuth client plus refresh token, exchanged for access tokens.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_uri: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ClientSection {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialFile {
    access_token: Option<String>,
    #[serde(flatten)]
    top: ClientSection,
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

impl Credentials {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SplitterError::auth(format!("cannot read credential file {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Accepts `{"access_token": ..}`, an authorized-user document, or an
    /// OAuth client document (`installed`/`web`) carrying a `refresh_token`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CredentialFile = serde_json::from_str(raw)
            .map_err(|e| SplitterError::auth(format!("invalid credential file: {e}")))?;

        if let Some(token) = file.access_token.filter(|t| !t.is_empty()) {
            return Ok(Self::AccessToken(token));
        }

        let section = file.installed.or(file.web).unwrap_or_default();
        let top = file.top;
        match (
            section.client_id.or(top.client_id),
            section.client_secret.or(top.client_secret),
            section.refresh_token.or(top.refresh_token),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Ok(Self::RefreshToken {
                    client_id,
                    client_secret,
                    refresh_token,
                    token_uri: section
                        .token_uri
                        .or(top.token_uri)
                        .unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string()),
                })
            }
            (Some(_), Some(_), None) => Err(SplitterError::auth(
                "credential file has no refresh_token; authorize the client first",
            )),
            _ => Err(SplitterError::auth(
                "credential file needs an access_token or client_id, client_secret and refresh_token",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .is_none_or(|at| Instant::now() + EXPIRY_MARGIN < at)
    }
}

/// Hands out bearer tokens, refreshing them when they are about to expire.
pub struct TokenProvider {
    client: Client,
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(client: Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Obtains the first token, failing with an authentication error.
    pub async fn authenticate(&self) -> Result<()> {
        self.bearer()
            .await
            .map_err(|e| SplitterError::auth(e.to_string()))?;
        info!("Authenticated with the YouTube Data API");
        Ok(())
    }

    pub async fn bearer(&self) -> std::result::Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let token = match &self.credentials {
            Credentials::AccessToken(token) => CachedToken {
                access_token: token.clone(),
                expires_at: None,
            },
            Credentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
                token_uri,
            } => {
                debug!("Refreshing OAuth access token");
                self.refresh(token_uri, client_id, client_secret, refresh_token)
                    .await?
            }
        };
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn refresh(
        &self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> std::result::Result<CachedToken, ApiError> {
        let response = self
            .client
            .post(token_uri)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(token_error(status.as_u16(), body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::Auth(format!("malformed token response: {e}")))?;
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

/// Maps a rejected token request (revoked grant, bad client, ...) to
/// [`ApiError::Auth`].
fn token_error(status: u16, body: String) -> ApiError {
    let message = serde_json::from_str::<TokenErrorResponse>(&body)
        .map(|e| match e.error_description {
            Some(description) => format!("{}: {}", e.error, description),
            None => e.error,
        })
        .unwrap_or(body);
    ApiError::Auth(format!("token refresh rejected (status {status}): {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_access_token() {
        let creds = Credentials::from_json(r#"{"access_token": "ya29.abc"}"#).unwrap();
        assert_eq!(creds, Credentials::AccessToken("ya29.abc".into()));
    }

    #[test]
    fn reads_authorized_user_document() {
        let creds = Credentials::from_json(
            r#"{"type": "authorized_user", "client_id": "id", "client_secret": "secret", "refresh_token": "rt"}"#,
        )
        .unwrap();
        assert_eq!(
            creds,
            Credentials::RefreshToken {
                client_id: "id".into(),
                client_secret: "secret".into(),
                refresh_token: "rt".into(),
                token_uri: GOOGLE_TOKEN_URI.into(),
            }
        );
    }

    #[test]
    fn reads_installed_client_with_refresh_token() {
        let creds = Credentials::from_json(
            r#"{"installed": {"client_id": "id", "client_secret": "s", "token_uri": "https://example.test/token"}, "refresh_token": "rt"}"#,
        )
        .unwrap();
        match creds {
            Credentials::RefreshToken {
                refresh_token,
                token_uri,
                ..
            } => {
                assert_eq!(refresh_token, "rt");
                assert_eq!(token_uri, "https://example.test/token");
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
    }

    #[test]
    fn client_without_refresh_token_is_an_auth_error() {
        let err = Credentials::from_json(r#"{"installed": {"client_id": "id", "client_secret": "s"}}"#)
            .unwrap_err();
        assert!(matches!(err, SplitterError::Authentication(_)));
    }

    #[test]
    fn garbage_is_an_auth_error() {
        assert!(matches!(
            Credentials::from_json("not json"),
            Err(SplitterError::Authentication(_))
        ));
    }

    #[test]
    fn rejected_refresh_is_an_auth_error() {
        let err = token_error(
            400,
            r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#
                .to_string(),
        );
        match err {
            ApiError::Auth(message) => {
                assert!(message.contains("status 400"));
                assert!(message.ends_with("invalid_grant: Token has been expired or revoked."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn access_token_is_served_without_network() {
        let client = crate::http::build_client(Duration::from_secs(5), None).unwrap();
        let provider = TokenProvider::new(client, Credentials::AccessToken("tok".into()));
        provider.authenticate().await.unwrap();
        assert_eq!(provider.bearer().await.unwrap(), "tok");
    }
}
