//! Run configuration consumed by the [`Reconciler`](crate::Reconciler).

use serde::{Deserialize, Serialize};

use crate::api::PrivacyStatus;
use crate::error::{Result, SplitterError};

pub const DEFAULT_TARGET_SIZE: usize = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Title of the playlist to split.
    pub source_playlist: String,
    /// Base title of the new playlists (`{name}-1`, `{name}-2`, ...).
    pub new_playlist_name: String,
    pub target_size: usize,
    /// Remove migrated videos from the source playlist.
    pub delete_original: bool,
    pub privacy_status: PrivacyStatus,
    /// End the invocation on quota exhaustion instead of waiting it out.
    pub exit_on_quota: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            source_playlist: "WSC".to_string(),
            new_playlist_name: "WSC".to_string(),
            target_size: DEFAULT_TARGET_SIZE,
            delete_original: false,
            privacy_status: PrivacyStatus::default(),
            exit_on_quota: false,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source_playlist.trim().is_empty() {
            return Err(SplitterError::config("source playlist name must not be empty"));
        }
        if self.new_playlist_name.trim().is_empty() {
            return Err(SplitterError::config("new playlist name must not be empty"));
        }
        if self.target_size == 0 {
            return Err(SplitterError::config("target size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SplitConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_target_size() {
        let config = SplitConfig {
            target_size: 0,
            ..SplitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SplitterError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_blank_names() {
        let config = SplitConfig {
            source_playlist: "  ".into(),
            ..SplitConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
