//! Layered CLI configuration: built-in defaults, then an optional TOML file,
//! then command-line flags and environment variables.

use std::path::{Path, PathBuf};

use playlist_splitter::api::PrivacyStatus;
use playlist_splitter::config::DEFAULT_TARGET_SIZE;
use playlist_splitter::SplitConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::{CliError, Result};

pub const DEFAULT_CHECKPOINT_FILE: &str = "split_playlist_progress.json";
pub const DEFAULT_SECRET_FILE: &str = "client_secret.json";
pub const DEFAULT_PLAYLIST: &str = "WSC";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub checkpoint_file: PathBuf,
    pub secret_file: PathBuf,
    pub playlist: String,
    /// Falls back to `playlist` when unset.
    pub new_playlist: Option<String>,
    pub target_size: usize,
    pub delete_original: bool,
    pub privacy: PrivacyStatus,
    pub exit_on_quota: bool,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            checkpoint_file: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            secret_file: PathBuf::from(DEFAULT_SECRET_FILE),
            playlist: DEFAULT_PLAYLIST.to_string(),
            new_playlist: None,
            target_size: DEFAULT_TARGET_SIZE,
            delete_original: false,
            privacy: PrivacyStatus::default(),
            exit_on_quota: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            proxy: None,
        }
    }
}

impl AppConfig {
    /// Reads `path` when given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Overrides file values with whatever was given on the command line.
    pub fn merge_args(mut self, args: &Args) -> Self {
        if let Some(path) = &args.checkpoint_file {
            self.checkpoint_file = path.clone();
        }
        if let Some(path) = &args.secret_file {
            self.secret_file = path.clone();
        }
        if let Some(playlist) = &args.playlist {
            self.playlist = playlist.clone();
        }
        if let Some(name) = &args.new_playlist {
            self.new_playlist = Some(name.clone());
        }
        if let Some(size) = args.target_size {
            self.target_size = size as usize;
        }
        if let Some(privacy) = args.privacy {
            self.privacy = privacy;
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(proxy) = &args.proxy {
            self.proxy = Some(proxy.clone());
        }
        self.delete_original |= args.delete_original;
        self.exit_on_quota |= args.exit_on_quota;
        self
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            source_playlist: self.playlist.clone(),
            new_playlist_name: self
                .new_playlist
                .clone()
                .unwrap_or_else(|| self.playlist.clone()),
            target_size: self.target_size,
            delete_original: self.delete_original,
            privacy_status: self.privacy,
            exit_on_quota: self.exit_on_quota,
        }
    }
}
