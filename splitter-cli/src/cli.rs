use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use playlist_splitter::api::PrivacyStatus;

/// Split a YouTube playlist into smaller playlists of a target size.
///
/// Progress is checkpointed after every change, so the command can be
/// stopped and re-run at any time; it picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "split-playlist", version, about, long_about)]
#[command(after_help = "Example:\n  split-playlist --playlist \"WSC\" --target-size 90 --secret-file client_secret.json")]
#[command(group(ArgGroup::new("report").args(["view_logs", "view_stats", "view_video_errors"])))]
pub struct Args {
    /// TOML file providing defaults for any of the options below
    #[arg(long, env = "SPLIT_PLAYLIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// File to load and save progress
    #[arg(long, env = "SPLIT_PLAYLIST_CHECKPOINT_FILE")]
    pub checkpoint_file: Option<PathBuf>,

    /// OAuth credential file (access token, or client id/secret plus refresh token)
    #[arg(long, env = "SPLIT_PLAYLIST_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// Name of the playlist to split
    #[arg(long, env = "SPLIT_PLAYLIST_PLAYLIST")]
    pub playlist: Option<String>,

    /// Base name of the new playlists (defaults to the playlist name)
    #[arg(long, env = "SPLIT_PLAYLIST_NEW_PLAYLIST")]
    pub new_playlist: Option<String>,

    /// Target size of the split playlists
    #[arg(long, env = "SPLIT_PLAYLIST_TARGET_SIZE", value_parser = clap::value_parser!(u64).range(1..))]
    pub target_size: Option<u64>,

    /// Delete the original playlist's videos after splitting
    #[arg(long)]
    pub delete_original: bool,

    /// Privacy status of the new playlists (public, unlisted, private)
    #[arg(long, env = "SPLIT_PLAYLIST_PRIVACY")]
    pub privacy: Option<PrivacyStatus>,

    /// Exit when the daily quota runs out instead of waiting for the reset
    #[arg(long)]
    pub exit_on_quota: bool,

    /// HTTP request timeout in seconds (0 disables it)
    #[arg(long, env = "SPLIT_PLAYLIST_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Proxy URL for all API requests
    #[arg(long, env = "SPLIT_PLAYLIST_PROXY")]
    pub proxy: Option<String>,

    /// View progress logs
    #[arg(long)]
    pub view_logs: bool,

    /// View saved playlist stats
    #[arg(long)]
    pub view_stats: bool,

    /// View videos with errors
    #[arg(long)]
    pub view_video_errors: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, env = "SPLIT_PLAYLIST_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Read-only report selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Logs,
    Stats,
    VideoErrors,
}

impl Args {
    pub fn report(&self) -> Option<Report> {
        if self.view_logs {
            Some(Report::Logs)
        } else if self.view_stats {
            Some(Report::Stats)
        } else if self.view_video_errors {
            Some(Report::VideoErrors)
        } else {
            None
        }
    }
}
