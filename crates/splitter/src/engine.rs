//! The reconciliation loop that drives a split from first run to completion.
//!
//! Every iteration:
//! 1. waits out a flagged quota window,
//! 2. resolves the source playlist id (once per engine),
//! 3. creates missing playlists and migrates pending videos,
//! 4. folds videos that appeared in the source since the split into the
//!    existing playlists,
//! 5. optionally removes migrated videos from the source,
//! 6. performs the initial split when no playlists exist yet,
//! 7. stops once nothing is pending.
//!
//! Every remote mutation is followed by a checkpoint save before the next
//! one is attempted.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::api::PlaylistApi;
use crate::checkpoint::CheckpointStore;
use crate::clock::Clock;
use crate::config::SplitConfig;
use crate::error::{Result, SplitterError};
use crate::model::{RunState, Video};
use crate::partition;
use crate::quota::QuotaGuard;

/// How a [`Reconciler::run`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Playlists exist and no video is pending.
    Completed,
    /// Quota ran out and the config asked to stop rather than wait.
    QuotaPaused,
    /// The source playlist is empty.
    NothingToSplit,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::QuotaPaused => f.write_str("paused on quota"),
            Self::NothingToSplit => f.write_str("nothing to split"),
        }
    }
}

pub struct Reconciler<A> {
    api: A,
    store: CheckpointStore,
    clock: Arc<dyn Clock>,
    guard: QuotaGuard,
    config: SplitConfig,
    state: RunState,
    source_id: Option<String>,
    rng: StdRng,
}

impl<A: PlaylistApi> Reconciler<A> {
    /// Validates `config` and loads (or creates) the checkpoint.
    pub fn new(api: A, store: CheckpointStore, config: SplitConfig) -> Result<Self> {
        config.validate()?;
        let state = store.load()?;
        Ok(Self {
            api,
            clock: Arc::clone(store.clock()),
            store,
            guard: QuotaGuard::default(),
            config,
            state,
            source_id: None,
            rng: StdRng::seed_from_u64(rand::random()),
        })
    }

    /// Fixes the shuffle used for the initial split.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Notes an external interrupt. The checkpoint is left as last saved.
    pub fn record_interrupt(&mut self) {
        self.state.log_info("User interrupted. Exiting.");
    }

    /// Runs iterations until the split completes or a fatal error occurs.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        loop {
            match self.step().await {
                Ok(Some(outcome)) => {
                    info!(%outcome, "Run finished");
                    return Ok(outcome);
                }
                Ok(None) => {}
                // the guard has already flagged and saved the state
                Err(SplitterError::QuotaExceeded(_)) => {
                    if self.config.exit_on_quota {
                        self.state
                            .log_info("Quota exceeded. Progress saved; run again after the reset.");
                        return Ok(RunOutcome::QuotaPaused);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn step(&mut self) -> Result<Option<RunOutcome>> {
        self.guard
            .wait_for_reset(&mut self.state, &self.store, self.clock.as_ref())
            .await?;
        let source_id = self.source_playlist_id().await?;

        if self.state.has_pending() {
            self.process_pending().await?;
        }

        if self.state.has_playlists() {
            self.add_new_videos(&source_id).await?;
        }

        if self.config.delete_original {
            self.retire_originals(&source_id).await?;
        }

        if !self.state.has_playlists() {
            self.split_source(&source_id).await?;
            if !self.state.has_playlists() {
                self.state.log_info(format!(
                    "Playlist '{}' has no videos to split.",
                    self.config.source_playlist
                ));
                self.save()?;
                return Ok(Some(RunOutcome::NothingToSplit));
            }
        }

        if !self.state.has_pending() {
            self.state
                .log_info("All current videos processed. Congratulations!");
            self.save()?;
            return Ok(Some(RunOutcome::Completed));
        }
        Ok(None)
    }

    fn save(&mut self) -> Result<()> {
        self.store.save(&mut self.state)
    }

    async fn source_playlist_id(&mut self) -> Result<String> {
        if let Some(id) = &self.source_id {
            return Ok(id.clone());
        }

        let name = self.config.source_playlist.clone();
        self.state.log_info(format!("Searching for: '{name}'"));
        let result = self.api.find_playlist_by_name(&name).await;
        let id = self
            .guard
            .inspect(result, &mut self.state, &self.store)
            .map_err(|e| e.escalate("find playlist"))?
            .ok_or_else(|| SplitterError::PlaylistNotFound(name))?;

        self.state.log_info(format!("Found ID: {id}"));
        self.source_id = Some(id.clone());
        Ok(id)
    }

    /// Creates playlists that have no remote id yet and adds every pending
    /// video to its playlist. Item-level failures are recorded on the video;
    /// a quota failure abandons the rest of the pass.
    async fn process_pending(&mut self) -> Result<()> {
        for p in 0..self.state.playlists.len() {
            let title = self.state.playlists[p].title.clone();
            let playlist_id = match self.state.playlists[p].id.clone() {
                Some(id) => id,
                None => {
                    let description = self.state.playlists[p].description.clone();
                    let result = self
                        .api
                        .create_playlist(&title, &description, self.config.privacy_status)
                        .await;
                    let id = self
                        .guard
                        .inspect(result, &mut self.state, &self.store)
                        .map_err(|e| e.escalate("create playlist"))?;
                    self.state
                        .log_info(format!("Created playlist {title} with ID: {id}"));
                    self.state.playlists[p].id = Some(id.clone());
                    self.save()?;
                    id
                }
            };

            for v in 0..self.state.playlists[p].videos.len() {
                if !self.state.playlists[p].videos[v].is_pending() {
                    continue;
                }
                let video_id = self.state.playlists[p].videos[v].id.clone();
                let result = self.api.add_item(&playlist_id, &video_id).await;

                match self.guard.inspect(result, &mut self.state, &self.store) {
                    Ok(membership_id) => {
                        let video = &mut self.state.playlists[p].videos[v];
                        video.mark_migrated(&playlist_id, membership_id);
                        let message = format!(
                            "Video {}: {} added to playlist {}: {}",
                            video.display_title(),
                            video.id,
                            title,
                            playlist_id
                        );
                        self.state.log_info(message);
                    }
                    Err(SplitterError::ItemOperationFailed(message)) => {
                        self.state.playlists[p].videos[v].mark_failed(message.as_str());
                        self.state.log_error(message);
                    }
                    Err(e) => return Err(e),
                }
                self.save()?;
            }
        }
        Ok(())
    }

    /// Lists the source playlist, keeping the first entry of each video.
    async fn fetch_source(&mut self, source_id: &str) -> Result<Vec<Video>> {
        let result = self.api.list_items(source_id).await;
        let items = self
            .guard
            .inspect(result, &mut self.state, &self.store)
            .map_err(|e| e.escalate("list playlist items"))?;

        let mut seen = HashSet::new();
        let videos: Vec<Video> = items
            .into_iter()
            .filter(|item| seen.insert(item.video_id.clone()))
            .map(|item| Video::from_remote(item, source_id))
            .collect();

        self.state.log_info(format!(
            "Found {} videos in playlist {}",
            videos.len(),
            source_id
        ));
        Ok(videos)
    }

    /// Places source videos not tracked anywhere yet into the existing
    /// playlists. Presence is decided by video id only.
    async fn add_new_videos(&mut self, source_id: &str) -> Result<()> {
        self.state.log_info("Checking for new videos...");
        let known: HashSet<String> = self.state.videos().map(|v| v.id.clone()).collect();
        let new_videos: Vec<Video> = self
            .fetch_source(source_id)
            .await?
            .into_iter()
            .filter(|v| !known.contains(&v.id))
            .collect();
        if new_videos.is_empty() {
            return Ok(());
        }
        self.state
            .log_info(format!("Found {} new videos.", new_videos.len()));

        let count = new_videos.len();
        let titles: Vec<String> = new_videos
            .iter()
            .map(|v| v.display_title().to_string())
            .collect();
        let placements = partition::rebalance(&mut self.state.playlists, new_videos);
        for (title, index) in titles.iter().zip(placements) {
            let playlist = self.state.playlists[index].title.clone();
            self.state
                .log_info(format!("Added video {title} to playlist {playlist}"));
        }
        self.state
            .log_info(format!("Added {count} new videos to playlists."));
        self.save()
    }

    /// Removes the source membership of every settled video migrated out of
    /// the source playlist.
    async fn retire_originals(&mut self, source_id: &str) -> Result<()> {
        let candidates: Vec<(usize, usize)> = self
            .state
            .playlists
            .iter()
            .enumerate()
            .flat_map(|(p, playlist)| {
                playlist
                    .videos
                    .iter()
                    .enumerate()
                    .filter(move |(_, v)| {
                        v.status.is_settled() && v.previous_playlist_id.as_deref() == Some(source_id)
                    })
                    .map(move |(v, _)| (p, v))
            })
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let source_name = self.config.source_playlist.clone();
        let mut deleted = 0usize;
        for (p, v) in candidates {
            let Some(membership_id) = self.state.playlists[p].videos[v]
                .previous_id_with_playlist
                .clone()
            else {
                let video = &mut self.state.playlists[p].videos[v];
                warn!(video_id = %video.id, "No source membership recorded; nothing to delete");
                video.mark_retired();
                self.save()?;
                continue;
            };

            let result = self.api.remove_item(&membership_id).await;
            match self.guard.inspect(result, &mut self.state, &self.store) {
                Ok(()) => {
                    let video = &mut self.state.playlists[p].videos[v];
                    video.mark_retired();
                    let message = format!(
                        "Deleted video {} from playlist {}: {}",
                        video.display_title(),
                        source_name,
                        source_id
                    );
                    self.state.log_info(message);
                    deleted += 1;
                }
                Err(SplitterError::ItemOperationFailed(message)) => {
                    self.state.playlists[p].videos[v].mark_failed(message.as_str());
                    self.state.log_error(message);
                }
                Err(e) => return Err(e),
            }
            self.save()?;
        }

        self.state.log_info(format!(
            "Deleted {deleted} videos from playlist {source_name}"
        ));
        self.save()
    }

    async fn split_source(&mut self, source_id: &str) -> Result<()> {
        let videos = self.fetch_source(source_id).await?;
        let playlists = partition::split(
            videos,
            &self.config.new_playlist_name,
            self.config.target_size,
            &mut self.rng,
        );
        if playlists.is_empty() {
            return Ok(());
        }

        for playlist in &playlists {
            self.state.log_info(format!(
                "Added {} videos to playlist {}",
                playlist.videos.len(),
                playlist.title
            ));
        }
        self.state.playlists.extend(playlists);
        self.state.log_info("All videos added to new playlists.");
        self.save()
    }
}
