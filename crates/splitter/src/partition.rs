//! Splitting a flat video list into balanced playlists, and placing videos
//! that appear later into the playlists that already exist.

use rand::seq::SliceRandom;

use crate::model::{Playlist, Video, VideoStatus};

/// Number of groups to cut `len` items into for a given target size.
///
/// A trailing remainder larger than half the list earns its own group.
pub fn group_count(len: usize, target_size: usize) -> usize {
    let target_size = target_size.max(1);
    let (mut groups, remainder) = (len / target_size, len % target_size);
    if remainder > len / 2 {
        groups += 1;
    }
    groups.max(1)
}

/// Cuts `items` into [`group_count`] contiguous groups whose sizes differ by
/// at most one. The first `len % groups` groups carry the extra item.
pub fn split_evenly<T>(items: Vec<T>, target_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let groups = group_count(items.len(), target_size);
    let (base, extra) = (items.len() / groups, items.len() % groups);

    let mut iter = items.into_iter();
    (0..groups)
        .map(|i| {
            let size = if i < extra { base + 1 } else { base };
            iter.by_ref().take(size).collect()
        })
        .collect()
}

/// Shuffles `videos` and splits them into new, not yet created playlists
/// named `{base_name}-1`, `{base_name}-2`, ...
pub fn split<R>(mut videos: Vec<Video>, base_name: &str, target_size: usize, rng: &mut R) -> Vec<Playlist>
where
    R: rand::Rng + ?Sized,
{
    videos.shuffle(rng);
    split_evenly(videos, target_size)
        .into_iter()
        .enumerate()
        .map(|(i, videos)| Playlist {
            videos,
            ..Playlist::new(format!("{}-{}", base_name, i + 1))
        })
        .collect()
}

/// Appends each new video to the playlist that keeps sizes level.
///
/// When every playlist has the maximum length the video goes to the first
/// one, otherwise to the first playlist shorter than the maximum. Videos
/// already placed are never moved. Returns the index of the playlist each
/// video was placed in.
pub fn rebalance(playlists: &mut [Playlist], new_videos: Vec<Video>) -> Vec<usize> {
    if playlists.is_empty() {
        return Vec::new();
    }

    let mut placements = Vec::with_capacity(new_videos.len());
    for mut video in new_videos {
        let max_len = playlists.iter().map(|p| p.videos.len()).max().unwrap_or(0);
        let target = playlists
            .iter()
            .position(|p| p.videos.len() < max_len)
            .unwrap_or(0);

        video.status = VideoStatus::Pending;
        playlists[target].videos.push(video);
        placements.push(target);
    }
    placements
}
