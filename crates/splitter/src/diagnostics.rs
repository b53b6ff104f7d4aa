//! Read-only reports over a checkpoint file. Nothing here touches the
//! remote API or writes the checkpoint.

use std::io::Write;

use crate::checkpoint::CheckpointStore;
use crate::error::Result;
use crate::model::{RunState, VideoStatus};

fn with_state<W, F>(store: &CheckpointStore, out: &mut W, render: F) -> Result<()>
where
    W: Write,
    F: FnOnce(&RunState, &mut W) -> std::io::Result<()>,
{
    match store.read_existing()? {
        Some(state) => render(&state, out)?,
        None => writeln!(out, "File {} does not exist.", store.path().display())?,
    }
    Ok(())
}

/// Prints every persisted progress log line.
pub fn view_logs<W: Write>(store: &CheckpointStore, out: &mut W) -> Result<()> {
    with_state(store, out, |state, out| {
        for line in &state.progress_logs {
            writeln!(out, "{line}")?;
        }
        Ok(())
    })
}

/// Prints each playlist title with its video count.
pub fn view_stats<W: Write>(store: &CheckpointStore, out: &mut W) -> Result<()> {
    with_state(store, out, |state, out| {
        for playlist in &state.playlists {
            writeln!(out, "{:<20} {}", playlist.title, playlist.videos.len())?;
        }
        Ok(())
    })
}

/// Prints `playlist | video | error` for every failed video.
pub fn view_errors<W: Write>(store: &CheckpointStore, out: &mut W) -> Result<()> {
    with_state(store, out, |state, out| {
        for playlist in &state.playlists {
            for video in playlist
                .videos
                .iter()
                .filter(|v| v.status == VideoStatus::Error)
            {
                writeln!(
                    out,
                    "{} | {} | {}",
                    playlist.title,
                    video.display_title(),
                    video.error_message
                )?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Playlist, Video};
    use std::fs;

    fn store_with_state() -> (tempfile::TempDir, CheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("progress.json"));

        let mut broken = Video::new("v2");
        broken.title = Some("Broken".into());
        broken.mark_failed("Video not found.");
        let mut first = Playlist::new("WSC-1");
        first.videos = vec![Video::new("v1"), broken];
        let mut second = Playlist::new("WSC-2");
        second.videos = vec![Video::new("v3")];

        let mut state = RunState {
            playlists: vec![first, second],
            progress_logs: vec!["[INFO]  2024-01-01 00:00:00 | one".into(), "[ERROR] 2024-01-01 00:00:01 | two".into()],
            ..RunState::default()
        };
        store.save(&mut state).unwrap();
        (dir, store)
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn logs_are_printed_verbatim() {
        let (_dir, store) = store_with_state();
        let output = render(|out| view_logs(&store, out));
        assert_eq!(
            output,
            "[INFO]  2024-01-01 00:00:00 | one\n[ERROR] 2024-01-01 00:00:01 | two\n"
        );
    }

    #[test]
    fn stats_pad_titles() {
        let (_dir, store) = store_with_state();
        let output = render(|out| view_stats(&store, out));
        assert_eq!(output, format!("{:<20} 2\n{:<20} 1\n", "WSC-1", "WSC-2"));
    }

    #[test]
    fn errors_list_failed_videos_only() {
        let (_dir, store) = store_with_state();
        let output = render(|out| view_errors(&store, out));
        assert_eq!(output, "WSC-1 | Broken | Video not found.\n");
    }

    #[test]
    fn views_do_not_modify_the_checkpoint() {
        let (_dir, store) = store_with_state();
        let before = fs::read(store.path()).unwrap();
        render(|out| view_logs(&store, out));
        render(|out| view_stats(&store, out));
        render(|out| view_errors(&store, out));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn missing_file_is_reported_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let store = CheckpointStore::new(&path);

        let output = render(|out| view_errors(&store, out));

        assert_eq!(output, format!("File {} does not exist.\n", path.display()));
        assert!(!path.exists());
    }
}
