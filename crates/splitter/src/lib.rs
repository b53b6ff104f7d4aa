//! Resumable splitting of one YouTube playlist into several smaller ones.
//!
//! The split is driven by a [`Reconciler`] that checkpoints every step to a
//! JSON file, so the process can be stopped at any point and resumed later.
//! Exhausting the provider's daily quota pauses the whole run until the
//! quota window resets; failures on a single video are recorded on that
//! video and skipped.
//!
//! # Architecture
//!
//! - [`model`]: videos, playlists and the [`RunState`] checkpoint document
//! - [`CheckpointStore`]: load/save of the checkpoint file
//! - [`partition`]: initial split and placement of late videos
//! - [`QuotaGuard`]: error classification and the quota pause
//! - [`api`]: the [`PlaylistApi`] capability and its YouTube implementation
//! - [`Reconciler`]: the control loop
//! - [`diagnostics`]: read-only reports over a checkpoint

pub mod api;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod http;
pub mod model;
pub mod partition;
pub mod quota;

pub use api::{ApiError, PlaylistApi, RemoteItem};
pub use checkpoint::CheckpointStore;
pub use clock::{Clock, SystemClock};
pub use config::SplitConfig;
pub use engine::{Reconciler, RunOutcome};
pub use error::{Result, SplitterError};
pub use model::{Playlist, RunState, Video, VideoStatus};
pub use quota::{ErrorClass, QuotaGuard};
