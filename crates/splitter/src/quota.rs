//! Daily quota handling: classifying failed calls and pausing until the
//! provider's quota window resets.

use std::time::Duration;

use tracing::{debug, warn};

use crate::api::ApiError;
use crate::checkpoint::CheckpointStore;
use crate::clock::{Clock, humanize_duration};
use crate::error::{Result, SplitterError};
use crate::model::RunState;

/// Message prefix the provider uses when the daily quota is spent.
pub const QUOTA_EXCEEDED_PHRASE: &str = "The request cannot be completed because you have exceeded";

const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];

/// How a failed remote call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Global: pause the whole pipeline until the quota resets.
    QuotaExceeded,
    /// Local to the call: record it on the item and move on.
    ItemOperationFailed,
    /// Neither; left to the caller.
    Unclassified,
}

/// Where the quota pause stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuotaStatus {
    Clear,
    WaitingForReset {
        /// Time until the window (plus buffer) has passed.
        remaining: Duration,
        /// Length of the next sleep, capped at `max_sleep`.
        sleep: Duration,
    },
    /// The window has passed; the flag can be cleared.
    ResetDue,
}

/// Classifies remote failures and runs the pause-until-reset loop.
#[derive(Debug, Clone)]
pub struct QuotaGuard {
    reset_window: Duration,
    max_sleep: Duration,
    buffer: Duration,
}

impl Default for QuotaGuard {
    fn default() -> Self {
        Self {
            reset_window: Duration::from_secs(24 * 60 * 60),
            max_sleep: Duration::from_secs(4 * 60 * 60),
            buffer: Duration::from_secs(60),
        }
    }
}

impl QuotaGuard {
    pub fn classify(&self, error: &ApiError) -> ErrorClass {
        match error {
            ApiError::Service {
                message, reason, ..
            } if message.contains(QUOTA_EXCEEDED_PHRASE)
                || reason.as_deref().is_some_and(|r| QUOTA_REASONS.contains(&r)) =>
            {
                ErrorClass::QuotaExceeded
            }
            ApiError::Service { status: 401, .. } => ErrorClass::Unclassified,
            ApiError::Service { .. } => ErrorClass::ItemOperationFailed,
            ApiError::Auth(_) | ApiError::Transport(_) | ApiError::Decode(_) => {
                ErrorClass::Unclassified
            }
        }
    }

    /// Passes a remote call's result through the guard.
    ///
    /// A quota failure is logged, flagged on `state` and persisted before it
    /// is returned as [`SplitterError::QuotaExceeded`]. Other structured
    /// errors become [`SplitterError::ItemOperationFailed`]. Token failures
    /// and 401s become [`SplitterError::Authentication`]; the rest pass
    /// through as [`SplitterError::Api`].
    pub fn inspect<T>(
        &self,
        result: std::result::Result<T, ApiError>,
        state: &mut RunState,
        store: &CheckpointStore,
    ) -> Result<T> {
        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        match self.classify(&error) {
            ErrorClass::QuotaExceeded => {
                let message = error.message();
                state.log_error(&message);
                state.quota_exceeded = true;
                store.save(state)?;
                Err(SplitterError::QuotaExceeded(message))
            }
            ErrorClass::ItemOperationFailed => {
                Err(SplitterError::ItemOperationFailed(error.message()))
            }
            ErrorClass::Unclassified => match error {
                ApiError::Auth(message) | ApiError::Service { status: 401, message, .. } => {
                    Err(SplitterError::Authentication(message))
                }
                other => Err(SplitterError::Api(other)),
            },
        }
    }

    /// Evaluates the pause at `now` for a flag raised by the save at `last_run_time`.
    pub fn status(&self, quota_exceeded: bool, last_run_time: f64, now: f64) -> QuotaStatus {
        if !quota_exceeded {
            return QuotaStatus::Clear;
        }
        let window = self.reset_window.as_secs_f64();
        let reset_at = last_run_time + window;
        if now >= reset_at {
            return QuotaStatus::ResetDue;
        }
        // a save stamped in the future never waits longer than one window
        let remaining = Duration::from_secs_f64((reset_at - now).min(window)) + self.buffer;
        QuotaStatus::WaitingForReset {
            remaining,
            sleep: remaining.min(self.max_sleep),
        }
    }

    /// Blocks until the quota flag on `state` can be cleared.
    ///
    /// Sleeps in slices of at most `max_sleep`, re-deriving the wait from the
    /// persisted `last_run_time` each time, so killing the process mid-wait
    /// loses nothing. Nothing is saved while waiting; saving would move
    /// `last_run_time` and with it the reset window.
    pub async fn wait_for_reset(
        &self,
        state: &mut RunState,
        store: &CheckpointStore,
        clock: &dyn Clock,
    ) -> Result<()> {
        state.log_info("Checking for quota violation...");
        if !state.quota_exceeded {
            state.log_info("Quota not exceeded.");
            return Ok(());
        }
        state.log_info("24 Hour Quota exceeded.");

        let now = clock.now();
        if state.last_run_time > now {
            warn!(
                last_run_time = state.last_run_time,
                now, "Checkpoint saved in the future; counting the quota window from now"
            );
            state.last_run_time = now;
        }

        loop {
            match self.status(state.quota_exceeded, state.last_run_time, clock.now()) {
                QuotaStatus::Clear => return Ok(()),
                QuotaStatus::WaitingForReset { remaining, sleep } => {
                    state.log_info(format!(
                        "{} until quota reset.",
                        humanize_duration(remaining)
                    ));
                    state.log_info(format!("Re-check status in {}", humanize_duration(sleep)));
                    debug!(?sleep, "Sleeping until quota re-check");
                    clock.sleep(sleep).await;
                }
                QuotaStatus::ResetDue => {
                    state.log_info("24 hours have passed. Resetting quota violation.");
                    state.quota_exceeded = false;
                    store.save(state)?;
                    return Ok(());
                }
            }
        }
    }
}
