//! Time source shared by the checkpoint store and the quota guard.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time in epoch seconds.
    fn now(&self) -> f64;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by chrono and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Renders a duration as `"H hours, M minutes, S seconds"`.
pub fn humanize_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64().round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours} hours, {minutes} minutes, {seconds} seconds")
}
