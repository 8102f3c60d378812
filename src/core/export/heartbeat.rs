//! Heartbeat rate limiting
//!
//! The walker calls into the governor once per entity. Liveness is only
//! signalled to the execution host when the configured interval has passed
//! since the last signal.

use crate::adapters::scheduler::JobExecution;
use chrono::{DateTime, Duration, Utc};

const MAX_INTERVAL_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// Rate limiter for job heartbeats
pub struct HeartbeatGovernor<'a> {
    execution: &'a dyn JobExecution,
    interval: Duration,
    last: DateTime<Utc>,
    beats: u64,
}

impl<'a> HeartbeatGovernor<'a> {
    /// Creates a governor whose clock starts now
    pub fn new(execution: &'a dyn JobExecution, interval_ms: u64) -> Self {
        Self {
            execution,
            interval: Duration::milliseconds(interval_ms.min(MAX_INTERVAL_MS) as i64),
            last: Utc::now(),
            beats: 0,
        }
    }

    /// Sends a heartbeat if `now - last >= interval`
    ///
    /// Returns `now` when a heartbeat was sent, `last` otherwise.
    pub async fn check_time_delta(&mut self, last: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        if now - last >= self.interval {
            self.execution.heartbeat().await;
            self.beats += 1;
            return now;
        }
        last
    }

    /// Checks the clock against the last heartbeat
    pub async fn tick(&mut self) {
        self.last = self.check_time_delta(self.last, Utc::now()).await;
    }

    /// Heartbeats sent so far
    pub fn beats(&self) -> u64 {
        self.beats
    }
}
