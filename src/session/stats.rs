use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for a relay session, updated across tasks.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub wake_detections: AtomicU64,
    pub commands_published: AtomicU64,
    pub publish_failures: AtomicU64,
    pub responses_played: AtomicU64,
}

/// Point-in-time copy of the counters, for logging and inspection.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub wake_detections: u64,
    pub commands_published: u64,
    pub publish_failures: u64,
    pub responses_played: u64,
}

impl SessionStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            wake_detections: self.wake_detections.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            responses_played: self.responses_played.load(Ordering::Relaxed),
        }
    }
}
