use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-lifetime frame counters shared by ingress, slot and inference loop.
#[derive(Debug, Default)]
pub struct PipelineStats {
    published: AtomicU64,
    overwritten: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub published: u64,
    pub overwritten: u64,
    pub processed: u64,
    pub failed: u64,
}

impl PipelineStats {
    pub fn record_published(&self, overwrote: bool) {
        self.published.fetch_add(1, Ordering::Relaxed);
        if overwrote {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
