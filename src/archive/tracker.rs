//! Periodic usage reporting for archive indexes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

use crate::migrate::gate::ComplianceGate;

/// Reports archive-index usage so the gated feature shows up as in use.
///
/// Hosts schedule `run` at a fixed interval; the tracker itself holds no
/// timer. The count provider is a host callback returning how many archive
/// indexes currently exist.
pub struct ArchiveUsageTracker {
    gate: Arc<dyn ComplianceGate>,
    archive_count: Box<dyn Fn() -> usize + Send + Sync>,
    runs: AtomicU64,
}

impl ArchiveUsageTracker {
    /// Create a tracker over a gate and an archive-index count provider.
    pub fn new(
        gate: Arc<dyn ComplianceGate>,
        archive_count: impl Fn() -> usize + Send + Sync + 'static,
    ) -> Self {
        ArchiveUsageTracker {
            gate,
            archive_count: Box::new(archive_count),
            runs: AtomicU64::new(0),
        }
    }

    /// Take one usage sample.
    pub fn run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);

        let count = (self.archive_count)();
        if count == 0 {
            return;
        }

        if self.gate.allowed() {
            info!(count, feature = self.gate.feature(), "archive indexes in use");
        } else {
            warn!(
                count,
                feature = self.gate.feature(),
                "archive indexes present but the current license does not permit them"
            );
        }
    }

    /// Number of samples taken so far.
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ArchiveUsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveUsageTracker")
            .field("gate", &self.gate)
            .field("runs", &self.runs)
            .finish()
    }
}
