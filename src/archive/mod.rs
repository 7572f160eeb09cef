//! Archive index policy wrappers around the migration core.
//!
//! An archive index is one written by a format version too old for current
//! readers. These helpers sit at the lifecycle seams of a host system: a
//! compliance check before restoring an archive index, a listener firing
//! migration once restored files are on disk, and a periodic usage tracker.
//! Scheduling is the host's concern.

pub mod tracker;

use std::sync::Arc;

use crate::commit::CURRENT_FORMAT_MAJOR;
use crate::error::{DoruError, Result};
use crate::migrate::gate::ComplianceGate;
use crate::migrate::hold::IndexStore;
use crate::migrate::orchestrator::IndexMigrator;

pub use tracker::ArchiveUsageTracker;

/// Whether a commit file-level major predates the current format and thus
/// needs migration before current readers can open the index.
pub fn is_archive_version(major: u32) -> bool {
    major < CURRENT_FORMAT_MAJOR
}

/// Compliance check run before a restore of an index begins.
///
/// Restoring an archive index is refused outright when the gate denies it,
/// so no data is copied for an index that could not be opened anyway.
pub fn pre_restore_check(gate: &dyn ComplianceGate, major: u32) -> Result<()> {
    if is_archive_version(major) && !gate.allowed() {
        return Err(DoruError::compliance(gate.feature()));
    }
    Ok(())
}

/// Lifecycle hook invoked when an index's files have been restored to
/// storage.
pub trait RestoreListener: Send + Sync {
    /// Called after all files of the index are present in the store.
    fn after_files_restored(&self, store: &IndexStore) -> Result<()>;
}

/// Restore listener that migrates archive commits to the current format.
///
/// This is the trigger event of the migration core: registered only for
/// archive indexes, it fires once the restored files are on disk and before
/// the index is opened for reads.
pub struct ArchiveRestoreListener {
    migrator: Arc<IndexMigrator>,
}

impl ArchiveRestoreListener {
    /// Create a listener driving the given migrator.
    pub fn new(migrator: Arc<IndexMigrator>) -> Self {
        ArchiveRestoreListener { migrator }
    }
}

impl RestoreListener for ArchiveRestoreListener {
    fn after_files_restored(&self, store: &IndexStore) -> Result<()> {
        self.migrator.migrate(store)
    }
}
