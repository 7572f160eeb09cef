//! Migration Orchestrator: sequence read, migrate, publish, verify, prune.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::commit::format::{is_current_commit, latest_commit_file};
use crate::commit::{CommitDescriptor, commit_file_name};
use crate::error::{DoruError, Result};
use crate::legacy;
use crate::legacy::codec::{CodecRegistry, default_registry};
use crate::legacy::format::LegacyCommitDescriptor;
use crate::migrate::gate::ComplianceGate;
use crate::migrate::hold::IndexStore;
use crate::migrate::migrator::migrate_descriptor;
use crate::migrate::{MigrationConfig, VerifyMode};
use crate::storage::Storage;

/// States a migration passes through, in order. `Failed` is terminal and
/// reachable from any non-terminal state; no state regresses and no step
/// runs twice per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    Reading,
    Migrating,
    Publishing,
    Verifying,
    Pruning,
    Done,
    Failed,
}

/// Drives the migration of one storage location's commit metadata.
///
/// One migration per storage location at a time is the only supported
/// concurrency mode; migrations of distinct locations are independent. There
/// is no cancellation and no internal retry: every failure propagates once
/// and the caller decides whether to start over.
#[derive(Debug)]
pub struct IndexMigrator {
    config: MigrationConfig,
    registry: Arc<CodecRegistry>,
    gate: Arc<dyn ComplianceGate>,
}

impl IndexMigrator {
    /// Create a migrator with an explicit codec registry.
    pub fn new(
        config: MigrationConfig,
        registry: Arc<CodecRegistry>,
        gate: Arc<dyn ComplianceGate>,
    ) -> Self {
        IndexMigrator {
            config,
            registry,
            gate,
        }
    }

    /// Create a migrator using the bundled compatibility codecs.
    pub fn with_default_registry(config: MigrationConfig, gate: Arc<dyn ComplianceGate>) -> Self {
        Self::new(config, default_registry(), gate)
    }

    /// Migrate the store's commit metadata to the current format.
    ///
    /// The compliance gate is consulted before any storage access. A hold on
    /// the store is kept for the whole run and released on every exit path.
    /// If the live commit is already current-format the call is a no-op.
    pub fn migrate(&self, store: &IndexStore) -> Result<()> {
        if !self.gate.allowed() {
            return Err(DoruError::compliance(self.gate.feature()));
        }

        let hold = store.hold()?;

        let mut state = MigrationState::Idle;
        let result = self.run(hold.storage(), &mut state);

        if let Err(e) = &result {
            debug!(state = ?state, error = %e, "migration failed");
            self.advance(&mut state, MigrationState::Failed);
        }

        result
    }

    fn run(&self, storage: &dyn Storage, state: &mut MigrationState) -> Result<()> {
        self.advance(state, MigrationState::Reading);

        if let Some((name, _)) = latest_commit_file(storage)? {
            if is_current_commit(storage, &name)? {
                debug!(commit = %name, "commit is already current-format, nothing to migrate");
                self.advance(state, MigrationState::Done);
                return Ok(());
            }
        }

        let legacy_commit = legacy::read_latest_commit(storage, self.config.max_legacy_major)?;

        self.advance(state, MigrationState::Migrating);
        let new_commit = migrate_descriptor(&legacy_commit, &self.registry)?;

        self.advance(state, MigrationState::Publishing);
        let published = new_commit.commit(storage)?;
        debug!(commit = %published, segments = new_commit.segments.len(), "published migrated commit");

        self.advance(state, MigrationState::Verifying);
        self.verify(storage)?;

        self.advance(state, MigrationState::Pruning);
        self.prune(storage, &legacy_commit, &new_commit);

        self.advance(state, MigrationState::Done);
        Ok(())
    }

    fn advance(&self, state: &mut MigrationState, next: MigrationState) {
        let from = *state;
        debug!(?from, ?next, "migration state transition");
        *state = next;
    }

    /// Re-open the store via the standard current-format read path.
    ///
    /// A failure here indicates a defect in the migration logic itself, not
    /// bad input, and must not be silently suppressed.
    fn verify(&self, storage: &dyn Storage) -> Result<()> {
        match CommitDescriptor::read_latest_commit(storage) {
            Ok(_) => Ok(()),
            Err(e) => match self.config.verify_mode {
                VerifyMode::Fatal => Err(DoruError::index(format!(
                    "Post-migration verification failed: {e}"
                ))),
                VerifyMode::Warn => {
                    warn!(error = %e, "post-migration verification failed");
                    Ok(())
                }
            },
        }
    }

    /// Delete files referenced only by the replaced legacy commit.
    ///
    /// Conservative set comparison: a file is deleted only if the new commit
    /// does not reference it. Deletion failures are logged and left for
    /// later garbage collection; they never fail the migration.
    fn prune(
        &self,
        storage: &dyn Storage,
        legacy_commit: &LegacyCommitDescriptor,
        new_commit: &CommitDescriptor,
    ) {
        let keep = new_commit.referenced_files();

        let mut stale: Vec<String> = legacy_commit
            .referenced_files()
            .into_iter()
            .filter(|f| !keep.contains(f))
            .collect();
        stale.push(commit_file_name(legacy_commit.generation));

        // Any other published commit below the new generation is stale too.
        if let Ok(files) = storage.list_files() {
            for name in files {
                if let Some(generation) = crate::commit::parse_commit_generation(&name) {
                    if generation < new_commit.generation && !stale.contains(&name) {
                        stale.push(name);
                    }
                }
            }
        }

        for file in stale {
            match storage.delete_file(&file) {
                Ok(()) => debug!(file = %file, "pruned stale file"),
                Err(e) => warn!(file = %file, error = %e, "failed to prune stale file"),
            }
        }
    }
}
