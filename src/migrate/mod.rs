//! Migration of legacy commit metadata to the current format.
//!
//! The pipeline reads the legacy commit, translates it into a current-format
//! descriptor with every legacy segment wrapped behind a compatibility
//! codec, publishes the new commit atomically at a higher generation,
//! verifies it opens via the standard read path, and prunes files only the
//! old commit referenced. Bulk segment data is never rewritten.

pub mod gate;
pub mod hold;
pub mod migrator;
pub mod orchestrator;

use serde::{Deserialize, Serialize};

use crate::legacy::DEFAULT_LEGACY_CEILING;

pub use gate::{AllowAll, ComplianceGate, FnGate};
pub use hold::{IndexStore, StoreHold};
pub use migrator::migrate_descriptor;
pub use orchestrator::{IndexMigrator, MigrationState};

/// How a post-publish verification failure is treated.
///
/// Verification re-opens the store through the current-format read path as a
/// self-check. A failure indicates a migration-logic defect, not bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyMode {
    /// Surface verification failure as a migration error.
    Fatal,

    /// Log verification failure at warn level and proceed.
    Warn,
}

/// Configuration for commit migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Highest legacy file-level major format accepted for migration.
    pub max_legacy_major: u32,

    /// Treatment of post-publish verification failures.
    pub verify_mode: VerifyMode,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            max_legacy_major: DEFAULT_LEGACY_CEILING,
            verify_mode: VerifyMode::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_config_default() {
        let config = MigrationConfig::default();

        assert_eq!(config.max_legacy_major, DEFAULT_LEGACY_CEILING);
        assert_eq!(config.verify_mode, VerifyMode::Fatal);
    }
}
