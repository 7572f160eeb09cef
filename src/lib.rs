//! # Doru
//!
//! Commit metadata migration for legacy-format search indexes.
//!
//! A segmented, append-only index written by an older format version cannot
//! be opened by current-format readers. Doru upgrades the on-disk commit
//! metadata in place: it reads the legacy commit descriptor, translates it
//! into the current descriptor layout, routes each legacy segment through a
//! compatibility codec so bulk data stays untouched, and atomically publishes
//! the new commit at a higher generation.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Pluggable storage backends
//! - Atomic commit publishing (readers never see a torn commit)
//! - Compatibility codec registry for legacy segment formats
//! - Conservative pruning of stale commit files

pub mod archive;
pub mod commit;
pub mod error;
pub mod legacy;
pub mod migrate;
pub mod storage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
