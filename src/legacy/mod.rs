//! Legacy commit format support.
//!
//! Indexes written by older format versions carry a commit file the current
//! reader cannot parse. This module reads those commits and wraps their
//! segments behind compatibility codecs so migration can republish them in
//! the current format without touching bulk data.

pub mod codec;
pub mod format;

#[cfg(test)]
pub(crate) mod testutil;

pub use codec::{CodecRegistry, CompatCodec, default_registry, wrap};
pub use format::{
    LegacyCommitDescriptor, LegacySegmentDescriptor, LegacySegmentRecord, read_latest_commit,
};

/// Leading magic of a legacy commit file ("LEGS").
pub const LEGACY_MAGIC: u32 = 0x4C45_4753;

/// Highest legacy major format readable by this crate.
pub const DEFAULT_LEGACY_CEILING: u32 = 7;

/// Lowest legacy major format with a bundled compatibility codec.
pub const MIN_LEGACY_MAJOR: u32 = 5;
