//! Commit metadata: descriptors, file naming and the current on-disk format.
//!
//! A commit is a durable snapshot of which segments constitute the index.
//! Commit files live in a single `segments_<generation>` namespace; the live
//! commit is the one with the highest generation.

pub mod descriptor;
pub mod format;

pub use descriptor::{CommitDescriptor, SegmentDescriptor, SegmentRecord};
pub use format::{is_current_commit, latest_commit_file};

/// File name prefix shared by all commit files, legacy and current.
pub const SEGMENTS_PREFIX: &str = "segments_";

/// File name prefix for a commit file that is written but not yet published.
pub const PENDING_SEGMENTS_PREFIX: &str = "pending_segments_";

/// Leading magic of a current-format commit file ("DORU").
pub const CURRENT_MAGIC: u32 = 0x444F_5255;

/// Major version of the current commit format.
pub const CURRENT_FORMAT_MAJOR: u32 = 8;

/// User-data key holding the index history identifier.
pub const HISTORY_UUID_KEY: &str = "history_uuid";

/// User-data key holding the local checkpoint.
pub const LOCAL_CHECKPOINT_KEY: &str = "local_checkpoint";

/// User-data key holding the maximum sequence number.
pub const MAX_SEQ_NO_KEY: &str = "max_seq_no";

/// User-data key holding the maximum unsafe auto-generated id timestamp.
pub const MAX_UNSAFE_AUTO_ID_TIMESTAMP_KEY: &str = "max_unsafe_auto_id_timestamp";

/// Sequence-number sentinel meaning no operations have been performed yet.
pub const NO_OPS_PERFORMED: i64 = -1;

/// Timestamp sentinel meaning the auto-id timestamp ceiling is unknown.
pub const UNKNOWN_AUTO_ID_TIMESTAMP: i64 = -1;

/// Build the commit file name for a generation.
pub fn commit_file_name(generation: u64) -> String {
    format!("{SEGMENTS_PREFIX}{generation}")
}

/// Build the pending (not yet published) commit file name for a generation.
pub fn pending_commit_file_name(generation: u64) -> String {
    format!("{PENDING_SEGMENTS_PREFIX}{generation}")
}

/// Parse the generation out of a commit file name.
///
/// Returns `None` for anything that is not a published commit file.
pub fn parse_commit_generation(name: &str) -> Option<u64> {
    name.strip_prefix(SEGMENTS_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_file_names() {
        assert_eq!(commit_file_name(6), "segments_6");
        assert_eq!(pending_commit_file_name(7), "pending_segments_7");
    }

    #[test]
    fn test_parse_commit_generation() {
        assert_eq!(parse_commit_generation("segments_6"), Some(6));
        assert_eq!(parse_commit_generation("segments_123"), Some(123));
        assert_eq!(parse_commit_generation("pending_segments_7"), None);
        assert_eq!(parse_commit_generation("segments_"), None);
        assert_eq!(parse_commit_generation("segments_abc"), None);
        assert_eq!(parse_commit_generation("_0.dat"), None);
    }
}
