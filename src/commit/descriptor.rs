//! In-memory representation of a current-format commit.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Structural metadata of one segment as the current schema presents it.
///
/// The `codec` field names the codec responsible for decoding the segment's
/// bulk data. For migrated legacy segments it names a compatibility codec;
/// bulk files themselves are never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    /// Segment name, e.g. `_0`.
    pub name: String,

    /// Name of the codec that decodes this segment's bulk data.
    pub codec: String,

    /// Per-segment format major version the bulk data was written with.
    pub format_major: u32,

    /// Number of documents in the segment.
    pub doc_count: u64,

    /// Free-form per-segment attributes.
    pub attributes: HashMap<String, String>,

    /// Diagnostic metadata used for introspection (writer version, host, ...).
    pub diagnostics: HashMap<String, String>,

    /// Names of the segment's bulk data files.
    pub files: Vec<String>,
}

/// One physical segment committed to the index, with its deletion and
/// update bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// The segment's structural metadata.
    pub descriptor: SegmentDescriptor,

    /// Number of deleted documents.
    pub del_count: u64,

    /// Number of soft-deleted documents.
    pub soft_del_count: u64,

    /// Generation of the live-docs file, -1 if the segment has no deletes.
    pub del_gen: i64,

    /// Generation of the field-infos file, -1 if never updated.
    pub field_infos_gen: i64,

    /// Generation of doc-values updates, -1 if never updated.
    pub doc_values_gen: i64,

    /// Stable 128-bit segment identifier.
    pub id: [u8; 16],

    /// Files holding doc-values updates for this segment.
    pub doc_values_update_files: Vec<String>,

    /// Files holding field-infos updates for this segment.
    pub field_infos_files: Vec<String>,
}

/// The durable record of one consistent index state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDescriptor {
    /// Monotonically increasing change counter.
    pub version: u64,

    /// Counter used to allocate segment name suffixes.
    pub counter: u64,

    /// Generation identifying the physical commit file.
    pub generation: u64,

    /// Free-form bookkeeping, including the replication keys.
    pub user_data: HashMap<String, String>,

    /// The segments of this commit, in read order.
    pub segments: Vec<SegmentRecord>,
}

impl CommitDescriptor {
    /// The file name this commit is (or will be) published under.
    pub fn file_name(&self) -> String {
        super::commit_file_name(self.generation)
    }

    /// The transitive set of files referenced by this commit, excluding the
    /// commit file itself.
    ///
    /// A file outside this set that belonged to an older commit is eligible
    /// for pruning once this commit is the live one.
    pub fn referenced_files(&self) -> HashSet<String> {
        let mut files = HashSet::new();

        for record in &self.segments {
            files.extend(record.descriptor.files.iter().cloned());
            files.extend(record.doc_values_update_files.iter().cloned());
            files.extend(record.field_infos_files.iter().cloned());
        }

        files
    }

    /// Total number of live documents across all segments.
    pub fn total_doc_count(&self) -> u64 {
        self.segments
            .iter()
            .map(|r| r.descriptor.doc_count.saturating_sub(r.del_count))
            .sum()
    }
}
