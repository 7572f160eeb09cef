//! Legacy Descriptor Reader: parses the old commit file layout.
//!
//! The legacy layout differs from the current one in magic, in carrying a
//! file-level major version, and in per-segment records that have no codec
//! name: codec identity is implied by the per-segment format major and is
//! resolved through the compatibility registry at migration time.

use std::collections::HashMap;

use crate::commit::{CURRENT_MAGIC, latest_commit_file, parse_commit_generation};
use crate::error::{DoruError, Result};
use crate::legacy::LEGACY_MAGIC;
use crate::storage::{Storage, StorageInput, StructReader};

/// Structural metadata of one segment as the legacy schema presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySegmentDescriptor {
    /// Segment name, e.g. `_0`.
    pub name: String,

    /// Per-segment format major version the bulk data was written with.
    pub format_major: u32,

    /// Number of documents in the segment.
    pub doc_count: u64,

    /// Free-form per-segment attributes.
    pub attributes: HashMap<String, String>,

    /// Diagnostic metadata used for introspection.
    pub diagnostics: HashMap<String, String>,

    /// Names of the segment's bulk data files.
    pub files: Vec<String>,
}

/// One segment record of a legacy commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySegmentRecord {
    /// The segment's structural metadata.
    pub descriptor: LegacySegmentDescriptor,

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

/// A fully parsed legacy commit. Read-only input to migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCommitDescriptor {
    /// File-level legacy major format version.
    pub major: u32,

    /// Monotonically increasing change counter.
    pub version: u64,

    /// Counter used to allocate segment name suffixes.
    pub counter: u64,

    /// Generation of the commit file this descriptor was read from.
    pub generation: u64,

    /// Free-form bookkeeping carried by the legacy commit.
    pub user_data: HashMap<String, String>,

    /// The segments of this commit, in read order.
    pub segments: Vec<LegacySegmentRecord>,
}

impl LegacyCommitDescriptor {
    /// The transitive set of files referenced by this commit, excluding the
    /// commit file itself.
    pub fn referenced_files(&self) -> std::collections::HashSet<String> {
        let mut files = std::collections::HashSet::new();

        for record in &self.segments {
            files.extend(record.descriptor.files.iter().cloned());
            files.extend(record.doc_values_update_files.iter().cloned());
            files.extend(record.field_infos_files.iter().cloned());
        }

        files
    }
}

/// Locate and parse the most recent legacy commit file.
///
/// Rejects commits whose file-level major exceeds `ceiling` with
/// [`DoruError::UnsupportedFormat`] and structurally invalid files with
/// [`DoruError::CorruptCommit`]. Never mutates storage.
pub fn read_latest_commit(storage: &dyn Storage, ceiling: u32) -> Result<LegacyCommitDescriptor> {
    match latest_commit_file(storage)? {
        Some((name, _)) => read_commit(storage, &name, ceiling),
        None => Err(DoruError::index("No commit file found in storage")),
    }
}

/// Parse one named legacy commit file.
pub fn read_commit(
    storage: &dyn Storage,
    name: &str,
    ceiling: u32,
) -> Result<LegacyCommitDescriptor> {
    let expected_generation = parse_commit_generation(name)
        .ok_or_else(|| DoruError::index(format!("Not a commit file name: {name}")))?;

    let input = storage.open_input(name)?;
    let mut reader = StructReader::new(input)?;

    let magic = reader.read_u32()?;
    if magic == CURRENT_MAGIC {
        return Err(DoruError::index(format!(
            "Commit {name} is already in the current format"
        )));
    }
    if magic != LEGACY_MAGIC {
        return Err(DoruError::corrupt(format!(
            "Commit {name} has unexpected magic {magic:#010x}"
        )));
    }

    let major = reader.read_u32()?;
    if major > ceiling {
        return Err(DoruError::UnsupportedFormat { major, ceiling });
    }

    let version = reader.read_u64()?;
    let counter = reader.read_u64()?;
    let generation = reader.read_u64()?;
    if generation != expected_generation {
        return Err(DoruError::corrupt(format!(
            "Commit {name} records generation {generation}"
        )));
    }

    let user_data = reader.read_string_map()?;

    let segment_count = reader.read_varint()? as usize;
    let mut segments = Vec::with_capacity(segment_count.min(1024));
    for _ in 0..segment_count {
        segments.push(read_segment_record(&mut reader)?);
    }

    if !reader.verify_checksum()? {
        return Err(DoruError::corrupt(format!("Commit {name} checksum mismatch")));
    }

    Ok(LegacyCommitDescriptor {
        major,
        version,
        counter,
        generation,
        user_data,
        segments,
    })
}

fn read_segment_record<R: StorageInput>(
    reader: &mut StructReader<R>,
) -> Result<LegacySegmentRecord> {
    let name = reader.read_string()?;

    let id_bytes = reader.read_raw(16)?;
    let mut id = [0u8; 16];
    id.copy_from_slice(&id_bytes);

    let format_major = reader.read_u32()?;
    let doc_count = reader.read_u64()?;
    let attributes = reader.read_string_map()?;
    let diagnostics = reader.read_string_map()?;
    let files = reader.read_string_list()?;

    let del_count = reader.read_u64()?;
    let soft_del_count = reader.read_u64()?;
    let del_gen = reader.read_i64()?;
    let field_infos_gen = reader.read_i64()?;
    let doc_values_gen = reader.read_i64()?;
    let doc_values_update_files = reader.read_string_list()?;
    let field_infos_files = reader.read_string_list()?;

    Ok(LegacySegmentRecord {
        descriptor: LegacySegmentDescriptor {
            name,
            format_major,
            doc_count,
            attributes,
            diagnostics,
            files,
        },
        del_count,
        soft_del_count,
        del_gen,
        field_infos_gen,
        doc_values_gen,
        id,
        doc_values_update_files,
        field_infos_files,
    })
}
