//! Test fixtures: write legacy commit files the reader can parse.

use std::collections::HashMap;

use crate::commit::commit_file_name;
use crate::error::Result;
use crate::legacy::LEGACY_MAGIC;
use crate::legacy::format::{
    LegacyCommitDescriptor, LegacySegmentDescriptor, LegacySegmentRecord,
};
use crate::storage::{Storage, StructWriter};

/// Write a legacy commit file for the descriptor under its generation name.
pub fn write_legacy_commit(storage: &dyn Storage, commit: &LegacyCommitDescriptor) -> Result<()> {
    let name = commit_file_name(commit.generation);
    let output = storage.create_output(&name)?;
    let mut writer = StructWriter::new(output);

    writer.write_u32(LEGACY_MAGIC)?;
    writer.write_u32(commit.major)?;
    writer.write_u64(commit.version)?;
    writer.write_u64(commit.counter)?;
    writer.write_u64(commit.generation)?;
    writer.write_string_map(&commit.user_data)?;

    writer.write_varint(commit.segments.len() as u64)?;
    for record in &commit.segments {
        let descriptor = &record.descriptor;

        writer.write_string(&descriptor.name)?;
        writer.write_raw(&record.id)?;
        writer.write_u32(descriptor.format_major)?;
        writer.write_u64(descriptor.doc_count)?;
        writer.write_string_map(&descriptor.attributes)?;
        writer.write_string_map(&descriptor.diagnostics)?;
        writer.write_string_list(&descriptor.files)?;
        writer.write_u64(record.del_count)?;
        writer.write_u64(record.soft_del_count)?;
        writer.write_i64(record.del_gen)?;
        writer.write_i64(record.field_infos_gen)?;
        writer.write_i64(record.doc_values_gen)?;
        writer.write_string_list(&record.doc_values_update_files)?;
        writer.write_string_list(&record.field_infos_files)?;
    }

    writer.close()
}

/// Build a legacy commit with `segment_count` segments at the given
/// generation. File major is 6, per-segment format major is 6, user data is
/// empty.
pub fn sample_legacy_commit(generation: u64, segment_count: usize) -> LegacyCommitDescriptor {
    let segments = (0..segment_count)
        .map(|i| {
            let name = format!("_{i}");
            let mut id = [0u8; 16];
            id[0] = i as u8;
            id[15] = 0xa5;

            let mut diagnostics = HashMap::new();
            diagnostics.insert("source".to_string(), "flush".to_string());

            LegacySegmentRecord {
                descriptor: LegacySegmentDescriptor {
                    name: name.clone(),
                    format_major: 6,
                    doc_count: 100 * (i as u64 + 1),
                    attributes: HashMap::new(),
                    diagnostics,
                    files: vec![format!("{name}.dat"), format!("{name}.idx")],
                },
                del_count: i as u64,
                soft_del_count: 0,
                del_gen: if i == 0 { -1 } else { 1 },
                field_infos_gen: -1,
                doc_values_gen: -1,
                id,
                doc_values_update_files: vec![],
                field_infos_files: vec![],
            }
        })
        .collect();

    LegacyCommitDescriptor {
        major: 6,
        version: 42,
        counter: segment_count as u64,
        generation,
        user_data: HashMap::new(),
        segments,
    }
}

/// Write the segment data files a legacy commit refers to, so pruning and
/// referenced-file checks operate on a realistic directory.
pub fn write_segment_files(storage: &dyn Storage, commit: &LegacyCommitDescriptor) -> Result<()> {
    use std::io::Write;

    for file in commit.referenced_files() {
        let mut output = storage.create_output(&file)?;
        output.write_all(b"segment data")?;
        output.close()?;
    }

    Ok(())
}
