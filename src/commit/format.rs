//! Current commit file format: encode, decode and atomic publish.
//!
//! Publishing writes the full commit under a `pending_segments_<gen>` name,
//! syncs it, then renames it to `segments_<gen>`. Readers that resolve the
//! live commit by highest generation therefore see either the old commit or
//! the fully written new one, never a partial file.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::commit::descriptor::{CommitDescriptor, SegmentDescriptor, SegmentRecord};
use crate::commit::{CURRENT_FORMAT_MAJOR, CURRENT_MAGIC, parse_commit_generation};
use crate::error::{DoruError, Result};
use crate::storage::{Storage, StructReader, StructWriter};

/// Find the published commit file with the highest generation.
///
/// Returns the file name and its generation, or `None` if the storage holds
/// no commit file at all.
pub fn latest_commit_file(storage: &dyn Storage) -> Result<Option<(String, u64)>> {
    let mut latest: Option<(String, u64)> = None;

    for name in storage.list_files()? {
        if let Some(generation) = parse_commit_generation(&name) {
            match latest {
                Some((_, best)) if best >= generation => {}
                _ => latest = Some((name, generation)),
            }
        }
    }

    Ok(latest)
}

/// Check whether a commit file carries the current-format magic.
///
/// Only the leading four bytes are read; the file is not validated.
pub fn is_current_commit(storage: &dyn Storage, name: &str) -> Result<bool> {
    let mut input = storage.open_input(name)?;
    let magic = input.read_u32::<LittleEndian>()?;
    input.close()?;
    Ok(magic == CURRENT_MAGIC)
}

impl CommitDescriptor {
    /// Durably publish this commit to storage.
    ///
    /// Any failure before the rename leaves the previous commit as the only
    /// discoverable one; the pending file is cleaned up on a best-effort
    /// basis and the error is reported as a publish failure.
    pub fn commit(&self, storage: &dyn Storage) -> Result<String> {
        let pending = super::pending_commit_file_name(self.generation);
        let published = self.file_name();

        let result = self
            .write_to(storage, &pending)
            .and_then(|_| storage.rename_file(&pending, &published))
            .and_then(|_| storage.sync());

        if let Err(e) = result {
            if let Err(cleanup) = storage.delete_file(&pending) {
                tracing::warn!(file = %pending, error = %cleanup, "failed to remove pending commit file");
            }
            return Err(DoruError::publish(format!(
                "writing commit {published} failed: {e}"
            )));
        }

        Ok(published)
    }

    fn write_to(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        let output = storage.create_output(name)?;
        let mut writer = StructWriter::new(output);

        writer.write_u32(CURRENT_MAGIC)?;
        writer.write_u32(CURRENT_FORMAT_MAJOR)?;
        writer.write_u64(self.version)?;
        writer.write_u64(self.counter)?;
        writer.write_u64(self.generation)?;
        writer.write_string_map(&self.user_data)?;

        writer.write_varint(self.segments.len() as u64)?;
        for record in &self.segments {
            write_segment_record(&mut writer, record)?;
        }

        writer.close()
    }

    /// Read and validate the highest-generation commit file.
    pub fn read_latest_commit(storage: &dyn Storage) -> Result<CommitDescriptor> {
        match latest_commit_file(storage)? {
            Some((name, _)) => Self::read_commit(storage, &name),
            None => Err(DoruError::index("No commit file found in storage")),
        }
    }

    /// Read and validate one named commit file.
    pub fn read_commit(storage: &dyn Storage, name: &str) -> Result<CommitDescriptor> {
        let expected_generation = parse_commit_generation(name)
            .ok_or_else(|| DoruError::index(format!("Not a commit file name: {name}")))?;

        let input = storage.open_input(name)?;
        let mut reader = StructReader::new(input)?;

        let magic = reader.read_u32()?;
        if magic != CURRENT_MAGIC {
            return Err(DoruError::corrupt(format!(
                "Commit {name} has unexpected magic {magic:#010x}"
            )));
        }

        let major = reader.read_u32()?;
        if major != CURRENT_FORMAT_MAJOR {
            return Err(DoruError::index(format!(
                "Commit {name} has format major {major}, expected {CURRENT_FORMAT_MAJOR}"
            )));
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

        Ok(CommitDescriptor {
            version,
            counter,
            generation,
            user_data,
            segments,
        })
    }
}

fn write_segment_record<W: crate::storage::StorageOutput>(
    writer: &mut StructWriter<W>,
    record: &SegmentRecord,
) -> Result<()> {
    let descriptor = &record.descriptor;

    writer.write_string(&descriptor.name)?;
    writer.write_string(&descriptor.codec)?;
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

    Ok(())
}

fn read_segment_record<R: crate::storage::StorageInput>(
    reader: &mut StructReader<R>,
) -> Result<SegmentRecord> {
    let name = reader.read_string()?;
    let codec = reader.read_string()?;

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

    Ok(SegmentRecord {
        descriptor: SegmentDescriptor {
            name,
            codec,
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
