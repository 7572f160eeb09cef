//! Descriptor Migrator: translate a legacy commit descriptor into the
//! current layout.
//!
//! A pure translation: no storage access, no side effects. The legacy
//! descriptor is read-only input; every segment record is copied by value
//! with its scalar bookkeeping unchanged and its descriptor wrapped behind a
//! compatibility codec.

use std::collections::HashMap;

use uuid::Uuid;

use crate::commit::{
    CommitDescriptor, HISTORY_UUID_KEY, LOCAL_CHECKPOINT_KEY, MAX_SEQ_NO_KEY,
    MAX_UNSAFE_AUTO_ID_TIMESTAMP_KEY, NO_OPS_PERFORMED, SegmentRecord,
    UNKNOWN_AUTO_ID_TIMESTAMP,
};
use crate::error::Result;
use crate::legacy::codec::{CodecRegistry, wrap};
use crate::legacy::format::LegacyCommitDescriptor;

/// Build a current-format commit descriptor from a legacy one.
///
/// `version` and `counter` are copied unchanged; the new generation is the
/// legacy generation plus one so readers picking the highest generation
/// always resolve to the migrated commit. Bookkeeping keys absent from the
/// legacy user data are filled with defaults; present values are never
/// overwritten. Segment order is preserved. If any segment has no
/// compatibility codec the whole migration fails and no descriptor is
/// returned.
pub fn migrate_descriptor(
    legacy: &LegacyCommitDescriptor,
    registry: &CodecRegistry,
) -> Result<CommitDescriptor> {
    let mut segments = Vec::with_capacity(legacy.segments.len());

    for record in &legacy.segments {
        segments.push(SegmentRecord {
            descriptor: wrap(&record.descriptor, registry)?,
            del_count: record.del_count,
            soft_del_count: record.soft_del_count,
            del_gen: record.del_gen,
            field_infos_gen: record.field_infos_gen,
            doc_values_gen: record.doc_values_gen,
            id: record.id,
            doc_values_update_files: record.doc_values_update_files.clone(),
            field_infos_files: record.field_infos_files.clone(),
        });
    }

    Ok(CommitDescriptor {
        version: legacy.version,
        counter: legacy.counter,
        generation: legacy.generation + 1,
        user_data: merge_user_data(&legacy.user_data),
        segments,
    })
}

/// Fill the bookkeeping keys replication logic depends on, leaving existing
/// values untouched.
fn merge_user_data(legacy: &HashMap<String, String>) -> HashMap<String, String> {
    let mut user_data = legacy.clone();

    user_data
        .entry(HISTORY_UUID_KEY.to_string())
        .or_insert_with(|| Uuid::new_v4().to_string());
    user_data
        .entry(LOCAL_CHECKPOINT_KEY.to_string())
        .or_insert_with(|| NO_OPS_PERFORMED.to_string());
    user_data
        .entry(MAX_SEQ_NO_KEY.to_string())
        .or_insert_with(|| NO_OPS_PERFORMED.to_string());
    user_data
        .entry(MAX_UNSAFE_AUTO_ID_TIMESTAMP_KEY.to_string())
        .or_insert_with(|| UNKNOWN_AUTO_ID_TIMESTAMP.to_string());

    user_data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DoruError;
    use crate::legacy::DEFAULT_LEGACY_CEILING;
    use crate::legacy::codec::default_registry;
    use crate::legacy::testutil::sample_legacy_commit;

    #[test]
    fn test_generation_strictly_increases() {
        let legacy = sample_legacy_commit(6, 2);
        let migrated = migrate_descriptor(&legacy, &default_registry()).unwrap();

        assert_eq!(migrated.generation, 7);
        assert!(migrated.generation > legacy.generation);
    }

    #[test]
    fn test_version_and_counter_copied() {
        let legacy = sample_legacy_commit(6, 2);
        let migrated = migrate_descriptor(&legacy, &default_registry()).unwrap();

        assert_eq!(migrated.version, legacy.version);
        assert_eq!(migrated.counter, legacy.counter);
    }

    #[test]
    fn test_segment_scalars_copied_exactly() {
        let mut legacy = sample_legacy_commit(6, 2);
        legacy.segments[1].del_count = 17;
        legacy.segments[1].soft_del_count = 3;
        legacy.segments[1].del_gen = 5;
        legacy.segments[1].field_infos_gen = 2;
        legacy.segments[1].doc_values_gen = 9;

        let migrated = migrate_descriptor(&legacy, &default_registry()).unwrap();
        assert_eq!(migrated.segments.len(), 2);

        for (old, new) in legacy.segments.iter().zip(&migrated.segments) {
            assert_eq!(new.del_count, old.del_count);
            assert_eq!(new.soft_del_count, old.soft_del_count);
            assert_eq!(new.del_gen, old.del_gen);
            assert_eq!(new.field_infos_gen, old.field_infos_gen);
            assert_eq!(new.doc_values_gen, old.doc_values_gen);
            assert_eq!(new.id, old.id);
            assert_eq!(new.doc_values_update_files, old.doc_values_update_files);
            assert_eq!(new.field_infos_files, old.field_infos_files);
            assert_eq!(new.descriptor.name, old.descriptor.name);
        }
    }

    #[test]
    fn test_segment_order_preserved() {
        let legacy = sample_legacy_commit(6, 4);
        let migrated = migrate_descriptor(&legacy, &default_registry()).unwrap();

        let names: Vec<&str> = migrated
            .segments
            .iter()
            .map(|r| r.descriptor.name.as_str())
            .collect();
        assert_eq!(names, vec!["_0", "_1", "_2", "_3"]);
    }

    #[test]
    fn test_empty_user_data_gets_all_defaults() {
        // Scenario A of the migration contract.
        let legacy = sample_legacy_commit(6, 2);
        assert!(legacy.user_data.is_empty());

        let migrated = migrate_descriptor(&legacy, &default_registry()).unwrap();

        assert_eq!(migrated.user_data.len(), 4);
        assert!(!migrated.user_data[HISTORY_UUID_KEY].is_empty());
        assert_eq!(migrated.user_data[LOCAL_CHECKPOINT_KEY], "-1");
        assert_eq!(migrated.user_data[MAX_SEQ_NO_KEY], "-1");
        assert_eq!(migrated.user_data[MAX_UNSAFE_AUTO_ID_TIMESTAMP_KEY], "-1");
    }

    #[test]
    fn test_existing_user_data_not_overwritten() {
        // Scenario B: a present history identifier survives migration.
        let mut legacy = sample_legacy_commit(6, 1);
        legacy
            .user_data
            .insert(HISTORY_UUID_KEY.to_string(), "abc".to_string());

        let migrated = migrate_descriptor(&legacy, &default_registry()).unwrap();

        assert_eq!(migrated.user_data[HISTORY_UUID_KEY], "abc");
        assert_eq!(migrated.user_data[LOCAL_CHECKPOINT_KEY], "-1");
        assert_eq!(migrated.user_data[MAX_SEQ_NO_KEY], "-1");
        assert_eq!(migrated.user_data[MAX_UNSAFE_AUTO_ID_TIMESTAMP_KEY], "-1");
    }

    #[test]
    fn test_complete_user_data_untouched() {
        let mut legacy = sample_legacy_commit(6, 1);
        legacy
            .user_data
            .insert(HISTORY_UUID_KEY.to_string(), "abc".to_string());
        legacy
            .user_data
            .insert(LOCAL_CHECKPOINT_KEY.to_string(), "100".to_string());
        legacy
            .user_data
            .insert(MAX_SEQ_NO_KEY.to_string(), "120".to_string());
        legacy
            .user_data
            .insert(MAX_UNSAFE_AUTO_ID_TIMESTAMP_KEY.to_string(), "99".to_string());
        legacy
            .user_data
            .insert("translog_uuid".to_string(), "xyz".to_string());

        let migrated = migrate_descriptor(&legacy, &default_registry()).unwrap();

        assert_eq!(migrated.user_data, legacy.user_data);
    }

    #[test]
    fn test_unknown_codec_fails_whole_migration() {
        let mut legacy = sample_legacy_commit(6, 3);
        legacy.segments[2].descriptor.format_major = DEFAULT_LEGACY_CEILING + 10;

        match migrate_descriptor(&legacy, &default_registry()) {
            Err(DoruError::UnknownSegmentCodec { format_major }) => {
                assert_eq!(format_major, DEFAULT_LEGACY_CEILING + 10);
            }
            other => panic!("Expected unknown segment codec error, got {other:?}"),
        }
    }

    #[test]
    fn test_idempotent_at_data_level() {
        let mut legacy = sample_legacy_commit(6, 2);
        legacy
            .user_data
            .insert(HISTORY_UUID_KEY.to_string(), "abc".to_string());

        let registry = default_registry();
        let first = migrate_descriptor(&legacy, &registry).unwrap();
        let second = migrate_descriptor(&legacy, &registry).unwrap();

        assert_eq!(first, second);
    }
}
