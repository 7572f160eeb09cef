//! Compatibility codecs and the shim wrapper.
//!
//! A compatibility codec lets current-schema readers route bulk-data reads
//! for a legacy segment to legacy-aware decoders. The registry maps a legacy
//! per-segment format major to its codec; the shim wrapper rewrites a legacy
//! segment descriptor into a current-schema one whose codec identity is the
//! compat codec. Nothing here touches bulk data: decode happens lazily,
//! on-demand, when a reader later resolves the codec by name.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::commit::SegmentDescriptor;
use crate::error::{DoruError, Result};
use crate::legacy::format::LegacySegmentDescriptor;
use crate::legacy::{DEFAULT_LEGACY_CEILING, MIN_LEGACY_MAJOR};

/// A decoder identity capable of satisfying current-schema read requests for
/// bulk data written by one legacy per-segment format.
pub trait CompatCodec: Send + Sync + std::fmt::Debug {
    /// Codec name recorded in migrated segment descriptors.
    fn name(&self) -> &str;

    /// The legacy per-segment format major this codec decodes.
    fn legacy_major(&self) -> u32;
}

/// Built-in compatibility codec for one legacy format major.
#[derive(Debug)]
struct LegacyCodec {
    name: String,
    major: u32,
}

impl CompatCodec for LegacyCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn legacy_major(&self) -> u32 {
        self.major
    }
}

/// Lookup table from legacy per-segment format major to compatibility codec.
///
/// The crate bundles codecs for the majors it can migrate; hosts may
/// register additional ones. Population beyond the defaults is the caller's
/// concern.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    codecs: HashMap<u32, Arc<dyn CompatCodec>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        CodecRegistry {
            codecs: HashMap::new(),
        }
    }

    /// Create a registry with the bundled compatibility codecs registered.
    pub fn with_default_codecs() -> Self {
        let mut registry = CodecRegistry::new();
        for major in MIN_LEGACY_MAJOR..=DEFAULT_LEGACY_CEILING {
            registry.register(Arc::new(LegacyCodec {
                name: format!("compat{major}x"),
                major,
            }));
        }
        registry
    }

    /// Register a compatibility codec, replacing any codec already mapped to
    /// the same legacy major.
    pub fn register(&mut self, codec: Arc<dyn CompatCodec>) {
        self.codecs.insert(codec.legacy_major(), codec);
    }

    /// Look up the codec for a legacy per-segment format major.
    pub fn lookup(&self, format_major: u32) -> Option<Arc<dyn CompatCodec>> {
        self.codecs.get(&format_major).cloned()
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: Arc<CodecRegistry> = Arc::new(CodecRegistry::with_default_codecs());
}

/// The process-wide registry holding the bundled compatibility codecs.
pub fn default_registry() -> Arc<CodecRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

/// Wrap a legacy segment descriptor for the current schema.
///
/// The result presents current-schema structural metadata while its codec
/// identity routes bulk reads to the legacy-aware decoder. Name, document
/// count, attributes, diagnostics and the file list are preserved. Fails
/// with [`DoruError::UnknownSegmentCodec`] if no codec is registered for the
/// segment's format major.
pub fn wrap(
    legacy: &LegacySegmentDescriptor,
    registry: &CodecRegistry,
) -> Result<SegmentDescriptor> {
    let codec = registry
        .lookup(legacy.format_major)
        .ok_or(DoruError::UnknownSegmentCodec {
            format_major: legacy.format_major,
        })?;

    Ok(SegmentDescriptor {
        name: legacy.name.clone(),
        codec: codec.name().to_string(),
        format_major: legacy.format_major,
        doc_count: legacy.doc_count,
        attributes: legacy.attributes.clone(),
        diagnostics: legacy.diagnostics.clone(),
        files: legacy.files.clone(),
    })
}
