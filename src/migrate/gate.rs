//! Compliance gate: the licensing predicate consulted before migration.
//!
//! Migration of legacy indexes may be a gated feature. The gate is consulted
//! before any storage access; population of the actual licensing logic is
//! the host's concern.

/// Boolean predicate deciding whether migration is permitted.
pub trait ComplianceGate: Send + Sync + std::fmt::Debug {
    /// Whether the gated feature may be used right now.
    fn allowed(&self) -> bool;

    /// Name of the gated feature, used in error messages.
    fn feature(&self) -> &str {
        "archive"
    }
}

/// A gate that always permits migration.
#[derive(Debug, Default)]
pub struct AllowAll;

impl ComplianceGate for AllowAll {
    fn allowed(&self) -> bool {
        true
    }
}

/// A gate backed by a host-supplied closure.
pub struct FnGate<F: Fn() -> bool + Send + Sync> {
    predicate: F,
    feature: String,
}

impl<F: Fn() -> bool + Send + Sync> FnGate<F> {
    /// Create a gate from a predicate and a feature name.
    pub fn new(feature: impl Into<String>, predicate: F) -> Self {
        FnGate {
            predicate,
            feature: feature.into(),
        }
    }
}

impl<F: Fn() -> bool + Send + Sync> std::fmt::Debug for FnGate<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnGate").field("feature", &self.feature).finish()
    }
}

impl<F: Fn() -> bool + Send + Sync> ComplianceGate for FnGate<F> {
    fn allowed(&self) -> bool {
        (self.predicate)()
    }

    fn feature(&self) -> &str {
        &self.feature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let gate = AllowAll;
        assert!(gate.allowed());
        assert_eq!(gate.feature(), "archive");
    }

    #[test]
    fn test_fn_gate() {
        let gate = FnGate::new("archive", || false);
        assert!(!gate.allowed());
        assert_eq!(gate.feature(), "archive");

        let gate = FnGate::new("archive", || true);
        assert!(gate.allowed());
    }
}
