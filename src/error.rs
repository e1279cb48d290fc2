//! Fault taxonomy for primitive lookup and synthesis.
//!
//! Lookup misses are not errors: they surface as `Option::None`. The
//! variants here describe configuration faults (a registration table that
//! cannot be satisfied) plus the one expected refusal, `CannotSynthesize`,
//! which `PrimitiveRegistry::locate` folds back into a miss.

pub type LoopResult<T> = Result<T, LoopError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoopError {
    #[error("type id space exhausted on {axis} axis while registering {descriptor:?}")]
    IdSpaceExhausted { axis: String, descriptor: String },

    #[error("lazy primitive proxy mismatch: expected {expected}, factory produced {found}")]
    ProxyMismatch { expected: String, found: String },

    #[error("no generic argb loop for {kind} under composite {composite}")]
    MissingGenericLoop { kind: String, composite: String },

    #[error("cannot synthesize {kind} for composite {composite}")]
    CannotSynthesize { kind: String, composite: String },

    #[error("primitive kind mismatch: expected {expected}, found {found}")]
    WrongLoopKind { expected: String, found: String },
}

impl LoopError {
    pub fn id_space_exhausted(axis: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self::IdSpaceExhausted {
            axis: axis.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn proxy_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::ProxyMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn missing_generic_loop(kind: impl Into<String>, composite: impl Into<String>) -> Self {
        Self::MissingGenericLoop {
            kind: kind.into(),
            composite: composite.into(),
        }
    }

    pub fn cannot_synthesize(kind: impl Into<String>, composite: impl Into<String>) -> Self {
        Self::CannotSynthesize {
            kind: kind.into(),
            composite: composite.into(),
        }
    }

    pub fn wrong_loop_kind(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::WrongLoopKind {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// True for the expected refusal that callers treat like a lookup miss.
    pub fn is_refusal(&self) -> bool {
        matches!(self, Self::CannotSynthesize { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_are_stable() {
        assert!(LoopError::id_space_exhausted("surface", "Foo")
            .to_string()
            .contains("type id space exhausted on surface"));
        assert!(LoopError::proxy_mismatch("a", "b")
            .to_string()
            .contains("lazy primitive proxy mismatch"));
        assert!(LoopError::missing_generic_loop("Blit", "SrcOver")
            .to_string()
            .contains("no generic argb loop for Blit"));
        assert!(LoopError::cannot_synthesize("MaskFill", "Xor")
            .to_string()
            .contains("cannot synthesize MaskFill"));
        assert!(LoopError::wrong_loop_kind("Blit", "FillRect")
            .to_string()
            .contains("expected Blit"));
    }

    #[test]
    fn test_only_cannot_synthesize_is_a_refusal() {
        assert!(LoopError::cannot_synthesize("MaskBlit", "Xor").is_refusal());
        assert!(!LoopError::missing_generic_loop("Blit", "Src").is_refusal());
        assert!(!LoopError::proxy_mismatch("x", "y").is_refusal());
    }
}
