//! Construction and validation errors for market model inputs.
//!
//! Registry and topology construction fails fast: the first malformed
//! attribute or unknown id aborts the build with no partial state left
//! behind.

use crate::{NodeId, ZoneId};
use thiserror::Error;

/// Errors raised while building registries, topologies, or systems.
#[derive(Error, Debug)]
pub enum ModelError {
    /// An entity name was registered twice.
    #[error("duplicate {kind} id {name:?}")]
    DuplicateId { kind: &'static str, name: String },

    /// An attribute is outside its economically meaningful range.
    #[error("invalid {entity}: {reason}")]
    InvalidRange { entity: String, reason: String },

    /// A topology query referenced a node that was never registered.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// A topology query referenced a zone that was never registered.
    #[error("unknown zone {0:?}")]
    UnknownZone(ZoneId),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    pub(crate) fn invalid(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::InvalidRange {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results using ModelError.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<anyhow::Error> for ModelError {
    fn from(err: anyhow::Error) -> Self {
        ModelError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::DuplicateId {
            kind: "generation unit",
            name: "g1".to_string(),
        };
        assert!(err.to_string().contains("duplicate"));
        assert!(err.to_string().contains("g1"));
    }

    #[test]
    fn test_invalid_range_display() {
        let err = ModelError::invalid("generation unit g1", "pmin exceeds pmax");
        assert!(err.to_string().contains("pmin exceeds pmax"));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> ModelResult<()> {
            Err(ModelError::UnknownNode(NodeId::new(7)))
        }

        fn outer() -> ModelResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(ModelError::UnknownNode(n)) if n.value() == 7));
    }
}
