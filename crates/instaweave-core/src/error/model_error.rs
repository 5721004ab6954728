//! Error taxonomy of fallible element-graph and playbook operations.

use thiserror::Error;

use crate::{identifier::ElementId, phase::Phase};

/// Errors raised while querying or interpreting a model.
///
/// The three variants follow the error taxonomy of the engine:
/// - references that cannot be resolved,
/// - invalid configuration (unknown projection, impossible quantity),
/// - structural problems (cycles) that make a phase impossible to complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A reference names an id that is not part of the model.
    #[error("`{referrer}` refers to unknown element `{id}` through `{field}`")]
    Reference {
        id: ElementId,
        referrer: ElementId,
        field: String,
    },

    /// Invalid configuration or arguments.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A structural property of the model prevents completion.
    #[error("structural error: {message}")]
    Structural {
        phase: Option<Phase>,
        members: Vec<ElementId>,
        message: String,
    },
}

impl ModelError {
    /// Convenience constructor for [`ModelError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Convenience constructor for [`ModelError::Structural`].
    pub fn structural(
        phase: Option<Phase>,
        members: Vec<ElementId>,
        message: impl Into<String>,
    ) -> Self {
        Self::Structural {
            phase,
            members,
            message: message.into(),
        }
    }

    /// Elements implicated by the error.
    pub fn members(&self) -> &[ElementId] {
        match self {
            Self::Reference { referrer, .. } => std::slice::from_ref(referrer),
            Self::Configuration(_) => &[],
            Self::Structural { members, .. } => members,
        }
    }
}

/// Errors that stop a model from loading at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model document must be a JSON array of element records")]
    NotAnArray,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_display() {
        let err = ModelError::Reference {
            id: ElementId::new("ghost"),
            referrer: ElementId::new("typing-1"),
            field: "target".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`typing-1` refers to unknown element `ghost` through `target`"
        );
        assert_eq!(err.members(), &[ElementId::new("typing-1")]);
    }

    #[test]
    fn test_structural_members() {
        let err = ModelError::structural(
            Some(Phase::Rollup),
            vec![ElementId::new("a"), ElementId::new("b")],
            "generalization cycle",
        );
        assert_eq!(err.members().len(), 2);
        assert_eq!(err.to_string(), "structural error: generalization cycle");
    }

    #[test]
    fn test_load_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let err: LoadError = json_err.into();
        assert!(matches!(err, LoadError::Json(_)));
    }
}
