//! The ordered phases of an instance-generation run.

use std::fmt;

use serde::Serialize;

/// One step of the instance-generation playbook.
///
/// Phases are strictly ordered; [`Phase::predecessor`] names the phase that
/// must complete first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Phase 0: read the relationship graph and materialize projections.
    InterpretEdges,
    /// Phase 1: choose a concrete count per definition and allocate it.
    Multiplicities,
    /// Phase 2: roll subtype pools into supertypes, fill unconnected types.
    Rollup,
    /// Phase 3: build nested instance sequences along feature paths.
    Sequences,
    /// Phase 4: extend sequences with expression-valued features.
    ExpressionSequences,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::InterpretEdges,
        Phase::Multiplicities,
        Phase::Rollup,
        Phase::Sequences,
        Phase::ExpressionSequences,
    ];

    /// Returns the phase number (0-4).
    pub fn number(self) -> u8 {
        match self {
            Phase::InterpretEdges => 0,
            Phase::Multiplicities => 1,
            Phase::Rollup => 2,
            Phase::Sequences => 3,
            Phase::ExpressionSequences => 4,
        }
    }

    /// Returns the phase that must complete before this one, if any.
    pub fn predecessor(self) -> Option<Phase> {
        match self {
            Phase::InterpretEdges => None,
            Phase::Multiplicities => Some(Phase::InterpretEdges),
            Phase::Rollup => Some(Phase::Multiplicities),
            Phase::Sequences => Some(Phase::Rollup),
            Phase::ExpressionSequences => Some(Phase::Sequences),
        }
    }

    fn title(self) -> &'static str {
        match self {
            Phase::InterpretEdges => "interpret edges",
            Phase::Multiplicities => "multiplicity resolution",
            Phase::Rollup => "rollup",
            Phase::Sequences => "sequence construction",
            Phase::ExpressionSequences => "expression sequences",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase {} ({})", self.number(), self.title())
    }
}
