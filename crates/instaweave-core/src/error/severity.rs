//! Severity levels for diagnostics.

use std::fmt;

use serde::Serialize;

/// The severity level of a diagnostic.
///
/// - [`Severity::Error`] marks a finding that makes the affected part of the
///   model unusable (an ownership cycle, for instance).
/// - [`Severity::Warning`] marks a defect that was repaired with a documented
///   fallback, such as a dropped dangling reference.
/// - [`Severity::Note`] records a resolution decision the caller may want to
///   audit, such as a defaulted multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    /// Returns `true` if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns `true` if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }

    /// Returns `true` if this is a note.
    pub fn is_note(&self) -> bool {
        matches!(self, Severity::Note)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_predicates() {
        assert!(Severity::Error.is_error());
        assert!(!Severity::Error.is_warning());
        assert!(Severity::Warning.is_warning());
        assert!(Severity::Note.is_note());
        assert!(!Severity::Note.is_error());
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Note.to_string(), "note");
    }
}
