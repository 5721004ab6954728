//! The core diagnostic type.
//!
//! A [`Diagnostic`] is a single error, warning, or note with an optional
//! error code, the element it is about, other elements involved, the
//! playbook phase that raised it, and help text.

use std::fmt;

use serde::Serialize;

use crate::{
    error::{Severity, error_code::ErrorCode},
    identifier::ElementId,
    phase::Phase,
};

/// A diagnostic message anchored to model elements.
///
/// # Example
///
/// ```text
/// warning[E200]: malformed multiplicity on `X`: lower bound "many" is not a number
///   subject: x-def
///   phase: phase 1 (multiplicity resolution)
///   = help: multiplicity defaulted to exactly 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<ElementId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    related: Vec<ElementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Create a note.
    ///
    /// # Example
    ///
    /// ```
    /// # use instaweave_core::error::{Diagnostic, ErrorCode};
    /// let note = Diagnostic::note("no multiplicity declared, using exactly 1")
    ///     .with_code(ErrorCode::E201);
    /// assert!(note.severity().is_note());
    /// ```
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the element this diagnostic is about, if any.
    pub fn subject(&self) -> Option<ElementId> {
        self.subject
    }

    /// Get the other elements involved (cycle members, for instance).
    pub fn related(&self) -> &[ElementId] {
        &self.related
    }

    /// Get the phase that produced this diagnostic, if any.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the element this diagnostic is about.
    pub fn with_subject(mut self, subject: ElementId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Add elements involved in the finding.
    pub fn with_related(mut self, related: impl IntoIterator<Item = ElementId>) -> Self {
        self.related.extend(related);
        self
    }

    /// Set the phase that produced this diagnostic.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            subject: None,
            related: Vec::new(),
            phase: None,
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "warning[E100]: message" or "note: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_new() {
        let diag = Diagnostic::new(Severity::Error, "test error");

        assert!(diag.severity().is_error());
        assert_eq!(diag.message(), "test error");
        assert!(diag.code().is_none());
        assert!(diag.subject().is_none());
        assert!(diag.related().is_empty());
        assert!(diag.phase().is_none());
        assert!(diag.help().is_none());
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let diag = Diagnostic::error("generalization cycle through `A`")
            .with_code(ErrorCode::E300)
            .with_subject(ElementId::new("a"))
            .with_related([ElementId::new("a"), ElementId::new("b")])
            .with_phase(Phase::Rollup)
            .with_help("break the cycle");

        assert_eq!(diag.code(), Some(ErrorCode::E300));
        assert_eq!(diag.subject(), Some(ElementId::new("a")));
        assert_eq!(diag.related().len(), 2);
        assert_eq!(diag.phase(), Some(Phase::Rollup));
        assert_eq!(diag.help(), Some("break the cycle"));
    }

    #[test]
    fn test_diagnostic_display_with_code() {
        let diag = Diagnostic::warning("endpoint `ghost` does not resolve").with_code(ErrorCode::E100);

        assert_eq!(
            diag.to_string(),
            "warning[E100]: endpoint `ghost` does not resolve"
        );
    }

    #[test]
    fn test_diagnostic_display_without_code() {
        let diag = Diagnostic::note("defaulted");

        assert_eq!(diag.to_string(), "note: defaulted");
    }
}
