//! Error adapter for converting instaweave errors and diagnostics to miette
//! reports.
//!
//! Fatal [`InstaweaveError`]s and the non-fatal [`Diagnostic`]s of a run are
//! both rendered through miette's graphical handler. Models carry no source
//! spans, so reports show the code, the message and a help line naming the
//! elements involved.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, Severity as MietteSeverity};

use instaweave::InstaweaveError;
use instaweave_core::{
    error::{Diagnostic, ErrorCode, ModelError, Severity},
    identifier::ElementId,
    phase::Phase,
};

/// Adapter for a single instaweave diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    help: Option<String>,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic) -> Self {
        let help = match (diag.help(), diag.related()) {
            (Some(help), _) => Some(help.to_string()),
            (None, []) => None,
            (None, related) => Some(format!("related elements: {}", join_ids(related))),
        };
        Self { diag, help }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diag.subject() {
            Some(subject) => write!(f, "{} (at `{subject}`)", self.diag.message()),
            None => write!(f, "{}", self.diag.message()),
        }
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<MietteSeverity> {
        Some(match self.diag.severity() {
            Severity::Error => MietteSeverity::Error,
            Severity::Warning => MietteSeverity::Warning,
            Severity::Note => MietteSeverity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }
}

/// Adapter for a fatal [`InstaweaveError`].
pub struct ErrorAdapter<'a>(pub &'a InstaweaveError);

impl ErrorAdapter<'_> {
    fn members(&self) -> &[ElementId] {
        match self.0 {
            InstaweaveError::Model(err) | InstaweaveError::Phase { source: err, .. } => {
                err.members()
            }
            _ => &[],
        }
    }
}

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.0 {
            InstaweaveError::Io(_) => "instaweave::io",
            InstaweaveError::Load(_) => "instaweave::load",
            InstaweaveError::Model(ModelError::Reference { .. }) => "instaweave::reference",
            InstaweaveError::Model(_) => "instaweave::model",
            InstaweaveError::Phase {
                phase: Phase::InterpretEdges,
                source: ModelError::Structural { .. },
            } => ErrorCode::E301.as_str(),
            InstaweaveError::Phase {
                phase: Phase::Rollup,
                source: ModelError::Structural { .. },
            } => ErrorCode::E300.as_str(),
            InstaweaveError::Phase { .. } => "instaweave::phase",
            InstaweaveError::PhaseOrder { .. } => "instaweave::phase_order",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let members = self.members();
        if members.is_empty() {
            return None;
        }
        Some(Box::new(format!("elements involved: {}", join_ids(members))))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A diagnostic collected during loading or generation.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A fatal error.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(_) => Some(MietteSeverity::Error),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }
}

/// Convert an [`InstaweaveError`] into a reportable error.
pub fn to_reportables(err: &InstaweaveError) -> Vec<Reportable<'_>> {
    vec![Reportable::Error(ErrorAdapter(err))]
}

/// Warnings and errors among `diagnostics`, ready for rendering.
///
/// Notes are left to the log.
pub fn diagnostics_to_reportables(diagnostics: &[Diagnostic]) -> Vec<Reportable<'_>> {
    diagnostics
        .iter()
        .filter(|d| !d.severity().is_note())
        .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d)))
        .collect()
}

fn join_ids(ids: &[ElementId]) -> String {
    ids.iter()
        .map(|id| format!("`{id}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_has_code_and_members() {
        let err = InstaweaveError::in_phase(
            Phase::Rollup,
            ModelError::structural(
                Some(Phase::Rollup),
                vec!["a".into(), "b".into()],
                "generalization cycle between a, b",
            ),
        );

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        let reportable = &reportables[0];
        assert_eq!(reportable.code().unwrap().to_string(), "E300");
        assert_eq!(
            reportable.help().unwrap().to_string(),
            "elements involved: `a`, `b`"
        );
    }

    #[test]
    fn test_phase_order_error() {
        let err = InstaweaveError::PhaseOrder {
            requested: Phase::Sequences,
            reason: "phase 2 (rollup) has not completed".to_string(),
        };

        let reportables = to_reportables(&err);
        assert_eq!(
            reportables[0].code().unwrap().to_string(),
            "instaweave::phase_order"
        );
        assert!(reportables[0].help().is_none());
    }

    #[test]
    fn test_notes_are_not_reported() {
        let diagnostics = vec![
            Diagnostic::note("defaulted").with_code(ErrorCode::E201),
            Diagnostic::warning("dangling reference dropped")
                .with_code(ErrorCode::E100)
                .with_subject("r1".into())
                .with_related(["x".into()]),
        ];

        let reportables = diagnostics_to_reportables(&diagnostics);
        assert_eq!(reportables.len(), 1);
        assert_eq!(
            reportables[0].to_string(),
            "dangling reference dropped (at `r1`)"
        );
        assert_eq!(reportables[0].severity(), Some(MietteSeverity::Warning));
        assert_eq!(
            reportables[0].help().unwrap().to_string(),
            "related elements: `x`"
        );
    }
}
