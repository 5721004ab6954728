//! Accumulates diagnostics while a load or playbook run continues.

use log::{debug, warn};

use crate::error::{Diagnostic, Severity};

/// Collects diagnostics in emission order.
///
/// Warnings and errors are also forwarded to the `log` facade so they show up
/// in the run log next to the phase boundaries.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        let code = diagnostic.code().map(|code| code.as_str()).unwrap_or("-");
        match diagnostic.severity() {
            Severity::Error | Severity::Warning => {
                warn!(code = code; "{}", diagnostic.message());
            }
            Severity::Note => {
                debug!(code = code; "{}", diagnostic.message());
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// Record every diagnostic of an iterator.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
        }
    }

    /// Returns `true` if any error-level diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity().is_error())
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Borrow the recorded diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the collector and return the recorded diagnostics.
    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_collector_keeps_order() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::note("first").with_code(ErrorCode::E201));
        collector.emit(Diagnostic::warning("second").with_code(ErrorCode::E100));

        let diags = collector.finish();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message(), "first");
        assert_eq!(diags[1].message(), "second");
    }

    #[test]
    fn test_has_errors() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("just a warning"));
        assert!(!collector.has_errors());

        collector.emit(Diagnostic::error("a real error"));
        assert!(collector.has_errors());
        assert_eq!(collector.len(), 2);
    }
}
