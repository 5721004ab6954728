//! Error and diagnostic system for the element graph and the playbook.
//!
//! Two layers:
//! - [`ModelError`] is the error taxonomy (reference, configuration,
//!   structural) returned by fallible operations.
//! - [`Diagnostic`] records a non-fatal finding (a dropped dangling
//!   reference, a defaulted multiplicity) with an [`ErrorCode`], the element
//!   it concerns and the phase that produced it. Load and playbook runs
//!   accumulate diagnostics in a [`DiagnosticCollector`] and hand them to the
//!   caller instead of failing.
//!
//! # Example
//!
//! ```
//! # use instaweave_core::error::{Diagnostic, ErrorCode};
//! # use instaweave_core::identifier::ElementId;
//! let diag = Diagnostic::warning("relationship endpoint `ghost` does not resolve")
//!     .with_code(ErrorCode::E100)
//!     .with_subject(ElementId::new("typing-1"))
//!     .with_help("the endpoint was dropped from the relationship");
//!
//! assert_eq!(diag.code(), Some(ErrorCode::E100));
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod model_error;
mod severity;

pub use collector::DiagnosticCollector;
pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use model_error::{LoadError, ModelError};
pub use severity::Severity;
