//! Error codes for the instaweave diagnostic system.
//!
//! Error codes are organized by category:
//! - `E1xx` - Reference problems (ids that do not resolve, malformed references)
//! - `E2xx` - Configuration problems (malformed bounds, bad quantities, names)
//! - `E3xx` - Structural problems (cycles, runaway nesting)

use std::fmt;

use serde::{Serialize, Serializer};

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Reference Errors (E1xx)
    // =========================================================================
    /// Dangling relationship endpoint.
    ///
    /// A relationship names a source or target id that is not loaded. The
    /// endpoint is dropped; the rest of the relationship is kept.
    E100,

    /// Dangling owner reference.
    ///
    /// The owner field of an element names an id that is not loaded. The
    /// element is treated as an owned root.
    E101,

    /// Dangling owned-element reference.
    ///
    /// An entry of an `ownedElement` list does not resolve.
    E102,

    /// Reference shape violation.
    ///
    /// A reference object carries fields besides `@id`. The extra fields are
    /// ignored.
    E103,

    /// Record without an id.
    ///
    /// An input record has no `@id` string and cannot be placed in the graph.
    E104,

    /// Duplicate record id.
    ///
    /// Two records share an `@id`; the first one wins.
    E105,

    /// Record without a metatype.
    ///
    /// An input record has no `@type`; it is loaded as a plain `Element`.
    E106,

    // =========================================================================
    // Configuration Errors (E2xx)
    // =========================================================================
    /// Malformed multiplicity bound.
    ///
    /// A bound is non-numeric, negative, non-integral, or inverted. The
    /// multiplicity defaults to exactly one.
    E200,

    /// Missing multiplicity bound.
    ///
    /// No bound is declared; the multiplicity defaults to exactly one.
    E201,

    /// Bound over-subscribed by subtypes.
    ///
    /// The union of a supertype's subtype pools already exceeds its declared
    /// upper bound.
    E202,

    /// Unknown projection name.
    E203,

    /// Invalid instance quantity.
    ///
    /// A requested quantity is negative or non-integral.
    E204,

    // =========================================================================
    // Structural Errors (E3xx)
    // =========================================================================
    /// Generalization cycle.
    E300,

    /// Ownership cycle.
    E301,

    /// Self-referential edge.
    ///
    /// A relationship connects an element to itself.
    E302,

    /// Recursive feature containment.
    ///
    /// A feature path reaches a type already on the path; the path is not
    /// expanded further.
    E303,

    /// Feature path too deep.
    ///
    /// A feature path reached the configured maximum depth.
    E304,
}

impl ErrorCode {
    /// Returns the code as a string (e.g., "E100").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Reference errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",
            // Configuration errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            // Structural errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Reference errors
            ErrorCode::E100 => "dangling relationship endpoint",
            ErrorCode::E101 => "dangling owner",
            ErrorCode::E102 => "dangling owned element",
            ErrorCode::E103 => "reference shape violation",
            ErrorCode::E104 => "record without id",
            ErrorCode::E105 => "duplicate record id",
            ErrorCode::E106 => "record without metatype",
            // Configuration errors
            ErrorCode::E200 => "malformed multiplicity",
            ErrorCode::E201 => "missing multiplicity",
            ErrorCode::E202 => "bound over-subscribed by subtypes",
            ErrorCode::E203 => "unknown projection",
            ErrorCode::E204 => "invalid quantity",
            // Structural errors
            ErrorCode::E300 => "generalization cycle",
            ErrorCode::E301 => "ownership cycle",
            ErrorCode::E302 => "self-referential edge",
            ErrorCode::E303 => "recursive feature containment",
            ErrorCode::E304 => "feature path too deep",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
