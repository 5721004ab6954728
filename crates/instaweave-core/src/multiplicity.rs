//! Declared multiplicity bounds.
//!
//! Records declare bounds either flat (`lowerBound` / `upperBound`) or in a
//! nested `multiplicity` object. [`Declared::from_record`] reads whichever
//! form is present and classifies the outcome as missing, well-formed or
//! malformed, so callers can substitute defaults and record why.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

const LOWER: &str = "lowerBound";
const UPPER: &str = "upperBound";
const NESTED: &str = "multiplicity";

/// The upper end of a multiplicity interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpperBound {
    Bounded(u64),
    Unbounded,
}

impl UpperBound {
    /// Returns the bound as a number, `None` when unbounded.
    pub fn finite(self) -> Option<u64> {
        match self {
            UpperBound::Bounded(n) => Some(n),
            UpperBound::Unbounded => None,
        }
    }
}

impl fmt::Display for UpperBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpperBound::Bounded(n) => write!(f, "{n}"),
            UpperBound::Unbounded => write!(f, "*"),
        }
    }
}

/// A closed multiplicity interval `[lower, upper]`.
///
/// # Examples
///
/// ```
/// use instaweave_core::multiplicity::{Multiplicity, UpperBound};
///
/// let bound = Multiplicity::new(1, UpperBound::Bounded(3)).unwrap();
/// assert!(bound.contains(2));
/// assert!(!bound.contains(4));
/// assert_eq!(bound.to_string(), "[1..3]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Multiplicity {
    lower: u64,
    upper: UpperBound,
}

impl Multiplicity {
    /// Creates a bound, rejecting `lower > upper`.
    pub fn new(lower: u64, upper: UpperBound) -> Result<Self, MultiplicityError> {
        if let UpperBound::Bounded(upper) = upper {
            if lower > upper {
                return Err(MultiplicityError::Inverted { lower, upper });
            }
        }
        Ok(Self { lower, upper })
    }

    /// The bound `[n..n]`.
    pub fn exactly(n: u64) -> Self {
        Self {
            lower: n,
            upper: UpperBound::Bounded(n),
        }
    }

    /// The bound `[n..*]`.
    pub fn at_least(n: u64) -> Self {
        Self {
            lower: n,
            upper: UpperBound::Unbounded,
        }
    }

    pub fn lower(&self) -> u64 {
        self.lower
    }

    pub fn upper(&self) -> UpperBound {
        self.upper
    }

    /// Returns `true` if `count` lies inside the interval.
    pub fn contains(&self, count: u64) -> bool {
        count >= self.lower
            && match self.upper {
                UpperBound::Bounded(upper) => count <= upper,
                UpperBound::Unbounded => true,
            }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.lower, self.upper)
    }
}

/// Why a declared bound could not be read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MultiplicityError {
    #[error("{field} `{value}` is not a number")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} `{value}` is negative")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} `{value}` is not an integer")]
    NonIntegral { field: &'static str, value: f64 },

    #[error("lower bound {lower} exceeds upper bound {upper}")]
    Inverted { lower: u64, upper: u64 },

    #[error("`multiplicity` must be an object with lowerBound/upperBound")]
    Shape,
}

/// Outcome of reading a record's multiplicity declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declared {
    /// No bound keys were present.
    Missing,
    /// A well-formed bound.
    Bound(Multiplicity),
    /// Bound keys were present but unusable.
    Malformed(MultiplicityError),
}

impl Declared {
    /// Reads the bound of a raw record.
    ///
    /// Flat keys take precedence over a nested `multiplicity` object. A
    /// `multiplicity` value that is a plain reference (`{"@id": ..}` only) is
    /// treated as no declaration.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        if record.contains_key(LOWER) || record.contains_key(UPPER) {
            return Self::from_pair(record.get(LOWER), record.get(UPPER));
        }
        match record.get(NESTED) {
            None | Some(Value::Null) => Declared::Missing,
            Some(Value::Object(nested)) => {
                if nested.contains_key(LOWER) || nested.contains_key(UPPER) {
                    Self::from_pair(nested.get(LOWER), nested.get(UPPER))
                } else if nested.contains_key("@id") {
                    Declared::Missing
                } else {
                    Declared::Malformed(MultiplicityError::Shape)
                }
            }
            Some(_) => Declared::Malformed(MultiplicityError::Shape),
        }
    }

    /// Returns the bound when well-formed.
    pub fn bound(&self) -> Option<Multiplicity> {
        match self {
            Declared::Bound(bound) => Some(*bound),
            Declared::Missing | Declared::Malformed(_) => None,
        }
    }

    fn from_pair(lower: Option<&Value>, upper: Option<&Value>) -> Self {
        let lower = lower.filter(|v| !v.is_null());
        let upper = upper.filter(|v| !v.is_null());
        let parsed = match (lower, upper) {
            (None, None) => return Declared::Missing,
            (Some(lower), None) => {
                parse_count(LOWER, lower).and_then(|n| Multiplicity::new(n, UpperBound::Bounded(n)))
            }
            (None, Some(upper)) => parse_upper(upper).and_then(|upper| {
                let lower = upper.finite().unwrap_or(0);
                Multiplicity::new(lower, upper)
            }),
            (Some(lower), Some(upper)) => parse_count(LOWER, lower)
                .and_then(|lower| parse_upper(upper).and_then(|upper| Multiplicity::new(lower, upper))),
        };
        match parsed {
            Ok(bound) => Declared::Bound(bound),
            Err(err) => Declared::Malformed(err),
        }
    }
}

fn parse_upper(value: &Value) -> Result<UpperBound, MultiplicityError> {
    match value {
        Value::String(s) if s.trim() == "*" => Ok(UpperBound::Unbounded),
        Value::Number(n) if n.as_i64() == Some(-1) => Ok(UpperBound::Unbounded),
        Value::String(s) if s.trim() == "-1" => Ok(UpperBound::Unbounded),
        other => parse_count(UPPER, other).map(UpperBound::Bounded),
    }
}

fn parse_count(field: &'static str, value: &Value) -> Result<u64, MultiplicityError> {
    match value {
        Value::Number(n) => {
            if let Some(n) = n.as_u64() {
                Ok(n)
            } else if let Some(n) = n.as_i64() {
                Err(MultiplicityError::Negative { field, value: n })
            } else {
                float_count(field, n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                if n < 0 {
                    return Err(MultiplicityError::Negative { field, value: n });
                }
                return Ok(n as u64);
            }
            match trimmed.parse::<f64>() {
                Ok(f) => float_count(field, f),
                Err(_) => Err(MultiplicityError::NotANumber {
                    field,
                    value: s.clone(),
                }),
            }
        }
        other => Err(MultiplicityError::NotANumber {
            field,
            value: other.to_string(),
        }),
    }
}

fn float_count(field: &'static str, f: f64) -> Result<u64, MultiplicityError> {
    if !f.is_finite() {
        return Err(MultiplicityError::NotANumber {
            field,
            value: f.to_string(),
        });
    }
    if f.fract() != 0.0 {
        return Err(MultiplicityError::NonIntegral { field, value: f });
    }
    if f < 0.0 {
        return Err(MultiplicityError::Negative {
            field,
            value: f as i64,
        });
    }
    Ok(f as u64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn declared(value: Value) -> Declared {
        match value {
            Value::Object(map) => Declared::from_record(&map),
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_flat_bounds() {
        let d = declared(json!({"lowerBound": 1, "upperBound": 3}));
        assert_eq!(
            d,
            Declared::Bound(Multiplicity::new(1, UpperBound::Bounded(3)).unwrap())
        );
    }

    #[test]
    fn test_nested_bounds_with_star() {
        let d = declared(json!({"multiplicity": {"lowerBound": "2", "upperBound": "*"}}));
        assert_eq!(d, Declared::Bound(Multiplicity::at_least(2)));
    }

    #[test]
    fn test_minus_one_is_unbounded() {
        let d = declared(json!({"lowerBound": 0, "upperBound": -1}));
        assert_eq!(d.bound(), Some(Multiplicity::at_least(0)));
    }

    #[test]
    fn test_single_sided_bounds() {
        assert_eq!(
            declared(json!({"upperBound": 4})).bound(),
            Some(Multiplicity::exactly(4))
        );
        assert_eq!(
            declared(json!({"upperBound": "*"})).bound(),
            Some(Multiplicity::at_least(0))
        );
        assert_eq!(
            declared(json!({"lowerBound": 2.0})).bound(),
            Some(Multiplicity::exactly(2))
        );
    }

    #[test]
    fn test_missing() {
        assert_eq!(declared(json!({"name": "Engine"})), Declared::Missing);
        assert_eq!(
            declared(json!({"multiplicity": {"@id": "mult-1"}})),
            Declared::Missing
        );
        assert_eq!(
            declared(json!({"lowerBound": null, "upperBound": null})),
            Declared::Missing
        );
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            declared(json!({"lowerBound": "many", "upperBound": 3})),
            Declared::Malformed(MultiplicityError::NotANumber { .. })
        ));
        assert!(matches!(
            declared(json!({"lowerBound": -2, "upperBound": 3})),
            Declared::Malformed(MultiplicityError::Negative { value: -2, .. })
        ));
        assert!(matches!(
            declared(json!({"lowerBound": 1.5})),
            Declared::Malformed(MultiplicityError::NonIntegral { .. })
        ));
        assert!(matches!(
            declared(json!({"lowerBound": 4, "upperBound": 2})),
            Declared::Malformed(MultiplicityError::Inverted { lower: 4, upper: 2 })
        ));
        assert!(matches!(
            declared(json!({"multiplicity": "1..2"})),
            Declared::Malformed(MultiplicityError::Shape)
        ));
    }

    #[test]
    fn test_contains() {
        let bound = Multiplicity::at_least(2);
        assert!(!bound.contains(1));
        assert!(bound.contains(2));
        assert!(bound.contains(1_000));
        assert_eq!(bound.to_string(), "[2..*]");
    }
}
