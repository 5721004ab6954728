//! Element identifiers backed by a global string interner.
//!
//! Model records name each other by string ids (`"@id"`). Every id that
//! enters the graph is interned once, so the rest of the engine can pass
//! [`ElementId`] around by value and use it as a cheap map key.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for element ids.
///
/// # Thread Safety
///
/// Access goes through a `Mutex`, so ids may be created from any thread.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> std::sync::MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock")
}

/// Interned identifier of a model element.
///
/// # Examples
///
/// ```
/// use instaweave_core::identifier::ElementId;
///
/// let engine = ElementId::new("engine-def");
/// assert_eq!(engine, "engine-def");
/// assert_eq!(engine, ElementId::new("engine-def"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(DefaultSymbol);

impl ElementId {
    /// Creates an `ElementId` from its string form, interning it if needed.
    pub fn new(id: &str) -> Self {
        let symbol = interner().get_or_intern(id);
        Self(symbol)
    }

    /// Returns an owned copy of the id string.
    pub fn as_string(&self) -> String {
        interner()
            .resolve(self.0)
            .expect("Symbol should exist in interner")
            .to_string()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        let str_value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{str_value}")
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl PartialEq<str> for ElementId {
    fn eq(&self, other: &str) -> bool {
        let interner = interner();
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        self_str == other
    }
}

impl PartialEq<&str> for ElementId {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(Self::new(&id))
    }
}
