//! Model elements and their derived relationship index.
//!
//! An [`Element`] wraps one raw record. Besides the record itself it keeps the
//! pieces the engine reads all the time (metatype, name, owner, declared
//! multiplicity) and, per [`RelationshipKind`], the ids reachable through and
//! against relationships of that kind.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{identifier::ElementId, multiplicity::Declared};

const THROUGH: &str = "through";
const REVERSE: &str = "reverse";

/// Metatypes that classify as definitions without the `Definition` suffix.
const DEFINITION_METATYPES: &[&str] = &[
    "Class",
    "Classifier",
    "Structure",
    "DataType",
    "Behavior",
    "Function",
    "Association",
];

/// The kind of a relationship element, taken from its metatype.
///
/// # Examples
///
/// ```
/// use instaweave_core::element::RelationshipKind;
///
/// let kind = RelationshipKind::from_metatype("FeatureTyping");
/// assert_eq!(kind, RelationshipKind::FeatureTyping);
/// assert_eq!(kind.through_key(), "throughFeatureTyping");
/// assert_eq!(
///     RelationshipKind::from_metatype("Dependency"),
///     RelationshipKind::Other("Dependency".to_string())
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    FeatureTyping,
    Subclassification,
    Superclassing,
    Generalization,
    Specialization,
    Redefinition,
    Subsetting,
    ReferenceSubsetting,
    FeatureMembership,
    OwningMembership,
    Membership,
    Other(String),
}

impl RelationshipKind {
    /// Maps a relationship metatype to its kind.
    pub fn from_metatype(metatype: &str) -> Self {
        match metatype {
            "FeatureTyping" => Self::FeatureTyping,
            "Subclassification" => Self::Subclassification,
            "Superclassing" => Self::Superclassing,
            "Generalization" => Self::Generalization,
            "Specialization" => Self::Specialization,
            "Redefinition" => Self::Redefinition,
            "Subsetting" => Self::Subsetting,
            "ReferenceSubsetting" => Self::ReferenceSubsetting,
            "FeatureMembership" => Self::FeatureMembership,
            "OwningMembership" => Self::OwningMembership,
            "Membership" => Self::Membership,
            other => Self::Other(other.to_string()),
        }
    }

    /// The metatype name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FeatureTyping => "FeatureTyping",
            Self::Subclassification => "Subclassification",
            Self::Superclassing => "Superclassing",
            Self::Generalization => "Generalization",
            Self::Specialization => "Specialization",
            Self::Redefinition => "Redefinition",
            Self::Subsetting => "Subsetting",
            Self::ReferenceSubsetting => "ReferenceSubsetting",
            Self::FeatureMembership => "FeatureMembership",
            Self::OwningMembership => "OwningMembership",
            Self::Membership => "Membership",
            Self::Other(name) => name,
        }
    }

    /// Key of the forward derived entry, e.g. `throughFeatureTyping`.
    pub fn through_key(&self) -> String {
        format!("{THROUGH}{}", self.as_str())
    }

    /// Key of the backward derived entry, e.g. `reverseFeatureTyping`.
    pub fn reverse_key(&self) -> String {
        format!("{REVERSE}{}", self.as_str())
    }

    /// Returns `true` for kinds that specialize their target.
    pub fn is_specialization(&self) -> bool {
        matches!(
            self,
            Self::Subclassification
                | Self::Superclassing
                | Self::Generalization
                | Self::Specialization
                | Self::FeatureTyping
                | Self::Redefinition
                | Self::Subsetting
                | Self::ReferenceSubsetting
        )
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RelationshipKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which way a relationship is followed from an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From a source endpoint to the targets.
    Through,
    /// From a target endpoint back to the sources.
    Reverse,
}

/// Neighbors of one element through one relationship kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelatedElements {
    pub through: Vec<ElementId>,
    pub reverse: Vec<ElementId>,
}

impl RelatedElements {
    pub fn get(&self, direction: Direction) -> &[ElementId] {
        match direction {
            Direction::Through => &self.through,
            Direction::Reverse => &self.reverse,
        }
    }
}

/// Result of a typed key lookup on an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// The key is a field of the raw record.
    Raw(&'a Value),
    /// The key is a derived `through<Kind>` / `reverse<Kind>` entry.
    Derived(&'a [ElementId]),
    NotFound,
}

/// One model element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) id: ElementId,
    pub(crate) metatype: String,
    pub(crate) name: Option<String>,
    pub(crate) is_abstract: bool,
    pub(crate) is_relationship: bool,
    pub(crate) data: Map<String, Value>,
    pub(crate) owner: Option<ElementId>,
    pub(crate) owned_elements: Vec<ElementId>,
    pub(crate) sources: Vec<ElementId>,
    pub(crate) targets: Vec<ElementId>,
    pub(crate) multiplicity: Declared,
    pub(crate) relationships: IndexMap<RelationshipKind, RelatedElements>,
}

impl Element {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn metatype(&self) -> &str {
        &self.metatype
    }

    /// The declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The declared name, falling back to the id.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.as_string(),
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_relationship(&self) -> bool {
        self.is_relationship
    }

    /// The raw record this element was loaded from.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The resolved owner; `None` for roots and for dangling owners.
    pub fn owner(&self) -> Option<ElementId> {
        self.owner
    }

    /// Resolved entries of the record's `ownedElement` list.
    pub fn owned_elements(&self) -> &[ElementId] {
        &self.owned_elements
    }

    /// Resolved source endpoints (relationships only).
    pub fn sources(&self) -> &[ElementId] {
        &self.sources
    }

    /// Resolved target endpoints (relationships only).
    pub fn targets(&self) -> &[ElementId] {
        &self.targets
    }

    /// The relationship kind when this element is a relationship.
    pub fn relationship_kind(&self) -> Option<RelationshipKind> {
        if self.is_relationship {
            Some(RelationshipKind::from_metatype(&self.metatype))
        } else {
            None
        }
    }

    pub fn multiplicity(&self) -> &Declared {
        &self.multiplicity
    }

    /// All derived relationship entries, keyed by kind in discovery order.
    pub fn relationships(&self) -> &IndexMap<RelationshipKind, RelatedElements> {
        &self.relationships
    }

    /// Neighbors through `kind` in `direction`.
    pub fn related(&self, kind: &RelationshipKind, direction: Direction) -> &[ElementId] {
        self.relationships
            .get(kind)
            .map(|related| related.get(direction))
            .unwrap_or(&[])
    }

    pub fn through(&self, kind: &RelationshipKind) -> &[ElementId] {
        self.related(kind, Direction::Through)
    }

    pub fn reverse(&self, kind: &RelationshipKind) -> &[ElementId] {
        self.related(kind, Direction::Reverse)
    }

    /// The first FeatureTyping target, the type of a feature.
    pub fn feature_type(&self) -> Option<ElementId> {
        self.through(&RelationshipKind::FeatureTyping).first().copied()
    }

    /// Looks a key up in the raw record, then among derived entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use instaweave_core::{Model, element::Lookup};
    /// use serde_json::json;
    ///
    /// let model = Model::load(vec![
    ///     json!({"@id": "rocket", "@type": "PartDefinition", "name": "Rocket"}),
    ///     json!({"@id": "r1", "@type": "PartUsage"}),
    ///     json!({"@id": "t1", "@type": "FeatureTyping", "relatedElement": [],
    ///            "source": [{"@id": "r1"}], "target": [{"@id": "rocket"}]}),
    /// ]);
    /// let usage = model.get("r1".into()).unwrap();
    /// assert!(matches!(usage.lookup("@type"), Lookup::Raw(_)));
    /// assert!(matches!(usage.lookup("throughFeatureTyping"), Lookup::Derived(ids) if ids.len() == 1));
    /// assert!(matches!(usage.lookup("reverseFeatureTyping"), Lookup::NotFound));
    /// ```
    pub fn lookup(&self, key: &str) -> Lookup<'_> {
        if let Some(value) = self.data.get(key) {
            return Lookup::Raw(value);
        }
        let (direction, metatype) = if let Some(rest) = key.strip_prefix(THROUGH) {
            (Direction::Through, rest)
        } else if let Some(rest) = key.strip_prefix(REVERSE) {
            (Direction::Reverse, rest)
        } else {
            return Lookup::NotFound;
        };
        match self
            .relationships
            .get(&RelationshipKind::from_metatype(metatype))
        {
            Some(related) if !related.get(direction).is_empty() => {
                Lookup::Derived(related.get(direction))
            }
            _ => Lookup::NotFound,
        }
    }

    /// Definitions are the types instances are counted against.
    pub fn is_definition(&self) -> bool {
        !self.is_relationship
            && (self.metatype.ends_with("Definition")
                || DEFINITION_METATYPES.contains(&self.metatype.as_str()))
    }

    pub fn is_expression(&self) -> bool {
        !self.is_relationship && self.metatype.ends_with("Expression")
    }

    /// Usages and other features (expressions included).
    pub fn is_feature(&self) -> bool {
        !self.is_relationship
            && (self.metatype.ends_with("Usage")
                || self.metatype == "Feature"
                || self.metatype == "Step"
                || self.is_expression())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<{name} «{}»>", self.metatype),
            None => write!(f, "<{} «{}»>", self.id, self.metatype),
        }
    }
}
