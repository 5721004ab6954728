//! Set builders: creating instances and arranging them into sequences.
//!
//! These are the primitive operations every playbook phase is made of.
//! Nothing here touches the model; instance naming state lives in an
//! explicit [`InstanceCounters`] table owned by the caller.

use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeTuple};
use serde_json::Value;

use instaweave_core::{element::Element, error::ModelError, identifier::ElementId};

/// One generated (M0) individual of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    type_id: ElementId,
    name: String,
}

impl Instance {
    pub fn new(type_id: ElementId, name: impl Into<String>) -> Self {
        Self {
            type_id,
            name: name.into(),
        }
    }

    /// The element this instance conforms to.
    pub fn type_id(&self) -> ElementId {
        self.type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Serialized as a `[type_id, name]` pair.
impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.type_id)?;
        pair.serialize_element(&self.name)?;
        pair.end()
    }
}

/// An ordered path of instances, outermost first.
///
/// # Examples
///
/// ```
/// use instaweave::set_builders::{Instance, InstanceSequence};
/// use instaweave_core::identifier::ElementId;
///
/// let rocket = Instance::new(ElementId::new("rocket"), "Rocket#1");
/// let tank = Instance::new(ElementId::new("tank"), "FuelTank#1");
/// let seq = InstanceSequence::single(rocket).extended(tank);
///
/// assert_eq!(seq.len(), 2);
/// assert_eq!(
///     serde_json::to_string(&seq).unwrap(),
///     r#"[["rocket","Rocket#1"],["tank","FuelTank#1"]]"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InstanceSequence(Vec<Instance>);

impl InstanceSequence {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self(instances)
    }

    /// A sequence of length one.
    pub fn single(instance: Instance) -> Self {
        Self(vec![instance])
    }

    /// A copy of this sequence with `instance` appended.
    pub fn extended(&self, instance: Instance) -> Self {
        let mut instances = self.0.clone();
        instances.push(instance);
        Self(instances)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.0
    }

    pub fn first(&self) -> Option<&Instance> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Instance> {
        self.0.last()
    }

    /// Type ids along the sequence.
    pub fn types(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.0.iter().map(Instance::type_id)
    }
}

impl fmt::Display for InstanceSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Instance::name).collect();
        write!(f, "({})", names.join(", "))
    }
}

/// Per-type count of instances created during one run.
///
/// Counts only grow; the next ordinal for a type is its count plus one.
#[derive(Debug, Clone, Default)]
pub struct InstanceCounters {
    counts: HashMap<ElementId, usize>,
}

impl InstanceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances created so far for `type_id`.
    pub fn count(&self, type_id: ElementId) -> usize {
        self.counts.get(&type_id).copied().unwrap_or(0)
    }

    /// Bumps the count of `type_id` and returns the new 1-based ordinal.
    pub fn next(&mut self, type_id: ElementId) -> usize {
        let count = self.counts.entry(type_id).or_insert(0);
        *count += 1;
        *count
    }
}

/// Explicit instance names per type.
///
/// The N-th instance created for a type takes the N-th hint when there is
/// one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct NameHints {
    hints: IndexMap<ElementId, Vec<String>>,
}

impl NameHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, type_id: ElementId, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.insert(type_id, names);
        self
    }

    pub fn insert(&mut self, type_id: ElementId, names: impl IntoIterator<Item = impl Into<String>>) {
        self.hints
            .entry(type_id)
            .or_default()
            .extend(names.into_iter().map(Into::into));
    }

    /// The hint for the `ordinal`-th (1-based) instance of `type_id`.
    pub fn hint(&self, type_id: ElementId, ordinal: usize) -> Option<&str> {
        let index = ordinal.checked_sub(1)?;
        self.hints
            .get(&type_id)
            .and_then(|names| names.get(index))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

/// A validated, non-negative instance count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    pub const ONE: Quantity = Quantity(1);

    pub fn new(count: u64) -> Self {
        Self(count)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    fn as_usize(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl From<u64> for Quantity {
    fn from(count: u64) -> Self {
        Self(count)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = ModelError;

    fn try_from(count: i64) -> Result<Self, Self::Error> {
        u64::try_from(count)
            .map(Self)
            .map_err(|_| ModelError::configuration(format!("quantity {count} is negative")))
    }
}

impl TryFrom<f64> for Quantity {
    type Error = ModelError;

    fn try_from(count: f64) -> Result<Self, Self::Error> {
        if !count.is_finite() || count.fract() != 0.0 {
            return Err(ModelError::configuration(format!(
                "quantity {count} is not an integer"
            )));
        }
        if count < 0.0 {
            return Err(ModelError::configuration(format!(
                "quantity {count} is negative"
            )));
        }
        Ok(Self(count as u64))
    }
}

impl TryFrom<&Value> for Quantity {
    type Error = ModelError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => {
                if let Some(n) = n.as_u64() {
                    Ok(Self(n))
                } else if let Some(n) = n.as_i64() {
                    Self::try_from(n)
                } else {
                    Self::try_from(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            other => Err(ModelError::configuration(format!(
                "quantity {other} is not a number"
            ))),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether parents split the child slice or reuse it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sharing {
    /// Each parent gets its own children; a cursor walks the child list.
    #[default]
    Partitioned,
    /// Every parent takes its children from the start of the child list.
    Shared,
}

/// Creates `quantity` new instances of `type_element`.
///
/// Names come from `hints` when present, otherwise `"<name or id>#<N>"`
/// where N is the running count for the type.
///
/// # Examples
///
/// ```
/// use instaweave::set_builders::{InstanceCounters, NameHints, Quantity, create_instances};
/// use instaweave_core::Model;
/// use serde_json::json;
///
/// let model = Model::load(vec![json!({"@id": "e", "@type": "PartDefinition", "name": "Engine"})]);
/// let engine = model.get("e".into()).unwrap();
/// let mut counters = InstanceCounters::new();
///
/// let first = create_instances(engine, Quantity::new(2), &mut counters, &NameHints::new());
/// let more = create_instances(engine, Quantity::ONE, &mut counters, &NameHints::new());
/// assert_eq!(first[1].name(), "Engine#2");
/// assert_eq!(more[0].name(), "Engine#3");
/// ```
pub fn create_instances(
    type_element: &Element,
    quantity: Quantity,
    counters: &mut InstanceCounters,
    hints: &NameHints,
) -> Vec<Instance> {
    let type_id = type_element.id();
    let base = type_element.display_name();
    (0..quantity.get())
        .map(|_| {
            let ordinal = counters.next(type_id);
            let name = match hints.hint(type_id, ordinal) {
                Some(hint) => hint.to_string(),
                None => format!("{base}#{ordinal}"),
            };
            trace!(instance = name.as_str(); "Instance created");
            Instance::new(type_id, name)
        })
        .collect()
}

/// Appends a slice of `children` to every parent sequence.
///
/// `quantities[i]` is the number of children parent `i` receives. With
/// [`Sharing::Partitioned`] a cursor advances through `children` so no child
/// goes to two parents; with [`Sharing::Shared`] every parent starts at the
/// first child. The output is parent-major.
///
/// # Errors
///
/// [`ModelError::Configuration`] when the quantity list does not match the
/// parents or when `children` runs out.
pub fn build_sequences(
    parents: &[InstanceSequence],
    children: &[Instance],
    quantities: &[Quantity],
    sharing: Sharing,
) -> Result<Vec<InstanceSequence>, ModelError> {
    if parents.len() != quantities.len() {
        return Err(ModelError::configuration(format!(
            "{} parent sequences but {} quantities",
            parents.len(),
            quantities.len()
        )));
    }

    let mut sequences = Vec::new();
    let mut cursor: usize = 0;
    for (parent, quantity) in parents.iter().zip(quantities) {
        let start = match sharing {
            Sharing::Partitioned => cursor,
            Sharing::Shared => 0,
        };
        let end = start.saturating_add(quantity.as_usize());
        let Some(slice) = children.get(start..end) else {
            return Err(ModelError::configuration(format!(
                "parent {parent} needs children {start}..{end} but only {} are available",
                children.len()
            )));
        };
        sequences.extend(slice.iter().map(|child| parent.extended(child.clone())));
        cursor = end;
    }
    Ok(sequences)
}

/// Builds sequences along `template` from fresh instances only.
///
/// Level 0 gets `quantities[0]` instances; each sequence at level `i - 1`
/// receives `quantities[i]` new instances of `template[i]`.
pub fn create_sequences_with_new_instances(
    template: &[&Element],
    quantities: &[Quantity],
    counters: &mut InstanceCounters,
    hints: &NameHints,
) -> Result<Vec<InstanceSequence>, ModelError> {
    if template.len() != quantities.len() {
        return Err(ModelError::configuration(format!(
            "template of length {} with {} quantities",
            template.len(),
            quantities.len()
        )));
    }
    let Some((first, rest)) = template.split_first() else {
        return Ok(Vec::new());
    };

    let mut sequences: Vec<InstanceSequence> =
        create_instances(first, quantities[0], counters, hints)
            .into_iter()
            .map(InstanceSequence::single)
            .collect();
    for (element, quantity) in rest.iter().zip(&quantities[1..]) {
        let total = quantity
            .get()
            .checked_mul(sequences.len() as u64)
            .map(Quantity::new)
            .ok_or_else(|| {
                ModelError::configuration(format!(
                    "{} sequences of {quantity} instances of `{}` overflow a count",
                    sequences.len(),
                    element.id()
                ))
            })?;
        let children = create_instances(element, total, counters, hints);
        let per_parent = vec![*quantity; sequences.len()];
        sequences = build_sequences(&sequences, &children, &per_parent, Sharing::Partitioned)?;
    }
    Ok(sequences)
}
