//! The element graph: loading, indexes and reference resolution.
//!
//! [`Model::load`] never fails. Problems with individual records (dangling
//! references, odd reference shapes, missing ids) are dropped from the graph
//! and reported through [`Model::diagnostics`], so a caller can inspect a
//! best-effort graph and decide whether to proceed.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::{
    element::{Element, Lookup, RelatedElements, RelationshipKind},
    error::{Diagnostic, DiagnosticCollector, ErrorCode, LoadError, ModelError},
    identifier::ElementId,
    multiplicity::Declared,
};

const ID: &str = "@id";
const TYPE: &str = "@type";
const OWNER_KEYS: [&str; 3] = ["owner", "owningRelatedElement", "owningRelationship"];
const DEFAULT_METATYPE: &str = "Element";

/// A reference field resolved against the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'m> {
    /// The value referenced a loaded element.
    Element(&'m Element),
    /// A plain value (or a string that is not an element id).
    Value(&'m Value),
    /// A list, resolved item by item.
    List(Vec<Resolved<'m>>),
    NotFound,
}

/// All elements of one model snapshot plus the indexes the engine needs.
#[derive(Debug, Default)]
pub struct Model {
    elements: IndexMap<ElementId, Element>,
    relationships: Vec<ElementId>,
    non_relationships: Vec<ElementId>,
    by_metatype: IndexMap<String, Vec<ElementId>>,
    owned_roots: Vec<ElementId>,
    owned_relationships: Vec<ElementId>,
    owned_by: IndexMap<ElementId, Vec<ElementId>>,
    ownership_cycles: Vec<Vec<ElementId>>,
    diagnostics: Vec<Diagnostic>,
}

/// References read from one record before ids are checked.
struct PendingRefs {
    owner: Option<ElementId>,
    owned_elements: Vec<ElementId>,
    sources: Vec<ElementId>,
    targets: Vec<ElementId>,
}

impl Model {
    /// Builds a model from raw element records.
    pub fn load(records: impl IntoIterator<Item = Value>) -> Self {
        let mut diagnostics = DiagnosticCollector::new();
        let mut elements: IndexMap<ElementId, Element> = IndexMap::new();
        let mut pending: IndexMap<ElementId, PendingRefs> = IndexMap::new();

        for (index, record) in records.into_iter().enumerate() {
            let Value::Object(data) = record else {
                diagnostics.emit(
                    Diagnostic::error(format!("record #{index} is not a JSON object"))
                        .with_code(ErrorCode::E104),
                );
                continue;
            };
            let Some(id) = data.get(ID).and_then(Value::as_str).map(ElementId::new) else {
                diagnostics.emit(
                    Diagnostic::error(format!("record #{index} has no `@id`"))
                        .with_code(ErrorCode::E104)
                        .with_help("the record was skipped"),
                );
                continue;
            };
            if elements.contains_key(&id) {
                diagnostics.emit(
                    Diagnostic::warning(format!("duplicate record id `{id}`"))
                        .with_code(ErrorCode::E105)
                        .with_subject(id)
                        .with_help("the first record with this id was kept"),
                );
                continue;
            }

            let (element, refs) = read_record(id, data, &mut diagnostics);
            elements.insert(id, element);
            pending.insert(id, refs);
        }

        for (id, refs) in pending {
            resolve_references(id, refs, &mut elements, &mut diagnostics);
        }

        add_relationships(&mut elements);

        let mut model = Model {
            elements,
            ..Model::default()
        };
        model.build_indexes();
        model.ownership_cycles = find_ownership_cycles(&model.elements);
        for cycle in &model.ownership_cycles {
            let names: Vec<String> = cycle.iter().map(ElementId::as_string).collect();
            diagnostics.emit(
                Diagnostic::error(format!("ownership cycle: {}", names.join(" -> ")))
                    .with_code(ErrorCode::E301)
                    .with_subject(cycle[0])
                    .with_related(cycle.iter().copied()),
            );
        }

        model.diagnostics = diagnostics.finish();
        info!(
            elements = model.elements.len(),
            relationships = model.relationships.len(),
            diagnostics = model.diagnostics.len();
            "Model loaded"
        );
        model
    }

    /// Parses a JSON array of element records.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(records) => Ok(Self::load(records)),
            _ => Err(LoadError::NotAnArray),
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements in load order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Relationship elements in load order.
    pub fn relationships(&self) -> impl Iterator<Item = &Element> {
        self.relationships.iter().filter_map(|id| self.get(*id))
    }

    /// Non-relationship elements in load order.
    pub fn non_relationships(&self) -> impl Iterator<Item = &Element> {
        self.non_relationships.iter().filter_map(|id| self.get(*id))
    }

    /// Ids of every element with the given metatype.
    pub fn by_metatype(&self, metatype: &str) -> &[ElementId] {
        self.by_metatype
            .get(metatype)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The metatypes present, in first-seen order.
    pub fn metatypes(&self) -> impl Iterator<Item = &str> {
        self.by_metatype.keys().map(String::as_str)
    }

    /// Non-relationship elements without an owner.
    pub fn owned_roots(&self) -> &[ElementId] {
        &self.owned_roots
    }

    /// Relationship elements without an owner.
    pub fn owned_relationships(&self) -> &[ElementId] {
        &self.owned_relationships
    }

    /// Elements whose owner is `owner`, in load order.
    pub fn owned_by(&self, owner: ElementId) -> &[ElementId] {
        self.owned_by
            .get(&owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first owned root with the given name.
    pub fn root_by_name(&self, name: &str) -> Option<&Element> {
        self.owned_roots
            .iter()
            .filter_map(|id| self.get(*id))
            .find(|element| element.name() == Some(name))
    }

    /// Findings recorded while loading.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Ownership chains that loop back on themselves.
    pub fn ownership_cycles(&self) -> &[Vec<ElementId>] {
        &self.ownership_cycles
    }

    /// Resolves `key` on `element`, dereferencing ids into elements.
    ///
    /// A reference object (`{"@id": ..}`) that names no loaded element is a
    /// [`ModelError::Reference`] naming `element` and `key`. Bare strings
    /// resolve to an element when one has that id and stay plain values
    /// otherwise.
    pub fn resolve(&self, element: ElementId, key: &str) -> Result<Resolved<'_>, ModelError> {
        let Some(found) = self.get(element) else {
            return Err(ModelError::Reference {
                id: element,
                referrer: element,
                field: key.to_string(),
            });
        };
        match found.lookup(key) {
            Lookup::Raw(value) => self.dereference(value, element, key),
            Lookup::Derived(ids) => Ok(Resolved::List(
                ids.iter()
                    .filter_map(|id| self.get(*id))
                    .map(Resolved::Element)
                    .collect(),
            )),
            Lookup::NotFound => Ok(Resolved::NotFound),
        }
    }

    fn dereference<'m>(
        &'m self,
        value: &'m Value,
        referrer: ElementId,
        field: &str,
    ) -> Result<Resolved<'m>, ModelError> {
        match value {
            Value::Object(map) => match map.get(ID).and_then(Value::as_str) {
                Some(id) => {
                    let id = ElementId::new(id);
                    self.get(id).map(Resolved::Element).ok_or_else(|| {
                        ModelError::Reference {
                            id,
                            referrer,
                            field: field.to_string(),
                        }
                    })
                }
                None => Ok(Resolved::Value(value)),
            },
            Value::String(s) => Ok(self
                .get(ElementId::new(s))
                .map(Resolved::Element)
                .unwrap_or(Resolved::Value(value))),
            Value::Array(items) => items
                .iter()
                .map(|item| self.dereference(item, referrer, field))
                .collect::<Result<Vec<_>, _>>()
                .map(Resolved::List),
            _ => Ok(Resolved::Value(value)),
        }
    }

    fn build_indexes(&mut self) {
        for element in self.elements.values() {
            let id = element.id();
            if element.is_relationship() {
                self.relationships.push(id);
            } else {
                self.non_relationships.push(id);
            }
            self.by_metatype
                .entry(element.metatype().to_string())
                .or_default()
                .push(id);
            match element.owner() {
                Some(owner) => self.owned_by.entry(owner).or_default().push(id),
                None if element.is_relationship() => self.owned_relationships.push(id),
                None => self.owned_roots.push(id),
            }
        }
    }
}

fn read_record(
    id: ElementId,
    mut data: Map<String, Value>,
    diagnostics: &mut DiagnosticCollector,
) -> (Element, PendingRefs) {
    let metatype = match data.get(TYPE).and_then(Value::as_str) {
        Some(metatype) => metatype.to_string(),
        None => {
            diagnostics.emit(
                Diagnostic::warning(format!("record `{id}` has no `@type`"))
                    .with_code(ErrorCode::E106)
                    .with_subject(id)
                    .with_help(format!("loaded as `{DEFAULT_METATYPE}`")),
            );
            data.insert(TYPE.to_string(), Value::String(DEFAULT_METATYPE.to_string()));
            DEFAULT_METATYPE.to_string()
        }
    };
    let name = data.get("name").and_then(Value::as_str).map(str::to_string);
    let is_abstract = data
        .get("isAbstract")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let is_relationship =
        data.contains_key("relatedElement") || (data.contains_key("source") && data.contains_key("target"));

    let owner = OWNER_KEYS
        .iter()
        .find_map(|key| data.get(*key).filter(|value| !value.is_null()).map(|v| (*key, v)))
        .and_then(|(key, value)| reference(value, id, key, diagnostics));
    let owned_elements = references(data.get("ownedElement"), id, "ownedElement", diagnostics);
    let (sources, targets) = if is_relationship {
        (
            references(data.get("source"), id, "source", diagnostics),
            references(data.get("target"), id, "target", diagnostics),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    let multiplicity = Declared::from_record(&data);
    let element = Element {
        id,
        metatype,
        name,
        is_abstract,
        is_relationship,
        data,
        owner: None,
        owned_elements: Vec::new(),
        sources: Vec::new(),
        targets: Vec::new(),
        multiplicity,
        relationships: IndexMap::new(),
    };
    let refs = PendingRefs {
        owner,
        owned_elements,
        sources,
        targets,
    };
    (element, refs)
}

/// Reads one reference: `{"@id": ..}` or a bare id string.
fn reference(
    value: &Value,
    referrer: ElementId,
    field: &str,
    diagnostics: &mut DiagnosticCollector,
) -> Option<ElementId> {
    match value {
        Value::String(id) => Some(ElementId::new(id)),
        Value::Object(map) => {
            let id = map.get(ID).and_then(Value::as_str).map(ElementId::new);
            if map.len() > 1 || id.is_none() {
                diagnostics.emit(
                    Diagnostic::warning(format!(
                        "reference in `{field}` of `{referrer}` has fields besides `@id`"
                    ))
                    .with_code(ErrorCode::E103)
                    .with_subject(referrer)
                    .with_help("extra fields were ignored"),
                );
            }
            id
        }
        _ => {
            diagnostics.emit(
                Diagnostic::warning(format!(
                    "`{field}` of `{referrer}` is not a reference: {value}"
                ))
                .with_code(ErrorCode::E103)
                .with_subject(referrer),
            );
            None
        }
    }
}

/// Reads a single reference or a list of references.
fn references(
    value: Option<&Value>,
    referrer: ElementId,
    field: &str,
    diagnostics: &mut DiagnosticCollector,
) -> Vec<ElementId> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| reference(item, referrer, field, diagnostics))
            .collect(),
        Some(single) => reference(single, referrer, field, diagnostics)
            .into_iter()
            .collect(),
    }
}

fn resolve_references(
    id: ElementId,
    refs: PendingRefs,
    elements: &mut IndexMap<ElementId, Element>,
    diagnostics: &mut DiagnosticCollector,
) {
    let owner = match refs.owner {
        Some(owner) if elements.contains_key(&owner) => Some(owner),
        Some(owner) => {
            diagnostics.emit(
                Diagnostic::warning(format!("owner `{owner}` of `{id}` does not resolve"))
                    .with_code(ErrorCode::E101)
                    .with_subject(id)
                    .with_help("the element is treated as an owned root"),
            );
            None
        }
        None => None,
    };

    let mut keep = |field: &str, code: ErrorCode, ids: Vec<ElementId>| -> Vec<ElementId> {
        ids.into_iter()
            .filter(|target| {
                let found = elements.contains_key(target);
                if !found {
                    diagnostics.emit(
                        Diagnostic::warning(format!(
                            "`{field}` entry `{target}` of `{id}` does not resolve"
                        ))
                        .with_code(code)
                        .with_subject(id)
                        .with_related([*target])
                        .with_help("the entry was dropped"),
                    );
                }
                found
            })
            .collect()
    };
    let owned_elements = keep("ownedElement", ErrorCode::E102, refs.owned_elements);
    let sources = keep("source", ErrorCode::E100, refs.sources);
    let targets = keep("target", ErrorCode::E100, refs.targets);

    if let Some(element) = elements.get_mut(&id) {
        element.owner = owner;
        element.owned_elements = owned_elements;
        element.sources = sources;
        element.targets = targets;
    }
}

/// Fills the `through` / `reverse` index of every relationship endpoint.
fn add_relationships(elements: &mut IndexMap<ElementId, Element>) {
    let edges: Vec<(RelationshipKind, Vec<ElementId>, Vec<ElementId>)> = elements
        .values()
        .filter(|element| element.is_relationship())
        .map(|element| {
            (
                RelationshipKind::from_metatype(element.metatype()),
                element.sources.clone(),
                element.targets.clone(),
            )
        })
        .collect();

    for (kind, sources, targets) in edges {
        for source in &sources {
            for target in &targets {
                if let Some(element) = elements.get_mut(source) {
                    entry(element, &kind).through.push(*target);
                }
                if let Some(element) = elements.get_mut(target) {
                    entry(element, &kind).reverse.push(*source);
                }
            }
        }
    }
}

fn entry<'e>(element: &'e mut Element, kind: &RelationshipKind) -> &'e mut RelatedElements {
    element.relationships.entry(kind.clone()).or_default()
}

/// Finds every owner chain that revisits an element.
fn find_ownership_cycles(elements: &IndexMap<ElementId, Element>) -> Vec<Vec<ElementId>> {
    let mut finished: HashSet<ElementId> = HashSet::new();
    let mut cycles = Vec::new();

    for start in elements.keys() {
        let mut path: Vec<ElementId> = Vec::new();
        let mut current = Some(*start);
        while let Some(id) = current {
            if finished.contains(&id) {
                break;
            }
            if let Some(pos) = path.iter().position(|seen| *seen == id) {
                let cycle = path[pos..].to_vec();
                warn!(length = cycle.len(); "Ownership cycle through `{id}`");
                cycles.push(cycle);
                break;
            }
            path.push(id);
            current = elements.get(&id).and_then(Element::owner);
        }
        finished.extend(path);
    }
    debug!(cycles = cycles.len(); "Ownership chains checked");
    cycles
}
