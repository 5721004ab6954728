//! Sequence templates: containment paths through the feature hierarchy.
//!
//! A template is an ordered list of element ids, outermost first. The root
//! is a definition or a top-level feature; every later entry is a feature
//! owned by the previous entry or by that entry's type. Templates are
//! produced in depth-first pre-order, so a template's prefix always comes
//! before the template itself.

use std::{collections::HashMap, fmt};

use log::debug;
use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
};
use serde::Serialize;

use instaweave_core::{
    Model,
    element::{Element, RelationshipKind},
    error::{Diagnostic, ErrorCode},
    identifier::ElementId,
    phase::Phase,
};

/// One containment path, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SequenceTemplate(Vec<ElementId>);

impl SequenceTemplate {
    pub fn new(path: Vec<ElementId>) -> Self {
        Self(path)
    }

    pub fn elements(&self) -> &[ElementId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The innermost element; the key its sequences are stored under.
    pub fn tail(&self) -> Option<ElementId> {
        self.0.last().copied()
    }

    /// Everything but the tail, `None` for roots.
    pub fn prefix(&self) -> Option<&[ElementId]> {
        match self.0.len() {
            0 | 1 => None,
            n => Some(&self.0[..n - 1]),
        }
    }

    fn extended(&self, id: ElementId) -> Self {
        let mut path = self.0.clone();
        path.push(id);
        Self(path)
    }
}

impl fmt::Display for SequenceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.0.iter().map(ElementId::as_string).collect();
        write!(f, "[{}]", ids.join(" > "))
    }
}

/// Templates plus the notes raised while discovering them.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    pub templates: Vec<SequenceTemplate>,
    pub notes: Vec<Diagnostic>,
}

/// The type instances at a template position are drawn from.
///
/// Definitions are their own type; features use their first FeatureTyping
/// target, or themselves when untyped.
pub fn instance_type(model: &Model, id: ElementId) -> ElementId {
    match model.get(id) {
        Some(element) if element.is_definition() => id,
        Some(element) => element.feature_type().unwrap_or(id),
        None => id,
    }
}

/// Discovers every feature containment path of the model.
///
/// Definitions that some feature is typed by are rooted last, each after
/// every typed definition whose paths reach it. Their instances are mostly
/// placed through those paths, so their own root only picks up the rest.
pub fn discover_feature_templates(model: &Model, max_depth: usize) -> TemplateSet {
    let mut set = TemplateSet::default();
    let walk = Walk {
        model,
        max_depth,
        accept: &is_structural_feature,
        phase: Phase::InterpretEdges,
    };
    let (typed, untyped): (Vec<&Element>, Vec<&Element>) = model
        .non_relationships()
        .filter(|element| is_template_root(model, element))
        .partition(|element| is_typed_definition(element));
    for root in untyped {
        walk.expand(SequenceTemplate::new(vec![root.id()]), &mut set);
    }

    let mut per_root: Vec<TemplateSet> = typed
        .iter()
        .map(|root| {
            let mut own = TemplateSet::default();
            walk.expand(SequenceTemplate::new(vec![root.id()]), &mut own);
            own
        })
        .collect();
    for index in reach_order(model, &typed, &per_root) {
        let own = std::mem::take(&mut per_root[index]);
        set.templates.extend(own.templates);
        set.notes.extend(own.notes);
    }
    debug!(
        templates = set.templates.len(),
        typed_roots = typed.len();
        "Feature templates discovered"
    );
    set
}

/// Extends each base template by the expressions hanging off its tail.
///
/// Only the extensions are returned; `base` itself is not repeated.
pub fn discover_expression_templates(
    model: &Model,
    base: &[SequenceTemplate],
    max_depth: usize,
) -> TemplateSet {
    let mut set = TemplateSet::default();
    let walk = Walk {
        model,
        max_depth,
        accept: &Element::is_expression,
        phase: Phase::ExpressionSequences,
    };
    for template in base {
        walk.expand_children(template, &mut set);
    }
    debug!(templates = set.templates.len(); "Expression templates discovered");
    set
}

fn is_structural_feature(element: &Element) -> bool {
    element.is_feature() && !element.is_expression()
}

fn is_template_root(model: &Model, element: &Element) -> bool {
    if !(element.is_definition() || is_structural_feature(element)) {
        return false;
    }
    match element.owner().and_then(|owner| model.get(owner)) {
        Some(owner) => !(owner.is_definition() || owner.is_feature()),
        None => true,
    }
}

fn is_typed_definition(element: &Element) -> bool {
    element.is_definition() && !element.reverse(&RelationshipKind::FeatureTyping).is_empty()
}

/// Orders typed definition roots so each comes after the roots whose
/// templates draw its instances. Inside a cycle the earliest root in model
/// order goes first.
fn reach_order(model: &Model, roots: &[&Element], sets: &[TemplateSet]) -> Vec<usize> {
    let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(roots.len(), 0);
    for _ in roots {
        graph.add_node(());
    }
    let positions: HashMap<ElementId, usize> = roots
        .iter()
        .enumerate()
        .map(|(position, root)| (root.id(), position))
        .collect();
    for (from, own) in sets.iter().enumerate() {
        for template in &own.templates {
            for id in template.elements().iter().skip(1) {
                if let Some(&to) = positions.get(&instance_type(model, *id)) {
                    if to != from {
                        graph.update_edge(NodeIndex::new(from), NodeIndex::new(to), ());
                    }
                }
            }
        }
    }

    let mut placed = vec![false; roots.len()];
    let mut order = Vec::with_capacity(roots.len());
    while order.len() < roots.len() {
        let ready = (0..roots.len()).find(|&position| {
            !placed[position]
                && graph
                    .neighbors_directed(NodeIndex::new(position), Direction::Incoming)
                    .all(|from| placed[from.index()])
        });
        let Some(next) = ready.or_else(|| placed.iter().position(|done| !done)) else {
            break;
        };
        placed[next] = true;
        order.push(next);
    }
    order
}

/// Depth-first template expansion over one kind of child.
struct Walk<'a> {
    model: &'a Model,
    max_depth: usize,
    accept: &'a dyn Fn(&Element) -> bool,
    phase: Phase,
}

impl Walk<'_> {
    /// Records `template`, then its admissible extensions.
    fn expand(&self, template: SequenceTemplate, set: &mut TemplateSet) {
        set.templates.push(template.clone());
        self.expand_children(&template, set);
    }

    fn expand_children(&self, template: &SequenceTemplate, set: &mut TemplateSet) {
        for child in self.children(template) {
            if let Some(next) = self.admit(template, child, &mut set.notes) {
                self.expand(next, set);
            }
        }
    }

    /// Accepted elements owned by the tail or by the tail's type.
    fn children(&self, template: &SequenceTemplate) -> Vec<ElementId> {
        let Some(tail) = template.tail() else {
            return Vec::new();
        };
        let ty = instance_type(self.model, tail);
        let mut owners = vec![tail];
        if ty != tail {
            owners.push(ty);
        }

        let mut found: Vec<ElementId> = Vec::new();
        for owner in owners {
            for id in self.model.owned_by(owner) {
                let accepted = self
                    .model
                    .get(*id)
                    .is_some_and(|element| (self.accept)(element));
                if accepted && !found.contains(id) {
                    found.push(*id);
                }
            }
        }
        found
    }

    /// Returns the extended template, or `None` with a note when the child
    /// would recurse or exceed the depth limit.
    fn admit(
        &self,
        template: &SequenceTemplate,
        child: ElementId,
        notes: &mut Vec<Diagnostic>,
    ) -> Option<SequenceTemplate> {
        if template.len() >= self.max_depth {
            notes.push(
                Diagnostic::note(format!(
                    "feature path {template} reached the depth limit of {}",
                    self.max_depth
                ))
                .with_code(ErrorCode::E304)
                .with_subject(child)
                .with_phase(self.phase),
            );
            return None;
        }
        let child_type = instance_type(self.model, child);
        let recursive = template.elements().iter().any(|id| {
            *id == child || instance_type(self.model, *id) == child_type
        });
        if recursive {
            notes.push(
                Diagnostic::note(format!(
                    "`{child}` repeats a type already on {template}; not expanded"
                ))
                .with_code(ErrorCode::E303)
                .with_subject(child)
                .with_related(template.elements().iter().copied())
                .with_phase(self.phase),
            );
            return None;
        }
        Some(template.extended(child))
    }
}
