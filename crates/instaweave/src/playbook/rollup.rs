//! Phase 2: roll subtype pools up the generalization hierarchy.
//!
//! Components come from `tarjan_scc`, which emits them supertypes first;
//! walking them in reverse guarantees every subtype's pool is final before
//! its supertypes read it. A supertype's pool is its own instances followed
//! by the union of its direct subtypes' pools. Only the own part is adjusted
//! to satisfy the declared bound.

use std::collections::HashSet;

use log::{debug, trace};
use petgraph::algo::tarjan_scc;

use instaweave_core::{
    error::{Diagnostic, ErrorCode, ModelError},
    identifier::ElementId,
    multiplicity::UpperBound,
    phase::Phase,
};

use super::{RunState, structural};
use crate::{
    lpg::{Lpg, Projection},
    set_builders::{Instance, NameHints, Quantity},
    templates::SequenceTemplate,
};

const PHASE: Phase = Phase::Rollup;

pub(super) fn run(
    part_definition: &Projection<'_>,
    hints: &NameHints,
    state: &mut RunState,
) -> Result<(), ModelError> {
    let mut components = tarjan_scc(part_definition.graph());
    components.reverse();

    for component in components {
        if component.len() > 1 {
            let members: Vec<ElementId> = component
                .iter()
                .map(|idx| part_definition.element(*idx).id())
                .collect();
            let names: Vec<String> = members.iter().map(ElementId::as_string).collect();
            return Err(structural(
                PHASE,
                members,
                format!("generalization cycle between {}", names.join(", ")),
            ));
        }

        let element = part_definition.element(component[0]);
        let id = element.id();
        let subtypes = part_definition.predecessors(id);
        if subtypes.is_empty() {
            continue;
        }
        if !element.is_definition() {
            trace!(element = id.to_string(); "Specialized usage left to sequence building");
            continue;
        }

        let mut inherited: Vec<Instance> = Vec::new();
        for sub in &subtypes {
            for instance in state.pool(*sub) {
                if !inherited.contains(instance) {
                    inherited.push(instance.clone());
                }
            }
        }
        let mut own: Vec<Instance> = state
            .pool(id)
            .iter()
            .filter(|instance| instance.type_id() == id)
            .cloned()
            .collect();

        let (lower, upper) = match element.multiplicity().bound() {
            Some(bound) => (bound.lower(), bound.upper()),
            None => (1, UpperBound::Unbounded),
        };
        let inherited_count = inherited.len() as u64;

        let needed = lower.saturating_sub(inherited_count);
        let have = own.len() as u64;
        if have < needed {
            let extra = state.create(element, Quantity::new(needed - have), hints);
            own.extend(extra);
        }
        if let Some(upper) = upper.finite() {
            let room = upper.saturating_sub(inherited_count);
            if own.len() as u64 > room {
                own.truncate(room as usize);
            }
            if inherited_count > upper {
                state.notes.emit(
                    Diagnostic::note(format!(
                        "{element} has {inherited_count} instances from subtypes, above its upper bound {upper}"
                    ))
                    .with_code(ErrorCode::E202)
                    .with_subject(id)
                    .with_related(subtypes.iter().copied())
                    .with_phase(PHASE),
                );
            }
        }

        trace!(
            element = id.to_string(),
            own = own.len(),
            inherited = inherited.len();
            "Pool rolled up"
        );
        own.extend(inherited);
        state.multiplicities.insert(id, own.len() as u64);
        state.set_pool(id, own);
    }
    Ok(())
}

/// Gives one instance to every type-like element nothing else populates.
///
/// An element qualifies when it is a definition or structural feature, no
/// typing edge points at it, no earlier phase populated it, and it does
/// not sit below the root of any feature template.
pub(super) fn fill_unconnected(
    lpg: &Lpg<'_>,
    part_typing: &Projection<'_>,
    templates: &[SequenceTemplate],
    hints: &NameHints,
    state: &mut RunState,
) {
    let nested: HashSet<ElementId> = templates
        .iter()
        .flat_map(|template| template.elements().iter().skip(1).copied())
        .collect();

    let mut filled = 0usize;
    for element in lpg.elements() {
        let id = element.id();
        let type_like =
            element.is_definition() || (element.is_feature() && !element.is_expression());
        if !type_like || nested.contains(&id) || part_typing.has_incoming(id) {
            continue;
        }
        let populated = state.multiplicities.contains_key(&id)
            || state.instances.get(&id).is_some_and(|seqs| !seqs.is_empty());
        if populated {
            continue;
        }
        let created = state.create(element, Quantity::ONE, hints);
        state.multiplicities.insert(id, 1);
        state.set_pool(id, created);
        filled += 1;
    }
    debug!(filled = filled; "Unconnected elements filled");
}
