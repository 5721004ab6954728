//! Phase 0: interpret the relationship graph.

use log::{debug, info};

use instaweave_core::{
    Model,
    error::{Diagnostic, ErrorCode, ModelError},
    phase::Phase,
};

use super::{Projections, RunState, structural};
use crate::{
    lpg::{Lpg, ProjectionName},
    templates::{SequenceTemplate, discover_feature_templates},
};

const PHASE: Phase = Phase::InterpretEdges;

pub(super) fn run<'m>(
    model: &'m Model,
    lpg: &Lpg<'m>,
    max_depth: usize,
    state: &mut RunState,
) -> Result<(Projections<'m>, Vec<SequenceTemplate>), ModelError> {
    if let Some(cycle) = model.ownership_cycles().first() {
        return Err(structural(
            PHASE,
            cycle.clone(),
            format!("ownership cycle through {} elements", cycle.len()),
        ));
    }

    for (id, edge) in lpg.self_loops() {
        state.notes.emit(
            Diagnostic::note(format!("`{id}` is related to itself by {}", edge.kind()))
                .with_code(ErrorCode::E302)
                .with_subject(id)
                .with_related([edge.relationship()])
                .with_phase(PHASE),
        );
    }
    for id in lpg.dangling_relationships() {
        state.notes.emit(
            Diagnostic::note(format!("relationship `{id}` has no resolvable source or target"))
                .with_code(ErrorCode::E100)
                .with_subject(*id)
                .with_phase(PHASE),
        );
    }

    let part_typing = lpg.projection(ProjectionName::PartTyping);
    let part_definition = lpg.projection(ProjectionName::PartDefinition);
    debug!(
        typing_edges = part_typing.edge_count(),
        definition_edges = part_definition.edge_count();
        "Projections materialized"
    );

    let discovered = discover_feature_templates(model, max_depth);
    state.notes.extend(discovered.notes);
    info!(templates = discovered.templates.len(); "Feature templates ready");

    Ok((
        Projections {
            part_typing,
            part_definition,
        },
        discovered.templates,
    ))
}
