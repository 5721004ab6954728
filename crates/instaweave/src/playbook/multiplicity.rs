//! Phase 1: a base count and fresh instances for every definition.

use log::trace;
use rand::Rng;

use instaweave_core::phase::Phase;

use super::RunState;
use crate::{lpg::Projection, resolution::Resolver, set_builders::NameHints};

pub(super) fn run<R: Rng>(
    part_definition: &Projection<'_>,
    resolver: &Resolver,
    hints: &NameHints,
    rng: &mut R,
    state: &mut RunState,
) {
    for element in part_definition.elements().filter(|e| e.is_definition()) {
        let resolution = resolver.resolve(element, Phase::Multiplicities, rng);
        if let Some(note) = resolution.note {
            state.notes.emit(note);
        }
        let own = state.create(element, resolution.count, hints);
        trace!(element = element.id().to_string(), count = own.len(); "Base count allocated");
        state.multiplicities.insert(element.id(), resolution.count.get());
        state.set_pool(element.id(), own);
    }
}
