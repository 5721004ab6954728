//! Phase 3: nested instance sequences along the feature templates.
//!
//! Templates arrive in pre-order, so the sequences of a template's prefix
//! are always built before the template itself and serve as its parents.
//! Child instances come from the pool of the child's type through a
//! per-type cursor; when a pool runs dry, new instances are created and
//! added to the pools of the type and all of its supertypes, and their
//! counts are raised to match. A definition root only spans the instances
//! its cursor has not reached, so no instance gets its features twice.

use std::collections::HashSet;

use log::{debug, trace};

use instaweave_core::{
    Model,
    element::Element,
    error::ModelError,
    identifier::ElementId,
    phase::Phase,
};

use super::RunState;
use crate::{
    lpg::Projection,
    resolution::Resolution,
    set_builders::{Instance, InstanceSequence, NameHints, Quantity, Sharing, build_sequences},
    templates::{SequenceTemplate, instance_type},
};

/// Sizes the children of one parent sequence.
pub(super) type QuantityFn<'f> =
    dyn FnMut(&Element, &InstanceSequence) -> Result<Resolution, ModelError> + 'f;

pub(super) struct Builder<'a, 'm> {
    pub(super) model: &'m Model,
    pub(super) part_definition: &'a Projection<'m>,
    pub(super) hints: &'a NameHints,
    pub(super) sharing: Sharing,
    pub(super) phase: Phase,
    pub(super) state: &'a mut RunState,
}

impl<'m> Builder<'_, 'm> {
    /// Builds and stores the sequences of one template.
    pub(super) fn build(
        &mut self,
        template: &SequenceTemplate,
        quantity: &mut QuantityFn<'_>,
    ) -> Result<(), ModelError> {
        let Some(tail) = template.tail() else {
            return Ok(());
        };
        let element = self.element(tail)?;
        let child_type = instance_type(self.model, tail);

        let Some(prefix) = template.prefix() else {
            if element.is_definition() {
                // Instances a feature path already drew keep their children
                // there; the root spans the rest of the pool and keeps its entry.
                let placed = self.state.cursors.get(&tail).copied().unwrap_or(0);
                let roots: Vec<InstanceSequence> = self
                    .state
                    .pool(tail)
                    .iter()
                    .skip(placed)
                    .cloned()
                    .map(InstanceSequence::single)
                    .collect();
                self.state.by_template.insert(template.clone(), roots);
                return Ok(());
            }
            let count = self.quantity_for(element, &InstanceSequence::default(), quantity)?;
            let roots: Vec<InstanceSequence> = self
                .draw(child_type, count)?
                .into_iter()
                .map(InstanceSequence::single)
                .collect();
            self.store(template, tail, roots);
            return Ok(());
        };

        let parents = self
            .state
            .by_template
            .get(&SequenceTemplate::new(prefix.to_vec()))
            .cloned()
            .ok_or_else(|| {
                ModelError::configuration(format!("template {template} reached before its prefix"))
            })?;
        let mut quantities = Vec::with_capacity(parents.len());
        for parent in &parents {
            quantities.push(self.quantity_for(element, parent, quantity)?);
        }
        let total = match self.sharing {
            Sharing::Partitioned => quantities.iter().map(|q| q.get()).sum(),
            Sharing::Shared => quantities.iter().map(|q| q.get()).max().unwrap_or(0),
        };
        let children = self.draw(child_type, Quantity::new(total))?;
        let sequences = build_sequences(&parents, &children, &quantities, self.sharing)?;
        self.store(template, tail, sequences);
        Ok(())
    }

    fn store(&mut self, template: &SequenceTemplate, key: ElementId, sequences: Vec<InstanceSequence>) {
        trace!(template = template.to_string(), sequences = sequences.len(); "Template built");
        self.state.by_template.insert(template.clone(), sequences.clone());
        self.state.write(key, sequences);
    }

    /// Asks `quantity`, recording a defaulting note once per element.
    fn quantity_for(
        &mut self,
        element: &Element,
        parent: &InstanceSequence,
        quantity: &mut QuantityFn<'_>,
    ) -> Result<Quantity, ModelError> {
        let resolution = quantity(element, parent)?;
        if let Some(note) = resolution.note {
            if self.state.noted.insert(element.id()) {
                self.state.notes.emit(note);
            }
        }
        Ok(resolution.count)
    }

    /// Takes the next `count` unused instances of `type_id`.
    fn draw(&mut self, type_id: ElementId, count: Quantity) -> Result<Vec<Instance>, ModelError> {
        let start = self.state.cursors.get(&type_id).copied().unwrap_or(0);
        let end = start.saturating_add(usize::try_from(count.get()).unwrap_or(usize::MAX));
        let available = self.state.pool(type_id).len();

        if end > available {
            let type_element = self.element(type_id)?;
            let shortfall = Quantity::new((end - available) as u64);
            let created = self.state.create(type_element, shortfall, self.hints);
            self.state.extend_pool(type_id, &created);
            let supertypes = self.supertypes(type_id);
            for supertype in &supertypes {
                self.state.extend_pool(*supertype, &created);
            }
            debug!(
                element = type_id.to_string(),
                created = created.len(),
                supertypes = supertypes.len(),
                phase = self.phase.number();
                "Pool exhausted, instances created"
            );
        }

        self.state.cursors.insert(type_id, end);
        Ok(self.state.pool(type_id)[start..end].to_vec())
    }

    /// Every transitive supertype of `type_id`, nearest first.
    fn supertypes(&self, type_id: ElementId) -> Vec<ElementId> {
        let mut found: Vec<ElementId> = Vec::new();
        let mut seen: HashSet<ElementId> = HashSet::from([type_id]);
        let mut stack = self.part_definition.successors(type_id);
        stack.reverse();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            found.push(next);
            let mut parents = self.part_definition.successors(next);
            parents.reverse();
            stack.extend(parents);
        }
        found
    }

    fn element(&self, id: ElementId) -> Result<&'m Element, ModelError> {
        self.model
            .get(id)
            .ok_or_else(|| ModelError::configuration(format!("`{id}` is not in the model")))
    }
}
