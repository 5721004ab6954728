//! The five-phase instance-generation playbook.
//!
//! A [`Playbook`] owns everything a run mutates: the instances-by-type
//! mapping, the per-type pools and cursors, the instance counters and the
//! notes. The model and its LPG are only read.
//!
//! Phases run strictly in order, each exactly once:
//!
//! 0. [`Playbook::interpret_edges`]
//! 1. [`Playbook::resolve_multiplicities`]
//! 2. [`Playbook::rollup`]
//! 3. [`Playbook::build_sequences`]
//! 4. [`Playbook::build_expression_sequences`]
//!
//! [`Playbook::run`] executes whatever phases remain and returns the
//! [`Interpretation`].

mod expressions;
mod interpret;
mod multiplicity;
mod rollup;
mod sequences;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;

use instaweave_core::{
    Model,
    element::Element,
    error::{Diagnostic, DiagnosticCollector, ModelError},
    identifier::ElementId,
    phase::Phase,
};

use crate::{
    InstaweaveError,
    config::GenerationConfig,
    lpg::{Lpg, Projection},
    resolution::{Resolution, Resolver},
    set_builders::{
        Instance, InstanceCounters, InstanceSequence, NameHints, Quantity, create_instances,
    },
    templates::SequenceTemplate,
};

pub use expressions::{ExpressionHook, MultiplicityOnly};

/// The result of a playbook run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Interpretation {
    /// Instance sequences per element id.
    pub instances: IndexMap<ElementId, Vec<InstanceSequence>>,
    /// Chosen (and rolled-up) instance count per type.
    pub multiplicities: IndexMap<ElementId, u64>,
    /// Non-fatal findings of the run.
    pub notes: Vec<Diagnostic>,
}

impl Interpretation {
    /// Sequences stored under `id`; empty when there are none.
    pub fn sequences(&self, id: ElementId) -> &[InstanceSequence] {
        self.instances.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Projections materialized by phase 0.
#[derive(Debug)]
struct Projections<'m> {
    part_typing: Projection<'m>,
    part_definition: Projection<'m>,
}

/// Mutable state threaded through the phases.
#[derive(Debug, Default)]
struct RunState {
    instances: IndexMap<ElementId, Vec<InstanceSequence>>,
    multiplicities: IndexMap<ElementId, u64>,
    /// Flat instances available per type, in creation order.
    pools: HashMap<ElementId, Vec<Instance>>,
    /// Next unused pool position per type.
    cursors: HashMap<ElementId, usize>,
    counters: InstanceCounters,
    /// Sequences built per template, reused as parents of longer templates.
    by_template: HashMap<SequenceTemplate, Vec<InstanceSequence>>,
    /// Keys written by phase 3 or 4.
    written: HashSet<ElementId>,
    /// Elements whose defaulted bound was already reported in phase 3/4.
    noted: HashSet<ElementId>,
    notes: DiagnosticCollector,
}

impl RunState {
    fn pool(&self, type_id: ElementId) -> &[Instance] {
        self.pools.get(&type_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces the pool of a type and mirrors it into the mapping.
    fn set_pool(&mut self, type_id: ElementId, pool: Vec<Instance>) {
        if !self.written.contains(&type_id) {
            self.instances.insert(
                type_id,
                pool.iter().cloned().map(InstanceSequence::single).collect(),
            );
        }
        self.pools.insert(type_id, pool);
    }

    /// Appends instances to the pool of a type and to its mapping entry.
    ///
    /// A type with a resolved count keeps that count equal to its pool.
    fn extend_pool(&mut self, type_id: ElementId, added: &[Instance]) {
        if !self.written.contains(&type_id) {
            self.instances
                .entry(type_id)
                .or_default()
                .extend(added.iter().cloned().map(InstanceSequence::single));
        }
        let pool = self.pools.entry(type_id).or_default();
        pool.extend_from_slice(added);
        if let Some(count) = self.multiplicities.get_mut(&type_id) {
            *count = pool.len() as u64;
        }
    }

    /// Stores sequences under `key`: the first phase 3/4 write replaces,
    /// later writes append.
    fn write(&mut self, key: ElementId, sequences: Vec<InstanceSequence>) {
        if self.written.insert(key) {
            self.instances.insert(key, sequences);
        } else {
            self.instances.entry(key).or_default().extend(sequences);
        }
    }

    fn create(
        &mut self,
        element: &Element,
        quantity: Quantity,
        hints: &NameHints,
    ) -> Vec<Instance> {
        create_instances(element, quantity, &mut self.counters, hints)
    }
}

/// A single instance-generation run over one model.
///
/// # Examples
///
/// Stepping through the phases one at a time:
///
/// ```
/// use instaweave::{Playbook, config::{GenerationConfig, ResolutionStrategy}};
/// use instaweave::set_builders::NameHints;
/// use instaweave_core::{Model, identifier::ElementId};
/// use rand::{SeedableRng, rngs::StdRng};
/// use serde_json::json;
///
/// let model = Model::load(vec![
///     json!({"@id": "engine", "@type": "PartDefinition", "name": "Engine",
///            "lowerBound": 1, "upperBound": 3}),
/// ]);
/// let config = GenerationConfig::default().with_strategy(ResolutionStrategy::Minimum);
/// let mut playbook = Playbook::new(&model, config, NameHints::new(), StdRng::seed_from_u64(7));
///
/// playbook.interpret_edges().unwrap();
/// playbook.resolve_multiplicities().unwrap();
/// assert_eq!(playbook.multiplicities()[&ElementId::new("engine")], 1);
///
/// let interpretation = playbook.run().unwrap();
/// assert_eq!(interpretation.sequences("engine".into())[0].to_string(), "(Engine#1)");
/// ```
pub struct Playbook<'m, R> {
    model: &'m Model,
    lpg: Lpg<'m>,
    config: GenerationConfig,
    resolver: Resolver,
    hints: NameHints,
    hook: Box<dyn ExpressionHook + 'm>,
    rng: R,
    completed: Option<Phase>,
    projections: Option<Projections<'m>>,
    templates: Vec<SequenceTemplate>,
    state: RunState,
}

impl<'m> Playbook<'m, StdRng> {
    /// A playbook seeded from `config.seed()`, or from OS entropy without one.
    pub fn from_config(model: &'m Model, config: GenerationConfig, hints: NameHints) -> Self {
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(model, config, hints, rng)
    }
}

impl<'m, R: Rng> Playbook<'m, R> {
    pub fn new(model: &'m Model, config: GenerationConfig, hints: NameHints, rng: R) -> Self {
        let resolver = Resolver::new(config.strategy(), config.unbounded_extent());
        Self {
            model,
            lpg: Lpg::new(model),
            config,
            resolver,
            hints,
            hook: Box::new(MultiplicityOnly),
            rng,
            completed: None,
            projections: None,
            templates: Vec::new(),
            state: RunState::default(),
        }
    }

    /// Replaces the hook that sizes expression sequences in phase 4.
    pub fn with_expression_hook(mut self, hook: impl ExpressionHook + 'm) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn lpg(&self) -> &Lpg<'m> {
        &self.lpg
    }

    /// The last phase that completed.
    pub fn completed(&self) -> Option<Phase> {
        self.completed
    }

    /// The Part Typing Graph, once phase 0 has run.
    pub fn part_typing_graph(&self) -> Option<&Projection<'m>> {
        self.projections.as_ref().map(|p| &p.part_typing)
    }

    /// The Part Definition Graph, once phase 0 has run.
    pub fn part_definition_graph(&self) -> Option<&Projection<'m>> {
        self.projections.as_ref().map(|p| &p.part_definition)
    }

    /// Feature templates discovered by phase 0.
    pub fn templates(&self) -> &[SequenceTemplate] {
        &self.templates
    }

    pub fn instances(&self) -> &IndexMap<ElementId, Vec<InstanceSequence>> {
        &self.state.instances
    }

    pub fn multiplicities(&self) -> &IndexMap<ElementId, u64> {
        &self.state.multiplicities
    }

    pub fn notes(&self) -> &[Diagnostic] {
        self.state.notes.diagnostics()
    }

    /// Phase 0: materialize projections, report odd edges, find templates.
    pub fn interpret_edges(&mut self) -> Result<(), InstaweaveError> {
        let phase = Phase::InterpretEdges;
        self.begin(phase)?;
        let (projections, templates) = interpret::run(
            self.model,
            &self.lpg,
            self.config.max_sequence_depth(),
            &mut self.state,
        )
        .map_err(|err| InstaweaveError::in_phase(phase, err))?;
        self.projections = Some(projections);
        self.templates = templates;
        self.finish(phase);
        Ok(())
    }

    /// Phase 1: choose and allocate a base count per definition.
    pub fn resolve_multiplicities(&mut self) -> Result<(), InstaweaveError> {
        let phase = Phase::Multiplicities;
        self.begin(phase)?;
        let projections = materialized(&self.projections, phase)?;
        multiplicity::run(
            &projections.part_definition,
            &self.resolver,
            &self.hints,
            &mut self.rng,
            &mut self.state,
        );
        self.finish(phase);
        Ok(())
    }

    /// Phase 2: roll subtype pools into supertypes, then fill unconnected
    /// elements.
    pub fn rollup(&mut self) -> Result<(), InstaweaveError> {
        let phase = Phase::Rollup;
        self.begin(phase)?;
        let projections = materialized(&self.projections, phase)?;
        rollup::run(&projections.part_definition, &self.hints, &mut self.state)
            .map_err(|err| InstaweaveError::in_phase(phase, err))?;
        rollup::fill_unconnected(
            &self.lpg,
            &projections.part_typing,
            &self.templates,
            &self.hints,
            &mut self.state,
        );
        self.finish(phase);
        Ok(())
    }

    /// Phase 3: build nested sequences along the feature templates.
    pub fn build_sequences(&mut self) -> Result<(), InstaweaveError> {
        let phase = Phase::Sequences;
        self.begin(phase)?;
        let projections = materialized(&self.projections, phase)?;
        let mut builder = sequences::Builder {
            model: self.model,
            part_definition: &projections.part_definition,
            hints: &self.hints,
            sharing: self.config.sharing(),
            phase,
            state: &mut self.state,
        };
        let resolver = &self.resolver;
        let rng = &mut self.rng;
        for template in &self.templates {
            builder
                .build(
                    template,
                    &mut |feature: &Element,
                          _parent: &InstanceSequence|
                          -> Result<Resolution, ModelError> {
                        Ok(resolver.resolve(feature, phase, rng))
                    },
                )
                .map_err(|err| InstaweaveError::in_phase(phase, err))?;
        }
        self.finish(phase);
        Ok(())
    }

    /// Phase 4: extend sequences with expression-valued features.
    pub fn build_expression_sequences(&mut self) -> Result<(), InstaweaveError> {
        let phase = Phase::ExpressionSequences;
        self.begin(phase)?;
        let projections = materialized(&self.projections, phase)?;
        expressions::run(
            expressions::Context {
                model: self.model,
                part_definition: &projections.part_definition,
                templates: &self.templates,
                max_depth: self.config.max_sequence_depth(),
                hints: &self.hints,
                sharing: self.config.sharing(),
                resolver: &self.resolver,
                hook: self.hook.as_ref(),
            },
            &mut self.rng,
            &mut self.state,
        )
        .map_err(|err| InstaweaveError::in_phase(phase, err))?;
        self.finish(phase);
        Ok(())
    }

    /// Runs every remaining phase and returns the interpretation.
    pub fn run(mut self) -> Result<Interpretation, InstaweaveError> {
        for phase in Phase::ALL {
            if self.completed.is_some_and(|done| done >= phase) {
                continue;
            }
            match phase {
                Phase::InterpretEdges => self.interpret_edges()?,
                Phase::Multiplicities => self.resolve_multiplicities()?,
                Phase::Rollup => self.rollup()?,
                Phase::Sequences => self.build_sequences()?,
                Phase::ExpressionSequences => self.build_expression_sequences()?,
            }
        }
        Ok(self.into_interpretation())
    }

    /// The state as it stands, whichever phases have run.
    pub fn into_interpretation(self) -> Interpretation {
        Interpretation {
            instances: self.state.instances,
            multiplicities: self.state.multiplicities,
            notes: self.state.notes.finish(),
        }
    }

    fn begin(&self, phase: Phase) -> Result<(), InstaweaveError> {
        if self.completed.is_some_and(|done| done >= phase) {
            return Err(InstaweaveError::PhaseOrder {
                requested: phase,
                reason: "it already ran in this playbook".to_string(),
            });
        }
        if let Some(required) = phase.predecessor() {
            if self.completed != Some(required) {
                return Err(InstaweaveError::PhaseOrder {
                    requested: phase,
                    reason: format!("{required} has not completed"),
                });
            }
        }
        info!(phase = phase.number(); "Starting {phase}");
        Ok(())
    }

    fn finish(&mut self, phase: Phase) {
        self.completed = Some(phase);
        debug!(
            phase = phase.number(),
            keys = self.state.instances.len(),
            notes = self.state.notes.len();
            "Finished {phase}"
        );
    }
}

/// Runs a whole playbook with default settings besides strategy and seed.
///
/// Without a seed the RNG is seeded from OS entropy.
///
/// # Examples
///
/// ```
/// use instaweave::{config::ResolutionStrategy, run_playbook, set_builders::NameHints};
/// use instaweave_core::{Model, identifier::ElementId};
/// use serde_json::json;
///
/// let model = Model::load(vec![
///     json!({"@id": "engine", "@type": "PartDefinition", "name": "Engine",
///            "lowerBound": 1, "upperBound": 3}),
/// ]);
/// let result = run_playbook(&model, ResolutionStrategy::Minimum, NameHints::new(), Some(1)).unwrap();
/// assert_eq!(result.multiplicities[&ElementId::new("engine")], 1);
/// ```
pub fn run_playbook(
    model: &Model,
    strategy: crate::config::ResolutionStrategy,
    name_hints: NameHints,
    seed: Option<u64>,
) -> Result<Interpretation, InstaweaveError> {
    let config = GenerationConfig::default()
        .with_strategy(strategy)
        .with_seed(seed);
    Playbook::from_config(model, config, name_hints).run()
}

/// Projections from phase 0; borrowed per field so phases can mutate state.
fn materialized<'a, 'm>(
    projections: &'a Option<Projections<'m>>,
    phase: Phase,
) -> Result<&'a Projections<'m>, InstaweaveError> {
    projections.as_ref().ok_or_else(|| InstaweaveError::PhaseOrder {
        requested: phase,
        reason: "projections have not been materialized".to_string(),
    })
}

/// Convenience for phase code: a structural failure in `phase`.
fn structural(phase: Phase, members: Vec<ElementId>, message: impl Into<String>) -> ModelError {
    ModelError::structural(Some(phase), members, message)
}
