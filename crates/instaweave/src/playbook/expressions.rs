//! Phase 4: sequences for expression-valued features.
//!
//! Expression templates extend the feature templates of phase 3. How many
//! values an expression contributes under a parent is up to the
//! [`ExpressionHook`]; the default defers to the expression's multiplicity.

use log::info;
use rand::Rng;

use instaweave_core::{
    Model,
    element::Element,
    error::ModelError,
    phase::Phase,
};

use super::{RunState, sequences::Builder};
use crate::{
    lpg::Projection,
    resolution::{Resolution, Resolver},
    set_builders::{InstanceSequence, NameHints, Quantity, Sharing},
    templates::{SequenceTemplate, discover_expression_templates},
};

const PHASE: Phase = Phase::ExpressionSequences;

/// Decides how many values an expression yields under one parent sequence.
///
/// Returning `Ok(None)` falls back to the expression's declared
/// multiplicity. An error aborts phase 4.
///
/// # Examples
///
/// ```
/// use instaweave::{ExpressionHook, set_builders::{InstanceSequence, Quantity}};
/// use instaweave_core::{element::Element, error::ModelError};
///
/// /// Every expression evaluates to a single value.
/// struct Scalar;
///
/// impl ExpressionHook for Scalar {
///     fn quantity(
///         &self,
///         _expression: &Element,
///         _parent: &InstanceSequence,
///     ) -> Result<Option<Quantity>, ModelError> {
///         Ok(Some(Quantity::ONE))
///     }
/// }
/// ```
pub trait ExpressionHook {
    fn quantity(
        &self,
        expression: &Element,
        parent: &InstanceSequence,
    ) -> Result<Option<Quantity>, ModelError>;
}

/// Sizes expressions by multiplicity alone; nothing is evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicityOnly;

impl ExpressionHook for MultiplicityOnly {
    fn quantity(
        &self,
        _expression: &Element,
        _parent: &InstanceSequence,
    ) -> Result<Option<Quantity>, ModelError> {
        Ok(None)
    }
}

pub(super) struct Context<'a, 'm> {
    pub(super) model: &'m Model,
    pub(super) part_definition: &'a Projection<'m>,
    pub(super) templates: &'a [SequenceTemplate],
    pub(super) max_depth: usize,
    pub(super) hints: &'a NameHints,
    pub(super) sharing: Sharing,
    pub(super) resolver: &'a Resolver,
    pub(super) hook: &'a dyn ExpressionHook,
}

pub(super) fn run<R: Rng>(
    ctx: Context<'_, '_>,
    rng: &mut R,
    state: &mut RunState,
) -> Result<(), ModelError> {
    let discovered = discover_expression_templates(ctx.model, ctx.templates, ctx.max_depth);
    state.notes.extend(discovered.notes);
    info!(templates = discovered.templates.len(); "Expression templates ready");

    let resolver = ctx.resolver;
    let hook = ctx.hook;
    let mut builder = Builder {
        model: ctx.model,
        part_definition: ctx.part_definition,
        hints: ctx.hints,
        sharing: ctx.sharing,
        phase: PHASE,
        state,
    };
    for template in &discovered.templates {
        builder.build(
            template,
            &mut |expression: &Element,
                  parent: &InstanceSequence|
                  -> Result<Resolution, ModelError> {
                match hook.quantity(expression, parent)? {
                    Some(count) => Ok(Resolution { count, note: None }),
                    None => Ok(resolver.resolve(expression, PHASE, rng)),
                }
            },
        )?;
    }
    Ok(())
}
