//! Choosing a concrete count inside a declared multiplicity.

use log::trace;
use rand::Rng;

use instaweave_core::{
    element::Element,
    error::{Diagnostic, ErrorCode},
    multiplicity::{Declared, Multiplicity, UpperBound},
    phase::Phase,
};

use crate::{config::ResolutionStrategy, set_builders::Quantity};

/// A chosen count plus the note explaining a default, if one was used.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub count: Quantity,
    pub note: Option<Diagnostic>,
}

/// Resolves bounds with a fixed strategy.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    strategy: ResolutionStrategy,
    unbounded_extent: u64,
}

impl Resolver {
    pub fn new(strategy: ResolutionStrategy, unbounded_extent: u64) -> Self {
        Self {
            strategy,
            unbounded_extent,
        }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Picks a count in `bound`.
    ///
    /// An unbounded upper end is treated as `lower + unbounded_extent`.
    ///
    /// # Examples
    ///
    /// ```
    /// use instaweave::{config::ResolutionStrategy, resolution::Resolver};
    /// use instaweave_core::multiplicity::Multiplicity;
    /// use rand::{SeedableRng, rngs::StdRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let resolver = Resolver::new(ResolutionStrategy::Minimum, 5);
    /// assert_eq!(resolver.choose(&Multiplicity::at_least(2), &mut rng), 2);
    ///
    /// let resolver = Resolver::new(ResolutionStrategy::Random, 5);
    /// let count = resolver.choose(&Multiplicity::at_least(2), &mut rng);
    /// assert!((2..=7).contains(&count));
    /// ```
    pub fn choose<R: Rng>(&self, bound: &Multiplicity, rng: &mut R) -> u64 {
        let lower = bound.lower();
        let upper = match bound.upper() {
            UpperBound::Bounded(upper) => upper,
            UpperBound::Unbounded => lower.saturating_add(self.unbounded_extent),
        };
        match self.strategy {
            ResolutionStrategy::Minimum => lower,
            ResolutionStrategy::Random if lower >= upper => lower,
            ResolutionStrategy::Random => rng.random_range(lower..=upper),
        }
    }

    /// Resolves the declared multiplicity of `element`.
    ///
    /// Missing bounds resolve to 1 with an `E201` note; malformed bounds
    /// resolve to 1 with an `E200` warning.
    pub fn resolve<R: Rng>(&self, element: &Element, phase: Phase, rng: &mut R) -> Resolution {
        match element.multiplicity() {
            Declared::Bound(bound) => {
                let count = self.choose(bound, rng);
                trace!(element = element.id().to_string(), count = count; "Bound {bound} resolved");
                Resolution {
                    count: Quantity::new(count),
                    note: None,
                }
            }
            Declared::Missing => Resolution {
                count: Quantity::ONE,
                note: Some(
                    Diagnostic::note(format!(
                        "no multiplicity declared on {element}, using exactly 1"
                    ))
                    .with_code(ErrorCode::E201)
                    .with_subject(element.id())
                    .with_phase(phase),
                ),
            },
            Declared::Malformed(err) => Resolution {
                count: Quantity::ONE,
                note: Some(
                    Diagnostic::warning(format!("malformed multiplicity on {element}: {err}"))
                        .with_code(ErrorCode::E200)
                        .with_subject(element.id())
                        .with_phase(phase)
                        .with_help("multiplicity defaulted to exactly 1"),
                ),
            },
        }
    }
}
