//! Configuration types for instance generation.
//!
//! All types implement [`serde::Deserialize`] so a front end can load them
//! from TOML or any other serde format.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration root.
//! - [`GenerationConfig`] - How bounds are resolved and sequences are built.
//!
//! # Example
//!
//! ```
//! # use instaweave::config::{AppConfig, ResolutionStrategy};
//! let config = AppConfig::default();
//! assert_eq!(config.generation().strategy(), ResolutionStrategy::Random);
//! assert_eq!(config.generation().unbounded_extent(), 5);
//! ```

use serde::Deserialize;

use crate::set_builders::Sharing;

const DEFAULT_UNBOUNDED_EXTENT: u64 = 5;
const DEFAULT_MAX_SEQUENCE_DEPTH: usize = 8;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Generation configuration section.
    #[serde(default)]
    generation: GenerationConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the given generation settings.
    pub fn new(generation: GenerationConfig) -> Self {
        Self { generation }
    }

    /// Returns the generation configuration.
    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Returns the generation configuration for in-place overrides.
    pub fn generation_mut(&mut self) -> &mut GenerationConfig {
        &mut self.generation
    }
}

/// How a concrete count is chosen inside a declared bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Always the lower bound. Deterministic.
    Minimum,
    /// Uniformly inside the bound.
    #[default]
    Random,
}

/// Settings of one generation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    strategy: ResolutionStrategy,
    seed: Option<u64>,
    /// Width of the window used for unbounded upper bounds.
    unbounded_extent: u64,
    max_sequence_depth: usize,
    sharing: Sharing,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            strategy: ResolutionStrategy::default(),
            seed: None,
            unbounded_extent: DEFAULT_UNBOUNDED_EXTENT,
            max_sequence_depth: DEFAULT_MAX_SEQUENCE_DEPTH,
            sharing: Sharing::default(),
        }
    }
}

impl GenerationConfig {
    /// Returns the resolution strategy.
    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Returns the RNG seed, `None` for OS entropy.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns how far above the lower bound an unbounded bound may resolve.
    pub fn unbounded_extent(&self) -> u64 {
        self.unbounded_extent
    }

    /// Returns the deepest feature path that is expanded.
    pub fn max_sequence_depth(&self) -> usize {
        self.max_sequence_depth
    }

    /// Returns whether child instances are partitioned or shared between parents.
    pub fn sharing(&self) -> Sharing {
        self.sharing
    }

    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_unbounded_extent(mut self, extent: u64) -> Self {
        self.unbounded_extent = extent;
        self
    }

    pub fn with_max_sequence_depth(mut self, depth: usize) -> Self {
        self.max_sequence_depth = depth;
        self
    }

    pub fn with_sharing(mut self, sharing: Sharing) -> Self {
        self.sharing = sharing;
        self
    }
}
