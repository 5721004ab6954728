//! Command-line argument definitions for the instaweave CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the input model and output file, the
//! configuration file, overrides for the generation settings, and logging
//! verbosity.

use clap::{Parser, ValueEnum};

use instaweave::config::ResolutionStrategy;

/// Command-line arguments for the instaweave generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input model, a JSON array of element records
    #[arg(help = "Path to the input model")]
    pub input: String,

    /// Path to the output JSON file
    #[arg(short, long, default_value = "instances.json")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// How counts are chosen inside multiplicity bounds
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Seed for the random strategy
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON object mapping type ids to instance names
    #[arg(long)]
    pub name_hints: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Command-line spelling of [`ResolutionStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Always the lower bound
    Minimum,
    /// Uniformly inside the bound
    Random,
}

impl From<Strategy> for ResolutionStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Minimum => ResolutionStrategy::Minimum,
            Strategy::Random => ResolutionStrategy::Random,
        }
    }
}
