//! Instaweave - generates concrete (M0) instance populations from a
//! SysML-style type model.
//!
//! A model is loaded into an element graph, projected into the relationship
//! views the generator needs, and then walked by a five-phase [`Playbook`]
//! that chooses counts inside declared multiplicities, rolls subtype
//! populations into their supertypes, and arranges instances into nested
//! sequences along feature paths.

pub mod config;
pub mod lpg;
pub mod resolution;
pub mod set_builders;
pub mod templates;

mod error;
mod playbook;

pub use instaweave_core::{element, identifier, multiplicity, phase};

pub use error::InstaweaveError;
pub use playbook::{ExpressionHook, Interpretation, MultiplicityOnly, Playbook, run_playbook};

use std::{fs, path::Path};

use log::{debug, info};

use instaweave_core::Model;

use config::AppConfig;
use set_builders::NameHints;

/// Loads models and runs playbooks with one configuration.
///
/// # Examples
///
/// ```rust
/// use instaweave::{Generator, config::AppConfig};
///
/// let json = r#"[{"@id": "engine", "@type": "PartDefinition", "name": "Engine"}]"#;
/// let generator = Generator::new(AppConfig::default());
///
/// let model = generator.load_str(json).expect("Failed to load");
/// let result = generator.generate(&model).expect("Failed to generate");
/// assert_eq!(result.sequences("engine".into()).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Generator {
    config: AppConfig,
    hints: NameHints,
}

impl Generator {
    /// Create a generator with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            hints: NameHints::new(),
        }
    }

    /// Use `hints` to name generated instances.
    pub fn with_name_hints(mut self, hints: NameHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load a model from a JSON array of element records.
    ///
    /// # Errors
    ///
    /// Returns [`InstaweaveError::Load`] when the text is not JSON or not an
    /// array. Individual bad records are reported in the model's diagnostics
    /// instead.
    pub fn load_str(&self, json: &str) -> Result<Model, InstaweaveError> {
        let model = Model::from_json(json)?;
        debug!(
            elements = model.len(),
            diagnostics = model.diagnostics().len();
            "Model parsed"
        );
        Ok(model)
    }

    /// Load a model from a JSON file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Model, InstaweaveError> {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Reading model");
        let json = fs::read_to_string(path)?;
        self.load_str(&json)
    }

    /// Run every playbook phase over `model`.
    ///
    /// # Errors
    ///
    /// Returns [`InstaweaveError::Phase`] when a phase meets a fatal
    /// structural problem, such as an ownership or generalization cycle.
    pub fn generate(&self, model: &Model) -> Result<Interpretation, InstaweaveError> {
        let generation = self.config.generation().clone();
        info!(
            strategy:? = generation.strategy(),
            seed:? = generation.seed();
            "Generating instances"
        );
        let interpretation = Playbook::from_config(model, generation, self.hints.clone()).run()?;
        info!(
            keys = interpretation.instances.len(),
            notes = interpretation.notes.len();
            "Instances generated"
        );
        Ok(interpretation)
    }
}
