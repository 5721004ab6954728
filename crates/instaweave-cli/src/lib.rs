//! CLI logic for the instaweave generator.
//!
//! Loads a model, runs the playbook and writes the interpretation as JSON.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Strategy};

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
};

use log::info;

use instaweave::{Generator, InstaweaveError, set_builders::NameHints};
use instaweave_core::error::{Diagnostic, LoadError};

/// Run the instaweave CLI application
///
/// Reads the model named by `args.input`, generates instances and writes
/// the interpretation to `args.output`.
///
/// Returns the diagnostics of loading and generation so the caller can
/// report them.
///
/// # Errors
///
/// Returns `InstaweaveError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed model or name-hint JSON
/// - Structural problems that abort a phase
pub fn run(args: &Args) -> Result<Vec<Diagnostic>, InstaweaveError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing model"
    );

    let mut app_config = config::load_config(args.config.as_ref())?;
    config::apply_overrides(&mut app_config, args);

    let hints = match &args.name_hints {
        Some(path) => load_name_hints(path)?,
        None => NameHints::new(),
    };

    let generator = Generator::new(app_config).with_name_hints(hints);
    let model = generator.load_file(&args.input)?;
    let interpretation = generator.generate(&model)?;

    let mut writer = BufWriter::new(File::create(&args.output)?);
    serde_json::to_writer_pretty(&mut writer, &interpretation).map_err(io::Error::from)?;
    writer.flush()?;

    info!(output_file = args.output; "Interpretation written");

    let mut diagnostics = model.diagnostics().to_vec();
    diagnostics.extend(interpretation.notes);
    Ok(diagnostics)
}

fn load_name_hints(path: &str) -> Result<NameHints, InstaweaveError> {
    info!(path = path; "Reading name hints");
    let json = fs::read_to_string(path)?;
    let hints = serde_json::from_str(&json).map_err(LoadError::from)?;
    Ok(hints)
}
