//! instaweave CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info, warn};

use instaweave_cli::{
    Args,
    error_adapter::{Reportable, diagnostics_to_reportables, to_reportables},
};

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting instaweave");
    debug!(args:?; "Parsed arguments");

    match instaweave_cli::run(&args) {
        Ok(diagnostics) => {
            for reportable in diagnostics_to_reportables(&diagnostics) {
                warn!("{}", render(&reportable));
            }
            info!(diagnostics = diagnostics.len(); "Completed successfully");
        }
        Err(err) => {
            for reportable in to_reportables(&err) {
                error!("{}", render(&reportable));
            }
            process::exit(1);
        }
    }
}

fn render(reportable: &Reportable<'_>) -> String {
    let reporter = miette::GraphicalReportHandler::new();
    let mut writer = String::new();
    if reporter.render_report(&mut writer, reportable).is_err() {
        return reportable.to_string();
    }
    writer
}
