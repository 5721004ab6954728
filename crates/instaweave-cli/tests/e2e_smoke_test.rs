use std::{fs, path::PathBuf};

use serde_json::Value;
use tempfile::tempdir;

use instaweave_cli::{Args, Strategy, run};

fn demos_dir() -> PathBuf {
    // Demos live at the workspace root, not in the crate
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

/// Collects all .json files from a directory
fn collect_json_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json")
            })
            .collect()
    } else {
        Vec::new()
    };

    files.sort();
    files
}

fn args(input: &PathBuf, output: &PathBuf) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        output: output.to_string_lossy().to_string(),
        config: None,
        strategy: Some(Strategy::Random),
        seed: Some(7),
        name_hints: None,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_valid_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let valid_demos = collect_json_files(demos_dir());

    assert!(!valid_demos.is_empty(), "No demos found in demos/");

    let mut failed = Vec::new();
    for demo in &valid_demos {
        let output = temp_dir
            .path()
            .join(demo.file_name().unwrap());

        match run(&args(demo, &output)) {
            Ok(_) => {
                let written = fs::read_to_string(&output).unwrap();
                let value: Value = serde_json::from_str(&written).unwrap();
                assert!(value["instances"].is_object(), "{}", demo.display());
            }
            Err(e) => failed.push((demo.clone(), e)),
        }
    }

    if !failed.is_empty() {
        eprintln!("\nDemos that failed:");
        for (path, err) in &failed {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} demo(s) failed unexpectedly", failed.len());
    }
}

#[test]
fn e2e_smoke_test_error_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let error_demos = collect_json_files(demos_dir().join("errors"));

    assert!(!error_demos.is_empty(), "No error demos found in demos/errors/");

    let mut unexpectedly_succeeded = Vec::new();
    for demo in &error_demos {
        let output = temp_dir
            .path()
            .join(demo.file_name().unwrap());
        if run(&args(demo, &output)).is_ok() {
            unexpectedly_succeeded.push(demo.clone());
        }
    }

    if !unexpectedly_succeeded.is_empty() {
        eprintln!("\nError demos that unexpectedly succeeded:");
        for path in &unexpectedly_succeeded {
            eprintln!("  - {}", path.display());
        }
        panic!(
            "{} error demo(s) succeeded unexpectedly",
            unexpectedly_succeeded.len()
        );
    }
}

#[test]
fn e2e_name_hints_and_minimum_strategy() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let output = temp_dir.path().join("rocket.json");
    let mut args = args(&demos_dir().join("rocket.json"), &output);
    args.strategy = Some(Strategy::Minimum);
    args.name_hints = Some(
        demos_dir()
            .join("hints")
            .join("rocket.json")
            .to_string_lossy()
            .to_string(),
    );

    let diagnostics = run(&args).unwrap();
    let value: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();

    assert_eq!(value["instances"]["rocket"][0][0][1], "Saturn");
    assert_eq!(value["instances"]["stages"][0][1][1], "S-IC");
    assert_eq!(value["instances"]["stages"][1][1][1], "S-II");
    assert_eq!(value["multiplicities"]["stage-def"], 2);
    assert!(diagnostics.iter().any(|d| d.code().is_some()));
}
