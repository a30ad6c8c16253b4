//! Integration tests for gavel
//!
//! These tests require a running Docker daemon and the language images named
//! in the test configuration (python:3.8-slim, gcc:latest).
//! Run with: cargo test -p gavel --features integration-tests

#![cfg(feature = "integration-tests")]

use std::path::{Path, PathBuf};

use gavel::config::Config;

mod config_loading;
mod judging;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Create a test config with private asset and workspace roots
pub(crate) fn test_config(tag: &str) -> (Config, PathBuf) {
    let root = std::env::temp_dir().join(format!("gavel-it-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&root).expect("failed to create test root");

    let mut config = Config::default();
    config.asset_root = root.join("assets");
    config.workspace.root = root.join("workspace");
    (config, root)
}

/// Lay down one (input, expected-output) pair for a problem
pub(crate) fn write_case(asset_root: &Path, problem_id: u64, name: &str, input: &str, output: &str) {
    let problem = gavel::problem_dir(asset_root, problem_id);
    let in_dir = problem.join("in");
    let out_dir = problem.join("out");
    std::fs::create_dir_all(&in_dir).expect("failed to create in dir");
    std::fs::create_dir_all(&out_dir).expect("failed to create out dir");
    std::fs::write(in_dir.join(name), input).expect("failed to write input");
    std::fs::write(out_dir.join(name), output).expect("failed to write output");
}
