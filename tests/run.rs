//! Integration tests for the `run` command.
use femtosim::cli::{RunOpts, handle_run_command};
use femtosim::settings::Settings;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example scenario.
fn get_scenario_dir() -> PathBuf {
    PathBuf::from("scenarios/femto_closed")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("FEMTOSIM_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
        debug_channels: true,
    };
    handle_run_command(&get_scenario_dir(), &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "cells.csv",
        "buildings.csv",
        "stations.csv",
        "terminals.csv",
        "flows.csv",
        "channel_realizations.csv",
        "simulation.csv",
        "metadata.toml",
        "femtosim_info.log",
        "femtosim_error.log",
    ] {
        assert!(output_dir.join(file_name).is_file(), "Missing {file_name}");
    }

    // Second time will fail because the logging is already initialised
    let opts = RunOpts {
        output_dir: Some(tempdir.path().join("results2")),
        ..RunOpts::default()
    };
    assert_eq!(
        handle_run_command(&get_scenario_dir(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
