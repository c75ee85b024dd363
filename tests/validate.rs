//! Integration tests for the `validate` command.
use femtosim::cli::handle_validate_command;
use femtosim::log::is_logger_initialised;
use femtosim::settings::Settings;
use std::path::PathBuf;

/// Get the path to the example scenario.
fn get_scenario_dir() -> PathBuf {
    PathBuf::from("scenarios/femto_fls")
}

/// An integration test for the `validate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("FEMTOSIM_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    handle_validate_command(&get_scenario_dir(), Some(Settings::default())).unwrap();

    assert!(is_logger_initialised());
}
