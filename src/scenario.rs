//! Defines the `ScenarioParameters` struct, which represents the contents of `scenario.toml`.
use crate::flow::{FlowCounts, VideoBitRate};
use crate::input::{deserialise_proportion, input_err_msg, read_toml};
use crate::qos::fls_coefficient_count;
use crate::scheduler::SchedulerType;
use crate::station::AccessPolicy;
use crate::topology::BuildingType;
use crate::units::{Kilometres, KilometresPerHour, Seconds};
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::Display;

const SCENARIO_FILE_NAME: &str = "scenario.toml";

/// The number of macro cells in a scenario
pub const NB_CELL: u32 = 1;

/// The total simulated time of a run
pub const SIMULATION_DURATION: Seconds = Seconds::new(30.0);

fn default_access_policy() -> i64 {
    0
}

fn default_video_bit_rate() -> i64 {
    128
}

/// Represents the contents of the scenario file.
///
/// Selectors are kept as the numbers found in the file; the typed accessors convert them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioParameters {
    /// Radius of each macro cell
    pub radius: Kilometres,
    /// Number of buildings in each macro cell
    pub nb_buildings: u32,
    /// Building layout: 0 for a 5×5 grid, 1 for a dual stripe
    pub building_type: i64,
    /// Expected fraction of femto cells with an active station
    #[serde(deserialize_with = "deserialise_proportion")]
    pub activity_ratio: f64,
    /// Terminals per macro cell
    pub nb_ue: u32,
    /// Terminals per active femto cell
    pub nb_femto_ue: u32,
    /// VoIP flows per terminal
    pub nb_voip: u32,
    /// Video flows per terminal
    pub nb_video: u32,
    /// Best effort flows per terminal
    pub nb_be: u32,
    /// CBR flows per terminal
    pub nb_cbr: u32,
    /// Downlink scheduler: 1 PF, 2 MLWDF, 3 EXP, 4 FLS, 5 EXP_RULE, 6 LOG_RULE
    pub scheduler: i64,
    /// Frame structure: 1 FDD, 2 TDD
    pub frame_structure: i64,
    /// Terminal speed
    pub speed: KilometresPerHour,
    /// Home station access policy: 0 closed, 1 open
    #[serde(default = "default_access_policy")]
    pub access_policy: i64,
    /// Maximum tolerable delay for delay-sensitive flows
    pub max_delay: Seconds,
    /// Video bit rate in kbps: 128, 242 or 440
    #[serde(default = "default_video_bit_rate")]
    pub video_bit_rate: i64,
    /// Seed for the random source; negative values use the wall clock
    pub seed: i64,
}

/// The duplexing scheme of the radio frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameStructure {
    /// Frequency division duplex
    #[default]
    Fdd,
    /// Time division duplex
    Tdd,
}

impl FrameStructure {
    /// Convert the numeric selector used in scenario files.
    ///
    /// Unknown selectors fall back on FDD.
    pub fn from_selector(selector: i64) -> Self {
        match selector {
            1 => Self::Fdd,
            2 => Self::Tdd,
            other => {
                warn!("Unknown frame structure {other}: using FDD");
                Self::Fdd
            }
        }
    }
}

/// The frame structure requested by a scenario and the one in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameConfiguration {
    /// Frame structure named in the scenario file
    pub requested: FrameStructure,
    /// Frame structure given to the frame manager
    pub applied: FrameStructure,
}

impl FrameConfiguration {
    /// Record the requested frame structure.
    ///
    /// The frame manager always runs FDD.
    pub fn new(requested: FrameStructure) -> Self {
        if requested != FrameStructure::Fdd {
            warn!("Frame structure {requested} requested but FDD will be applied");
        }

        Self {
            requested,
            applied: FrameStructure::Fdd,
        }
    }
}

/// Entity counts fixed before construction begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioTotals {
    /// Number of macro cells
    pub nb_cell: u32,
    /// Number of femto cell slots, active or not
    pub nb_femto_cells: u32,
    /// Macro cells plus femto cell slots
    pub total_nb_cell: u32,
    /// The largest number of terminals the scenario can hold
    pub total_nb_ue: u32,
}

/// Check that the `radius` parameter is valid
fn check_radius(radius: Kilometres) -> Result<()> {
    ensure!(
        radius.is_finite() && radius > Kilometres(0.0),
        "radius must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that buildings of the given type fit inside a macro cell of the given radius
fn check_radius_fits_buildings(
    radius: Kilometres,
    building_type: BuildingType,
    nb_buildings: u32,
) -> Result<()> {
    let min_radius = building_type.min_cell_radius();
    ensure!(
        nb_buildings == 0 || radius >= min_radius,
        "radius of {radius} is too small to hold a {building_type} building (at least {:.3} km \
        is needed)",
        min_radius.value()
    );

    Ok(())
}

/// Check that the `max_delay` parameter is valid
fn check_max_delay(max_delay: Seconds) -> Result<()> {
    ensure!(
        max_delay.is_finite() && max_delay > Seconds(0.0),
        "max_delay must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `speed` parameter is valid
fn check_speed(speed: KilometresPerHour) -> Result<()> {
    ensure!(
        speed.is_finite() && speed >= KilometresPerHour(0.0),
        "speed must be a finite number no less than zero"
    );

    Ok(())
}

impl ScenarioParameters {
    /// Read a scenario file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `scenario_dir` - Folder containing the scenario file
    ///
    /// # Returns
    ///
    /// The file contents as a [`ScenarioParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(scenario_dir: P) -> Result<ScenarioParameters> {
        let file_path = scenario_dir.as_ref().join(SCENARIO_FILE_NAME);
        let params: ScenarioParameters = read_toml(&file_path)?;

        params
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(params)
    }

    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        check_radius(self.radius)?;

        check_radius_fits_buildings(self.radius, self.building_type()?, self.nb_buildings)?;

        // activity_ratio already validated with deserialise_proportion, unless built in code
        ensure!(
            (0.0..=1.0).contains(&self.activity_ratio),
            "activity_ratio must be between 0 and 1"
        );

        check_speed(self.speed)?;
        self.access_policy()?;
        check_max_delay(self.max_delay)?;

        // The FLS table is consulted again for every flow, but fail before anything is built
        if self.scheduler() == SchedulerType::Fls {
            fls_coefficient_count(self.max_delay).context("Invalid value for max_delay")?;
        }

        self.totals()?;
        self.flow_counts().per_terminal()?;

        Ok(())
    }

    /// The building layout
    pub fn building_type(&self) -> Result<BuildingType> {
        BuildingType::from_selector(self.building_type)
    }

    /// The downlink scheduler
    pub fn scheduler(&self) -> SchedulerType {
        SchedulerType::from_selector(self.scheduler)
    }

    /// The requested frame structure
    pub fn frame_structure(&self) -> FrameStructure {
        FrameStructure::from_selector(self.frame_structure)
    }

    /// The home station access policy
    pub fn access_policy(&self) -> Result<AccessPolicy> {
        AccessPolicy::from_selector(self.access_policy)
    }

    /// The video bit rate
    pub fn video_bit_rate(&self) -> VideoBitRate {
        VideoBitRate::from_selector(self.video_bit_rate)
    }

    /// The number of flows of each kind per terminal
    pub fn flow_counts(&self) -> FlowCounts {
        FlowCounts {
            voip: self.nb_voip,
            video: self.nb_video,
            best_effort: self.nb_be,
            cbr: self.nb_cbr,
        }
    }

    /// Compute the entity counts of the scenario.
    ///
    /// Fails if any count does not fit in the ID space.
    pub fn totals(&self) -> Result<ScenarioTotals> {
        let overflow = || "Scenario is too large: entity counts overflow the ID space";
        let per_building = self.building_type()?.femto_cells_per_building();
        let nb_femto_cells = NB_CELL
            .checked_mul(self.nb_buildings)
            .and_then(|buildings| buildings.checked_mul(per_building))
            .with_context(overflow)?;
        let total_nb_cell = NB_CELL
            .checked_add(nb_femto_cells)
            .with_context(overflow)?;
        let total_nb_ue = NB_CELL
            .checked_mul(self.nb_ue)
            .zip(nb_femto_cells.checked_mul(self.nb_femto_ue))
            .and_then(|(macro_ue, femto_ue)| macro_ue.checked_add(femto_ue))
            .with_context(overflow)?;
        // The gateway takes the ID after the last terminal
        total_nb_cell
            .checked_add(total_nb_ue)
            .and_then(|last| last.checked_add(1))
            .with_context(overflow)?;

        Ok(ScenarioTotals {
            nb_cell: NB_CELL,
            nb_femto_cells,
            total_nb_cell,
            total_nb_ue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, scenario_parameters};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const SCENARIO_TOML: &str = r"
radius = 1.0
nb_buildings = 1
building_type = 0
activity_ratio = 0.5
nb_ue = 2
nb_femto_ue = 1
nb_voip = 1
nb_video = 0
nb_be = 1
nb_cbr = 0
scheduler = 4
frame_structure = 1
speed = 3.0
max_delay = 0.1
seed = 1
";

    #[test]
    fn test_scenario_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SCENARIO_FILE_NAME)).unwrap();
            write!(file, "{SCENARIO_TOML}").unwrap();
        }

        let params = ScenarioParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.scheduler(), SchedulerType::Fls);
        assert_eq!(params.access_policy().unwrap(), AccessPolicy::Closed);
        assert_eq!(params.video_bit_rate(), VideoBitRate::Kbps128);
        assert_eq!(params.radius, Kilometres(1.0));
    }

    #[test]
    fn test_scenario_params_from_path_bad_delay() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SCENARIO_FILE_NAME)).unwrap();
            write!(file, "{}", SCENARIO_TOML.replace("max_delay = 0.1", "max_delay = 0.05"))
                .unwrap();
        }

        let err = ScenarioParameters::from_path(dir.path()).unwrap_err();
        let messages: Vec<_> = err.chain().map(ToString::to_string).collect();
        assert!(messages[0].starts_with("Error reading"));
        assert_eq!(messages[1], "Invalid value for max_delay");
    }

    #[test]
    fn test_scenario_params_from_path_missing_field() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SCENARIO_FILE_NAME)).unwrap();
            write!(file, "{}", SCENARIO_TOML.replace("seed = 1", "")).unwrap();
        }

        assert!(ScenarioParameters::from_path(dir.path()).is_err());
    }

    #[rstest]
    fn test_validate_ok(scenario_parameters: ScenarioParameters) {
        assert!(scenario_parameters.validate().is_ok());
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::INFINITY)]
    #[case(f64::NAN)]
    fn test_validate_bad_radius(mut scenario_parameters: ScenarioParameters, #[case] radius: f64) {
        scenario_parameters.radius = Kilometres(radius);
        assert_error!(
            scenario_parameters.validate(),
            "radius must be a finite number greater than zero"
        );
    }

    #[rstest]
    fn test_validate_bad_building_type(mut scenario_parameters: ScenarioParameters) {
        scenario_parameters.building_type = 3;
        assert_error!(
            scenario_parameters.validate(),
            "Invalid building type 3: must be 0 or 1"
        );
    }

    #[rstest]
    #[case(0.1, 0, 1, false)]
    #[case(0.1, 0, 0, true)]
    #[case(0.11, 0, 1, true)]
    #[case(0.11, 1, 1, false)]
    #[case(0.15, 1, 2, true)]
    fn test_validate_radius_fits_buildings(
        mut scenario_parameters: ScenarioParameters,
        #[case] radius: f64,
        #[case] building_type: i64,
        #[case] nb_buildings: u32,
        #[case] valid: bool,
    ) {
        scenario_parameters.radius = Kilometres(radius);
        scenario_parameters.building_type = building_type;
        scenario_parameters.nb_buildings = nb_buildings;
        assert_eq!(scenario_parameters.validate().is_ok(), valid);
    }

    #[rstest]
    fn test_validate_radius_too_small_message(mut scenario_parameters: ScenarioParameters) {
        scenario_parameters.radius = Kilometres(0.1);
        assert_error!(
            scenario_parameters.validate(),
            "radius of 0.1 km is too small to hold a 5x5 grid building (at least 0.106 km is \
            needed)"
        );
    }

    #[rstest]
    fn test_validate_flow_counts_overflow(mut scenario_parameters: ScenarioParameters) {
        scenario_parameters.nb_voip = u32::MAX;
        scenario_parameters.nb_video = 1;
        assert_error!(
            scenario_parameters.validate(),
            "Scenario is too large: flow counts per terminal overflow"
        );
    }

    #[rstest]
    fn test_validate_bad_access_policy(mut scenario_parameters: ScenarioParameters) {
        scenario_parameters.access_policy = 2;
        assert_error!(
            scenario_parameters.validate(),
            "Invalid access policy 2: must be 0 (closed) or 1 (open)"
        );
    }

    #[rstest]
    fn test_validate_negative_speed(mut scenario_parameters: ScenarioParameters) {
        scenario_parameters.speed = KilometresPerHour(-3.0);
        assert_error!(
            scenario_parameters.validate(),
            "speed must be a finite number no less than zero"
        );
    }

    #[rstest]
    #[case(SchedulerType::Fls, 0.05, false)]
    #[case(SchedulerType::Fls, 0.04, true)]
    #[case(SchedulerType::Exp, 0.05, true)]
    #[case(SchedulerType::ProportionalFair, 0.0, false)]
    fn test_validate_max_delay(
        mut scenario_parameters: ScenarioParameters,
        #[case] scheduler: SchedulerType,
        #[case] max_delay: f64,
        #[case] valid: bool,
    ) {
        scenario_parameters.scheduler = scheduler.selector();
        scenario_parameters.max_delay = Seconds(max_delay);
        assert_eq!(scenario_parameters.validate().is_ok(), valid);
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, 1, 40)]
    #[case(3, 0, 75)]
    #[case(2, 1, 80)]
    fn test_totals(
        mut scenario_parameters: ScenarioParameters,
        #[case] nb_buildings: u32,
        #[case] building_type: i64,
        #[case] expected_femto_cells: u32,
    ) {
        scenario_parameters.nb_buildings = nb_buildings;
        scenario_parameters.building_type = building_type;
        scenario_parameters.nb_ue = 10;
        scenario_parameters.nb_femto_ue = 2;

        let totals = scenario_parameters.totals().unwrap();
        assert_eq!(totals.nb_femto_cells, expected_femto_cells);
        assert_eq!(totals.total_nb_cell, 1 + expected_femto_cells);
        assert_eq!(totals.total_nb_ue, 10 + 2 * expected_femto_cells);
    }

    #[rstest]
    fn test_totals_overflow(mut scenario_parameters: ScenarioParameters) {
        scenario_parameters.nb_buildings = u32::MAX;
        assert_error!(
            scenario_parameters.totals(),
            "Scenario is too large: entity counts overflow the ID space"
        );
    }

    #[rstest]
    #[case(1, FrameStructure::Fdd)]
    #[case(2, FrameStructure::Tdd)]
    #[case(7, FrameStructure::Fdd)]
    fn test_frame_structure_from_selector(#[case] selector: i64, #[case] expected: FrameStructure) {
        assert_eq!(FrameStructure::from_selector(selector), expected);
    }

    #[test]
    fn test_frame_configuration_always_fdd() {
        let frame = FrameConfiguration::new(FrameStructure::Tdd);
        assert_eq!(frame.requested, FrameStructure::Tdd);
        assert_eq!(frame.applied, FrameStructure::Fdd);
    }
}
