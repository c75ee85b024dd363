//! Fixtures for tests
use crate::scenario::ScenarioParameters;
use crate::units::{Kilometres, KilometresPerHour, Seconds};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {{
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    }};
}
pub(crate) use assert_error;

/// A small scenario with one building, every femto cell active and closed access
#[fixture]
pub fn scenario_parameters() -> ScenarioParameters {
    ScenarioParameters {
        radius: Kilometres(1.0),
        nb_buildings: 1,
        building_type: 0,
        activity_ratio: 1.0,
        nb_ue: 3,
        nb_femto_ue: 1,
        nb_voip: 1,
        nb_video: 1,
        nb_be: 1,
        nb_cbr: 1,
        scheduler: 1,
        frame_structure: 1,
        speed: KilometresPerHour(3.0),
        access_policy: 0,
        max_delay: Seconds(0.1),
        video_bit_rate: 128,
        seed: 1,
    }
}
