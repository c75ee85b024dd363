//! The downlink scheduling algorithms a station can be bound to.
//!
//! The algorithms themselves live outside this crate. Here we only need to know which one is
//! active, because it decides the shape of the QoS parameters attached to each flow.
use log::warn;
use strum::{Display, EnumIter};

/// The downlink scheduler used by every station in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum SchedulerType {
    /// Proportional fair
    #[strum(to_string = "PF")]
    ProportionalFair,
    /// Modified largest weighted delay first
    #[strum(to_string = "MLWDF")]
    Mlwdf,
    /// Exponential proportional fair
    #[strum(to_string = "EXP")]
    Exp,
    /// Frame level scheduler
    #[strum(to_string = "FLS")]
    Fls,
    /// Exponential rule
    #[strum(to_string = "EXP_RULE")]
    ExpRule,
    /// Logarithmic rule
    #[strum(to_string = "LOG_RULE")]
    LogRule,
}

impl SchedulerType {
    /// Convert the numeric selector used in scenario files.
    ///
    /// Selectors outside `1..=6` fall back on proportional fair.
    pub fn from_selector(selector: i64) -> Self {
        match selector {
            1 => Self::ProportionalFair,
            2 => Self::Mlwdf,
            3 => Self::Exp,
            4 => Self::Fls,
            5 => Self::ExpRule,
            6 => Self::LogRule,
            other => {
                warn!("Unknown scheduler selector {other}; using proportional fair");
                Self::ProportionalFair
            }
        }
    }

    /// The numeric selector for this scheduler
    pub fn selector(self) -> i64 {
        match self {
            Self::ProportionalFair => 1,
            Self::Mlwdf => 2,
            Self::Exp => 3,
            Self::Fls => 4,
            Self::ExpRule => 5,
            Self::LogRule => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case(1, SchedulerType::ProportionalFair)]
    #[case(2, SchedulerType::Mlwdf)]
    #[case(3, SchedulerType::Exp)]
    #[case(4, SchedulerType::Fls)]
    #[case(5, SchedulerType::ExpRule)]
    #[case(6, SchedulerType::LogRule)]
    #[case(0, SchedulerType::ProportionalFair)]
    #[case(7, SchedulerType::ProportionalFair)]
    #[case(-3, SchedulerType::ProportionalFair)]
    fn test_from_selector(#[case] selector: i64, #[case] expected: SchedulerType) {
        assert_eq!(SchedulerType::from_selector(selector), expected);
    }

    #[test]
    fn test_selector_round_trip() {
        for scheduler in SchedulerType::iter() {
            assert_eq!(SchedulerType::from_selector(scheduler.selector()), scheduler);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(SchedulerType::Fls.to_string(), "FLS");
        assert_eq!(SchedulerType::LogRule.to_string(), "LOG_RULE");
    }
}
