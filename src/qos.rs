//! QoS parameters attached to application flows.
//!
//! Delay-aware schedulers read extra per-flow data, so the shape of a flow's QoS parameters
//! depends on which scheduler the scenario uses.
use crate::scheduler::SchedulerType;
use crate::units::Seconds;
use anyhow::{Context, Result};
use float_cmp::approx_eq;
use log::debug;
use strum::Display;

/// Target delays supported by the FLS scheduler and the number of filter coefficients for each
const FLS_COEFFICIENTS: [(f64, u32); 4] = [(0.1, 9), (0.08, 7), (0.06, 5), (0.04, 3)];

/// QoS parameters for a flow, in the form expected by the active scheduler
#[derive(Debug, Clone, Copy, PartialEq, Display)]
pub enum QosParameters {
    /// Generic parameters, optionally carrying a delay target
    #[strum(to_string = "base")]
    Base {
        /// Maximum tolerable delay, if any
        max_delay: Option<Seconds>,
    },
    /// Parameters for the frame level scheduler
    #[strum(to_string = "fls")]
    Fls {
        /// Maximum tolerable delay
        max_delay: Seconds,
        /// Number of coefficients of the FLS filter
        coefficient_count: u32,
    },
    /// Parameters for the exponential proportional fair scheduler
    #[strum(to_string = "exp")]
    Exp {
        /// Maximum tolerable delay
        max_delay: Seconds,
    },
    /// Parameters for the M-LWDF scheduler
    #[strum(to_string = "mlwdf")]
    Mlwdf {
        /// Maximum tolerable delay
        max_delay: Seconds,
    },
}

/// Look up the number of FLS filter coefficients for the given target delay.
///
/// Only the delays in the FLS table are supported; anything else is an error.
pub fn fls_coefficient_count(max_delay: Seconds) -> Result<u32> {
    FLS_COEFFICIENTS
        .iter()
        .find(|(delay, _)| approx_eq!(f64, *delay, max_delay.value(), ulps = 4))
        .map(|(_, count)| *count)
        .with_context(|| {
            format!(
                "Target delay of {} s is not available for the FLS scheduler (supported: 0.1, \
                0.08, 0.06, 0.04)",
                max_delay.value()
            )
        })
}

impl QosParameters {
    /// Parameters with no delay target
    pub fn base() -> Self {
        Self::Base { max_delay: None }
    }

    /// Generic parameters carrying a delay target
    pub fn base_with_delay(max_delay: Seconds) -> Self {
        Self::Base {
            max_delay: Some(max_delay),
        }
    }

    /// Build the parameters a delay-sensitive flow needs under the given scheduler
    pub fn for_scheduler(scheduler: SchedulerType, max_delay: Seconds) -> Result<Self> {
        let qos = match scheduler {
            SchedulerType::Fls => {
                let coefficient_count = fls_coefficient_count(max_delay)?;
                debug!(
                    "Target Delay = {} s, M = {coefficient_count}",
                    max_delay.value()
                );
                Self::Fls {
                    max_delay,
                    coefficient_count,
                }
            }
            SchedulerType::Exp => Self::Exp { max_delay },
            SchedulerType::Mlwdf => Self::Mlwdf { max_delay },
            SchedulerType::ProportionalFair | SchedulerType::ExpRule | SchedulerType::LogRule => {
                Self::base_with_delay(max_delay)
            }
        };

        Ok(qos)
    }

    /// The delay target, if the parameters carry one
    pub fn max_delay(&self) -> Option<Seconds> {
        match self {
            Self::Base { max_delay } => *max_delay,
            Self::Fls { max_delay, .. } | Self::Exp { max_delay } | Self::Mlwdf { max_delay } => {
                Some(*max_delay)
            }
        }
    }

    /// The number of FLS filter coefficients, for FLS parameters
    pub fn coefficient_count(&self) -> Option<u32> {
        match self {
            Self::Fls {
                coefficient_count, ..
            } => Some(*coefficient_count),
            _ => None,
        }
    }
}
