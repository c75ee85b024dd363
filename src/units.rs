//! This module defines the unit types used for scenario quantities and their conversions.

macro_rules! unit_struct {
    ($name:ident, $symbol:literal) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            derive_more::Add,
            derive_more::Sub,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the value is neither infinite nor NaN
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::Mul<f64> for $name {
            type Output = $name;
            fn mul(self, rhs: f64) -> $name {
                $name(self.0 * rhs)
            }
        }

        impl std::ops::Div<f64> for $name {
            type Output = $name;
            fn div(self, rhs: f64) -> $name {
                $name(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} {}", self.0, $symbol)
            }
        }
    };
}

unit_struct!(Metres, "m");
unit_struct!(Kilometres, "km");
unit_struct!(Seconds, "s");
unit_struct!(Megahertz, "MHz");
unit_struct!(KilometresPerHour, "km/h");
unit_struct!(Radians, "rad");

impl From<Kilometres> for Metres {
    fn from(val: Kilometres) -> Self {
        Metres(val.0 * 1000.0)
    }
}

impl Radians {
    /// Convert a whole number of degrees into radians
    pub fn from_degrees(degrees: u32) -> Self {
        Radians(f64::from(degrees).to_radians())
    }
}
