//! Semantic unit types for stockpile quantities
//!
//! Newtype wrappers keep field dimensions, volumes, masses and density factors
//! from being mixed up (a tonnage passed where a volume is expected is a
//! compile error, not a silently wrong report).
//!
//! # Design
//! - All quantities use f64: field tonnages reach 10^5 t and reconciliation
//!   compares them at the 0.01 % level
//! - Private inner fields, `Deref` to the raw value for formulas
//! - Total ordering via `total_cmp` so quantities can be sorted and used as keys
//! - Serde support (serialized as bare numbers)
//! - Only the physically meaningful cross-unit operations are implemented:
//!   `CubicMeters * DensityFactor = Tonnes` and `Tonnes / CubicMeters = DensityFactor`
//!
//! # Usage
//! ```
//! use stockpile_core::core_types::units::{CubicMeters, DensityFactor, Tonnes};
//!
//! let volume = CubicMeters::new(100.0);
//! let mass: Tonnes = volume * DensityFactor::new(1.66);
//! assert!((*mass - 166.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Deref, Div, Mul, Sub};

/// Round `value` to `decimals` decimal places (half away from zero).
///
/// Used for display and for calibration suggestions; stored quantities keep
/// full precision.
#[inline]
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Clamp a raw field reading to a non-negative, finite value.
///
/// NaN and negative values become 0.0.
#[inline]
#[must_use]
pub fn non_negative(value: f64) -> f64 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Shared plumbing for every f64-backed quantity: total ordering, `Deref`,
/// conversions and `Display` with a unit suffix.
macro_rules! quantity {
    ($name:ident, $unit:literal) => {
        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Deref for $name {
            type Target = f64;
            #[inline]
            fn deref(&self) -> &f64 {
                &self.0
            }
        }

        impl $name {
            /// Zero quantity
            pub const ZERO: $name = $name(0.0);

            /// Create a new quantity from a raw value
            #[inline]
            #[must_use]
            pub const fn new(value: f64) -> Self {
                $name(value)
            }

            /// Get the raw f64 value
            #[inline]
            #[must_use]
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the value is strictly positive and finite
            #[inline]
            #[must_use]
            pub fn is_positive(self) -> bool {
                self.0 > 0.0 && self.0.is_finite()
            }

            /// Value rounded to `decimals` places, for display
            #[inline]
            #[must_use]
            pub fn rounded(self, decimals: u32) -> f64 {
                round_to(self.0, decimals)
            }
        }

        impl From<f64> for $name {
            fn from(v: f64) -> Self {
                $name(v)
            }
        }

        impl From<$name> for f64 {
            fn from(q: $name) -> f64 {
                q.0
            }
        }

        impl PartialEq<f64> for $name {
            fn eq(&self, other: &f64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<f64> for $name {
            fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
                self.0.partial_cmp(other)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match f.precision() {
                    Some(p) => write!(f, "{:.*} {}", p, self.0, $unit),
                    None => write!(f, "{} {}", self.0, $unit),
                }
            }
        }
    };
}

/// Additive quantities (lengths, volumes, masses) can be summed.
macro_rules! additive {
    ($name:ident) => {
        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: $name) -> $name {
                $name(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: $name) -> $name {
                $name(self.0 - rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = $name>>(iter: I) -> $name {
                $name(iter.map(|q| q.0).sum())
            }
        }
    };
}

/// Linear field dimension (axis length, perimeter, height) in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Meters(f64);

quantity!(Meters, "m");
additive!(Meters);

/// Volume in cubic meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CubicMeters(f64);

quantity!(CubicMeters, "m³");
additive!(CubicMeters);

/// Mass in metric tonnes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Tonnes(f64);

quantity!(Tonnes, "t");
additive!(Tonnes);

/// Bulk density factor in tonnes per cubic meter (t/m³)
///
/// A factor of 0.0 is never a valid density; it is the "insufficient data"
/// value produced by the guarded inversions in [`crate::mass`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DensityFactor(f64);

quantity!(DensityFactor, "t/m³");

/// Percentage (0-100 scale, may exceed 100 for deviations)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Percent(f64);

quantity!(Percent, "%");

impl Percent {
    /// Convert to a 0-1 fraction
    #[inline]
    #[must_use]
    pub fn as_fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl Mul<DensityFactor> for CubicMeters {
    type Output = Tonnes;
    fn mul(self, rhs: DensityFactor) -> Tonnes {
        Tonnes(self.0 * rhs.0)
    }
}

impl Div<CubicMeters> for Tonnes {
    type Output = DensityFactor;
    fn div(self, rhs: CubicMeters) -> DensityFactor {
        DensityFactor(self.0 / rhs.0)
    }
}

impl Mul<f64> for CubicMeters {
    type Output = CubicMeters;
    fn mul(self, rhs: f64) -> CubicMeters {
        CubicMeters(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(78.539816, 2), 78.54);
        assert_eq!(round_to(1.7000000000000002, 3), 1.7);
        assert_eq!(round_to(-2.4096, 2), -2.41);
    }

    #[test]
    fn test_non_negative_clamps_nan_and_negatives() {
        assert_eq!(non_negative(-3.0), 0.0);
        assert_eq!(non_negative(f64::NAN), 0.0);
        assert_eq!(non_negative(f64::INFINITY), 0.0);
        assert_eq!(non_negative(4.5), 4.5);
    }

    #[test]
    fn test_volume_times_density_is_mass() {
        let mass = CubicMeters::new(10.0) * DensityFactor::new(2.0);
        assert_eq!(mass, Tonnes::new(20.0));

        let factor = mass / CubicMeters::new(10.0);
        assert_eq!(factor, DensityFactor::new(2.0));
    }

    #[test]
    fn test_total_ordering() {
        let mut volumes = vec![
            CubicMeters::new(3.0),
            CubicMeters::new(1.0),
            CubicMeters::new(2.0),
        ];
        volumes.sort();
        assert_eq!(volumes[0], 1.0);
        assert_eq!(volumes.iter().copied().max(), Some(CubicMeters::new(3.0)));
    }

    #[test]
    fn test_display_precision() {
        assert_eq!(format!("{:.2}", CubicMeters::new(78.539816)), "78.54 m³");
        assert_eq!(format!("{:.1}", Tonnes::new(166.04)), "166.0 t");
    }

    #[test]
    fn test_serializes_as_bare_number() {
        let json = serde_json::to_string(&DensityFactor::new(1.78)).unwrap();
        assert_eq!(json, "1.78");
        let back: Tonnes = serde_json::from_str("170.5").unwrap();
        assert_eq!(back, 170.5);
    }
}
