//! Stockpile volume from field-measured dimensions
//!
//! Stockpiles are modelled as one of three solids: a cone over an elliptical
//! base, an elliptical frustum (pile with a flattened top), or a circular
//! frustum specified by walked perimeters.
//!
//! # Axis convention
//! Axis lengths passed to this module are **full widths across the pile**
//! (diameters), which is what a tape measure gives in the field. They are
//! halved to semi-axes internally.
//!
//! # Robustness
//! Every function is total: inputs that are negative, zero, NaN or infinite
//! are clamped to 0.0 before use, so the result is always a finite,
//! non-negative volume. Rejecting bad measurements is the caller's job.

mod estimator;

pub use estimator::{GeometricEstimator, VolumeEstimate, VolumeEstimator, VolumeInput};

use std::f64::consts::PI;
use std::fmt;

use crate::core_types::dimensions::{DimensionKey, Dimensions, GeometryKind};
use crate::core_types::units::{non_negative, CubicMeters};

/// Volume of a cone over an elliptical base (m³)
///
/// # Formula
/// ```text
/// V = (1/3) × π × a × b × h
/// ```
///
/// Where:
/// - **a** = Semi-major axis of the base (`major / 2`)
/// - **b** = Semi-minor axis of the base (`minor / 2`)
/// - **h** = Pile height
///
/// # Example
/// ```
/// use stockpile_core::geometry::elliptic_cone_volume;
///
/// // 10 m × 6 m base, 5 m high: semi-axes 5 and 3
/// let volume = elliptic_cone_volume(10.0, 6.0, 5.0);
/// assert!((*volume - 78.54).abs() < 0.01);
/// ```
pub fn elliptic_cone_volume(major_axis: f64, minor_axis: f64, height: f64) -> CubicMeters {
    let a = non_negative(major_axis) / 2.0;
    let b = non_negative(minor_axis) / 2.0;
    let h = non_negative(height);

    CubicMeters::new(PI * a * b * h / 3.0)
}

/// Volume of a frustum with elliptical base and top (m³)
///
/// # Formula
/// ```text
/// A1 = π × a1 × b1
/// A2 = π × a2 × b2
/// V  = (h/3) × (A1 + A2 + √(A1 × A2))
/// ```
///
/// Assumes the semi-axes vary linearly between the two parallel planes. With
/// a zero-area top this degenerates to [`elliptic_cone_volume`]; with equal
/// base and top it is an elliptic cylinder.
pub fn truncated_elliptic_cone_volume(
    base_major: f64,
    base_minor: f64,
    top_major: f64,
    top_minor: f64,
    height: f64,
) -> CubicMeters {
    let base_area = ellipse_area(base_major, base_minor);
    let top_area = ellipse_area(top_major, top_minor);

    frustum_volume(base_area, top_area, height)
}

/// Volume of a frustum specified by base and top perimeters (m³)
///
/// # Formula
/// ```text
/// R  = P / (2π)      r = P' / (2π)
/// A1 = π × R²        A2 = π × r²
/// V  = (h/3) × (A1 + A2 + √(A1 × A2))
/// ```
///
/// Perimeters are converted to radii of equivalent circles. An elliptical
/// cross-section with the same perimeter has a smaller area, so this slightly
/// overestimates elongated piles.
pub fn perimeter_truncated_cone_volume(
    base_perimeter: f64,
    top_perimeter: f64,
    height: f64,
) -> CubicMeters {
    let base_radius = non_negative(base_perimeter) / (2.0 * PI);
    let top_radius = non_negative(top_perimeter) / (2.0 * PI);

    frustum_volume(
        PI * base_radius * base_radius,
        PI * top_radius * top_radius,
        height,
    )
}

/// Area of an ellipse given full axis lengths
fn ellipse_area(major_axis: f64, minor_axis: f64) -> f64 {
    PI * (non_negative(major_axis) / 2.0) * (non_negative(minor_axis) / 2.0)
}

/// Frustum between two parallel cross-sections of known area
fn frustum_volume(base_area: f64, top_area: f64, height: f64) -> CubicMeters {
    let h = non_negative(height);
    CubicMeters::new(h / 3.0 * (base_area + top_area + (base_area * top_area).sqrt()))
}

/// Compute the volume of `kind` from a dimension set.
///
/// Every key in [`GeometryKind::required_keys`] must be present; a missing
/// key is reported before any formula runs.
pub fn solve(kind: GeometryKind, dimensions: &Dimensions) -> Result<CubicMeters, GeometryError> {
    if let Some(key) = dimensions.first_missing(kind) {
        return Err(GeometryError::MissingDimension { kind, key });
    }

    let get = |key: DimensionKey| dimensions.get(key).map_or(0.0, |m| *m);

    let volume = match kind {
        GeometryKind::EllipticCone => elliptic_cone_volume(
            get(DimensionKey::BaseMajorAxis),
            get(DimensionKey::BaseMinorAxis),
            get(DimensionKey::Height),
        ),
        GeometryKind::TruncatedEllipticCone => truncated_elliptic_cone_volume(
            get(DimensionKey::BaseMajorAxis),
            get(DimensionKey::BaseMinorAxis),
            get(DimensionKey::TopMajorAxis),
            get(DimensionKey::TopMinorAxis),
            get(DimensionKey::Height),
        ),
        GeometryKind::PerimeterTruncatedCone => perimeter_truncated_cone_volume(
            get(DimensionKey::BasePerimeter),
            get(DimensionKey::TopPerimeter),
            get(DimensionKey::Height),
        ),
    };

    Ok(volume)
}

/// Errors raised before a volume is computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// A dimension required by the selected shape was not measured
    MissingDimension {
        kind: GeometryKind,
        key: DimensionKey,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::MissingDimension { kind, key } => {
                write!(f, "Missing dimension '{key}' required by {kind}")
            }
        }
    }
}

impl std::error::Error for GeometryError {}
