//! Volume estimator trait definition
//!
//! A `VolumeEstimator` turns some capture of a stockpile into a volume. The
//! geometric estimator works from taped dimensions; an image-based estimator
//! (photogrammetry, depth sensing) plugs in behind the same trait.

use serde::{Deserialize, Serialize};

use super::{solve, GeometryError};
use crate::core_types::dimensions::{Dimensions, GeometryKind};
use crate::core_types::units::CubicMeters;

/// Input handed to an estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInput {
    pub geometry: GeometryKind,
    pub dimensions: Dimensions,
}

impl VolumeInput {
    pub fn new(geometry: GeometryKind, dimensions: Dimensions) -> Self {
        Self {
            geometry,
            dimensions,
        }
    }
}

/// Volume produced by an estimator together with how much it trusts it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeEstimate {
    pub volume: CubicMeters,
    /// 0.0 to 1.0
    pub confidence: f64,
}

/// Backend-agnostic interface for producing a stockpile volume
pub trait VolumeEstimator: Send + Sync {
    /// Short identifier recorded alongside measurements
    fn name(&self) -> &'static str;

    /// Estimate the volume described by `input`
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the input lacks data the estimator needs.
    fn estimate(&self, input: &VolumeInput) -> Result<VolumeEstimate, GeometryError>;
}

/// Deterministic estimator over the closed-form solids in [`crate::geometry`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricEstimator;

impl VolumeEstimator for GeometricEstimator {
    fn name(&self) -> &'static str {
        "geometric"
    }

    fn estimate(&self, input: &VolumeInput) -> Result<VolumeEstimate, GeometryError> {
        let volume = solve(input.geometry, &input.dimensions)?;
        Ok(VolumeEstimate {
            volume,
            confidence: 1.0,
        })
    }
}
