//! Stockpile Tonnage Core Library
//!
//! Volumetric and mass estimation for mineral stockpiles measured in the field.
//! Piles are modelled as elliptic or perimeter-based cones, converted to tonnes
//! with a per-class density factor, and reconciled against weighbridge
//! tonnage so the density profile can be calibrated over time.
//!
//! ## Pipeline
//!
//! - [`geometry`]: closed-form cone volumes and the [`VolumeEstimator`] seam
//! - [`mass`]: volume × density factor, with the factor's provenance
//! - [`profile`]: per-class density factors behind a shared resolver
//! - [`reconciliation`]: estimated vs scale tonnage and the 5 % tolerance
//! - [`calibration`]: profile suggestions from reconciliation history
//! - [`measurement`]: captured records and their rollups

// Core types and utilities
pub mod core_types;

pub mod calibration;
pub mod geometry;
pub mod mass;
pub mod measurement;
pub mod profile;
pub mod reconciliation;

// Re-export core types
pub use core_types::{CubicMeters, DensityFactor, Meters, Percent, Tonnes};
pub use core_types::{DimensionKey, Dimensions, GeometryKind, GranulometryClass};

pub use calibration::{suggest_calibration, CalibrationAggregator, CalibrationSuggestion};
pub use geometry::{GeometricEstimator, GeometryError, VolumeEstimate, VolumeEstimator, VolumeInput};
pub use mass::{to_density_factor, to_mass, FactorResolution, FactorSource};
pub use measurement::{summarize, Measurement, MeasurementSummary};
pub use profile::{DensityProfileResolver, MaterialProfile, ProfileError};
pub use reconciliation::{reconcile, ReconciliationOutcome, ReconciliationRecord};
