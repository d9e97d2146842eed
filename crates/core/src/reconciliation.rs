//! Reconciliation of field estimates against scale weighments
//!
//! When a pile is hauled, the weighbridge gives its real tonnage. Comparing
//! that with the field estimate yields the deviation of the estimate and the
//! real density factor of the material, which feeds calibration.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core_types::granulometry::GranulometryClass;
use crate::core_types::units::{CubicMeters, DensityFactor, Percent, Tonnes};
use crate::mass::to_density_factor;
use crate::measurement::Measurement;

/// Maximum deviation (inclusive) between estimated and scale tonnage for an
/// estimate to be considered accurate.
pub const TONNAGE_TOLERANCE_PERCENT: f64 = 5.0;

/// Float rounding slack at the boundary: 166 t vs 174.3 t is 5.000000000000007 %.
const TOLERANCE_EPSILON: f64 = 1e-9;

/// Whether a deviation is inside [`TONNAGE_TOLERANCE_PERCENT`]
pub fn is_within_tolerance(difference: Percent) -> bool {
    *difference <= TONNAGE_TOLERANCE_PERCENT + TOLERANCE_EPSILON
}

/// Result of comparing one estimate with its scale weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// Scale mass over measured volume; 0.0 when the volume is not positive
    pub real_density_factor: DensityFactor,
    /// |estimated − real| relative to the estimate; 0.0 when the estimate is not positive
    pub difference_percent: Percent,
    pub within_tolerance: bool,
    /// A division guard fired: the zeros above mean "no data", not a perfect match
    pub insufficient_data: bool,
}

/// Compare an estimated tonnage with the real (scale) tonnage.
///
/// # Formula
/// ```text
/// ρ_real = m_real / V
/// Δ%     = |m_est − m_real| × 100 / m_est
/// ok     = Δ% ≤ 5.0
/// ```
///
/// The comparison allows a 1e-9 % slack for float rounding.
///
/// A non-positive estimate is reported as 0 % deviation with
/// `insufficient_data` set.
pub fn reconcile(volume: CubicMeters, estimated: Tonnes, real: Tonnes) -> ReconciliationOutcome {
    let real_density_factor = to_density_factor(volume, real);

    let difference_percent = if estimated.is_positive() {
        Percent::new((*estimated - *real).abs() * 100.0 / *estimated)
    } else {
        Percent::ZERO
    };

    let outcome = ReconciliationOutcome {
        real_density_factor,
        difference_percent,
        within_tolerance: is_within_tolerance(difference_percent),
        insufficient_data: !volume.is_positive() || !estimated.is_positive(),
    };

    debug!(
        "Reconciled {:.2} m³: est {:.2} t vs scale {:.2} t -> {:.2}% (factor {:.3})",
        *volume, *estimated, *real, *outcome.difference_percent, *outcome.real_density_factor
    );

    outcome
}

/// Signed deviation (%) of the real density factor from a reference factor.
///
/// Positive when the material is denser than the reference. Returns 0.0 when
/// either the volume or the reference is not positive.
pub fn deviation_from_reference(
    volume: CubicMeters,
    real: Tonnes,
    reference: DensityFactor,
) -> Percent {
    if !volume.is_positive() || !reference.is_positive() {
        return Percent::ZERO;
    }
    let real_factor = to_density_factor(volume, real);
    Percent::new((*real_factor - *reference) * 100.0 / *reference)
}

/// Append-only record of a scale weighment against a measured pile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub asset_id: String,
    pub granulometry: GranulometryClass,
    pub volume_m3: CubicMeters,
    pub estimated_mass_t: Tonnes,
    pub real_mass_t: Tonnes,
    pub real_density_factor: DensityFactor,
    pub deviation_percent: Percent,
    /// Always false when `insufficient_data` is set
    pub within_tolerance: bool,
    /// The pile had no positive volume or estimate; the zeros above are not a match
    #[serde(default)]
    pub insufficient_data: bool,
    pub reconciled_at_ms: u64,
}

impl ReconciliationRecord {
    /// Reconcile `measurement` against a scale weight.
    ///
    /// The record takes its asset id from the measurement. A pile without a
    /// positive volume or estimate is stored with `insufficient_data` set and
    /// never counts as within tolerance.
    pub fn from_measurement(
        measurement: &Measurement,
        real_mass: Tonnes,
        reconciled_at_ms: u64,
    ) -> Self {
        let outcome = reconcile(measurement.volume(), measurement.mass(), real_mass);
        if outcome.insufficient_data {
            warn!(
                "Reconciling {} without a positive volume or estimate; stored as insufficient data",
                measurement.asset_id()
            );
        }

        Self {
            asset_id: measurement.asset_id().to_string(),
            granulometry: measurement.granulometry(),
            volume_m3: measurement.volume(),
            estimated_mass_t: measurement.mass(),
            real_mass_t: real_mass,
            real_density_factor: outcome.real_density_factor,
            deviation_percent: outcome.difference_percent,
            within_tolerance: outcome.within_tolerance && !outcome.insufficient_data,
            insufficient_data: outcome.insufficient_data,
            reconciled_at_ms,
        }
    }

    /// Whether the real factor can be used for calibration
    pub fn has_usable_factor(&self) -> bool {
        self.real_density_factor.is_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::dimensions::{Dimensions, GeometryKind};
    use crate::geometry::{GeometricEstimator, VolumeInput};
    use crate::mass::FactorResolution;
    use approx::assert_relative_eq;

    fn run(volume: f64, estimated: f64, real: f64) -> ReconciliationOutcome {
        reconcile(
            CubicMeters::new(volume),
            Tonnes::new(estimated),
            Tonnes::new(real),
        )
    }

    #[test]
    fn test_reference_scenario() {
        let outcome = run(100.0, 166.0, 170.0);

        assert_relative_eq!(*outcome.difference_percent, 2.4096, epsilon = 1e-4);
        assert_eq!(outcome.difference_percent.rounded(2), 2.41);
        assert!(outcome.within_tolerance);
        assert_relative_eq!(*outcome.real_density_factor, 1.70, epsilon = 1e-12);
        assert!(!outcome.insufficient_data);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let at_limit = run(100.0, 100.0, 105.0);
        assert_eq!(at_limit.difference_percent, 5.0);
        assert!(at_limit.within_tolerance);

        let below = run(100.0, 100.0, 95.0);
        assert_eq!(below.difference_percent, 5.0);
        assert!(below.within_tolerance);

        let over = run(100.0, 100.0, 105.01);
        assert!(*over.difference_percent > 5.0);
        assert!(!over.within_tolerance);
    }

    #[test]
    fn test_within_tolerance_matches_difference() {
        for real in [90.0, 94.99, 95.0, 100.0, 103.3, 105.0, 105.01, 130.0] {
            let outcome = run(60.0, 100.0, real);
            assert_eq!(
                outcome.within_tolerance,
                *outcome.difference_percent <= TONNAGE_TOLERANCE_PERCENT
            );
        }
    }

    #[test]
    fn test_decimal_five_percent_is_within_tolerance() {
        // 8.3 / 166 is 5.000000000000007 in f64
        let outcome = run(100.0, 166.0, 174.3);
        assert_eq!(outcome.difference_percent.rounded(2), 5.0);
        assert!(outcome.within_tolerance);

        let outcome = run(100.0, 166.0, 174.32);
        assert!(!outcome.within_tolerance);
    }

    #[test]
    fn test_guards_report_insufficient_data() {
        let no_volume = run(0.0, 166.0, 170.0);
        assert_eq!(no_volume.real_density_factor, 0.0);
        assert!(no_volume.insufficient_data);

        let no_estimate = run(100.0, 0.0, 170.0);
        assert_eq!(no_estimate.difference_percent, 0.0);
        assert!(no_estimate.within_tolerance);
        assert!(no_estimate.insufficient_data);
    }

    #[test]
    fn test_flat_pile_record_is_insufficient_data() {
        let measurement = Measurement::capture(
            "pile-7",
            &GeometricEstimator,
            VolumeInput::new(
                GeometryKind::EllipticCone,
                Dimensions::elliptic_cone(10.0, 6.0, 0.0),
            ),
            GranulometryClass::Colpas,
            FactorResolution::default_profile(DensityFactor::new(1.66)),
            42,
        )
        .unwrap();
        assert_eq!(measurement.volume(), 0.0);

        let record = ReconciliationRecord::from_measurement(&measurement, Tonnes::new(170.0), 50);
        assert_eq!(record.asset_id, "pile-7");
        assert!(record.insufficient_data);
        assert!(!record.within_tolerance);
        assert!(!record.has_usable_factor());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"insufficient_data\":true"));
    }

    #[test]
    fn test_records_without_flag_still_parse() {
        let json = r#"{
            "asset_id": "pile-1", "granulometry": "MIXTO", "volume_m3": 100.0,
            "estimated_mass_t": 188.0, "real_mass_t": 190.0, "real_density_factor": 1.9,
            "deviation_percent": 1.06, "within_tolerance": true, "reconciled_at_ms": 1
        }"#;
        let record: ReconciliationRecord = serde_json::from_str(json).unwrap();
        assert!(!record.insufficient_data);
        assert!(record.within_tolerance);
    }

    #[test]
    fn test_deviation_from_reference() {
        // 170 t over 100 m³ is 1.70 against a 1.66 reference
        let deviation = deviation_from_reference(
            CubicMeters::new(100.0),
            Tonnes::new(170.0),
            DensityFactor::new(1.66),
        );
        assert_relative_eq!(*deviation, 2.4096, epsilon = 1e-4);

        let lighter = deviation_from_reference(
            CubicMeters::new(100.0),
            Tonnes::new(160.0),
            DensityFactor::new(1.66),
        );
        assert!(*lighter < 0.0);

        assert_eq!(
            deviation_from_reference(CubicMeters::ZERO, Tonnes::new(1.0), DensityFactor::new(1.66)),
            0.0
        );
    }
}
