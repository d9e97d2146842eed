//! Stockpile measurements and their rollups
//!
//! A [`Measurement`] is produced once per field capture and never edited
//! afterwards, except for its `ignored` flag, which removes it from rollups
//! without deleting it.

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::core_types::dimensions::{Dimensions, GeometryKind};
use crate::core_types::granulometry::GranulometryClass;
use crate::core_types::units::{CubicMeters, DensityFactor, Percent, Tonnes};
use crate::geometry::{GeometryError, VolumeEstimator, VolumeInput};
use crate::mass::{calculate_asset, FactorResolution, FactorSource};
use crate::reconciliation::ReconciliationRecord;

/// One volumetric capture of a stockpile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    asset_id: String,
    #[serde(rename = "volumen_m3")]
    volume_m3: CubicMeters,
    #[serde(rename = "peso_t")]
    mass_t: Tonnes,
    #[serde(rename = "density_factor")]
    density_factor_applied: DensityFactor,
    #[serde(rename = "geometry_type")]
    geometry_kind: GeometryKind,
    dimensions: Dimensions,
    granulometry: GranulometryClass,
    timestamp_ms: u64,
    factor_source: FactorSource,
    confidence: f64,
    #[serde(default)]
    ignored: bool,
}

impl Measurement {
    /// Estimate volume with `estimator`, apply `factor`, and record the result.
    ///
    /// # Errors
    /// Returns [`GeometryError`] if `input` is missing a required dimension.
    pub fn capture(
        asset_id: impl Into<String>,
        estimator: &dyn VolumeEstimator,
        input: VolumeInput,
        granulometry: GranulometryClass,
        factor: FactorResolution,
        timestamp_ms: u64,
    ) -> Result<Self, GeometryError> {
        let estimate = estimator.estimate(&input)?;
        let calculation = calculate_asset(estimate.volume, factor);

        Ok(Self {
            asset_id: asset_id.into(),
            volume_m3: calculation.volume_m3,
            mass_t: calculation.mass_t,
            density_factor_applied: calculation.factor_applied,
            geometry_kind: input.geometry,
            dimensions: input.dimensions,
            granulometry,
            timestamp_ms,
            factor_source: calculation.source,
            confidence: estimate.confidence * calculation.confidence,
            ignored: false,
        })
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Full-precision volume
    pub fn volume(&self) -> CubicMeters {
        self.volume_m3
    }

    /// Volume rounded to 2 decimals for display
    pub fn display_volume(&self) -> f64 {
        self.volume_m3.rounded(2)
    }

    pub fn mass(&self) -> Tonnes {
        self.mass_t
    }

    pub fn density_factor(&self) -> DensityFactor {
        self.density_factor_applied
    }

    pub fn geometry_kind(&self) -> GeometryKind {
        self.geometry_kind
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn granulometry(&self) -> GranulometryClass {
        self.granulometry
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn factor_source(&self) -> FactorSource {
        self.factor_source
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Exclude from (or restore to) rollups. The only permitted mutation.
    pub fn set_ignored(&mut self, ignored: bool) {
        self.ignored = ignored;
    }
}

/// Rollup over the non-ignored measurements of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSummary {
    pub count: usize,
    pub ignored_count: usize,
    pub total_volume_m3: CubicMeters,
    pub total_mass_t: Tonnes,
    /// Most recent active measurement
    pub latest: Option<Measurement>,
    /// Latest volume minus the previous active one; `None` with fewer than two
    pub volume_delta_m3: Option<CubicMeters>,
}

/// Summarize a snapshot of measurements, skipping ignored ones.
pub fn summarize(measurements: &[Measurement]) -> MeasurementSummary {
    let (count, total_volume, total_mass) = measurements
        .par_iter()
        .filter(|m| !m.ignored)
        .map(|m| (1usize, m.volume_m3, m.mass_t))
        .reduce(
            || (0, CubicMeters::ZERO, Tonnes::ZERO),
            |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2),
        );

    // Two most recent active measurements
    let mut latest: Option<&Measurement> = None;
    let mut previous: Option<&Measurement> = None;
    for m in measurements.iter().filter(|m| !m.ignored) {
        match latest {
            Some(l) if m.timestamp_ms < l.timestamp_ms => {
                if !previous.is_some_and(|p| m.timestamp_ms < p.timestamp_ms) {
                    previous = Some(m);
                }
            }
            _ => {
                previous = latest;
                latest = Some(m);
            }
        }
    }

    MeasurementSummary {
        count,
        ignored_count: measurements.len() - count,
        total_volume_m3: total_volume,
        total_mass_t: total_mass,
        latest: latest.cloned(),
        volume_delta_m3: latest
            .zip(previous)
            .map(|(l, p)| l.volume_m3 - p.volume_m3),
    }
}

/// Share of active assets that have at least one reconciliation record.
///
/// Returns 0 % when there are no active measurements.
pub fn reconciliation_coverage(
    measurements: &[Measurement],
    records: &[ReconciliationRecord],
) -> Percent {
    let assets: FxHashSet<&str> = measurements
        .iter()
        .filter(|m| !m.ignored)
        .map(|m| m.asset_id.as_str())
        .collect();

    if assets.is_empty() {
        return Percent::ZERO;
    }

    let reconciled: FxHashSet<&str> = records
        .iter()
        .map(|r| r.asset_id.as_str())
        .filter(|id| assets.contains(id))
        .collect();

    Percent::new(reconciled.len() as f64 * 100.0 / assets.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometricEstimator;
    use approx::assert_relative_eq;

    fn cone(asset: &str, major: f64, timestamp_ms: u64) -> Measurement {
        Measurement::capture(
            asset,
            &GeometricEstimator,
            VolumeInput::new(
                GeometryKind::EllipticCone,
                Dimensions::elliptic_cone(major, 6.0, 5.0),
            ),
            GranulometryClass::Colpas,
            FactorResolution::default_profile(DensityFactor::new(1.66)),
            timestamp_ms,
        )
        .unwrap()
    }

    #[test]
    fn test_capture_fills_record() {
        let m = cone("pile-1", 10.0, 1_700_000_000_000);

        assert_eq!(m.asset_id(), "pile-1");
        assert_eq!(m.display_volume(), 78.54);
        assert_relative_eq!(*m.mass(), *m.volume() * 1.66, max_relative = 1e-12);
        assert_eq!(m.factor_source(), FactorSource::Default);
        assert_eq!(m.confidence(), 0.5);
        assert!(!m.is_ignored());
    }

    #[test]
    fn test_capture_rejects_missing_dimension() {
        let result = Measurement::capture(
            "pile-1",
            &GeometricEstimator,
            VolumeInput::new(
                GeometryKind::TruncatedEllipticCone,
                Dimensions::elliptic_cone(10.0, 6.0, 5.0),
            ),
            GranulometryClass::Colpas,
            FactorResolution::manual(DensityFactor::new(1.7)),
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let m = cone("pile-1", 10.0, 42);
        let value = serde_json::to_value(&m).unwrap();

        assert!(value.get("volumen_m3").is_some());
        assert!(value.get("peso_t").is_some());
        assert_eq!(value["density_factor"], 1.66);
        assert_eq!(value["geometry_type"], "CONO_ELIPTICO");
        assert_eq!(value["dimensions"]["height"], 5.0);
        assert_eq!(value["granulometry"], "COLPAS");

        let back: Measurement = serde_json::from_value(value).unwrap();
        assert_eq!(back.asset_id(), "pile-1");
        assert_eq!(back.geometry_kind(), GeometryKind::EllipticCone);
        assert_relative_eq!(*back.volume(), *m.volume(), max_relative = 1e-12);
        assert!(!back.is_ignored());
    }

    #[test]
    fn test_summary_excludes_ignored() {
        let mut measurements = vec![
            cone("a", 10.0, 1),
            cone("a", 12.0, 2),
            cone("b", 20.0, 3),
        ];
        measurements[2].set_ignored(true);

        let summary = summarize(&measurements);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.ignored_count, 1);
        assert_relative_eq!(
            *summary.total_volume_m3,
            *measurements[0].volume() + *measurements[1].volume(),
            max_relative = 1e-12
        );
        assert_eq!(summary.latest.as_ref().map(Measurement::timestamp_ms), Some(2));
        assert_relative_eq!(
            *summary.volume_delta_m3.unwrap(),
            *measurements[1].volume() - *measurements[0].volume(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_summary_orders_by_timestamp_not_position() {
        let measurements = vec![cone("a", 12.0, 20), cone("a", 14.0, 30), cone("a", 10.0, 10)];

        let summary = summarize(&measurements);
        assert_eq!(summary.latest.as_ref().map(Measurement::timestamp_ms), Some(30));
        assert_relative_eq!(
            *summary.volume_delta_m3.unwrap(),
            *measurements[1].volume() - *measurements[0].volume(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_summary_of_empty_snapshot() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.total_mass_t, 0.0);
        assert!(summary.latest.is_none());
        assert!(summary.volume_delta_m3.is_none());
    }

    #[test]
    fn test_reconciliation_coverage() {
        let mut measurements = vec![cone("a", 10.0, 1), cone("b", 10.0, 2), cone("c", 10.0, 3)];
        measurements[2].set_ignored(true);

        let record =
            ReconciliationRecord::from_measurement(&measurements[0], Tonnes::new(130.0), 10);
        let coverage = reconciliation_coverage(&measurements, &[record]);
        assert_eq!(coverage, 50.0);

        assert_eq!(reconciliation_coverage(&[], &[]), 0.0);
    }
}
