//! Volume ⇄ mass conversion through a bulk density factor

use serde::{Deserialize, Serialize};

use crate::core_types::units::{CubicMeters, DensityFactor, Tonnes};

/// Tonnage of `volume` at `factor` t/m³.
///
/// ```text
/// m = V × ρ
/// ```
#[inline]
pub fn to_mass(volume: CubicMeters, factor: DensityFactor) -> Tonnes {
    volume * factor
}

/// Density factor implied by a volume and a mass.
///
/// ```text
/// ρ = m / V
/// ```
///
/// Returns 0.0 when `volume` is not positive, so an empty or unmeasured pile
/// never puts NaN or infinity into a report. A 0.0 factor means
/// "insufficient data", never a real density.
#[inline]
pub fn to_density_factor(volume: CubicMeters, mass: Tonnes) -> DensityFactor {
    if !volume.is_positive() {
        return DensityFactor::ZERO;
    }
    mass / volume
}

/// Where the density factor of an estimate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorSource {
    /// Entered by the operator
    Manual,
    /// Inferred from reconciled history of the same material
    Inference,
    /// Current material profile value
    Default,
}

/// A density factor together with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorResolution {
    pub factor: DensityFactor,
    pub source: FactorSource,
    /// 0.0 to 1.0
    pub confidence: f64,
}

impl FactorResolution {
    /// Confidence assigned to profile defaults
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;
    /// Confidence assigned to factors inferred from history
    pub const INFERENCE_CONFIDENCE: f64 = 0.85;

    pub fn manual(factor: DensityFactor) -> Self {
        Self {
            factor,
            source: FactorSource::Manual,
            confidence: 1.0,
        }
    }

    pub fn inferred(factor: DensityFactor) -> Self {
        Self {
            factor,
            source: FactorSource::Inference,
            confidence: Self::INFERENCE_CONFIDENCE,
        }
    }

    pub fn default_profile(factor: DensityFactor) -> Self {
        Self {
            factor,
            source: FactorSource::Default,
            confidence: Self::DEFAULT_CONFIDENCE,
        }
    }
}

/// Tonnage estimate for one stockpile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetCalculation {
    pub volume_m3: CubicMeters,
    pub factor_applied: DensityFactor,
    pub mass_t: Tonnes,
    pub confidence: f64,
    pub source: FactorSource,
}

/// Combine a volume with a resolved factor into a tonnage estimate.
pub fn calculate_asset(volume: CubicMeters, resolution: FactorResolution) -> AssetCalculation {
    AssetCalculation {
        volume_m3: volume,
        factor_applied: resolution.factor,
        mass_t: to_mass(volume, resolution.factor),
        confidence: resolution.confidence,
        source: resolution.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_to_mass() {
        let mass = to_mass(CubicMeters::new(100.0), DensityFactor::new(1.66));
        assert_relative_eq!(*mass, 166.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mass_density_round_trip() {
        for (v, d) in [(78.54, 1.66), (0.35, 2.05), (4100.0, 1.78)] {
            let volume = CubicMeters::new(v);
            let factor = DensityFactor::new(d);
            let back = to_density_factor(volume, to_mass(volume, factor));
            assert_relative_eq!(*back, d, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_density_of_empty_volume_is_zero() {
        assert_eq!(to_density_factor(CubicMeters::ZERO, Tonnes::new(170.0)), 0.0);
        assert_eq!(
            to_density_factor(CubicMeters::new(-5.0), Tonnes::new(170.0)),
            0.0
        );
        assert_eq!(
            to_density_factor(CubicMeters::new(f64::NAN), Tonnes::new(170.0)),
            0.0
        );
    }

    #[test]
    fn test_calculate_asset_carries_provenance() {
        let volume = CubicMeters::new(200.0);

        let manual = calculate_asset(volume, FactorResolution::manual(DensityFactor::new(1.7)));
        assert_eq!(manual.source, FactorSource::Manual);
        assert_eq!(manual.confidence, 1.0);
        assert_relative_eq!(*manual.mass_t, 340.0, epsilon = 1e-9);

        let fallback =
            calculate_asset(volume, FactorResolution::default_profile(DensityFactor::new(1.66)));
        assert_eq!(fallback.source, FactorSource::Default);
        assert_eq!(fallback.confidence, 0.5);
    }
}
