use serde::Serialize;

use crate::core_types::units::DensityFactor;

/// Suggested density for a mineral type, with the reasoning shown to the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MineralDensityHint {
    pub density: DensityFactor,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reasoning: &'static str,
}

/// Density used when the mineral is not in the table
pub const FALLBACK_MINERAL_DENSITY: f64 = 2.0;

const KNOWN_MINERAL_CONFIDENCE: f64 = 0.92;
const UNKNOWN_MINERAL_CONFIDENCE: f64 = 0.5;

/// Suggest a bulk density for a mineral by name (case and whitespace insensitive).
///
/// Unknown minerals get a conservative 2.0 t/m³ with low confidence.
pub fn mineral_density_hint(mineral: &str) -> MineralDensityHint {
    let (density, reasoning) = match mineral.trim().to_uppercase().as_str() {
        "COBRE" => (
            2.1,
            "Fragmented chalcopyrite average with 4% moisture",
        ),
        "HIERRO" => (
            2.8,
            "High-grade hematite with a swell factor of 1.4",
        ),
        "ORO" => (
            1.9,
            "Primary quartz gold ore, corrected for medium fragmentation",
        ),
        "LITIO" => (
            1.6,
            "Spodumene concentrate, low specific gravity",
        ),
        _ => {
            return MineralDensityHint {
                density: DensityFactor::new(FALLBACK_MINERAL_DENSITY),
                confidence: UNKNOWN_MINERAL_CONFIDENCE,
                reasoning: "Unrecognised mineral type; standard safety density suggested",
            }
        }
    };

    MineralDensityHint {
        density: DensityFactor::new(density),
        confidence: KNOWN_MINERAL_CONFIDENCE,
        reasoning,
    }
}
