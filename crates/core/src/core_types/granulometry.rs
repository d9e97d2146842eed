use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::units::DensityFactor;

/// Plausible bulk density band for a granulometry class (t/m³)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityRange {
    pub min: DensityFactor,
    pub default: DensityFactor,
    pub max: DensityFactor,
}

impl DensityRange {
    const fn new(min: f64, default: f64, max: f64) -> Self {
        Self {
            min: DensityFactor::new(min),
            default: DensityFactor::new(default),
            max: DensityFactor::new(max),
        }
    }

    /// Whether `factor` lies inside the band (inclusive)
    pub fn contains(&self, factor: DensityFactor) -> bool {
        factor >= self.min && factor <= self.max
    }
}

/// Fragment-size classification of a stockpile's material.
///
/// Coarser material packs with more voids, so its bulk density is lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum GranulometryClass {
    /// Coarse blocky fragments (>12"), high porosity
    Colpas = 0,
    /// Medium / mixed fragments
    Gransa = 1,
    /// Combined coarse and fine
    Mixto = 2,
    /// Fine material, low porosity
    Finos = 3,
}

impl GranulometryClass {
    /// All classes in reference-table order
    pub const ALL: [GranulometryClass; 4] = [
        GranulometryClass::Colpas,
        GranulometryClass::Gransa,
        GranulometryClass::Mixto,
        GranulometryClass::Finos,
    ];

    /// Reference density band for this class.
    pub const fn density_range(self) -> DensityRange {
        match self {
            GranulometryClass::Colpas => DensityRange::new(1.60, 1.66, 1.69),
            GranulometryClass::Gransa => DensityRange::new(1.70, 1.78, 1.85),
            GranulometryClass::Mixto => DensityRange::new(1.80, 1.88, 1.95),
            GranulometryClass::Finos => DensityRange::new(1.90, 2.00, 2.15),
        }
    }

    /// Upper-case tag used in stored documents
    pub fn name(self) -> &'static str {
        match self {
            GranulometryClass::Colpas => "COLPAS",
            GranulometryClass::Gransa => "GRANSA",
            GranulometryClass::Mixto => "MIXTO",
            GranulometryClass::Finos => "FINOS",
        }
    }
}

impl fmt::Display for GranulometryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for unrecognised class names or indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownClass(pub String);

impl fmt::Display for UnknownClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown granulometry class '{}' (expected COLPAS, GRANSA, MIXTO or FINOS)",
            self.0
        )
    }
}

impl std::error::Error for UnknownClass {}

impl FromStr for GranulometryClass {
    type Err = UnknownClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COLPAS" => Ok(GranulometryClass::Colpas),
            "GRANSA" => Ok(GranulometryClass::Gransa),
            "MIXTO" => Ok(GranulometryClass::Mixto),
            "FINOS" => Ok(GranulometryClass::Finos),
            _ => Err(UnknownClass(s.to_string())),
        }
    }
}

impl TryFrom<u8> for GranulometryClass {
    type Error = UnknownClass;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        GranulometryClass::ALL
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| UnknownClass(index.to_string()))
    }
}
