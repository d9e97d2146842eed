//! Field measurement inputs: which solid was measured and its dimensions

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::units::Meters;

/// Named axis of a field measurement
///
/// Axis lengths are full widths (diameters) across the pile, as taped in the
/// field. Perimeters are walked around the base or the flattened top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKey {
    BaseMajorAxis,
    BaseMinorAxis,
    TopMajorAxis,
    TopMinorAxis,
    BasePerimeter,
    TopPerimeter,
    Height,
}

impl DimensionKey {
    /// Index into the fixed 7-slot layout used by the C ABI
    pub const SLOTS: [DimensionKey; 7] = [
        DimensionKey::BaseMajorAxis,
        DimensionKey::BaseMinorAxis,
        DimensionKey::TopMajorAxis,
        DimensionKey::TopMinorAxis,
        DimensionKey::BasePerimeter,
        DimensionKey::TopPerimeter,
        DimensionKey::Height,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DimensionKey::BaseMajorAxis => "base_major_axis",
            DimensionKey::BaseMinorAxis => "base_minor_axis",
            DimensionKey::TopMajorAxis => "top_major_axis",
            DimensionKey::TopMinorAxis => "top_minor_axis",
            DimensionKey::BasePerimeter => "base_perimeter",
            DimensionKey::TopPerimeter => "top_perimeter",
            DimensionKey::Height => "height",
        }
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Solid shape used to model a stockpile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GeometryKind {
    /// Cone over an elliptical base
    #[serde(rename = "CONO_ELIPTICO")]
    EllipticCone = 0,
    /// Frustum with elliptical base and flattened elliptical top
    #[serde(rename = "CONO_ELIPTICO_TRUNCADO")]
    TruncatedEllipticCone = 1,
    /// Frustum measured by base and top perimeters (circular cross-section)
    #[serde(rename = "CONO_TRUNCADO_PERIMETRO")]
    PerimeterTruncatedCone = 2,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 3] = [
        GeometryKind::EllipticCone,
        GeometryKind::TruncatedEllipticCone,
        GeometryKind::PerimeterTruncatedCone,
    ];

    /// Dimension keys consumed by this shape
    pub fn required_keys(self) -> &'static [DimensionKey] {
        match self {
            GeometryKind::EllipticCone => &[
                DimensionKey::BaseMajorAxis,
                DimensionKey::BaseMinorAxis,
                DimensionKey::Height,
            ],
            GeometryKind::TruncatedEllipticCone => &[
                DimensionKey::BaseMajorAxis,
                DimensionKey::BaseMinorAxis,
                DimensionKey::TopMajorAxis,
                DimensionKey::TopMinorAxis,
                DimensionKey::Height,
            ],
            GeometryKind::PerimeterTruncatedCone => &[
                DimensionKey::BasePerimeter,
                DimensionKey::TopPerimeter,
                DimensionKey::Height,
            ],
        }
    }

    /// Tag stored in the `geometry_type` field of a measurement document
    pub fn tag(self) -> &'static str {
        match self {
            GeometryKind::EllipticCone => "CONO_ELIPTICO",
            GeometryKind::TruncatedEllipticCone => "CONO_ELIPTICO_TRUNCADO",
            GeometryKind::PerimeterTruncatedCone => "CONO_TRUNCADO_PERIMETRO",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl TryFrom<u8> for GeometryKind {
    type Error = u8;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        GeometryKind::ALL.get(usize::from(index)).copied().ok_or(index)
    }
}

/// Measured dimensions of one stockpile, keyed by axis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimensions(FxHashMap<DimensionKey, Meters>);

impl Dimensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: DimensionKey, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: DimensionKey, value: f64) {
        self.0.insert(key, Meters::new(value));
    }

    pub fn get(&self, key: DimensionKey) -> Option<Meters> {
        self.0.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First required key of `kind` that is absent, if any
    pub fn first_missing(&self, kind: GeometryKind) -> Option<DimensionKey> {
        kind.required_keys()
            .iter()
            .copied()
            .find(|key| !self.0.contains_key(key))
    }

    /// Build from the fixed 7-slot layout; NaN slots are treated as absent.
    pub fn from_slots(slots: &[f64; 7]) -> Self {
        let mut dims = Self::new();
        for (key, value) in DimensionKey::SLOTS.iter().zip(slots) {
            if !value.is_nan() {
                dims.insert(*key, *value);
            }
        }
        dims
    }

    /// Elliptic cone from full axis lengths
    pub fn elliptic_cone(major: f64, minor: f64, height: f64) -> Self {
        Self::new()
            .with(DimensionKey::BaseMajorAxis, major)
            .with(DimensionKey::BaseMinorAxis, minor)
            .with(DimensionKey::Height, height)
    }

    /// Truncated elliptic cone from full axis lengths
    pub fn truncated_elliptic_cone(
        base_major: f64,
        base_minor: f64,
        top_major: f64,
        top_minor: f64,
        height: f64,
    ) -> Self {
        Self::new()
            .with(DimensionKey::BaseMajorAxis, base_major)
            .with(DimensionKey::BaseMinorAxis, base_minor)
            .with(DimensionKey::TopMajorAxis, top_major)
            .with(DimensionKey::TopMinorAxis, top_minor)
            .with(DimensionKey::Height, height)
    }

    /// Perimeter-measured frustum
    pub fn perimeter_truncated_cone(base_perimeter: f64, top_perimeter: f64, height: f64) -> Self {
        Self::new()
            .with(DimensionKey::BasePerimeter, base_perimeter)
            .with(DimensionKey::TopPerimeter, top_perimeter)
            .with(DimensionKey::Height, height)
    }
}
