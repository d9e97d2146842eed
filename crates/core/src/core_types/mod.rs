//! Core types and utilities

pub mod dimensions;
pub mod granulometry;
pub mod units;

pub use dimensions::{DimensionKey, Dimensions, GeometryKind};
pub use granulometry::{DensityRange, GranulometryClass, UnknownClass};
pub use units::*;
