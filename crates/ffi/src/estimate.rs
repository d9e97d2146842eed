use std::slice;

use stockpile_core::geometry::solve;
use stockpile_core::mass::calculate_asset;
use stockpile_core::{DensityFactor, Dimensions, FactorSource, GeometryKind};

use crate::error::{DefaultStockpileError, StockpileErrorCode};
use crate::helpers::{engine_from_ptr, track_error, track_result, write_optional};
use crate::instance::{class_from_index, StockpileEngine};

/// Number of dimension slots expected by `stockpile_engine_estimate`.
///
/// Slot order: base major axis, base minor axis, top major axis, top minor
/// axis, base perimeter, top perimeter, height. Unused slots are NaN.
pub const STOCKPILE_DIMENSION_SLOTS: usize = 7;

/// Where the density factor of an estimate came from.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockpileFactorSource {
    /// Operator-entered factor.
    Manual = 0,
    /// Mean of the supplied reconciliation history.
    Inference = 1,
    /// Current engine profile value.
    Default = 2,
}

impl From<FactorSource> for StockpileFactorSource {
    fn from(source: FactorSource) -> Self {
        match source {
            FactorSource::Manual => Self::Manual,
            FactorSource::Inference => Self::Inference,
            FactorSource::Default => Self::Default,
        }
    }
}

#[repr(C)]
/// FFI-friendly tonnage estimate for one stockpile.
/// Keep this layout stable for C/Swift/Kotlin consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockpileEstimate {
    /// Volume at full precision (m³).
    pub volume_m3: f64,

    /// Estimated mass (t).
    pub mass_t: f64,

    /// Density factor applied (t/m³).
    pub density_factor: f64,

    /// Confidence in the factor, 0.0 to 1.0.
    pub confidence: f64,

    pub source: StockpileFactorSource,
}

/// Read the current profile factor for a class.
///
/// Returns
/// - `StockpileErrorCode::Ok` (0) with the factor in `out_factor`
/// - `NullPointer` if `engine` or `out_factor` is null
/// - `InvalidGranulometry` if `class` is not 0 to 3
///
/// # Safety
///
/// - `engine` must be null or a live pointer from `stockpile_engine_new`.
/// - `out_factor` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn stockpile_engine_factor(
    engine: *const StockpileEngine,
    class: u8,
    out_factor: *mut f64,
) -> StockpileErrorCode {
    if out_factor.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("out_factor"));
    }

    let result = unsafe { engine_from_ptr(engine) }.and_then(|engine| {
        let class = class_from_index(class)?;
        Ok(*engine.resolver.factor(class))
    });

    match track_result(result) {
        Ok(factor) => {
            unsafe {
                *out_factor = factor;
            }
            StockpileErrorCode::Ok
        }
        Err(code) => code,
    }
}

/// Overwrite the profile factor of a class for every later estimate.
///
/// This is the operator's acceptance of a calibration suggestion. The
/// replaced factor is written to `out_previous` when it is non-null.
///
/// Returns
/// - `StockpileErrorCode::Ok` (0) on success
/// - `NullPointer` if `engine` is null
/// - `InvalidGranulometry` if `class` is not 0 to 3
/// - `InvalidFactor` if `factor` is not finite and positive
///
/// # Safety
///
/// - `engine` must be null or a live pointer from `stockpile_engine_new`.
/// - `out_previous` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn stockpile_engine_update_profile(
    engine: *const StockpileEngine,
    class: u8,
    factor: f64,
    out_previous: *mut f64,
) -> StockpileErrorCode {
    let result = unsafe { engine_from_ptr(engine) }.and_then(|engine| {
        let class = class_from_index(class)?;
        engine
            .resolver
            .update_profile(class, DensityFactor::new(factor))
            .map_err(DefaultStockpileError::from)
    });

    match track_result(result) {
        Ok(previous) => {
            unsafe { write_optional(out_previous, *previous) };
            StockpileErrorCode::Ok
        }
        Err(code) => code,
    }
}

/// Estimate volume and tonnage of a stockpile.
///
/// Parameters
/// - `geometry`: 0 elliptic cone, 1 truncated elliptic cone, 2 perimeter frustum
/// - `class`: 0 COLPAS, 1 GRANSA, 2 MIXTO, 3 FINOS
/// - `dimensions`: [`STOCKPILE_DIMENSION_SLOTS`] values in metres, NaN where not measured.
///   Axis lengths are full widths across the pile.
/// - `operator_factor`: operator override in t/m³, or NaN for none
/// - `history` / `history_len`: real density factors from earlier reconciliations of this
///   material; may be null when `history_len` is 0
///
/// Returns
/// - `StockpileErrorCode::Ok` (0) with the estimate in `out_estimate`
/// - `NullPointer` if `engine`, `dimensions` or `out_estimate` is null, or `history`
///   is null with a non-zero length
/// - `InvalidGeometry` / `InvalidGranulometry` for unknown indices
/// - `MissingDimension` if a slot required by `geometry` is NaN
///
/// # Safety
///
/// - `engine` must be null or a live pointer from `stockpile_engine_new`.
/// - `dimensions` must point to 7 readable `double`s.
/// - `history` must point to `history_len` readable `double`s.
/// - `out_estimate` must be valid for writes.
#[no_mangle]
#[expect(clippy::too_many_arguments)]
pub unsafe extern "C" fn stockpile_engine_estimate(
    engine: *const StockpileEngine,
    geometry: u8,
    class: u8,
    dimensions: *const f64,
    operator_factor: f64,
    history: *const f64,
    history_len: usize,
    out_estimate: *mut StockpileEstimate,
) -> StockpileErrorCode {
    if out_estimate.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("out_estimate"));
    }
    if dimensions.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("dimensions"));
    }
    if history.is_null() && history_len > 0 {
        return track_error(&DefaultStockpileError::null_pointer("history"));
    }

    // SAFETY: non-null checked above; caller guarantees the lengths.
    let slots = unsafe { &*dimensions.cast::<[f64; STOCKPILE_DIMENSION_SLOTS]>() };
    let history: Vec<DensityFactor> = if history_len == 0 {
        Vec::new()
    } else {
        unsafe { slice::from_raw_parts(history, history_len) }
            .iter()
            .map(|f| DensityFactor::new(*f))
            .collect()
    };

    let result = unsafe { engine_from_ptr(engine) }.and_then(|engine| {
        let kind = GeometryKind::try_from(geometry)
            .map_err(DefaultStockpileError::invalid_geometry)?;
        let class = class_from_index(class)?;

        let volume = solve(kind, &Dimensions::from_slots(slots))?;
        let override_factor =
            (!operator_factor.is_nan()).then_some(DensityFactor::new(operator_factor));
        let resolution = engine.resolver.resolve_factor(class, override_factor, &history);
        let calculation = calculate_asset(volume, resolution);

        Ok(StockpileEstimate {
            volume_m3: *calculation.volume_m3,
            mass_t: *calculation.mass_t,
            density_factor: *calculation.factor_applied,
            confidence: calculation.confidence,
            source: calculation.source.into(),
        })
    });

    match track_result(result) {
        Ok(estimate) => {
            unsafe {
                *out_estimate = estimate;
            }
            StockpileErrorCode::Ok
        }
        Err(code) => code,
    }
}
