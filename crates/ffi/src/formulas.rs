//! Stateless formula entry points
//!
//! These mirror the core library one to one and need no engine handle. They
//! are total: bad inputs clamp to zero instead of failing.

use std::slice;

use stockpile_core::{geometry, reconcile, suggest_calibration, CubicMeters, DensityFactor, Tonnes};

use crate::error::{DefaultStockpileError, StockpileErrorCode};
use crate::helpers::{clear_last_error, track_error};

#[repr(C)]
/// FFI-friendly result of reconciling an estimate with a scale weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockpileReconciliation {
    /// Scale mass over volume (t/m³); 0 when the volume is not positive.
    pub real_density_factor: f64,

    /// |estimated − real| × 100 / estimated; 0 when the estimate is not positive.
    pub difference_percent: f64,

    /// `difference_percent` ≤ 5.0, allowing float rounding at the boundary.
    pub within_tolerance: bool,

    /// A zero above means "no data" rather than a real zero.
    pub insufficient_data: bool,
}

/// Volume (m³) of a cone over an elliptical base, from full axis lengths.
#[no_mangle]
pub extern "C" fn stockpile_elliptic_cone_volume(major_axis: f64, minor_axis: f64, height: f64) -> f64 {
    *geometry::elliptic_cone_volume(major_axis, minor_axis, height)
}

/// Volume (m³) of an elliptical frustum, from full axis lengths.
#[no_mangle]
pub extern "C" fn stockpile_truncated_elliptic_cone_volume(
    base_major: f64,
    base_minor: f64,
    top_major: f64,
    top_minor: f64,
    height: f64,
) -> f64 {
    *geometry::truncated_elliptic_cone_volume(base_major, base_minor, top_major, top_minor, height)
}

/// Volume (m³) of a circular frustum from base and top perimeters.
#[no_mangle]
pub extern "C" fn stockpile_perimeter_truncated_cone_volume(
    base_perimeter: f64,
    top_perimeter: f64,
    height: f64,
) -> f64 {
    *geometry::perimeter_truncated_cone_volume(base_perimeter, top_perimeter, height)
}

/// Mass (t) = volume (m³) × density factor (t/m³).
#[no_mangle]
pub extern "C" fn stockpile_to_mass(volume_m3: f64, density_factor: f64) -> f64 {
    *stockpile_core::to_mass(CubicMeters::new(volume_m3), DensityFactor::new(density_factor))
}

/// Density factor (t/m³) = mass / volume, or 0 when the volume is not positive.
#[no_mangle]
pub extern "C" fn stockpile_to_density_factor(volume_m3: f64, mass_t: f64) -> f64 {
    *stockpile_core::to_density_factor(CubicMeters::new(volume_m3), Tonnes::new(mass_t))
}

/// Compare an estimated tonnage with the real scale tonnage.
#[no_mangle]
pub extern "C" fn stockpile_reconcile(
    volume_m3: f64,
    estimated_mass_t: f64,
    real_mass_t: f64,
) -> StockpileReconciliation {
    let outcome = reconcile(
        CubicMeters::new(volume_m3),
        Tonnes::new(estimated_mass_t),
        Tonnes::new(real_mass_t),
    );

    StockpileReconciliation {
        real_density_factor: *outcome.real_density_factor,
        difference_percent: *outcome.difference_percent,
        within_tolerance: outcome.within_tolerance,
        insufficient_data: outcome.insufficient_data,
    }
}

/// Suggest a calibrated density factor from real factors, oldest first.
///
/// With fewer than 3 usable samples there is no suggestion:
/// `out_has_suggestion` is set to `false` and `out_factor` is left untouched.
/// This is not an error.
///
/// Returns
/// - `StockpileErrorCode::Ok` (0) in both cases above
/// - `NullPointer` if an out-parameter is null, or `samples` is null with a non-zero length
///
/// # Safety
///
/// - `samples` must point to `len` readable `double`s (may be null when `len` is 0).
/// - `out_factor` and `out_has_suggestion` must be valid for writes.
///
/// Example (C)
/// ```c
/// double history[] = {1.60, 1.70, 1.80};
/// double factor = 0.0;
/// bool has = false;
/// stockpile_suggest_calibration(history, 3, &factor, &has);
/// // has == true, factor == 1.700
/// ```
#[no_mangle]
pub unsafe extern "C" fn stockpile_suggest_calibration(
    samples: *const f64,
    len: usize,
    out_factor: *mut f64,
    out_has_suggestion: *mut bool,
) -> StockpileErrorCode {
    if out_factor.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("out_factor"));
    }
    if out_has_suggestion.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("out_has_suggestion"));
    }
    if samples.is_null() && len > 0 {
        return track_error(&DefaultStockpileError::null_pointer("samples"));
    }

    let history = if len == 0 {
        &[][..]
    } else {
        // SAFETY: non-null checked above; caller guarantees `len` elements.
        unsafe { slice::from_raw_parts(samples, len) }
    };

    let suggestion = suggest_calibration(history);
    unsafe {
        *out_has_suggestion = suggestion.is_some();
        if let Some(factor) = suggestion {
            *out_factor = *factor;
        }
    }

    clear_last_error();
    StockpileErrorCode::Ok
}
