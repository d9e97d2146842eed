//! C ABI for the stockpile volume and density engine
//!
//! Functions follow C conventions: fallible calls return a
//! [`StockpileErrorCode`] (0 = success) and write results through
//! out-parameters, with a per-thread message available from
//! [`stockpile_get_last_error`]. The header is generated by `cbindgen` at
//! build time (`StockpileFFI.h` at the workspace root).
//!
//! Index conventions:
//! - granulometry class: 0 COLPAS, 1 GRANSA, 2 MIXTO, 3 FINOS
//! - geometry kind: 0 elliptic cone, 1 truncated elliptic cone, 2 perimeter frustum

mod error;
mod estimate;
mod formulas;
mod helpers;
mod instance;

pub use error::{stockpile_get_last_error, stockpile_get_last_error_code, StockpileErrorCode};
pub use estimate::{
    stockpile_engine_estimate, stockpile_engine_factor, stockpile_engine_update_profile,
    StockpileEstimate, StockpileFactorSource, STOCKPILE_DIMENSION_SLOTS,
};
pub use formulas::{
    stockpile_elliptic_cone_volume, stockpile_perimeter_truncated_cone_volume, stockpile_reconcile,
    stockpile_suggest_calibration, stockpile_to_density_factor, stockpile_to_mass,
    stockpile_truncated_elliptic_cone_volume, StockpileReconciliation,
};
pub use instance::{
    stockpile_engine_destroy, stockpile_engine_from_profile, stockpile_engine_new, StockpileEngine,
};
