use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use stockpile_core::{GeometryError, ProfileError};

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait StockpileError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> StockpileErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `StockpileError` for the FFI error scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultStockpileError {
    code: StockpileErrorCode,
    msg: String,
}

impl DefaultStockpileError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_engine"`, `"dimensions"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: StockpileErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for a granulometry class index outside `0..=3`.
    pub fn invalid_class(index: u8) -> Self {
        Self {
            code: StockpileErrorCode::InvalidGranulometry,
            msg: format!("Granulometry class index {index} is not one of 0 (COLPAS) to 3 (FINOS)"),
        }
    }

    /// Create error for a geometry kind index outside `0..=2`.
    pub fn invalid_geometry(index: u8) -> Self {
        Self {
            code: StockpileErrorCode::InvalidGeometry,
            msg: format!("Geometry kind index {index} is not one of 0 to 2"),
        }
    }
}

impl From<GeometryError> for DefaultStockpileError {
    fn from(error: GeometryError) -> Self {
        Self {
            code: StockpileErrorCode::MissingDimension,
            msg: error.to_string(),
        }
    }
}

impl From<ProfileError> for DefaultStockpileError {
    fn from(error: ProfileError) -> Self {
        let code = match &error {
            ProfileError::InvalidFactor { .. } => StockpileErrorCode::InvalidFactor,
            _ => StockpileErrorCode::InvalidParameter,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl StockpileError for DefaultStockpileError {
    fn code(&self) -> StockpileErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by stockpile engine functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockpileErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Granulometry class index is not a known class.
    InvalidGranulometry = 2,

    /// Geometry kind index is not a known shape.
    InvalidGeometry = 3,

    /// A dimension required by the selected shape was NaN (not measured).
    MissingDimension = 4,

    /// Density factor is not finite and positive.
    InvalidFactor = 5,

    /// Any other rejected input.
    InvalidParameter = 6,
}

impl From<DefaultStockpileError> for StockpileErrorCode {
    fn from(error: DefaultStockpileError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored here so the pointer handed to the caller stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, StockpileErrorCode)> = const { RefCell::new((None, StockpileErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, StockpileErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, StockpileErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if the last call on this thread failed.
/// - `null` if the last call succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread that
/// sets or clears the error, or until the thread terminates.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// StockpileEngine* engine = NULL;
/// if (stockpile_engine_new(&engine) != Ok) {
///     const char* error = stockpile_get_last_error();
///     if (error) {
///         printf("Engine creation failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn stockpile_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `StockpileErrorCode::Ok` (0) if the last call on this thread succeeded.
/// Error state is per thread.
#[no_mangle]
pub extern "C" fn stockpile_get_last_error_code() -> StockpileErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
