use crate::error::{with_last_error_mut, DefaultStockpileError, StockpileError, StockpileErrorCode};
use crate::instance::StockpileEngine;
use std::ffi::CString;

/// Set the thread-local error message and code.
/// Accepts any type implementing `StockpileError` trait.
pub(crate) fn set_last_error(error: &impl StockpileError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl StockpileError) -> StockpileErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, or clear the error state on success.
pub(crate) fn track_result<T, E: StockpileError>(result: Result<T, E>) -> Result<T, StockpileErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = StockpileErrorCode::Ok;
    });
}

/// Write `value` through `out` if the caller asked for it.
///
/// # Safety
/// `out` must be null or valid for writes.
#[inline]
pub(crate) unsafe fn write_optional<T>(out: *mut T, value: T) {
    if !out.is_null() {
        unsafe {
            *out = value;
        }
    }
}

/// Borrow the engine behind a caller-supplied pointer.
///
/// # Safety
/// `ptr` must be null or a live pointer from `stockpile_engine_new`.
pub(crate) unsafe fn engine_from_ptr<'a>(
    ptr: *const StockpileEngine,
) -> Result<&'a StockpileEngine, DefaultStockpileError> {
    // SAFETY: caller guarantees the pointer is null or valid.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultStockpileError::null_pointer("engine"))
}
