use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use stockpile_core::{DensityProfileResolver, GranulometryClass, MaterialProfile};
use tracing::info;

use crate::error::{DefaultStockpileError, StockpileErrorCode};
use crate::helpers::{track_error, track_result};

/// Engine handle owned by the host application.
///
/// Holds the density profile shared by every estimate made through this
/// handle. The profile sits behind an `RwLock` inside
/// [`DensityProfileResolver`], so a single engine can be used from the UI
/// thread and background sync threads at the same time: estimates read the
/// profile concurrently and a profile update is seen whole by later reads.
///
/// Create with [`stockpile_engine_new`], free with [`stockpile_engine_destroy`].
pub struct StockpileEngine {
    pub(crate) resolver: DensityProfileResolver,
}

impl StockpileEngine {
    /// Engine seeded with the reference density table.
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            resolver: DensityProfileResolver::new(),
        })
    }

    /// Engine seeded from a profile file.
    ///
    /// # Errors
    ///
    /// Returns the profile loading error if the file cannot be read or parsed.
    pub(crate) fn from_profile_file(path: &str) -> Result<Box<Self>, DefaultStockpileError> {
        let profile = MaterialProfile::load(path)?;
        Ok(Box::new(Self {
            resolver: DensityProfileResolver::with_profile(profile),
        }))
    }
}

/// Resolve a class index coming from C.
pub(crate) fn class_from_index(index: u8) -> Result<GranulometryClass, DefaultStockpileError> {
    GranulometryClass::try_from(index).map_err(|_| DefaultStockpileError::invalid_class(index))
}

/// Create a new engine with the reference density profile.
///
/// Returns `StockpileErrorCode::Ok` with a valid pointer in `out_engine`, or
/// `NullPointer` if `out_engine` is null.
///
/// # Safety
///
/// - `out_engine` must be a valid, non-null pointer to writable memory.
/// - The caller takes ownership of the returned engine and MUST call
///   `stockpile_engine_destroy` exactly once.
///
/// Example (C)
/// ```c
/// StockpileEngine* engine = NULL;
/// if (stockpile_engine_new(&engine) != Ok) {
///     return;
/// }
/// // ... use engine ...
/// stockpile_engine_destroy(engine);
/// ```
#[no_mangle]
pub unsafe extern "C" fn stockpile_engine_new(
    out_engine: *mut *mut StockpileEngine,
) -> StockpileErrorCode {
    if out_engine.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("out_engine"));
    }

    info!("Stockpile engine created with reference profile");
    unsafe {
        *out_engine = Box::into_raw(StockpileEngine::new());
    }
    StockpileErrorCode::Ok
}

/// Create a new engine from a JSON profile file (UTF-8 path).
///
/// Returns
/// - `StockpileErrorCode::Ok` (0) with a valid pointer in `out_engine`
/// - `NullPointer` if `path` or `out_engine` is null
/// - `InvalidFactor` if the file holds a non-positive factor
/// - `InvalidParameter` if the file cannot be read or parsed
///
/// On failure `out_engine` is set to null.
///
/// # Safety
///
/// - `path` must be null or a valid null-terminated C string.
/// - `out_engine` must be a valid, non-null pointer to writable memory.
/// - On success the caller MUST call `stockpile_engine_destroy` exactly once.
#[no_mangle]
pub unsafe extern "C" fn stockpile_engine_from_profile(
    path: *const c_char,
    out_engine: *mut *mut StockpileEngine,
) -> StockpileErrorCode {
    if out_engine.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("out_engine"));
    }
    unsafe {
        *out_engine = ptr::null_mut();
    }
    if path.is_null() {
        return track_error(&DefaultStockpileError::null_pointer("path"));
    }

    // SAFETY: checked non-null above; caller guarantees null termination.
    let path = unsafe { CStr::from_ptr(path) }.to_string_lossy();

    match track_result(StockpileEngine::from_profile_file(&path)) {
        Ok(engine) => {
            unsafe {
                *out_engine = Box::into_raw(engine);
            }
            StockpileErrorCode::Ok
        }
        Err(code) => code,
    }
}

/// Destroys an engine previously created by `stockpile_engine_new` or
/// `stockpile_engine_from_profile`.
///
/// If `ptr` is null, this function is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by one of the constructors above.
/// - The pointer MUST NOT have been freed already.
/// - After calling this function, the caller must not use the pointer again.
#[no_mangle]
pub unsafe extern "C" fn stockpile_engine_destroy(ptr: *mut StockpileEngine) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: the pointer came from `Box::into_raw` in a constructor and has
    // not been freed, so reclaiming the Box drops the engine exactly once.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
