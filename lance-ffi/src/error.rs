use std::ffi::{CString, c_char, c_int};
use std::ptr;

// The leading `::` keeps the crate path from resolving to the
// [`lance_error`] struct below.
use ::lance_error::{LanceError, LanceResult};

/// An unclassified failure, e.g. one raised below the engine.
pub const LANCE_ERROR_OTHER: c_int = -1;
pub const LANCE_ERROR_NOT_A_LANCE_FILE: c_int = 1;
pub const LANCE_ERROR_UNSUPPORTED_VERSION: c_int = 2;
pub const LANCE_ERROR_CORRUPT_ENCODING: c_int = 3;
pub const LANCE_ERROR_OUT_OF_RANGE: c_int = 4;
pub const LANCE_ERROR_SCHEMA_MISMATCH: c_int = 5;
pub const LANCE_ERROR_WRITER_CLOSED: c_int = 6;
pub const LANCE_ERROR_ALREADY_COMMITTED: c_int = 7;
pub const LANCE_ERROR_INVALID_ARGUMENT: c_int = 8;
pub const LANCE_ERROR_IO_FAILURE: c_int = 9;

/// An error surfaced to a native caller: a stable code plus a heap-allocated
/// message, both owned by this struct until [`lance_error_free`].
#[repr(C)]
pub struct lance_error {
    pub code: c_int,
    pub message: *const c_char,
}

fn error_code(err: &LanceError) -> c_int {
    match err {
        LanceError::NotALanceFile(_) => LANCE_ERROR_NOT_A_LANCE_FILE,
        LanceError::UnsupportedVersion(_) => LANCE_ERROR_UNSUPPORTED_VERSION,
        LanceError::CorruptEncoding(_) => LANCE_ERROR_CORRUPT_ENCODING,
        LanceError::OutOfRange(_) => LANCE_ERROR_OUT_OF_RANGE,
        LanceError::SchemaMismatch(_) => LANCE_ERROR_SCHEMA_MISMATCH,
        LanceError::WriterClosed(_) => LANCE_ERROR_WRITER_CLOSED,
        LanceError::AlreadyCommitted(_) => LANCE_ERROR_ALREADY_COMMITTED,
        LanceError::InvalidArgument(_) => LANCE_ERROR_INVALID_ARGUMENT,
        LanceError::IoFailure(_) => LANCE_ERROR_IO_FAILURE,
        _ => LANCE_ERROR_OTHER,
    }
}

/// Run `function`, writing any error to the out-parameter and returning
/// `default_value` in its place.
pub fn try_or<T>(
    error: *mut *mut lance_error,
    default_value: T,
    function: impl FnOnce() -> LanceResult<T>,
) -> T {
    match function() {
        Ok(value) => {
            unsafe { error.write(ptr::null_mut()) };
            value
        }
        Err(err) => {
            // A NUL inside the message would truncate it; swap each for a
            // space and carry on.
            let message = err.to_string().replace('\0', " ");
            #[allow(clippy::expect_used)]
            let c_string = CString::new(message).expect("error message contains no NUL");
            unsafe {
                error.write(Box::into_raw(Box::new(lance_error {
                    code: error_code(&err),
                    message: c_string.into_raw(),
                })));
            }
            default_value
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn lance_error_free(error: *mut lance_error) {
    let boxed = Box::from_raw(error);
    if !boxed.message.is_null() {
        drop(CString::from_raw(boxed.message.cast_mut()));
    }
}
