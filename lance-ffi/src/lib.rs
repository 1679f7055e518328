#![allow(unsafe_op_in_unsafe_fn, clippy::missing_safety_doc, clippy::panic)]

//! Native interface to Lance files and batches.
//!
//! Handles (`FFIFile`, `FFIFileWriter`, `FFIBatch`) are opaque boxed pointers
//! owned by the caller and released through the matching `*_free` function.
//! Row data crosses the boundary as Arrow C Data Interface structs, so no
//! values are copied or re-serialized on the way through.
//!
//! Fallible functions take a `*mut *mut lance_error` out-parameter; on
//! failure it receives an error carrying a stable code and a message, and the
//! function returns its documented default.

pub mod array;
pub mod error;
pub mod file;
pub mod log;

use std::ffi::{CStr, c_char};

pub(crate) unsafe fn to_string(ptr: *const c_char) -> String {
    let c_str = CStr::from_ptr(ptr);
    c_str.to_string_lossy().into_owned()
}
