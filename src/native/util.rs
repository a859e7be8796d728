//! Pointer helpers shared by the native exports.

use crate::error::ErrorCode;
use crate::native::exception::CvException;
use libc::c_char;
use std::ffi::{CString, c_void};

/// Convert a Rust string to an owned C string.
///
/// The caller is responsible for freeing the returned pointer with [`free_cstr`].
/// Returns null if the string contains internal null bytes.
pub fn string_to_cstr(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}

/// Free a string produced by [`string_to_cstr`] and null the slot.
///
/// # Safety
///
/// `*slot` must be null or a pointer returned by [`string_to_cstr`].
pub unsafe fn free_cstr(slot: &mut *mut c_char) {
    if !slot.is_null() {
        unsafe { drop(CString::from_raw(*slot)) };
        *slot = std::ptr::null_mut();
    }
}

/// Box a native object and hand it out as an opaque handle.
pub fn into_handle<T>(value: T) -> *mut c_void {
    Box::into_raw(Box::new(value)).cast()
}

/// Borrow the object behind an opaque handle.
///
/// Raises `StsNullPtr` for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live pointer produced by [`into_handle::<T>`].
pub unsafe fn handle_mut<'a, T>(
    handle: *mut c_void,
    func: &'static str,
) -> Result<&'a mut T, CvException> {
    unsafe { handle.cast::<T>().as_mut() }.ok_or_else(|| {
        CvException::new(ErrorCode::StsNullPtr, "null handle", func, file!(), line!())
    })
}

/// Shared borrow of the object behind an opaque handle.
///
/// Used for objects that several handles may point at, such as the object
/// managed by a smart pointer.
///
/// # Safety
///
/// `handle` must be null or a live pointer to a `T`.
pub unsafe fn handle_ref<'a, T>(
    handle: *mut c_void,
    func: &'static str,
) -> Result<&'a T, CvException> {
    unsafe { handle.cast::<T>().as_ref() }.ok_or_else(|| {
        CvException::new(ErrorCode::StsNullPtr, "null handle", func, file!(), line!())
    })
}

/// Write a result through an out-parameter.
///
/// Raises `StsNullPtr` for a null out-parameter.
///
/// # Safety
///
/// `out` must be null or valid for writes.
pub unsafe fn write_out<T>(out: *mut T, value: T, func: &'static str) -> Result<(), CvException> {
    match unsafe { out.as_mut() } {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(CvException::new(
            ErrorCode::StsNullPtr,
            "null out-parameter",
            func,
            file!(),
            line!(),
        )),
    }
}
