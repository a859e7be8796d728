//! Translation of native status codes into [`Error`].
//!
//! Every fallible native call goes through [`handle_exception`], directly or via
//! the out-parameter helpers. A failure is never retried or altered: the error
//! record parked by the native side is moved into a [`NativeException`] as-is.

use crate::error::{Error, NativeException, Result};
use crate::native::{ExceptionStatus, NativeErrorRecord, core_freeErrorRecord, core_takeLastError};
use crate::trace::trace_warn;
use libc::c_char;
use std::ffi::{CStr, c_void};
use std::ptr::{self, NonNull};

/// Raw native handle as passed across the boundary.
pub type RawHandle = *mut c_void;

/// Turn a native status into a `Result`.
pub fn handle_exception(status: ExceptionStatus) -> Result<()> {
    if status.occurred() {
        Err(Error::NativeOperation(take_last_error()))
    } else {
        Ok(())
    }
}

/// Call a native function that writes its result through an out-parameter.
///
/// The out value is discarded when the call reports failure.
pub fn out_value<T: Default>(call: impl FnOnce(*mut T) -> ExceptionStatus) -> Result<T> {
    let mut ret = T::default();
    handle_exception(call(ptr::addr_of_mut!(ret)))?;
    Ok(ret)
}

/// Call a native factory that writes a handle through an out-parameter.
///
/// A handle written by a failing call is treated as invalid: it is dropped
/// here and never reaches the caller. A successful call that produced no
/// handle is an allocation failure.
pub fn out_handle(
    type_name: &'static str,
    call: impl FnOnce(*mut RawHandle) -> ExceptionStatus,
) -> Result<NonNull<c_void>> {
    let mut raw: RawHandle = ptr::null_mut();
    let status = call(ptr::addr_of_mut!(raw));
    if let Err(e) = handle_exception(status) {
        if !raw.is_null() {
            trace_warn!("partial_handle_discarded", type_name = type_name);
        }
        return Err(e);
    }
    NonNull::new(raw).ok_or(Error::Allocation(type_name))
}

fn take_last_error() -> NativeException {
    let mut record = NativeErrorRecord::default();
    if unsafe { core_takeLastError(&mut record) } == 0 {
        return NativeException::unknown();
    }

    let exception = NativeException {
        code: record.code,
        message: unsafe { owned_string(record.message) },
        func: unsafe { owned_string(record.func) },
        file: unsafe { owned_string(record.file) },
        line: record.line,
    };
    unsafe { core_freeErrorRecord(&mut record) };
    exception
}

/// # Safety
///
/// `ptr` must be null or a valid null-terminated string.
unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
