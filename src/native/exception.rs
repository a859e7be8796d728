//! Native exception capture.
//!
//! Every fallible export runs its body through [`wrap`], which turns a raised
//! [`CvException`] (or a panic) into [`ExceptionStatus::OCCURRED`] and parks the
//! details in a thread-local record. The caller collects the record with
//! [`core_takeLastError`] on the same thread, right after the failing call.

use crate::error::ErrorCode;
use crate::native::util::{free_cstr, string_to_cstr};
use libc::{c_char, c_int};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

/// Status returned by every fallible native export.
///
/// Kept as a transparent integer so an unexpected value from the native side
/// is never an invalid enum discriminant.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionStatus(pub c_int);

impl ExceptionStatus {
    /// The call completed normally.
    pub const NOT_OCCURRED: Self = Self(0);
    /// The call raised; an error record is pending.
    pub const OCCURRED: Self = Self(1);

    /// Whether the call reported a failure.
    pub fn occurred(self) -> bool {
        self != Self::NOT_OCCURRED
    }
}

/// An exception raised inside the native library.
#[derive(Debug, Clone)]
pub(crate) struct CvException {
    pub code: i32,
    pub message: String,
    pub func: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl CvException {
    pub(crate) fn new(
        code: ErrorCode,
        message: impl Into<String>,
        func: &'static str,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            func,
            file,
            line,
        }
    }
}

/// Raise `StsAssert` with the failed condition as message.
macro_rules! cv_assert {
    ($cond:expr, $func:expr) => {
        if !($cond) {
            return Err($crate::native::exception::CvException::new(
                $crate::error::ErrorCode::StsAssert,
                stringify!($cond),
                $func,
                file!(),
                line!(),
            ));
        }
    };
}

pub(crate) use cv_assert;

thread_local! {
    static LAST_ERROR: RefCell<Option<CvException>> = const { RefCell::new(None) };
}

/// Park an exception for the next [`core_takeLastError`] on this thread.
pub(crate) fn raise(e: CvException) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(e));
}

/// Run an export body, translating failures into a status code.
pub(crate) fn wrap(
    func: &'static str,
    body: impl FnOnce() -> Result<(), CvException>,
) -> ExceptionStatus {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => ExceptionStatus::NOT_OCCURRED,
        Ok(Err(e)) => {
            raise(e);
            ExceptionStatus::OCCURRED
        }
        Err(_) => {
            raise(CvException::new(
                ErrorCode::StsInternal,
                "panic inside native call",
                func,
                file!(),
                line!(),
            ));
            ExceptionStatus::OCCURRED
        }
    }
}

/// Error record handed across the boundary by [`core_takeLastError`].
///
/// # Memory Ownership
///
/// The string fields are owned by the native side when non-null.
/// Call [`core_freeErrorRecord`] to release them.
#[repr(C)]
#[derive(Debug)]
pub struct NativeErrorRecord {
    /// Native error code (`cv::Error::Code`)
    pub code: c_int,
    /// Source line
    pub line: c_int,
    /// Error message
    pub message: *mut c_char,
    /// Function name
    pub func: *mut c_char,
    /// Source file
    pub file: *mut c_char,
}

impl Default for NativeErrorRecord {
    fn default() -> Self {
        Self {
            code: ErrorCode::StsOk as c_int,
            line: 0,
            message: std::ptr::null_mut(),
            func: std::ptr::null_mut(),
            file: std::ptr::null_mut(),
        }
    }
}

/// Move the pending error record of the calling thread into `out`.
///
/// # Returns
///
/// 1 if a record was pending, 0 otherwise (`out` is left untouched).
///
/// # Safety
///
/// `out` must be a valid pointer or NULL.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn core_takeLastError(out: *mut NativeErrorRecord) -> c_int {
    let Some(out) = (unsafe { out.as_mut() }) else {
        return 0;
    };

    match LAST_ERROR.with(|cell| cell.borrow_mut().take()) {
        Some(e) => {
            *out = NativeErrorRecord {
                code: e.code,
                line: c_int::try_from(e.line).unwrap_or(c_int::MAX),
                message: string_to_cstr(e.message),
                func: string_to_cstr(e.func),
                file: string_to_cstr(e.file),
            };
            1
        }
        None => 0,
    }
}

/// Free the strings of an error record.
///
/// Safe to call with NULL or with an already freed record.
///
/// # Safety
///
/// `record` must be a valid pointer or NULL.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn core_freeErrorRecord(record: *mut NativeErrorRecord) {
    let Some(record) = (unsafe { record.as_mut() }) else {
        return;
    };
    unsafe {
        free_cstr(&mut record.message);
        free_cstr(&mut record.func);
        free_cstr(&mut record.file);
    }
}
