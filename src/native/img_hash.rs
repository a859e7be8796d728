//! `cv::img_hash::RadialVarianceHash` exports.
//!
//! The object is held through a `cv::Ptr`, modelled as a boxed `Arc`: the
//! handle returned by the factory owns one strong reference, and
//! `img_hash_Ptr_RadialVarianceHash_get` exposes the address of the managed
//! object without touching the count. Only parameters are stored here; the
//! hash computation itself lives in the vision library proper.

use crate::native::diagnostics::{NativeKind, on_alloc, on_free};
use crate::native::exception::{ExceptionStatus, cv_assert, wrap};
use crate::native::util::{handle_ref, into_handle, write_out};
use libc::c_int;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::sync::Arc;

type PtrRadialVarianceHash = Arc<RadialVarianceHashImpl>;

struct Params {
    sigma: f64,
    num_of_angle_line: c_int,
}

pub(crate) struct RadialVarianceHashImpl {
    params: Mutex<Params>,
}

impl RadialVarianceHashImpl {
    fn new(sigma: f64, num_of_angle_line: c_int) -> Self {
        on_alloc(NativeKind::RadialVarianceHash);
        Self {
            params: Mutex::new(Params {
                sigma,
                num_of_angle_line,
            }),
        }
    }
}

impl Drop for RadialVarianceHashImpl {
    fn drop(&mut self) {
        on_free(NativeKind::RadialVarianceHash);
    }
}

/// `cv::img_hash::RadialVarianceHash::create(sigma, numOfAngleLine)`
///
/// # Returns
///
/// `OCCURRED` with `StsAssert` when `sigma < 1` or `numOfAngleLine <= 0`;
/// `*out` is then NULL.
///
/// # Safety
///
/// `out` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn img_hash_RadialVarianceHash_create(
    sigma: f64,
    num_of_angle_line: c_int,
    out: *mut *mut c_void,
) -> ExceptionStatus {
    const FUNC: &str = "img_hash_RadialVarianceHash_create";
    wrap(FUNC, || {
        unsafe { write_out(out, std::ptr::null_mut(), FUNC) }?;
        cv_assert!(sigma >= 1.0, FUNC);
        cv_assert!(num_of_angle_line > 0, FUNC);

        let object: PtrRadialVarianceHash =
            Arc::new(RadialVarianceHashImpl::new(sigma, num_of_angle_line));
        on_alloc(NativeKind::PtrRadialVarianceHash);
        unsafe { write_out(out, into_handle(object), FUNC) }
    })
}

/// `ptr->get()`: address of the managed object.
///
/// # Safety
///
/// `ptr` must be a live smart-pointer handle; `out` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn img_hash_Ptr_RadialVarianceHash_get(
    ptr: *mut c_void,
    out: *mut *mut c_void,
) -> ExceptionStatus {
    const FUNC: &str = "img_hash_Ptr_RadialVarianceHash_get";
    wrap(FUNC, || {
        let object = unsafe { handle_ref::<PtrRadialVarianceHash>(ptr, FUNC) }?;
        let managed = Arc::as_ptr(object).cast_mut().cast::<c_void>();
        unsafe { write_out(out, managed, FUNC) }
    })
}

/// `delete ptr`: drops one reference; the managed object goes with the last one.
///
/// # Safety
///
/// `ptr` must be NULL or a live smart-pointer handle; it is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn img_hash_Ptr_RadialVarianceHash_delete(
    ptr: *mut c_void,
) -> ExceptionStatus {
    wrap("img_hash_Ptr_RadialVarianceHash_delete", || {
        if !ptr.is_null() {
            unsafe { drop(Box::from_raw(ptr.cast::<PtrRadialVarianceHash>())) };
            on_free(NativeKind::PtrRadialVarianceHash);
        }
        Ok(())
    })
}

/// # Safety
///
/// `obj` must be a dereferenced handle of a live smart pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn img_hash_RadialVarianceHash_getSigma(
    obj: *mut c_void,
    out: *mut f64,
) -> ExceptionStatus {
    const FUNC: &str = "img_hash_RadialVarianceHash_getSigma";
    wrap(FUNC, || {
        let object = unsafe { handle_ref::<RadialVarianceHashImpl>(obj, FUNC) }?;
        let sigma = object.params.lock().sigma;
        unsafe { write_out(out, sigma, FUNC) }
    })
}

/// # Safety
///
/// `obj` must be a dereferenced handle of a live smart pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn img_hash_RadialVarianceHash_setSigma(
    obj: *mut c_void,
    value: f64,
) -> ExceptionStatus {
    const FUNC: &str = "img_hash_RadialVarianceHash_setSigma";
    wrap(FUNC, || {
        let object = unsafe { handle_ref::<RadialVarianceHashImpl>(obj, FUNC) }?;
        cv_assert!(value >= 1.0, FUNC);
        object.params.lock().sigma = value;
        Ok(())
    })
}

/// # Safety
///
/// `obj` must be a dereferenced handle of a live smart pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn img_hash_RadialVarianceHash_getNumOfAngleLine(
    obj: *mut c_void,
    out: *mut c_int,
) -> ExceptionStatus {
    const FUNC: &str = "img_hash_RadialVarianceHash_getNumOfAngleLine";
    wrap(FUNC, || {
        let object = unsafe { handle_ref::<RadialVarianceHashImpl>(obj, FUNC) }?;
        let value = object.params.lock().num_of_angle_line;
        unsafe { write_out(out, value, FUNC) }
    })
}

/// # Safety
///
/// `obj` must be a dereferenced handle of a live smart pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn img_hash_RadialVarianceHash_setNumOfAngleLine(
    obj: *mut c_void,
    value: c_int,
) -> ExceptionStatus {
    const FUNC: &str = "img_hash_RadialVarianceHash_setNumOfAngleLine";
    wrap(FUNC, || {
        let object = unsafe { handle_ref::<RadialVarianceHashImpl>(obj, FUNC) }?;
        cv_assert!(value > 0, FUNC);
        object.params.lock().num_of_angle_line = value;
        Ok(())
    })
}
