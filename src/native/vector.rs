//! `std::vector<T>` and `std::vector<std::vector<T>>` exports.
//!
//! The exported symbols are thin wrappers generated per element type; the
//! bodies live in the generic functions below. Size, copy and delete exports
//! report no status, matching the native library: they never throw.

use crate::error::ErrorCode;
use crate::native::diagnostics::{NativeKind, on_alloc, on_copy, on_free};
use crate::native::exception::{CvException, ExceptionStatus, wrap};
use crate::native::util::{handle_mut, handle_ref, into_handle, write_out};
use crate::types::{Point, Point2f};
use libc::{c_int, size_t};
use std::ffi::c_void;
use std::ptr;

type NestedVec<T> = Vec<Vec<T>>;

/// Build a row from a raw pointer, treating a zero length as empty.
///
/// # Safety
///
/// `data` must be valid for `len` reads when `len > 0`.
unsafe fn row_from_raw<T: Copy>(data: *const T, len: usize) -> Vec<T> {
    if len == 0 || data.is_null() {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
    }
}

fn nested_new1<T>() -> *mut c_void {
    on_alloc(NativeKind::VectorOfVector);
    into_handle(NestedVec::<T>::new())
}

unsafe fn nested_new3<T: Copy>(
    data: *const *const T,
    size1: size_t,
    size2: *const c_int,
) -> *mut c_void {
    if size1 > 0 && (data.is_null() || size2.is_null()) {
        return ptr::null_mut();
    }

    let mut rows = NestedVec::<T>::with_capacity(size1);
    for i in 0..size1 {
        let len = usize::try_from(unsafe { *size2.add(i) }).unwrap_or(0);
        let row = unsafe { row_from_raw(*data.add(i), len) };
        rows.push(row);
    }
    on_alloc(NativeKind::VectorOfVector);
    into_handle(rows)
}

unsafe fn nested_delete<T>(vec: *mut c_void) {
    if vec.is_null() {
        return;
    }
    unsafe { drop(Box::from_raw(vec.cast::<NestedVec<T>>())) };
    on_free(NativeKind::VectorOfVector);
}

unsafe fn nested_size1<T>(vec: *mut c_void) -> size_t {
    unsafe { vec.cast::<NestedVec<T>>().as_ref() }.map_or(0, Vec::len)
}

unsafe fn nested_size2<T>(vec: *mut c_void, dst: *mut size_t) {
    let Some(rows) = (unsafe { vec.cast::<NestedVec<T>>().as_ref() }) else {
        return;
    };
    if dst.is_null() {
        return;
    }
    for (i, row) in rows.iter().enumerate() {
        unsafe { *dst.add(i) = row.len() };
    }
}

unsafe fn nested_copy<T: Copy>(vec: *mut c_void, dst: *mut *mut T) {
    let Some(rows) = (unsafe { vec.cast::<NestedVec<T>>().as_ref() }) else {
        return;
    };
    if dst.is_null() {
        return;
    }
    on_copy(NativeKind::VectorOfVector);
    for (i, row) in rows.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        unsafe { ptr::copy_nonoverlapping(row.as_ptr(), *dst.add(i), row.len()) };
    }
}

unsafe fn nested_push_back<T: Copy>(
    vec: *mut c_void,
    row: *const T,
    len: size_t,
    func: &'static str,
) -> ExceptionStatus {
    wrap(func, || {
        let rows = unsafe { handle_mut::<NestedVec<T>>(vec, func) }?;
        if len > 0 && row.is_null() {
            return Err(CvException::new(
                ErrorCode::StsNullPtr,
                "row data is null",
                func,
                file!(),
                line!(),
            ));
        }
        rows.push(unsafe { row_from_raw(row, len) });
        Ok(())
    })
}

unsafe fn nested_at<T: Copy>(
    vec: *mut c_void,
    i: size_t,
    j: size_t,
    out: *mut T,
    func: &'static str,
) -> ExceptionStatus {
    wrap(func, || {
        let rows = unsafe { handle_ref::<NestedVec<T>>(vec, func) }?;
        let value = rows.get(i).and_then(|row| row.get(j)).copied().ok_or_else(|| {
            CvException::new(
                ErrorCode::StsOutOfRange,
                format!("index ({i}, {j}) is out of range"),
                func,
                file!(),
                line!(),
            )
        })?;
        unsafe { write_out(out, value, func) }
    })
}

fn flat_new1<T>() -> *mut c_void {
    on_alloc(NativeKind::Vector);
    into_handle(Vec::<T>::new())
}

unsafe fn flat_new3<T: Copy>(data: *const T, size: size_t) -> *mut c_void {
    if size > 0 && data.is_null() {
        return ptr::null_mut();
    }
    let items = unsafe { row_from_raw(data, size) };
    on_alloc(NativeKind::Vector);
    into_handle(items)
}

unsafe fn flat_size<T>(vec: *mut c_void) -> size_t {
    unsafe { vec.cast::<Vec<T>>().as_ref() }.map_or(0, Vec::len)
}

unsafe fn flat_pointer<T>(vec: *mut c_void) -> *mut T {
    unsafe { vec.cast::<Vec<T>>().as_mut() }.map_or(ptr::null_mut(), Vec::as_mut_ptr)
}

unsafe fn flat_delete<T>(vec: *mut c_void) {
    if vec.is_null() {
        return;
    }
    unsafe { drop(Box::from_raw(vec.cast::<Vec<T>>())) };
    on_free(NativeKind::Vector);
}

macro_rules! nested_vector_exports {
    (
        $t:ty,
        $new1:ident,
        $new3:ident,
        $delete:ident,
        $size1:ident,
        $size2:ident,
        $copy:ident,
        $push_back:ident,
        $at:ident $(,)?
    ) => {
        /// `new std::vector<std::vector<T>>()`
        #[unsafe(no_mangle)]
        pub extern "C" fn $new1() -> *mut c_void {
            nested_new1::<$t>()
        }

        /// Construct from `size1` rows of `size2[i]` elements each.
        ///
        /// # Returns
        ///
        /// Handle on success, NULL if `data` or `size2` is NULL while `size1 > 0`.
        ///
        /// # Safety
        ///
        /// `data[i]` must be valid for `size2[i]` reads for every row.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $new3(
            data: *const *const $t,
            size1: size_t,
            size2: *const c_int,
        ) -> *mut c_void {
            unsafe { nested_new3::<$t>(data, size1, size2) }
        }

        /// Delete the vector. Safe to call with NULL.
        ///
        /// # Safety
        ///
        /// `vec` must be NULL or a live handle of this type; it is invalid afterwards.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $delete(vec: *mut c_void) {
            unsafe { nested_delete::<$t>(vec) }
        }

        /// `vec.size()`
        ///
        /// # Safety
        ///
        /// `vec` must be NULL or a live handle of this type.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $size1(vec: *mut c_void) -> size_t {
            unsafe { nested_size1::<$t>(vec) }
        }

        /// `vec[i].size()` for every row, written to `dst`.
        ///
        /// # Safety
        ///
        /// `dst` must be valid for `vec.size()` writes.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $size2(vec: *mut c_void, dst: *mut size_t) {
            unsafe { nested_size2::<$t>(vec, dst) }
        }

        /// Copy every row into the host buffers `dst[i]`.
        ///
        /// # Safety
        ///
        /// `dst[i]` must be valid for `vec[i].size()` writes for every row.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $copy(vec: *mut c_void, dst: *mut *mut $t) {
            unsafe { nested_copy::<$t>(vec, dst) }
        }

        /// Append a row of `len` elements.
        ///
        /// # Safety
        ///
        /// `row` must be valid for `len` reads.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $push_back(
            vec: *mut c_void,
            row: *const $t,
            len: size_t,
        ) -> ExceptionStatus {
            unsafe { nested_push_back::<$t>(vec, row, len, stringify!($push_back)) }
        }

        /// `vec.at(i).at(j)`, raising `StsOutOfRange` for a bad index.
        ///
        /// # Safety
        ///
        /// `out` must be valid for writes.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $at(
            vec: *mut c_void,
            i: size_t,
            j: size_t,
            out: *mut $t,
        ) -> ExceptionStatus {
            unsafe { nested_at::<$t>(vec, i, j, out, stringify!($at)) }
        }
    };
}

macro_rules! flat_vector_exports {
    ($t:ty, $new1:ident, $new3:ident, $size:ident, $pointer:ident, $delete:ident $(,)?) => {
        /// `new std::vector<T>()`
        #[unsafe(no_mangle)]
        pub extern "C" fn $new1() -> *mut c_void {
            flat_new1::<$t>()
        }

        /// Construct from `size` contiguous elements.
        ///
        /// # Safety
        ///
        /// `data` must be valid for `size` reads.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $new3(data: *const $t, size: size_t) -> *mut c_void {
            unsafe { flat_new3::<$t>(data, size) }
        }

        /// `vec.size()`
        ///
        /// # Safety
        ///
        /// `vec` must be NULL or a live handle of this type.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $size(vec: *mut c_void) -> size_t {
            unsafe { flat_size::<$t>(vec) }
        }

        /// `vec.data()`; valid until the vector is mutated or deleted.
        ///
        /// # Safety
        ///
        /// `vec` must be NULL or a live handle of this type.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $pointer(vec: *mut c_void) -> *mut $t {
            unsafe { flat_pointer::<$t>(vec) }
        }

        /// Delete the vector. Safe to call with NULL.
        ///
        /// # Safety
        ///
        /// `vec` must be NULL or a live handle of this type; it is invalid afterwards.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $delete(vec: *mut c_void) {
            unsafe { flat_delete::<$t>(vec) }
        }
    };
}

nested_vector_exports!(
    Point2f,
    vector_vector_Point2f_new1,
    vector_vector_Point2f_new3,
    vector_vector_Point2f_delete,
    vector_vector_Point2f_getSize1,
    vector_vector_Point2f_getSize2,
    vector_vector_Point2f_copy,
    vector_vector_Point2f_pushBack,
    vector_vector_Point2f_at,
);

nested_vector_exports!(
    Point,
    vector_vector_Point_new1,
    vector_vector_Point_new3,
    vector_vector_Point_delete,
    vector_vector_Point_getSize1,
    vector_vector_Point_getSize2,
    vector_vector_Point_copy,
    vector_vector_Point_pushBack,
    vector_vector_Point_at,
);

flat_vector_exports!(
    Point2f,
    vector_Point2f_new1,
    vector_Point2f_new3,
    vector_Point2f_getSize,
    vector_Point2f_getPointer,
    vector_Point2f_delete,
);

flat_vector_exports!(
    Point,
    vector_Point_new1,
    vector_Point_new3,
    vector_Point_getSize,
    vector_Point_getPointer,
    vector_Point_delete,
);
