//! Proxies for native `std::vector<T>` and `std::vector<std::vector<T>>`.
//!
//! Sizes are always read from the native side at the time of the call and
//! never cached, since native code may resize a container between two calls.
//! Copy-out allocates host storage from the sizes it has just read and then
//! issues a single bulk copy into that storage.
//!
//! Reads take `&self` and mutations take `&mut self`, so through a single
//! proxy a size query and the copy that follows it cannot interleave with a
//! mutation. Native code that mutates the same container through another
//! path must be serialized by the caller.

use crate::array_address::ArrayAddress2;
use crate::bridge::{RawHandle, handle_exception, out_value};
use crate::error::{Error, Result};
use crate::handle::{BorrowedHandle, DisposableHandle, NativeRelease};
use crate::native::{self, ExceptionStatus};
use crate::trace::trace_span;
use crate::types::{Point, Point2f};
use libc::c_int;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Common surface of the container proxies.
pub trait StdVector {
    type Item;

    /// Number of elements (`vector.size()`).
    fn size(&self) -> Result<usize>;

    /// Copy the native contents into a fresh host array.
    fn to_array(&self) -> Result<Vec<Self::Item>>;
}

/// Native entry points for `std::vector<std::vector<Self>>`.
pub trait NestedElement: Copy + Default {
    const TYPE_NAME: &'static str;

    fn new1() -> RawHandle;
    /// # Safety
    /// `data[i]` must be valid for `size2[i]` reads.
    unsafe fn new3(data: *const *const Self, size1: usize, size2: *const c_int) -> RawHandle;
    /// # Safety
    /// `vec` must be a live handle of this kind; it is invalid afterwards.
    unsafe fn delete(vec: RawHandle);
    /// # Safety
    /// `vec` must be a live handle of this kind.
    unsafe fn size1(vec: RawHandle) -> usize;
    /// # Safety
    /// `dst` must be valid for `size1(vec)` writes.
    unsafe fn size2(vec: RawHandle, dst: *mut usize);
    /// # Safety
    /// `dst[i]` must be valid for the length of row `i`.
    unsafe fn copy(vec: RawHandle, dst: *mut *mut Self);
    /// # Safety
    /// `row` must be valid for `len` reads.
    unsafe fn push_back(vec: RawHandle, row: *const Self, len: usize) -> ExceptionStatus;
    /// # Safety
    /// `out` must be valid for writes.
    unsafe fn at(vec: RawHandle, i: usize, j: usize, out: *mut Self) -> ExceptionStatus;
}

/// Native entry points for `std::vector<Self>`.
pub trait FlatElement: Copy + Default {
    const TYPE_NAME: &'static str;

    fn new1() -> RawHandle;
    /// # Safety
    /// `data` must be valid for `size` reads.
    unsafe fn new3(data: *const Self, size: usize) -> RawHandle;
    /// # Safety
    /// `vec` must be a live handle of this kind.
    unsafe fn size(vec: RawHandle) -> usize;
    /// # Safety
    /// `vec` must be a live handle of this kind.
    unsafe fn pointer(vec: RawHandle) -> *mut Self;
    /// # Safety
    /// `vec` must be a live handle of this kind; it is invalid afterwards.
    unsafe fn delete(vec: RawHandle);
}

/// Release path of a nested vector handle.
#[derive(Debug)]
pub struct NestedRelease<T>(PhantomData<T>);

impl<T: NestedElement> NativeRelease for NestedRelease<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    unsafe fn release(handle: NonNull<c_void>) -> Result<()> {
        unsafe { T::delete(handle.as_ptr()) };
        Ok(())
    }
}

/// Release path of a flat vector handle.
#[derive(Debug)]
pub struct FlatRelease<T>(PhantomData<T>);

impl<T: FlatElement> NativeRelease for FlatRelease<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    unsafe fn release(handle: NonNull<c_void>) -> Result<()> {
        unsafe { T::delete(handle.as_ptr()) };
        Ok(())
    }
}

/// Proxy for a native `std::vector<std::vector<T>>`.
#[derive(Debug)]
pub struct VectorOfVector<T: NestedElement> {
    handle: DisposableHandle<NestedRelease<T>>,
}

/// `std::vector<std::vector<cv::Point2f>>`
pub type VectorOfVectorPoint2f = VectorOfVector<Point2f>;
/// `std::vector<std::vector<cv::Point>>`
pub type VectorOfVectorPoint = VectorOfVector<Point>;

impl<T: NestedElement> VectorOfVector<T> {
    /// Create an empty native container.
    pub fn new() -> Result<Self> {
        Ok(Self {
            handle: DisposableHandle::from_constructor(T::new1)?,
        })
    }

    /// Create a native container holding a copy of `rows`.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let data: Vec<*const T> = rows.iter().map(|r| r.as_ref().as_ptr()).collect();
        let size2 = rows
            .iter()
            .map(|r| c_int::try_from(r.as_ref().len()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidArgument("row is longer than c_int::MAX"))?;

        let handle = DisposableHandle::from_constructor(|| unsafe {
            T::new3(data.as_ptr(), rows.len(), size2.as_ptr())
        })?;
        Ok(Self { handle })
    }

    /// Number of rows (`vector.size()`), read from the native side.
    pub fn outer_count(&self) -> Result<usize> {
        self.handle.with(|vec| unsafe { T::size1(vec) })
    }

    /// Length of every row (`vector[i].size()`), read from the native side.
    ///
    /// The result always has one entry per row as of this call.
    pub fn inner_counts(&self) -> Result<Vec<usize>> {
        self.handle.with(|vec| {
            let outer = unsafe { T::size1(vec) };
            let mut counts = vec![0usize; outer];
            if outer > 0 {
                unsafe { T::size2(vec, counts.as_mut_ptr()) };
            }
            counts
        })
    }

    /// Copy every row into a fresh jagged host array.
    ///
    /// An empty container returns immediately without a copy call.
    pub fn to_array(&self) -> Result<Vec<Vec<T>>> {
        let outer = self.outer_count()?;
        if outer == 0 {
            return Ok(Vec::new());
        }
        let inner = self.inner_counts()?;
        let _span = trace_span!("vector_vector_to_array", rows = inner.len()).entered();

        let mut rows: Vec<Vec<T>> = inner.iter().map(|&n| vec![T::default(); n]).collect();
        self.handle.with(|vec| {
            let mut address = ArrayAddress2::new(&mut rows);
            unsafe { T::copy(vec, address.as_mut_ptr()) };
        })?;

        self.check_shape(&rows)?;
        Ok(rows)
    }

    /// Compare the allocated rows with the native shape after a copy.
    fn check_shape(&self, rows: &[Vec<T>]) -> Result<()> {
        let native = self.inner_counts()?;
        if rows.len() != native.len() {
            return Err(Error::InconsistentContainerRows {
                expected: rows.len(),
                actual: native.len(),
            });
        }
        for (row, (allocated, &actual)) in rows.iter().zip(&native).enumerate() {
            if allocated.len() != actual {
                return Err(Error::InconsistentContainerSize {
                    row,
                    expected: allocated.len(),
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Append a row on the native side.
    pub fn push_row(&mut self, row: &[T]) -> Result<()> {
        let status = self
            .handle
            .with_mut(|vec| unsafe { T::push_back(vec, row.as_ptr(), row.len()) })?;
        handle_exception(status)
    }

    /// Read one element directly from the native container.
    ///
    /// Fails with the native `StsOutOfRange` error for a bad index.
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        self.handle
            .with(|vec| out_value(|out| unsafe { T::at(vec, i, j, out) }))?
    }

    /// Non-owning view of the native handle, for passing to other native calls.
    pub fn borrow_handle(&self) -> Result<BorrowedHandle<'_>> {
        self.handle.borrow()
    }

    /// Release the native container. Idempotent.
    pub fn dispose(&mut self) -> Result<()> {
        self.handle.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_disposed()
    }
}

impl<T: NestedElement> StdVector for VectorOfVector<T> {
    type Item = Vec<T>;

    fn size(&self) -> Result<usize> {
        self.outer_count()
    }

    fn to_array(&self) -> Result<Vec<Vec<T>>> {
        VectorOfVector::to_array(self)
    }
}

/// Proxy for a native `std::vector<T>`.
#[derive(Debug)]
pub struct Vector<T: FlatElement> {
    handle: DisposableHandle<FlatRelease<T>>,
}

/// `std::vector<cv::Point2f>`
pub type VectorOfPoint2f = Vector<Point2f>;
/// `std::vector<cv::Point>`
pub type VectorOfPoint = Vector<Point>;

impl<T: FlatElement> Vector<T> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            handle: DisposableHandle::from_constructor(T::new1)?,
        })
    }

    pub fn from_slice(data: &[T]) -> Result<Self> {
        let handle =
            DisposableHandle::from_constructor(|| unsafe { T::new3(data.as_ptr(), data.len()) })?;
        Ok(Self { handle })
    }

    pub fn size(&self) -> Result<usize> {
        self.handle.with(|vec| unsafe { T::size(vec) })
    }

    /// Copy the native elements into a fresh host vector.
    pub fn to_array(&self) -> Result<Vec<T>> {
        self.handle.with(|vec| {
            let size = unsafe { T::size(vec) };
            if size == 0 {
                return Vec::new();
            }
            let data = unsafe { T::pointer(vec) };
            if data.is_null() {
                return Vec::new();
            }
            unsafe { std::slice::from_raw_parts(data.cast_const(), size) }.to_vec()
        })
    }

    pub fn borrow_handle(&self) -> Result<BorrowedHandle<'_>> {
        self.handle.borrow()
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.handle.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_disposed()
    }
}

impl<T: FlatElement> StdVector for Vector<T> {
    type Item = T;

    fn size(&self) -> Result<usize> {
        Vector::size(self)
    }

    fn to_array(&self) -> Result<Vec<T>> {
        Vector::to_array(self)
    }
}

macro_rules! impl_nested_element {
    (
        $t:ty,
        $name:literal,
        $new1:ident,
        $new3:ident,
        $delete:ident,
        $size1:ident,
        $size2:ident,
        $copy:ident,
        $push_back:ident,
        $at:ident
    ) => {
        impl NestedElement for $t {
            const TYPE_NAME: &'static str = $name;

            fn new1() -> RawHandle {
                native::$new1()
            }
            unsafe fn new3(
                data: *const *const Self,
                size1: usize,
                size2: *const c_int,
            ) -> RawHandle {
                unsafe { native::$new3(data, size1, size2) }
            }
            unsafe fn delete(vec: RawHandle) {
                unsafe { native::$delete(vec) }
            }
            unsafe fn size1(vec: RawHandle) -> usize {
                unsafe { native::$size1(vec) }
            }
            unsafe fn size2(vec: RawHandle, dst: *mut usize) {
                unsafe { native::$size2(vec, dst) }
            }
            unsafe fn copy(vec: RawHandle, dst: *mut *mut Self) {
                unsafe { native::$copy(vec, dst) }
            }
            unsafe fn push_back(vec: RawHandle, row: *const Self, len: usize) -> ExceptionStatus {
                unsafe { native::$push_back(vec, row, len) }
            }
            unsafe fn at(vec: RawHandle, i: usize, j: usize, out: *mut Self) -> ExceptionStatus {
                unsafe { native::$at(vec, i, j, out) }
            }
        }
    };
}

macro_rules! impl_flat_element {
    (
        $t:ty,
        $name:literal,
        $new1:ident,
        $new3:ident,
        $size:ident,
        $pointer:ident,
        $delete:ident
    ) => {
        impl FlatElement for $t {
            const TYPE_NAME: &'static str = $name;

            fn new1() -> RawHandle {
                native::$new1()
            }
            unsafe fn new3(data: *const Self, size: usize) -> RawHandle {
                unsafe { native::$new3(data, size) }
            }
            unsafe fn size(vec: RawHandle) -> usize {
                unsafe { native::$size(vec) }
            }
            unsafe fn pointer(vec: RawHandle) -> *mut Self {
                unsafe { native::$pointer(vec) }
            }
            unsafe fn delete(vec: RawHandle) {
                unsafe { native::$delete(vec) }
            }
        }
    };
}

impl_nested_element!(
    Point2f,
    "VectorOfVectorPoint2f",
    vector_vector_Point2f_new1,
    vector_vector_Point2f_new3,
    vector_vector_Point2f_delete,
    vector_vector_Point2f_getSize1,
    vector_vector_Point2f_getSize2,
    vector_vector_Point2f_copy,
    vector_vector_Point2f_pushBack,
    vector_vector_Point2f_at
);

impl_nested_element!(
    Point,
    "VectorOfVectorPoint",
    vector_vector_Point_new1,
    vector_vector_Point_new3,
    vector_vector_Point_delete,
    vector_vector_Point_getSize1,
    vector_vector_Point_getSize2,
    vector_vector_Point_copy,
    vector_vector_Point_pushBack,
    vector_vector_Point_at
);

impl_flat_element!(
    Point2f,
    "VectorOfPoint2f",
    vector_Point2f_new1,
    vector_Point2f_new3,
    vector_Point2f_getSize,
    vector_Point2f_getPointer,
    vector_Point2f_delete
);

impl_flat_element!(
    Point,
    "VectorOfPoint",
    vector_Point_new1,
    vector_Point_new3,
    vector_Point_getSize,
    vector_Point_getPointer,
    vector_Point_delete
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::native::{NativeKind, copy_calls, live_objects, release_calls};
    use proptest::prelude::*;

    fn p(x: f32, y: f32) -> Point2f {
        Point2f::new(x, y)
    }

    #[test]
    fn test_empty_to_array() {
        let copies = copy_calls(NativeKind::VectorOfVector);
        let vec = VectorOfVectorPoint2f::new().unwrap();
        assert_eq!(vec.outer_count().unwrap(), 0);
        assert!(vec.inner_counts().unwrap().is_empty());
        assert!(vec.to_array().unwrap().is_empty());
        assert_eq!(copy_calls(NativeKind::VectorOfVector), copies);
    }

    #[test]
    fn test_to_array_issues_single_copy() {
        let vec = VectorOfVectorPoint2f::from_rows(&[vec![p(1.0, 2.0)], vec![], vec![p(3.0, 4.0)]])
            .unwrap();
        let copies = copy_calls(NativeKind::VectorOfVector);
        assert_eq!(vec.to_array().unwrap().len(), 3);
        assert_eq!(copy_calls(NativeKind::VectorOfVector), copies + 1);
    }

    #[test]
    fn test_shape_check_detects_resized_row() {
        let vec = VectorOfVectorPoint2f::from_rows(&[vec![p(0.0, 0.0)], vec![]]).unwrap();
        let stale = vec![vec![p(0.0, 0.0)], vec![Point2f::default(); 3]];

        match vec.check_shape(&stale) {
            Err(Error::InconsistentContainerSize {
                row,
                expected,
                actual,
            }) => {
                assert_eq!(row, 1);
                assert_eq!(expected, 3);
                assert_eq!(actual, 0);
            }
            other => panic!("expected row size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_check_detects_row_count_change() {
        let vec = VectorOfVectorPoint2f::from_rows(&[vec![p(0.0, 0.0)], vec![]]).unwrap();
        let stale = vec![vec![p(0.0, 0.0)]];

        match vec.check_shape(&stale) {
            Err(Error::InconsistentContainerRows { expected, actual }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected row count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_check_accepts_matching_rows() {
        let rows = vec![vec![p(1.0, 1.0)], vec![], vec![p(2.0, 2.0), p(3.0, 3.0)]];
        let vec = VectorOfVectorPoint2f::from_rows(&rows).unwrap();
        assert!(vec.check_shape(&rows).is_ok());
    }

    #[test]
    fn test_rows_2_0_1() {
        let rows = vec![vec![p(1.0, 2.0), p(3.0, 4.0)], vec![], vec![p(5.0, 6.0)]];
        let vec = VectorOfVectorPoint2f::from_rows(&rows).unwrap();

        assert_eq!(vec.outer_count().unwrap(), 3);
        assert_eq!(vec.inner_counts().unwrap(), vec![2, 0, 1]);

        let array = vec.to_array().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[0].len(), 2);
        assert!(array[1].is_empty());
        assert_eq!(array[2].len(), 1);
        assert_eq!(array, rows);
    }

    #[test]
    fn test_to_array_matches_direct_reads() {
        let rows = vec![
            vec![Point::new(1, 1), Point::new(2, 4)],
            vec![Point::new(3, 9)],
        ];
        let vec = VectorOfVectorPoint::from_rows(&rows).unwrap();
        let array = vec.to_array().unwrap();

        for (i, row) in array.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                assert_eq!(*value, vec.get(i, j).unwrap());
            }
        }
    }

    #[test]
    fn test_sizes_are_not_cached() {
        let mut vec = VectorOfVectorPoint::new().unwrap();
        assert_eq!(vec.outer_count().unwrap(), 0);

        vec.push_row(&[Point::new(1, 2), Point::new(3, 4)]).unwrap();
        assert_eq!(vec.outer_count().unwrap(), 1);
        assert_eq!(vec.inner_counts().unwrap(), vec![2]);

        vec.push_row(&[]).unwrap();
        assert_eq!(vec.inner_counts().unwrap(), vec![2, 0]);
        assert_eq!(vec.to_array().unwrap().len(), 2);
    }

    #[test]
    fn test_get_out_of_range() {
        let vec = VectorOfVectorPoint2f::from_rows(&[vec![p(0.0, 0.0)]]).unwrap();
        let err = vec.get(0, 5).unwrap_err();
        assert_eq!(err.native_code(), Some(ErrorCode::StsOutOfRange as i32));
    }

    #[test]
    fn test_use_after_dispose() {
        let before = release_calls(NativeKind::VectorOfVector);
        let mut vec = VectorOfVectorPoint2f::from_rows(&[vec![p(1.0, 1.0)]]).unwrap();

        vec.dispose().unwrap();
        vec.dispose().unwrap();
        assert!(vec.is_disposed());
        assert_eq!(release_calls(NativeKind::VectorOfVector), before + 1);

        assert!(matches!(
            vec.outer_count(),
            Err(Error::UseAfterDispose("VectorOfVectorPoint2f"))
        ));
        assert!(matches!(vec.inner_counts(), Err(Error::UseAfterDispose(_))));
        assert!(matches!(vec.to_array(), Err(Error::UseAfterDispose(_))));
        assert!(matches!(vec.get(0, 0), Err(Error::UseAfterDispose(_))));
        assert!(matches!(vec.push_row(&[]), Err(Error::UseAfterDispose(_))));
        assert!(matches!(vec.borrow_handle(), Err(Error::UseAfterDispose(_))));

        drop(vec);
        assert_eq!(release_calls(NativeKind::VectorOfVector), before + 1);
    }

    #[test]
    fn test_drop_releases_native_container() {
        let before = live_objects(NativeKind::VectorOfVector);
        {
            let _vec = VectorOfVectorPoint::new().unwrap();
            assert_eq!(live_objects(NativeKind::VectorOfVector), before + 1);
        }
        assert_eq!(live_objects(NativeKind::VectorOfVector), before);
    }

    #[test]
    fn test_flat_vector() {
        let points = [p(1.0, 2.0), p(3.0, 4.0), p(5.0, 6.0)];
        let mut vec = VectorOfPoint2f::from_slice(&points).unwrap();
        assert_eq!(vec.size().unwrap(), 3);
        assert_eq!(vec.to_array().unwrap(), points);

        let empty = VectorOfPoint::new().unwrap();
        assert!(StdVector::to_array(&empty).unwrap().is_empty());

        vec.dispose().unwrap();
        assert!(matches!(vec.to_array(), Err(Error::UseAfterDispose("VectorOfPoint2f"))));
    }

    #[test]
    fn test_std_vector_trait() {
        fn total<V: StdVector>(v: &V) -> usize {
            v.size().unwrap()
        }
        let nested = VectorOfVectorPoint::from_rows(&[vec![Point::new(0, 0)], vec![]]).unwrap();
        let flat = VectorOfPoint::from_slice(&[Point::new(1, 1)]).unwrap();
        assert_eq!(total(&nested), 2);
        assert_eq!(total(&flat), 1);
    }

    proptest! {
        #[test]
        fn prop_to_array_round_trip(
            rows in prop::collection::vec(
                prop::collection::vec((any::<i32>(), any::<i32>()), 0..8),
                0..8,
            )
        ) {
            let rows: Vec<Vec<Point>> = rows
                .into_iter()
                .map(|r| r.into_iter().map(|(x, y)| Point::new(x, y)).collect())
                .collect();
            let vec = VectorOfVectorPoint::from_rows(&rows).unwrap();

            prop_assert_eq!(vec.outer_count().unwrap(), rows.len());
            let counts: Vec<usize> = rows.iter().map(Vec::len).collect();
            prop_assert_eq!(vec.inner_counts().unwrap(), counts);
            prop_assert_eq!(vec.to_array().unwrap(), rows);
        }

        #[test]
        fn prop_dispose_any_number_of_times(times in 1usize..5) {
            let before = release_calls(NativeKind::VectorOfVector);
            let mut vec = VectorOfVectorPoint2f::new().unwrap();
            for _ in 0..times {
                prop_assert!(vec.dispose().is_ok());
            }
            drop(vec);
            prop_assert_eq!(release_calls(NativeKind::VectorOfVector), before + 1);
        }
    }
}
