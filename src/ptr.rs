//! Proxy for a native reference-counted smart pointer (`cv::Ptr<T>`).
//!
//! [`CvPtr`] owns the smart pointer itself; releasing it drops one native
//! reference, and the managed object is freed by the native side when the last
//! reference goes. The managed object is reached through
//! [`CvPtr::dereference`], which hands out a [`BorrowedHandle`] bound to the
//! proxy's lifetime. Algorithm objects keep the `CvPtr` and use the borrowed
//! handle for their calls, so there is only ever one release path.

use crate::bridge::{RawHandle, out_handle};
use crate::error::Result;
use crate::handle::{BorrowedHandle, DisposableHandle, NativeRelease};
use crate::native::ExceptionStatus;
use std::ffi::c_void;
use std::ptr::NonNull;

/// Native entry points of one `cv::Ptr<T>` instantiation.
///
/// `release` (from [`NativeRelease`]) must call the smart pointer's delete
/// export.
pub trait SmartPtrAbi: NativeRelease {
    /// Address of the managed object (`ptr->get()`).
    ///
    /// # Safety
    ///
    /// `ptr` must be a live smart-pointer handle of this kind.
    unsafe fn get(ptr: RawHandle, out: *mut RawHandle) -> ExceptionStatus;
}

/// Owning proxy for a native smart pointer.
#[derive(Debug)]
pub struct CvPtr<T: SmartPtrAbi> {
    inner: DisposableHandle<T>,
}

impl<T: SmartPtrAbi> CvPtr<T> {
    /// Adopt the smart pointer written by a native factory.
    ///
    /// Fails with the native error when the factory raises, and with
    /// `Allocation` when it returns no pointer.
    pub fn create(factory: impl FnOnce(*mut RawHandle) -> ExceptionStatus) -> Result<Self> {
        Ok(Self {
            inner: DisposableHandle::from_factory(factory)?,
        })
    }

    /// Address of the managed object.
    ///
    /// Fails with `UseAfterDispose` once the pointer has been released.
    pub fn dereference(&self) -> Result<BorrowedHandle<'_>> {
        let ptr = self.inner.handle()?;
        let object = out_handle(T::TYPE_NAME, |out| unsafe { T::get(ptr.as_ptr(), out) })?;
        Ok(BorrowedHandle::new(object))
    }

    /// Drop the native reference. Idempotent.
    pub fn dispose(&mut self) -> Result<()> {
        self.inner.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// The smart-pointer handle itself (not the managed object).
    pub fn handle(&self) -> Result<NonNull<c_void>> {
        self.inner.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorCode};
    use crate::img_hash::RadialVarianceHashPtr;
    use crate::native::{
        NativeKind, img_hash_RadialVarianceHash_create, img_hash_RadialVarianceHash_getSigma,
        live_objects, release_calls,
    };

    fn create(sigma: f64) -> Result<CvPtr<RadialVarianceHashPtr>> {
        CvPtr::create(|out| unsafe { img_hash_RadialVarianceHash_create(sigma, 180, out) })
    }

    #[test]
    fn test_dereference_then_dispose() {
        let mut ptr = create(2.0).unwrap();

        let object = ptr.dereference().unwrap();
        let mut sigma = 0.0;
        let status = unsafe { img_hash_RadialVarianceHash_getSigma(object.as_raw(), &mut sigma) };
        assert_eq!(status, ExceptionStatus::NOT_OCCURRED);
        assert_eq!(sigma, 2.0);

        ptr.dispose().unwrap();
        assert!(ptr.is_disposed());
        assert!(matches!(ptr.dereference(), Err(Error::UseAfterDispose(_))));
    }

    #[test]
    fn test_dispose_releases_managed_object_once() {
        let live_before = live_objects(NativeKind::RadialVarianceHash);
        let released_before = release_calls(NativeKind::PtrRadialVarianceHash);

        let mut ptr = create(1.0).unwrap();
        assert_eq!(live_objects(NativeKind::RadialVarianceHash), live_before + 1);

        ptr.dispose().unwrap();
        ptr.dispose().unwrap();
        drop(ptr);

        assert_eq!(live_objects(NativeKind::RadialVarianceHash), live_before);
        assert_eq!(release_calls(NativeKind::PtrRadialVarianceHash), released_before + 1);
    }

    #[test]
    fn test_factory_failure_returns_no_proxy() {
        let live_before = live_objects(NativeKind::PtrRadialVarianceHash);

        let err = create(0.0).unwrap_err();
        assert_eq!(err.native_code(), Some(ErrorCode::StsAssert as i32));
        assert_eq!(live_objects(NativeKind::PtrRadialVarianceHash), live_before);
    }

    #[test]
    fn test_borrowed_view_does_not_release() {
        let live_before = live_objects(NativeKind::RadialVarianceHash);
        let ptr = create(1.0).unwrap();
        {
            let a = ptr.dereference().unwrap();
            let b = ptr.dereference().unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(live_objects(NativeKind::RadialVarianceHash), live_before + 1);
        drop(ptr);
        assert_eq!(live_objects(NativeKind::RadialVarianceHash), live_before);
    }
}
