//! Image hash algorithm objects.

use crate::bridge::{RawHandle, handle_exception, out_value};
use crate::error::Result;
use crate::handle::{BorrowedHandle, NativeRelease};
use crate::native::{self, ExceptionStatus};
use crate::ptr::{CvPtr, SmartPtrAbi};
use libc::c_int;
use std::ffi::c_void;
use std::ptr::NonNull;

/// `cv::Ptr<cv::img_hash::RadialVarianceHash>`
#[derive(Debug)]
pub struct RadialVarianceHashPtr;

impl NativeRelease for RadialVarianceHashPtr {
    const TYPE_NAME: &'static str = "RadialVarianceHash";

    unsafe fn release(handle: NonNull<c_void>) -> Result<()> {
        handle_exception(unsafe {
            native::img_hash_Ptr_RadialVarianceHash_delete(handle.as_ptr())
        })
    }
}

impl SmartPtrAbi for RadialVarianceHashPtr {
    unsafe fn get(ptr: RawHandle, out: *mut RawHandle) -> ExceptionStatus {
        unsafe { native::img_hash_Ptr_RadialVarianceHash_get(ptr, out) }
    }
}

/// Image hash based on the Radon transform.
///
/// Owns the native smart pointer; every property call dereferences it again
/// and reaches the managed object through the borrowed handle.
#[derive(Debug)]
pub struct RadialVarianceHash {
    ptr_obj: CvPtr<RadialVarianceHashPtr>,
}

impl RadialVarianceHash {
    pub const DEFAULT_SIGMA: f64 = 1.0;
    pub const DEFAULT_NUM_OF_ANGLE_LINE: i32 = 180;

    /// Create the hash object.
    ///
    /// # Arguments
    /// * `sigma` - Gaussian kernel standard deviation (at least 1)
    /// * `num_of_angle_line` - The number of angles to consider (positive)
    pub fn create(sigma: f64, num_of_angle_line: i32) -> Result<Self> {
        let ptr_obj = CvPtr::create(|out| unsafe {
            native::img_hash_RadialVarianceHash_create(sigma, num_of_angle_line, out)
        })?;
        Ok(Self { ptr_obj })
    }

    /// Create the hash object with `sigma = 1` and 180 angle lines.
    pub fn with_defaults() -> Result<Self> {
        Self::create(Self::DEFAULT_SIGMA, Self::DEFAULT_NUM_OF_ANGLE_LINE)
    }

    /// Handle of the managed object, valid while `self` is borrowed.
    pub fn object(&self) -> Result<BorrowedHandle<'_>> {
        self.ptr_obj.dereference()
    }

    /// Gaussian kernel standard deviation.
    pub fn sigma(&self) -> Result<f64> {
        let obj = self.object()?;
        out_value(|out| unsafe { native::img_hash_RadialVarianceHash_getSigma(obj.as_raw(), out) })
    }

    pub fn set_sigma(&mut self, value: f64) -> Result<()> {
        let obj = self.object()?;
        handle_exception(unsafe {
            native::img_hash_RadialVarianceHash_setSigma(obj.as_raw(), value)
        })
    }

    /// The number of angles to consider.
    pub fn num_of_angle_line(&self) -> Result<i32> {
        let obj = self.object()?;
        out_value(|out: *mut c_int| unsafe {
            native::img_hash_RadialVarianceHash_getNumOfAngleLine(obj.as_raw(), out)
        })
    }

    pub fn set_num_of_angle_line(&mut self, value: i32) -> Result<()> {
        let obj = self.object()?;
        handle_exception(unsafe {
            native::img_hash_RadialVarianceHash_setNumOfAngleLine(obj.as_raw(), value)
        })
    }

    /// Release the native smart pointer. Idempotent.
    pub fn dispose(&mut self) -> Result<()> {
        self.ptr_obj.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.ptr_obj.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorCode};
    use crate::native::{NativeKind, live_objects, release_calls};

    #[test]
    fn test_defaults() {
        let hash = RadialVarianceHash::with_defaults().unwrap();
        assert_eq!(hash.sigma().unwrap(), 1.0);
        assert_eq!(hash.num_of_angle_line().unwrap(), 180);
    }

    #[test]
    fn test_properties_round_trip() {
        let mut hash = RadialVarianceHash::create(2.5, 90).unwrap();
        assert_eq!(hash.sigma().unwrap(), 2.5);
        assert_eq!(hash.num_of_angle_line().unwrap(), 90);

        hash.set_sigma(3.0).unwrap();
        hash.set_num_of_angle_line(45).unwrap();
        assert_eq!(hash.sigma().unwrap(), 3.0);
        assert_eq!(hash.num_of_angle_line().unwrap(), 45);
    }

    #[test]
    fn test_invalid_setters_keep_old_values() {
        let mut hash = RadialVarianceHash::with_defaults().unwrap();

        let err = hash.set_num_of_angle_line(0).unwrap_err();
        assert_eq!(err.native_code(), Some(ErrorCode::StsAssert as i32));
        let err = hash.set_sigma(0.25).unwrap_err();
        assert_eq!(err.native_code(), Some(ErrorCode::StsAssert as i32));

        assert_eq!(hash.num_of_angle_line().unwrap(), 180);
        assert_eq!(hash.sigma().unwrap(), 1.0);
    }

    #[test]
    fn test_factory_failure() {
        let live_before = live_objects(NativeKind::PtrRadialVarianceHash);
        match RadialVarianceHash::create(1.0, -1) {
            Err(Error::NativeOperation(e)) => {
                assert_eq!(e.kind(), Some(ErrorCode::StsAssert));
                assert_eq!(e.func, "img_hash_RadialVarianceHash_create");
                assert!(e.message.contains("num_of_angle_line > 0"));
            }
            other => panic!("expected native error, got {other:?}"),
        }
        assert_eq!(live_objects(NativeKind::PtrRadialVarianceHash), live_before);
    }

    #[test]
    fn test_use_after_dispose() {
        let released_before = release_calls(NativeKind::PtrRadialVarianceHash);
        let mut hash = RadialVarianceHash::with_defaults().unwrap();

        hash.dispose().unwrap();
        hash.dispose().unwrap();
        assert!(hash.is_disposed());

        assert!(matches!(hash.sigma(), Err(Error::UseAfterDispose("RadialVarianceHash"))));
        assert!(matches!(hash.set_sigma(2.0), Err(Error::UseAfterDispose(_))));
        assert!(matches!(hash.num_of_angle_line(), Err(Error::UseAfterDispose(_))));
        assert!(matches!(hash.set_num_of_angle_line(3), Err(Error::UseAfterDispose(_))));
        assert!(matches!(hash.object(), Err(Error::UseAfterDispose(_))));

        drop(hash);
        assert_eq!(release_calls(NativeKind::PtrRadialVarianceHash), released_before + 1);
    }

    #[test]
    fn test_object_reads_through_smart_pointer() {
        let live_before = live_objects(NativeKind::RadialVarianceHash);
        let hash = RadialVarianceHash::create(4.0, 12).unwrap();

        let first = hash.object().unwrap();
        let second = hash.object().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_raw(), hash.ptr_obj.dereference().unwrap().as_raw());
        assert_eq!(live_objects(NativeKind::RadialVarianceHash), live_before + 1);

        let mut sigma = 0.0;
        let status =
            unsafe { native::img_hash_RadialVarianceHash_getSigma(first.as_raw(), &mut sigma) };
        assert_eq!(status, ExceptionStatus::NOT_OCCURRED);
        assert_eq!(sigma, 4.0);
    }

    #[test]
    fn test_drop_frees_managed_object() {
        let live_before = live_objects(NativeKind::RadialVarianceHash);
        {
            let hash = RadialVarianceHash::with_defaults().unwrap();
            let _view = hash.object().unwrap();
            assert_eq!(live_objects(NativeKind::RadialVarianceHash), live_before + 1);
        }
        assert_eq!(live_objects(NativeKind::RadialVarianceHash), live_before);
    }
}
