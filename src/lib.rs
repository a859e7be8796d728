//! Native object lifetime and array marshaling for a C++ computer-vision library.
//!
//! This crate wraps the library's C ABI: opaque handles, reference-counted
//! smart pointers (`cv::Ptr<T>`) and nested containers
//! (`std::vector<std::vector<T>>`). Every native object is owned by exactly one
//! proxy and released exactly once; native exceptions arrive as [`Error`]
//! values instead of raw status codes.
//!
//! # Layers
//!
//! - [`native`]: the C ABI surface, with the exact symbol names and
//!   out-parameter conventions of the native library
//! - [`bridge`]: status code to [`Error`] translation
//! - [`DisposableHandle`]: owning proxy with idempotent release
//! - [`CvPtr`]: smart-pointer proxy with a borrowed, dereferenced handle
//! - [`VectorOfVector`] / [`Vector`]: container proxies with bulk copy-out
//! - [`RadialVarianceHash`]: an algorithm object built on [`CvPtr`]
//!
//! # Thread Safety
//!
//! Proxies are `Send` but not `Sync`. Native errors are reported through a
//! thread-local record, collected on the thread that made the call.
//!
//! # Feature Flags
//!
//! - `tracing`: emit lifecycle events (handle created/released, release
//!   failures during drop, discarded partial handles) via `tracing`

#![allow(clippy::missing_safety_doc)]

mod array_address;
pub mod bridge;
mod error;
mod handle;
pub mod img_hash;
pub mod native;
mod ptr;
mod trace;
mod types;
pub mod vector;

pub use array_address::ArrayAddress2;
pub use bridge::RawHandle;
pub use error::{Error, ErrorCode, NativeException, Result};
pub use handle::{BorrowedHandle, DisposableHandle, NativeRelease};
pub use img_hash::RadialVarianceHash;
pub use ptr::{CvPtr, SmartPtrAbi};
pub use types::{Point, Point2f};
pub use vector::{
    StdVector, Vector, VectorOfPoint, VectorOfPoint2f, VectorOfVector, VectorOfVectorPoint,
    VectorOfVectorPoint2f,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{NativeKind, live_objects};

    #[test]
    fn test_factory_dereference_dispose_scenario() {
        let mut ptr: CvPtr<img_hash::RadialVarianceHashPtr> = CvPtr::create(|out| unsafe {
            native::img_hash_RadialVarianceHash_create(1.0, 180, out)
        })
        .unwrap();

        assert!(ptr.dereference().is_ok());
        ptr.dispose().unwrap();
        assert!(matches!(ptr.dereference(), Err(Error::UseAfterDispose(_))));
    }

    #[test]
    fn test_failed_factory_raises_native_error() {
        let err = RadialVarianceHash::create(0.0, 180).unwrap_err();
        assert!(matches!(err, Error::NativeOperation(_)));
        assert_eq!(err.native_code(), Some(ErrorCode::StsAssert as i32));
    }

    #[test]
    fn test_borrowed_container_handle_never_releases() {
        let before = live_objects(NativeKind::VectorOfVector);
        let vec = VectorOfVectorPoint2f::from_rows(&[vec![Point2f::new(1.0, 2.0)]]).unwrap();
        {
            let borrowed = vec.borrow_handle().unwrap();
            let size = unsafe { native::vector_vector_Point2f_getSize1(borrowed.as_raw()) };
            assert_eq!(size, 1);
        }
        assert_eq!(live_objects(NativeKind::VectorOfVector), before + 1);
        assert_eq!(vec.to_array().unwrap(), vec![vec![Point2f::new(1.0, 2.0)]]);
        drop(vec);
        assert_eq!(live_objects(NativeKind::VectorOfVector), before);
    }

    #[test]
    fn test_proxies_can_move_between_threads() {
        let vec = VectorOfVectorPoint::from_rows(&[vec![Point::new(7, 8)]]).unwrap();
        let hash = RadialVarianceHash::create(2.0, 10).unwrap();
        let (rows, sigma) = std::thread::spawn(move || {
            (vec.to_array().unwrap(), hash.sigma().unwrap())
        })
        .join()
        .unwrap();
        assert_eq!(rows, vec![vec![Point::new(7, 8)]]);
        assert_eq!(sigma, 2.0);
    }
}
