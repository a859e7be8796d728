//! In-process implementation of the native library's C ABI.
//!
//! The symbols here keep the exact names, parameter order and out-parameter
//! conventions of the native binary, so the proxies in the rest of the crate
//! talk to them exactly as they would to the real library. Fallible exports
//! return [`ExceptionStatus`] and park the error details for
//! [`core_takeLastError`]; infallible ones (sizes, copies, deletes of plain
//! containers) return their result directly.
//!
//! # Memory Management
//!
//! - Handles returned by `*_new1`/`*_new3`/`*_create` must be freed with the matching `*_delete`
//! - Error records filled by `core_takeLastError` must be freed with `core_freeErrorRecord`
//! - Pointers returned by `*_getPointer` borrow the vector's storage and must not be freed

#![allow(non_snake_case)]

pub mod diagnostics;
pub mod exception;
pub mod img_hash;
mod util;
pub mod vector;

pub use diagnostics::{NativeKind, copy_calls, live_objects, release_calls};
pub use exception::{
    ExceptionStatus, NativeErrorRecord, core_freeErrorRecord, core_takeLastError,
};
pub use img_hash::{
    img_hash_Ptr_RadialVarianceHash_delete, img_hash_Ptr_RadialVarianceHash_get,
    img_hash_RadialVarianceHash_create, img_hash_RadialVarianceHash_getNumOfAngleLine,
    img_hash_RadialVarianceHash_getSigma, img_hash_RadialVarianceHash_setNumOfAngleLine,
    img_hash_RadialVarianceHash_setSigma,
};
pub use vector::*;
