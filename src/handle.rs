//! Owning proxy for a single native handle.
//!
//! [`DisposableHandle`] owns exactly one native object and releases it exactly
//! once, either through [`DisposableHandle::dispose`] or on drop. Native calls
//! take the handle through a borrow of the proxy, so the proxy cannot be
//! dropped while a call that uses its handle is running.
//!
//! # Thread Safety
//!
//! A proxy may be moved to another thread but not shared between threads
//! (`Send`, not `Sync`). Mutation and disposal are serialized by `&mut self`.

use crate::bridge::{RawHandle, out_handle};
use crate::error::{Error, Result};
use crate::native::ExceptionStatus;
use crate::trace::{trace_event, trace_warn};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Release path for one kind of native object.
pub trait NativeRelease {
    /// Type name used in errors and trace events.
    const TYPE_NAME: &'static str;

    /// Release the native object behind `handle`.
    ///
    /// # Safety
    ///
    /// `handle` must be a live handle of this kind, owned by the caller. It is
    /// invalid after this call, whatever the result.
    unsafe fn release(handle: NonNull<c_void>) -> Result<()>;
}

/// Exclusive owner of one native handle.
pub struct DisposableHandle<R: NativeRelease> {
    handle: Option<NonNull<c_void>>,
    _release: PhantomData<R>,
}

// SAFETY: the native objects behind these handles are not tied to the thread
// that created them; `DisposableHandle` is not `Sync`, so there is never more
// than one thread using a handle at a time.
unsafe impl<R: NativeRelease> Send for DisposableHandle<R> {}

impl<R: NativeRelease> DisposableHandle<R> {
    /// Take ownership of the handle returned by a native constructor.
    ///
    /// Fails with [`Error::Allocation`] when the constructor returns NULL.
    pub fn from_constructor(ctor: impl FnOnce() -> RawHandle) -> Result<Self> {
        let handle = NonNull::new(ctor()).ok_or(Error::Allocation(R::TYPE_NAME))?;
        Ok(Self::live(handle))
    }

    /// Take ownership of the handle written by a native factory.
    ///
    /// The factory's status goes through the exception bridge; a handle
    /// written by a failing factory is never adopted.
    pub fn from_factory(factory: impl FnOnce(*mut RawHandle) -> ExceptionStatus) -> Result<Self> {
        let handle = out_handle(R::TYPE_NAME, factory)?;
        Ok(Self::live(handle))
    }

    fn live(handle: NonNull<c_void>) -> Self {
        trace_event!("native_handle_created", type_name = R::TYPE_NAME);
        Self {
            handle: Some(handle),
            _release: PhantomData,
        }
    }

    /// Whether the handle has been released.
    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    /// The owned handle, or [`Error::UseAfterDispose`].
    pub fn handle(&self) -> Result<NonNull<c_void>> {
        self.handle.ok_or(Error::UseAfterDispose(R::TYPE_NAME))
    }

    /// Run a native call with the raw handle.
    ///
    /// The proxy stays borrowed, and therefore alive, until `call` returns.
    pub fn with<T>(&self, call: impl FnOnce(RawHandle) -> T) -> Result<T> {
        let handle = self.handle()?;
        Ok(call(handle.as_ptr()))
    }

    /// Mutable variant of [`with`](Self::with) for native calls that change the object.
    pub fn with_mut<T>(&mut self, call: impl FnOnce(RawHandle) -> T) -> Result<T> {
        let handle = self.handle()?;
        Ok(call(handle.as_ptr()))
    }

    /// A non-owning view of the handle, valid while `self` is borrowed.
    pub fn borrow(&self) -> Result<BorrowedHandle<'_>> {
        self.handle().map(BorrowedHandle::new)
    }

    /// Release the handle.
    ///
    /// Idempotent: only the first call reaches the native release path. The
    /// proxy is marked disposed before releasing, so a failing release is
    /// reported once and never attempted again.
    pub fn dispose(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        trace_event!("native_handle_released", type_name = R::TYPE_NAME);
        unsafe { R::release(handle) }
    }
}

impl<R: NativeRelease> Drop for DisposableHandle<R> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            trace_warn!(
                "native_release_failed",
                type_name = R::TYPE_NAME,
                error = e.to_string().as_str(),
            );
        }
    }
}

impl<R: NativeRelease> std::fmt::Debug for DisposableHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposableHandle")
            .field("type", &R::TYPE_NAME)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Non-owning view of a native handle.
///
/// Has no release path: dropping it never touches the native object. Its
/// lifetime is tied to the owner it was borrowed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowedHandle<'a> {
    handle: NonNull<c_void>,
    _owner: PhantomData<&'a ()>,
}

impl<'a> BorrowedHandle<'a> {
    pub(crate) fn new(handle: NonNull<c_void>) -> Self {
        Self {
            handle,
            _owner: PhantomData,
        }
    }

    /// Raw pointer for native calls.
    pub fn as_raw(&self) -> RawHandle {
        self.handle.as_ptr()
    }
}
