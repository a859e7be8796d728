//! Per-thread allocation and copy counters for native objects.
//!
//! Counters are thread-local so that concurrently running tests do not see
//! each other's allocations. Compare values before and after an operation
//! instead of relying on absolute numbers.

use std::cell::Cell;

/// Kinds of native objects tracked by the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    /// `std::vector<std::vector<T>>`
    VectorOfVector,
    /// `std::vector<T>`
    Vector,
    /// `cv::Ptr<RadialVarianceHash>`
    PtrRadialVarianceHash,
    /// The `RadialVarianceHash` object managed by the smart pointer
    RadialVarianceHash,
}

const KINDS: usize = 4;

thread_local! {
    static LIVE: [Cell<i64>; KINDS] = const { [const { Cell::new(0) }; KINDS] };
    static RELEASED: [Cell<u64>; KINDS] = const { [const { Cell::new(0) }; KINDS] };
    static COPIED: [Cell<u64>; KINDS] = const { [const { Cell::new(0) }; KINDS] };
}

pub(crate) fn on_alloc(kind: NativeKind) {
    LIVE.with(|live| {
        let cell = &live[kind as usize];
        cell.set(cell.get() + 1);
    });
}

pub(crate) fn on_free(kind: NativeKind) {
    LIVE.with(|live| {
        let cell = &live[kind as usize];
        cell.set(cell.get() - 1);
    });
    RELEASED.with(|released| {
        let cell = &released[kind as usize];
        cell.set(cell.get() + 1);
    });
}

pub(crate) fn on_copy(kind: NativeKind) {
    COPIED.with(|copied| {
        let cell = &copied[kind as usize];
        cell.set(cell.get() + 1);
    });
}

/// Objects of `kind` allocated on this thread and not yet freed.
///
/// Can go negative when an object is freed on a different thread than the one
/// that allocated it.
pub fn live_objects(kind: NativeKind) -> i64 {
    LIVE.with(|live| live[kind as usize].get())
}

/// Number of times an object of `kind` was freed on this thread.
pub fn release_calls(kind: NativeKind) -> u64 {
    RELEASED.with(|released| released[kind as usize].get())
}

/// Number of bulk-copy calls on objects of `kind` made on this thread.
pub fn copy_calls(kind: NativeKind) -> u64 {
    COPIED.with(|copied| copied[kind as usize].get())
}
