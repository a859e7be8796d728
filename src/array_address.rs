//! Fixed row addresses of a jagged host array.
//!
//! [`ArrayAddress2`] collects the data pointer of every row while holding a
//! mutable borrow of the rows, so none of them can be reallocated, moved or
//! dropped while the native side writes through the addresses.

use std::marker::PhantomData;

/// Row pointers of a `[Vec<T>]`, valid for as long as the borrow lasts.
pub struct ArrayAddress2<'a, T> {
    rows: Vec<*mut T>,
    lengths: Vec<usize>,
    _data: PhantomData<&'a mut [Vec<T>]>,
}

impl<'a, T> ArrayAddress2<'a, T> {
    pub fn new(data: &'a mut [Vec<T>]) -> Self {
        let lengths = data.iter().map(Vec::len).collect();
        let rows = data.iter_mut().map(Vec::as_mut_ptr).collect();
        Self {
            rows,
            lengths,
            _data: PhantomData,
        }
    }

    /// Pointer to the row-pointer array (`T**`).
    pub fn as_mut_ptr(&mut self) -> *mut *mut T {
        self.rows.as_mut_ptr()
    }

    /// Number of rows.
    pub fn dim1_length(&self) -> usize {
        self.rows.len()
    }

    /// Length of every row at the time the addresses were taken.
    pub fn dim2_lengths(&self) -> &[usize] {
        &self.lengths
    }
}
