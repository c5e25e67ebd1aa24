//! Data allocator hook.
//!
//! Every buffer the runtime binds comes from a [`DataAllocator`]. Callers that
//! need pinned, pooled or budgeted memory substitute their own implementation;
//! the runtime only requires that returned buffers are zero-initialised and
//! exactly `len` elements long.

use std::fmt;

use crate::dtype::Element;
use crate::error::MatrtError;
use crate::Result;

/// Retries after a failed allocation before giving up.
pub const DEFAULT_ALLOC_RETRIES: usize = 1;

/// Outcome of an allocate-or-reuse request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Allocation {
    /// Shape already matched; buffer and contents untouched.
    Reused,
    /// A fresh zero-initialised buffer was bound.
    Fresh,
}

impl Allocation {
    pub fn is_reused(&self) -> bool {
        matches!(self, Allocation::Reused)
    }
}

/// Source of zero-initialised element buffers.
pub trait DataAllocator<T: Element>: fmt::Debug {
    /// Return a buffer of exactly `len` zeroed elements, or None if memory is
    /// not available right now.
    fn allocate(&self, len: usize) -> Option<Vec<T>>;
}

/// Global-heap allocator. Reports exhaustion instead of aborting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapAllocator;

impl<T: Element> DataAllocator<T> for HeapAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<T>> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, T::ZERO);
        Some(data)
    }
}

/// Heap allocator that refuses single requests above an element budget.
///
/// Lets embedders cap what generated code may request without relying on the
/// system allocator failing first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetAllocator {
    max_elements: usize,
}

impl BudgetAllocator {
    pub fn new(max_elements: usize) -> Self {
        Self { max_elements }
    }

    pub fn max_elements(&self) -> usize {
        self.max_elements
    }
}

impl<T: Element> DataAllocator<T> for BudgetAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<T>> {
        if len > self.max_elements {
            tracing::warn!(
                requested = len,
                budget = self.max_elements,
                "allocation request exceeds element budget"
            );
            return None;
        }
        HeapAllocator.allocate(len)
    }
}

/// Request a buffer, retrying `retries` times before reporting exhaustion.
pub(crate) fn allocate_buffer<T: Element>(
    allocator: &dyn DataAllocator<T>,
    len: usize,
    retries: usize,
) -> Result<Vec<T>> {
    if len == 0 {
        return Ok(Vec::new());
    }

    let attempts = retries + 1;
    for attempt in 1..=attempts {
        match allocator.allocate(len) {
            Some(data) if data.len() == len => return Ok(data),
            Some(data) => {
                tracing::warn!(
                    requested = len,
                    returned = data.len(),
                    attempt,
                    "data allocator returned a buffer of the wrong length"
                );
            }
            None => {
                tracing::warn!(requested = len, dtype = %T::DTYPE, attempt, "data allocation failed");
            }
        }
    }

    Err(MatrtError::AllocationFailed {
        elements: len,
        dtype: T::DTYPE,
        attempts,
    })
}
