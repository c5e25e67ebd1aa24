//! Creation ops: identity, filled, literal rows/columns, create-like and copy.

use crate::alloc::Allocation;
use crate::dtype::Element;
use crate::shape::Shape;
use crate::storage::{Provenance, Storage};
use crate::tensor::Tensor;
use crate::Result;

/// Bind `out` to `rows x cols` and write an identity pattern into it.
///
/// Ones land on the main diagonal (`i * (cols + 1)` in row-major order) for
/// `i < min(rows, cols)`; everything else is zero, also when `out` already had
/// the right shape and its buffer was kept.
pub fn eye<T: Element>(rows: usize, cols: usize, out: &mut Tensor<'_, T>) -> Result<()> {
    if out.allocate_or_reuse(&[rows, cols])? == Allocation::Reused {
        out.fill(T::ZERO);
    }
    let data = out.as_mut_slice();
    for i in 0..rows.min(cols) {
        data[i * (cols + 1)] = T::ONE;
    }
    Ok(())
}

impl<T: Element> Tensor<'static, T> {
    /// A new `rows x cols` identity matrix.
    pub fn eye(rows: usize, cols: usize) -> Result<Self> {
        let mut t = Self::new();
        eye(rows, cols, &mut t)?;
        Ok(t)
    }

    /// A `1 x n` row holding `values`.
    pub fn from_row(values: &[T]) -> Self {
        Self::owned_with_shape(values.to_vec(), Shape::new(&[1, values.len()]))
    }

    /// An `n x 1` column holding `values`.
    pub fn from_column(values: &[T]) -> Self {
        Self::owned_with_shape(values.to_vec(), Shape::new(&[values.len(), 1]))
    }

    /// A bound `0 x 0` tensor (MATLAB `[]`).
    pub fn empty() -> Self {
        Self::owned_with_shape(Vec::new(), Shape::new(&[0, 0]))
    }

    /// A new tensor filled with `value`.
    pub fn full(extents: &[usize], value: T) -> Result<Self> {
        let mut t = Self::new();
        t.alloc_filled(extents, value)?;
        Ok(t)
    }

    /// A new tensor filled with ones.
    pub fn ones(extents: &[usize]) -> Result<Self> {
        Self::full(extents, T::ONE)
    }

    fn owned_with_shape(data: Vec<T>, shape: Shape) -> Self {
        Self {
            storage: Storage::owned(data, Provenance::Allocated),
            shape: Some(shape),
        }
    }
}

impl<'a, T: Element> Tensor<'a, T> {
    /// Allocate or reuse for `extents`, then set every element to `value`.
    pub fn alloc_filled(&mut self, extents: &[usize], value: T) -> Result<Allocation> {
        let outcome = self.allocate_or_reuse(extents)?;
        self.fill(value);
        Ok(outcome)
    }

    /// Allocate or reuse with `other`'s shape. Contents are not copied.
    pub fn alloc_like(&mut self, other: &Tensor<'_, T>) -> Result<Allocation> {
        let shape = other.require_bound("alloc_like")?;
        self.allocate_or_reuse(shape.dims())
    }

    /// Allocate or reuse with `other`'s shape and copy its elements.
    pub fn copy_from(&mut self, other: &Tensor<'_, T>) -> Result<Allocation> {
        let shape = other.require_bound("copy")?;
        let outcome = self.allocate_or_reuse(shape.dims())?;
        self.as_mut_slice().copy_from_slice(other.as_slice());
        Ok(outcome)
    }
}
