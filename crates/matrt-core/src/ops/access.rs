//! Element access and assignment.

use crate::dtype::Element;
use crate::error::MatrtError;
use crate::tensor::Tensor;
use crate::Result;

impl<'a, T: Element> Tensor<'a, T> {
    /// Row-major linear index of zero-based subscripts.
    ///
    /// A single subscript is a linear index. When fewer subscripts than
    /// dimensions are given, the last one spans the remaining dimensions.
    /// Subscripts past the retained rank address implicit unit dimensions and
    /// must be 0.
    pub fn sub2ind(&self, indices: &[usize]) -> Result<usize> {
        self.require_bound("sub2ind")?.linear_index(indices)
    }

    /// Read the element at `indices`.
    pub fn get(&self, indices: &[usize]) -> Result<T> {
        let i = self.sub2ind(indices)?;
        Ok(self.as_slice()[i])
    }

    /// Write `value` at `indices`.
    pub fn set(&mut self, indices: &[usize], value: T) -> Result<()> {
        let i = self.sub2ind(indices)?;
        self.as_mut_slice()[i] = value;
        Ok(())
    }

    /// Assign `count` consecutive elements starting at linear `offset`.
    ///
    /// A single value is broadcast to all `count` positions; otherwise
    /// `values` must hold exactly `count` elements and is copied in order.
    pub fn set_row(&mut self, offset: usize, count: usize, values: &[T]) -> Result<()> {
        self.require_bound("set_row")?;
        if values.len() != 1 && values.len() != count {
            return Err(MatrtError::ElementCountMismatch {
                op: "set_row",
                expected: count,
                got: values.len(),
            });
        }

        let numel = self.numel();
        let end = match offset.checked_add(count) {
            Some(end) if end <= numel => end,
            _ => {
                return Err(MatrtError::IndexOutOfBounds {
                    op: "set_row",
                    index: offset.saturating_add(count),
                    extent: numel,
                })
            }
        };

        let dst = &mut self.as_mut_slice()[offset..end];
        match values {
            [value] => dst.fill(*value),
            _ => dst.copy_from_slice(values),
        }
        Ok(())
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }
}
