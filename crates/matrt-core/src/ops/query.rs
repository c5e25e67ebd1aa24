//! Shape and size queries.

use crate::dtype::Element;
use crate::tensor::Tensor;
use crate::Result;

impl<'a, T: Element> Tensor<'a, T> {
    /// Whether the handle is bound with exactly these extents.
    ///
    /// Rank and every extent must match. Unbound handles never match.
    pub fn same_shape(&self, extents: &[usize]) -> bool {
        self.shape.as_ref().is_some_and(|s| s.matches(extents))
    }

    /// MATLAB `length()`: the largest extent, or 0 if any extent is 0.
    /// Unbound handles report 0.
    pub fn max_extent(&self) -> usize {
        self.shape.as_ref().map_or(0, |s| s.max_extent())
    }

    /// Extent of dimension `axis` (zero-based). Dimensions beyond the
    /// retained rank report 1; unbound handles report 0.
    pub fn dim(&self, axis: usize) -> usize {
        match &self.shape {
            None => 0,
            Some(shape) => shape.dim(axis).unwrap_or(1),
        }
    }

    /// MATLAB `size(A)`: the extents as a `1 x ndims` row of f64.
    pub fn size_vector(&self) -> Result<Tensor<'static, f64>> {
        let shape = self.require_bound("size")?;
        let extents: Vec<f64> = shape.dims().iter().map(|&d| d as f64).collect();
        let n = extents.len();
        Tensor::from_vec(extents, &[1, n])
    }
}
