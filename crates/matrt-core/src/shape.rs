use smallvec::SmallVec;
use std::fmt;

use crate::error::MatrtError;
use crate::Result;

/// Tensor shape with stack-allocated storage for ≤4 dimensions.
///
/// Shapes built through [`Shape::squeezed`] drop trailing unit dimensions
/// above rank 2, which is the form every bound tensor carries.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    /// Create a shape from extents, exactly as given.
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Create a shape from extents and collapse trailing unit dimensions.
    ///
    /// Rank never drops below 2 through squeezing; a rank-1 request stays rank 1.
    pub fn squeezed(dims: &[usize]) -> Self {
        let mut shape = Self::new(dims);
        shape.squeeze();
        shape
    }

    /// Validate a shape request and return its squeezed shape plus element count.
    pub fn for_request(extents: &[usize]) -> Result<(Shape, usize)> {
        if extents.is_empty() {
            return Err(MatrtError::InvalidShape {
                extents: Vec::new(),
                reason: "at least one dimension is required",
            });
        }
        let numel = Self::checked_numel(extents).ok_or_else(|| MatrtError::InvalidShape {
            extents: extents.to_vec(),
            reason: "element count overflows usize",
        })?;
        Ok((Self::squeezed(extents), numel))
    }

    /// Product of extents, or None on overflow.
    pub fn checked_numel(extents: &[usize]) -> Option<usize> {
        extents.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Drop trailing extent-1 dimensions beyond the second.
    pub fn squeeze(&mut self) {
        while self.dims.len() > 2 && self.dims.last() == Some(&1) {
            self.dims.pop();
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Get dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Get size of a specific dimension.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// Rank-2 shape whose second extent is 1.
    pub fn is_column_vector(&self) -> bool {
        self.dims.len() == 2 && self.dims[1] == 1
    }

    /// Whether the extents equal `extents` exactly (same rank, same values).
    pub fn matches(&self, extents: &[usize]) -> bool {
        self.dims.as_slice() == extents
    }

    /// MATLAB `length()`: the largest extent, or 0 if any extent is 0.
    pub fn max_extent(&self) -> usize {
        let mut max = 0;
        for &d in &self.dims {
            if d == 0 {
                return 0;
            }
            max = max.max(d);
        }
        max
    }

    /// Compute default strides for a contiguous row-major layout.
    pub fn contiguous_strides(&self) -> SmallVec<[usize; 4]> {
        let ndim = self.dims.len();
        if ndim == 0 {
            return SmallVec::new();
        }
        let mut strides = SmallVec::from_elem(0usize, ndim);
        strides[ndim - 1] = 1;
        for i in (0..ndim - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Row-major linear index of zero-based subscripts.
    ///
    /// A single subscript (or none, meaning 0) is taken as a linear index.
    /// With fewer subscripts than dimensions, the last one ranges over the
    /// remaining dimensions folded together. Subscripts past the rank index
    /// implicit unit dimensions and must be 0.
    pub fn linear_index(&self, indices: &[usize]) -> Result<usize> {
        if indices.len() <= 1 {
            let index = indices.first().copied().unwrap_or(0);
            let numel = self.numel();
            if index >= numel {
                return Err(MatrtError::IndexOutOfBounds {
                    op: "sub2ind",
                    index,
                    extent: numel,
                });
            }
            return Ok(index);
        }

        let strides = self.contiguous_strides();
        let last = indices.len() - 1;
        let mut linear = 0;
        for (axis, &index) in indices.iter().enumerate() {
            let (extent, stride) = if axis == last && axis < self.ndim() {
                (self.dims[axis..].iter().product::<usize>(), 1)
            } else {
                (self.dim(axis).unwrap_or(1), strides.get(axis).copied().unwrap_or(0))
            };
            if index >= extent {
                return Err(MatrtError::IndexOutOfBounds {
                    op: "sub2ind",
                    index,
                    extent,
                });
            }
            linear += index * stride;
        }
        Ok(linear)
    }

    /// Swap the two extents of a rank-2 shape.
    pub fn transpose(&self) -> Option<Shape> {
        if self.ndim() != 2 {
            return None;
        }
        Some(Shape::new(&[self.dims[1], self.dims[0]]))
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

macro_rules! impl_shape_from_array {
    ($($n:expr),*) => {
        $(
            impl From<[usize; $n]> for Shape {
                fn from(dims: [usize; $n]) -> Self {
                    Shape::new(&dims)
                }
            }
        )*
    };
}

impl_shape_from_array!(1, 2, 3, 4, 5, 6);
