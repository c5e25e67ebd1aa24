use std::fmt;
use std::mem;

use crate::alloc::{allocate_buffer, Allocation, DataAllocator, HeapAllocator, DEFAULT_ALLOC_RETRIES};
use crate::dtype::{DType, Element};
use crate::error::MatrtError;
use crate::shape::Shape;
use crate::storage::{Provenance, Storage};
use crate::Result;

/// A dense row-major array handle, the runtime object behind every matrix in
/// generated code.
///
/// A handle is either unbound (no buffer, no shape) or bound to a buffer it
/// owns exclusively or to a window of another handle's buffer. The lifetime
/// `'a` is the borrow of that other handle; owning handles are usually
/// `Tensor<'static, T>`.
///
/// # Examples
///
/// ```
/// use matrt_core::Tensor;
///
/// let mut t: Tensor<f64> = Tensor::new();
/// t.allocate_or_reuse(&[2, 3, 1]).unwrap();
/// assert_eq!(t.extents(), &[2, 3]);
/// assert_eq!(t.numel(), 6);
/// assert!(t.owns_data());
/// ```
pub struct Tensor<'a, T: Element> {
    pub(crate) storage: Storage<'a, T>,
    pub(crate) shape: Option<Shape>,
}

impl<'a, T: Element> Tensor<'a, T> {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// An unbound handle.
    pub fn new() -> Self {
        Self {
            storage: Storage::Unbound,
            shape: None,
        }
    }

    /// A freshly allocated, zero-filled tensor.
    pub fn zeros(extents: &[usize]) -> Result<Self> {
        let mut t = Self::new();
        t.allocate_or_reuse(extents)?;
        Ok(t)
    }

    /// Take ownership of `data` laid out row-major with the given extents.
    pub fn from_vec(data: Vec<T>, extents: &[usize]) -> Result<Self> {
        let (shape, numel) = Shape::for_request(extents)?;
        if numel != data.len() {
            return Err(MatrtError::ElementCountMismatch {
                op: "from_vec",
                expected: numel,
                got: data.len(),
            });
        }
        Ok(Self {
            storage: Storage::owned(data, Provenance::Allocated),
            shape: Some(shape),
        })
    }

    /// Copy `data` into a new tensor with the given extents.
    pub fn from_slice(data: &[T], extents: &[usize]) -> Result<Self> {
        Self::from_vec(data.to_vec(), extents)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Whether the handle currently has a shape and buffer.
    pub fn is_bound(&self) -> bool {
        self.shape.is_some()
    }

    /// Shape of the tensor, `None` while unbound.
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    /// Retained extents; empty while unbound.
    pub fn extents(&self) -> &[usize] {
        self.shape.as_ref().map(Shape::dims).unwrap_or(&[])
    }

    /// Retained rank after squeezing; 0 while unbound.
    pub fn ndims(&self) -> usize {
        self.extents().len()
    }

    /// Number of elements in the buffer.
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Whether the buffer holds no elements (always true while unbound).
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    /// Whether releasing this handle frees its buffer.
    pub fn owns_data(&self) -> bool {
        self.storage.owns_data()
    }

    /// Whether the buffer is a window into another handle.
    pub fn is_alias(&self) -> bool {
        matches!(self.storage, Storage::Aliased(_))
    }

    /// How the owned buffer was produced, if owned.
    pub fn provenance(&self) -> Option<Provenance> {
        self.storage.provenance()
    }

    /// Element type tag.
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Offset of an alias into its source buffer.
    pub fn alias_offset(&self) -> Option<usize> {
        self.storage.alias().map(|a| a.offset())
    }

    /// Re-validate an alias window against its source; owned and unbound
    /// handles always pass.
    pub fn check_bounds(&self) -> Result<()> {
        match self.storage.alias() {
            Some(alias) => alias.check_bounds(),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Data access
    // =========================================================================

    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Address of the first element (dangling for empty buffers).
    pub fn as_ptr(&self) -> *const T {
        self.as_slice().as_ptr()
    }

    /// Raw bytes of the buffer, for device-upload and serialization collaborators.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Bind this handle to `extents`, reusing the current buffer when the shape
    /// already matches exactly.
    ///
    /// On a match nothing is touched, whether the buffer is owned or aliased;
    /// repeated calls on an alias therefore keep writing through the window.
    /// Otherwise a zero-filled buffer is allocated, then the previous buffer
    /// (if owned) and shape are released and the handle owns its new data.
    pub fn allocate_or_reuse(&mut self, extents: &[usize]) -> Result<Allocation> {
        self.allocate_or_reuse_with(extents, &HeapAllocator, DEFAULT_ALLOC_RETRIES)
    }

    /// [`allocate_or_reuse`](Self::allocate_or_reuse) with an explicit data
    /// allocator and retry count.
    pub fn allocate_or_reuse_with(
        &mut self,
        extents: &[usize],
        allocator: &dyn DataAllocator<T>,
        retries: usize,
    ) -> Result<Allocation> {
        if self.same_shape(extents) {
            tracing::trace!(shape = ?extents, "reusing tensor buffer");
            return Ok(Allocation::Reused);
        }

        let (shape, numel) = Shape::for_request(extents)?;
        let data = allocate_buffer(allocator, numel, retries)?;

        let previous = mem::replace(&mut self.storage, Storage::owned(data, Provenance::Allocated));
        tracing::debug!(
            shape = %shape,
            numel,
            dtype = %T::DTYPE,
            freed = previous.owns_data(),
            "allocated tensor buffer"
        );
        drop(previous);
        self.shape = Some(shape);

        Ok(Allocation::Fresh)
    }

    /// Destroy an owning handle: free the buffer if owned, drop the shape and
    /// leave the handle unbound. No-op on an unbound handle.
    pub fn release(&mut self) {
        if !self.is_bound() {
            return;
        }
        self.storage = Storage::Unbound;
        self.shape = None;
    }

    /// Destroy a view handle. Copy views own their buffer and free it here
    /// too, so both destroy paths are leak-free. No-op on an unbound handle.
    pub fn release_view(&mut self) {
        if self.owns_data() {
            tracing::trace!(numel = self.numel(), "releasing copy-view buffer");
        }
        self.release();
    }

    /// Move the storage and shape of an owning tensor into this handle,
    /// releasing whatever it held before.
    pub(crate) fn adopt(&mut self, other: Tensor<'static, T>) {
        self.storage = other.storage;
        self.shape = other.shape;
    }

    /// Rebind to a buffer obtained elsewhere, with the given shape.
    pub(crate) fn bind_owned(&mut self, data: Vec<T>, shape: Shape, provenance: Provenance) {
        self.storage = Storage::owned(data, provenance);
        self.shape = Some(shape);
    }

    pub(crate) fn require_bound(&self, op: &'static str) -> Result<&Shape> {
        self.shape.as_ref().ok_or(MatrtError::Unbound { op })
    }
}

impl<T: Element> Default for Tensor<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> fmt::Debug for Tensor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            None => write!(f, "Tensor(unbound, dtype={})", T::DTYPE),
            Some(shape) => write!(
                f,
                "Tensor(shape={}, dtype={}, numel={}, owns_data={})",
                shape,
                T::DTYPE,
                self.numel(),
                self.owns_data(),
            ),
        }
    }
}

impl<T: Element> fmt::Display for Tensor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(shape) = &self.shape else {
            return write!(f, "[]");
        };
        let data = self.as_slice();
        match shape.dims() {
            [_] => {
                write!(f, "[")?;
                for (i, v) in data.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            &[rows, cols] => {
                write!(f, "[")?;
                for r in 0..rows {
                    if r > 0 {
                        write!(f, "; ")?;
                    }
                    for c in 0..cols {
                        if c > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{}", data[r * cols + c])?;
                    }
                }
                write!(f, "]")
            }
            _ => write!(f, "tensor({:?}, shape={})", data, shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unbound() {
        let t: Tensor<f64> = Tensor::new();
        assert!(!t.is_bound());
        assert_eq!(t.ndims(), 0);
        assert_eq!(t.numel(), 0);
        assert!(t.extents().is_empty());
        assert!(!t.owns_data());
    }

    #[test]
    fn test_allocate_fresh() {
        let mut t: Tensor<f64> = Tensor::new();
        let outcome = t.allocate_or_reuse(&[3, 4]).unwrap();
        assert_eq!(outcome, Allocation::Fresh);
        assert_eq!(t.extents(), &[3, 4]);
        assert_eq!(t.numel(), 12);
        assert!(t.owns_data());
        assert_eq!(t.provenance(), Some(Provenance::Allocated));
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reuse_keeps_buffer_and_contents() {
        let mut t: Tensor<i32> = Tensor::zeros(&[2, 2]).unwrap();
        t.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        let ptr = t.as_ptr();

        let outcome = t.allocate_or_reuse(&[2, 2]).unwrap();
        assert_eq!(outcome, Allocation::Reused);
        assert_eq!(t.as_ptr(), ptr);
        assert_eq!(t.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_reshape_reallocates() {
        let mut t: Tensor<f32> = Tensor::zeros(&[2, 2]).unwrap();
        t.as_mut_slice().fill(7.0);
        let outcome = t.allocate_or_reuse(&[4, 1]).unwrap();
        assert_eq!(outcome, Allocation::Fresh);
        assert_eq!(t.extents(), &[4, 1]);
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_squeezed_request_does_not_match_its_own_shape() {
        let mut t: Tensor<f64> = Tensor::zeros(&[2, 3, 1]).unwrap();
        assert_eq!(t.extents(), &[2, 3]);
        assert_eq!(t.allocate_or_reuse(&[2, 3]).unwrap(), Allocation::Reused);
        assert_eq!(t.allocate_or_reuse(&[2, 3, 1]).unwrap(), Allocation::Fresh);
    }

    #[test]
    fn test_zero_extent_binds_empty_buffer() {
        let t: Tensor<f64> = Tensor::zeros(&[5, 0]).unwrap();
        assert!(t.is_bound());
        assert_eq!(t.numel(), 0);
        assert!(t.as_slice().is_empty());
        assert!(t.owns_data());
    }

    #[test]
    fn test_invalid_requests_leave_handle_untouched() {
        let mut t: Tensor<f64> = Tensor::zeros(&[2, 2]).unwrap();
        assert!(t.allocate_or_reuse(&[]).is_err());
        assert!(t.allocate_or_reuse(&[usize::MAX, 2]).is_err());
        assert_eq!(t.extents(), &[2, 2]);
        assert_eq!(t.numel(), 4);
    }

    #[test]
    fn test_budget_failure_is_recoverable() {
        let budget = crate::BudgetAllocator::new(4);
        let mut t: Tensor<f64> = Tensor::zeros(&[2, 2]).unwrap();
        let err = t.allocate_or_reuse_with(&[3, 3], &budget, 1).unwrap_err();
        assert!(matches!(err, MatrtError::AllocationFailed { elements: 9, attempts: 2, .. }));
        assert_eq!(t.extents(), &[2, 2]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut t: Tensor<u8> = Tensor::zeros(&[3, 3]).unwrap();
        t.release();
        assert!(!t.is_bound());
        assert_eq!(t.numel(), 0);
        t.release();
        t.release_view();
        assert!(!t.is_bound());
    }

    #[test]
    fn test_from_vec_checks_length() {
        let t = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        assert_eq!(t.extents(), &[2, 3]);
        assert!(Tensor::from_vec(vec![1.0f64, 2.0], &[2, 3]).is_err());
    }

    #[test]
    fn test_as_bytes() {
        let t = Tensor::from_vec(vec![1i32, 2], &[1, 2]).unwrap();
        assert_eq!(t.as_bytes().len(), 8);
    }

    #[test]
    fn test_debug_display() {
        let t = Tensor::from_vec(vec![1i32, 0, 0, 1], &[2, 2]).unwrap();
        assert_eq!(t.to_string(), "[1 0; 0 1]");
        let debug = format!("{:?}", t);
        assert!(debug.contains("shape=2x2"));
        assert!(debug.contains("i32"));

        let row = Tensor::from_vec(vec![1.5f64, 2.5], &[2]).unwrap();
        assert_eq!(row.to_string(), "[1.5 2.5]");

        let unbound: Tensor<f32> = Tensor::new();
        assert_eq!(unbound.to_string(), "[]");
        assert!(format!("{:?}", unbound).contains("unbound"));
    }
}
