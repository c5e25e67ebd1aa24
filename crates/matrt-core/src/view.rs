//! View factory: copy views and zero-copy alias views over a source buffer.
//!
//! A view covers `length` consecutive elements of its source starting at a
//! linear `offset`. It is shaped `(length, 1)` when the source is a column
//! vector and `(1, length)` otherwise.

use crate::alloc::{allocate_buffer, DataAllocator, HeapAllocator, DEFAULT_ALLOC_RETRIES};
use crate::dtype::Element;
use crate::error::MatrtError;
use crate::shape::Shape;
use crate::storage::{check_window, Alias, Provenance, Storage};
use crate::tensor::Tensor;
use crate::Result;

fn view_shape(source: &Shape, length: usize) -> Shape {
    if source.is_column_vector() {
        Shape::new(&[length, 1])
    } else {
        Shape::new(&[1, length])
    }
}

impl<'a, T: Element> Tensor<'a, T> {
    /// Copy `self[offset..offset + length]` into `view`.
    ///
    /// `view` keeps its buffer when it is already bound to exactly `length`
    /// elements: an owned buffer is overwritten and tagged
    /// [`Provenance::ViewCopy`], an alias receives the copy through its window
    /// and stays non-owning. Any other handle is rebound to a fresh owned
    /// buffer tagged [`Provenance::ViewCopy`].
    pub fn view_copy(&self, offset: usize, length: usize, view: &mut Tensor<'_, T>) -> Result<()> {
        self.view_copy_with(offset, length, view, &HeapAllocator, DEFAULT_ALLOC_RETRIES)
    }

    /// [`view_copy`](Self::view_copy) with an explicit data allocator.
    pub fn view_copy_with(
        &self,
        offset: usize,
        length: usize,
        view: &mut Tensor<'_, T>,
        allocator: &dyn DataAllocator<T>,
        retries: usize,
    ) -> Result<()> {
        let source_shape = self.require_bound("make_view")?;
        check_window(offset, length, self.numel())?;
        let shape = view_shape(source_shape, length);
        let window = &self.as_slice()[offset..offset + length];

        let reused = match &mut view.storage {
            Storage::Owned { data, provenance } if data.len() == length => {
                data.copy_from_slice(window);
                *provenance = Provenance::ViewCopy;
                true
            }
            // An alias of matching length stays an alias; the copy lands in its window.
            Storage::Aliased(alias) if alias.len() == length => {
                alias.as_mut_slice().copy_from_slice(window);
                true
            }
            _ => false,
        };
        if reused {
            view.shape = Some(shape);
            tracing::trace!(offset, length, "refreshed copy view in place");
            return Ok(());
        }

        let mut data = allocate_buffer(allocator, length, retries)?;
        data.copy_from_slice(window);
        view.bind_owned(data, shape, Provenance::ViewCopy);
        tracing::debug!(offset, length, dtype = %T::DTYPE, "allocated copy view");
        Ok(())
    }

    /// Rebind `view` to alias `self[offset..offset + length]` without copying.
    ///
    /// `self` stays mutably borrowed for as long as `view` holds the alias, so
    /// the source cannot be reallocated or released underneath it. A buffer
    /// previously owned by `view` is freed. Handles holding copy-view data
    /// refuse to become aliases.
    pub fn view_alias<'v>(&'v mut self, offset: usize, length: usize, view: &mut Tensor<'v, T>) -> Result<()> {
        if view.provenance() == Some(Provenance::ViewCopy) {
            return Err(MatrtError::AliasIntoCopyView);
        }
        let shape = view_shape(self.require_bound("make_view")?, length);
        let alias = Alias::new(self.as_mut_slice(), offset, length)?;

        if view.owns_data() {
            tracing::trace!(numel = view.numel(), "releasing buffer replaced by alias");
        }
        view.storage = Storage::Aliased(alias);
        view.shape = Some(shape);
        tracing::trace!(offset, length, "bound alias view");
        Ok(())
    }
}

/// Bind `view` to `source[offset..offset + length]`, copying when `copy` is
/// set and aliasing otherwise.
///
/// Both modes borrow `source` for the lifetime of `view`; callers that want
/// to keep using the source alongside a copy view call
/// [`Tensor::view_copy`] directly.
pub fn make_view<'v, T: Element>(
    source: &'v mut Tensor<'_, T>,
    offset: usize,
    length: usize,
    copy: bool,
    view: &mut Tensor<'v, T>,
) -> Result<()> {
    if copy {
        source.view_copy(offset, length, view)
    } else {
        source.view_alias(offset, length, view)
    }
}
