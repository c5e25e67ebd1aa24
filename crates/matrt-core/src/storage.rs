//! Buffer ownership model.
//!
//! A tensor's buffer is in exactly one of three states: unbound, exclusively
//! owned, or aliased from another live tensor. Only owned buffers are ever
//! freed, and an alias cannot outlive the borrow of its source.

use crate::error::MatrtError;
use crate::Result;

/// How an owned buffer came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Produced by the allocator for a shape request.
    Allocated,
    /// Produced by a copy-mode view. Such a handle may only be refreshed as a copy.
    ViewCopy,
}

/// A validated `(source, offset, length)` window into another tensor's buffer.
#[derive(Debug)]
pub struct Alias<'a, T> {
    source: &'a mut [T],
    offset: usize,
    len: usize,
}

impl<'a, T> Alias<'a, T> {
    /// Build a window over `source[offset..offset + len]`.
    pub fn new(source: &'a mut [T], offset: usize, len: usize) -> Result<Self> {
        check_window(offset, len, source.len())?;
        Ok(Self { source, offset, len })
    }

    /// Re-check the window against the source extent.
    pub fn check_bounds(&self) -> Result<()> {
        check_window(self.offset, self.len, self.source.len())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element count of the aliased source buffer.
    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.source[self.offset..self.offset + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.source[self.offset..self.offset + self.len]
    }
}

pub(crate) fn check_window(offset: usize, len: usize, source_len: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= source_len => Ok(()),
        _ => Err(MatrtError::ViewOutOfBounds {
            offset,
            length: len,
            source_len,
        }),
    }
}

/// Backing storage of a tensor handle.
#[derive(Debug)]
pub enum Storage<'a, T> {
    /// No buffer and no shape.
    Unbound,
    /// Exclusively owned buffer, freed when replaced or released.
    Owned { data: Vec<T>, provenance: Provenance },
    /// Non-owning window into another tensor's buffer.
    Aliased(Alias<'a, T>),
}

impl<T> Default for Storage<'_, T> {
    fn default() -> Self {
        Storage::Unbound
    }
}

impl<'a, T> Storage<'a, T> {
    pub fn owned(data: Vec<T>, provenance: Provenance) -> Self {
        Storage::Owned { data, provenance }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, Storage::Unbound)
    }

    /// Whether releasing this storage frees its buffer.
    pub fn owns_data(&self) -> bool {
        matches!(self, Storage::Owned { .. })
    }

    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            Storage::Owned { provenance, .. } => Some(*provenance),
            _ => None,
        }
    }

    /// Number of elements reachable through this storage.
    pub fn len(&self) -> usize {
        match self {
            Storage::Unbound => 0,
            Storage::Owned { data, .. } => data.len(),
            Storage::Aliased(alias) => alias.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Storage::Unbound => &[],
            Storage::Owned { data, .. } => data.as_slice(),
            Storage::Aliased(alias) => alias.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Storage::Unbound => &mut [],
            Storage::Owned { data, .. } => data.as_mut_slice(),
            Storage::Aliased(alias) => alias.as_mut_slice(),
        }
    }

    pub fn alias(&self) -> Option<&Alias<'a, T>> {
        match self {
            Storage::Aliased(alias) => Some(alias),
            _ => None,
        }
    }
}
