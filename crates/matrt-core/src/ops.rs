//! Shape-aware tensor operations: queries, element access, creation,
//! transpose and matrix multiply.
//!
//! Operations that produce a result write into a caller-provided handle
//! through `allocate_or_reuse`, so a handle reused across calls keeps its
//! buffer when the shape does not change.

pub mod access;
pub mod creation;
pub mod linalg;
pub mod query;
pub mod transpose;
