//! Convenience re-exports for common matrt-core types.
//!
//! ```rust
//! use matrt_core::prelude::*;
//! ```

pub use crate::Allocation;
pub use crate::DType;
pub use crate::Element;
pub use crate::MatrtError;
pub use crate::OrAbort;
pub use crate::Result;
pub use crate::Shape;
pub use crate::Tensor;
