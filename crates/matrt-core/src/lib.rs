//! # matrt-core
//!
//! Runtime array model for generated numeric code.
//!
//! Provides the `Tensor` handle with:
//! - Row-major dense buffers of a fixed element type (f32, f64, i8, u8, i32, i64)
//! - An allocate-or-reuse allocator with a pluggable data allocator hook
//! - Copy views and zero-copy alias views with validated bounds
//! - Shape-aware derived operations (eye, transpose, set_row, length, ...)
//! - A top-level adapter that turns errors into "report and stop"

pub mod alloc;
pub mod config;
pub mod dtype;
pub mod error;
pub mod fatal;
pub mod ops;
pub mod prelude;
pub mod shape;
pub mod storage;
pub mod tensor;
pub mod view;

pub use alloc::{Allocation, BudgetAllocator, DataAllocator, HeapAllocator};
pub use config::RuntimeConfig;
pub use dtype::{DType, Element};
pub use error::MatrtError;
pub use fatal::{FatalPolicy, OrAbort};
pub use ops::linalg::{matmul_into, Gemm, NaiveGemm};
pub use ops::transpose::transpose;
pub use ops::creation::eye;
pub use shape::Shape;
pub use storage::Provenance;
pub use tensor::Tensor;
pub use view::make_view;

pub type Result<T> = std::result::Result<T, MatrtError>;
