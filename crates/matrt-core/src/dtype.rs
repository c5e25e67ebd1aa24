use std::fmt;
use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

/// Element types a tensor buffer can hold.
///
/// Generated code instantiates one tensor layout per element type; the tag is
/// carried at runtime for diagnostics and byte-level interop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 single-precision float
    F32,
    /// 64-bit IEEE 754 double-precision float
    F64,
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
}

impl DType {
    pub const ALL: [DType; 6] = [DType::F32, DType::F64, DType::I8, DType::U8, DType::I32, DType::I64];

    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }

    /// Number of bytes needed to store `n` elements, or None on overflow.
    pub fn storage_bytes(&self, n: usize) -> Option<usize> {
        self.element_size().checked_mul(n)
    }

    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Whether this dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::I8 => write!(f, "i8"),
            DType::U8 => write!(f, "u8"),
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
        }
    }
}

/// A scalar type that can back a tensor buffer.
///
/// `Pod` gives the byte view used by device-upload collaborators; `ZERO` is
/// what fresh buffers are initialised with.
pub trait Element:
    bytemuck::Pod
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Add<Output = Self>
    + Mul<Output = Self>
    + Send
    + Sync
    + 'static
{
    const DTYPE: DType;
    const ZERO: Self;
    const ONE: Self;

    /// `self + a * b`. Integer types saturate at their bounds instead of
    /// wrapping or panicking; floats follow IEEE 754.
    fn mul_add_saturating(self, a: Self, b: Self) -> Self;
}

macro_rules! impl_float_element {
    ($($ty:ty => $dtype:expr);* $(;)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;

                #[inline]
                fn mul_add_saturating(self, a: Self, b: Self) -> Self {
                    self + a * b
                }
            }
        )*
    };
}

macro_rules! impl_int_element {
    ($($ty:ty => $dtype:expr);* $(;)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;
                const ZERO: Self = 0;
                const ONE: Self = 1;

                #[inline]
                fn mul_add_saturating(self, a: Self, b: Self) -> Self {
                    self.saturating_add(a.saturating_mul(b))
                }
            }
        )*
    };
}

impl_float_element! {
    f32 => DType::F32;
    f64 => DType::F64;
}

impl_int_element! {
    i8 => DType::I8;
    u8 => DType::U8;
    i32 => DType::I32;
    i64 => DType::I64;
}
