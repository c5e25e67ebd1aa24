//! Row-major dense matrix multiply.
//!
//! The runtime only owns the calling convention; optimised kernels (BLAS or
//! otherwise) plug in through [`Gemm`].

use std::fmt;

use crate::dtype::Element;
use crate::error::MatrtError;
use crate::tensor::Tensor;
use crate::Result;

/// `c = a · b` for row-major `a: m x k`, `b: k x n`, `c: m x n`.
pub trait Gemm<T: Element>: fmt::Debug {
    /// Callers guarantee `a_shape.1 == b_shape.0`, that the slice lengths
    /// agree with the shapes and that `c` may be overwritten. [`matmul_into`]
    /// checks all of this before delegating.
    fn gemm(&self, a: &[T], a_shape: (usize, usize), b: &[T], b_shape: (usize, usize), c: &mut [T]) -> Result<()>;
}

/// Triple-loop reference multiply.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveGemm;

impl<T: Element> Gemm<T> for NaiveGemm {
    fn gemm(&self, a: &[T], (m, k): (usize, usize), b: &[T], (k2, n): (usize, usize), c: &mut [T]) -> Result<()> {
        debug_assert_eq!(k, k2, "inner dimensions checked by matmul_into");
        for i in 0..m {
            for j in 0..n {
                let mut sum = T::ZERO;
                for p in 0..k {
                    sum = sum.mul_add_saturating(a[i * k + p], b[p * n + j]);
                }
                c[i * n + j] = sum;
            }
        }
        Ok(())
    }
}

fn matrix_dims<T: Element>(t: &Tensor<'_, T>) -> Result<(usize, usize)> {
    let dims = t.require_bound("matmul")?.dims();
    match dims {
        &[rows, cols] => Ok((rows, cols)),
        _ => Err(MatrtError::InvalidRank {
            op: "matmul",
            rank: dims.len(),
        }),
    }
}

/// Bind `out` to `m x n` and fill it with `a · b` using `kernel`.
pub fn matmul_into<T: Element>(
    a: &Tensor<'_, T>,
    b: &Tensor<'_, T>,
    out: &mut Tensor<'_, T>,
    kernel: &dyn Gemm<T>,
) -> Result<()> {
    let (m, k) = matrix_dims(a)?;
    let (k2, n) = matrix_dims(b)?;
    if k != k2 {
        return Err(MatrtError::ShapeMismatch {
            expected: vec![k, n],
            got: vec![k2, n],
        });
    }

    out.allocate_or_reuse(&[m, n])?;
    kernel.gemm(a.as_slice(), (m, k), b.as_slice(), (k2, n), out.as_mut_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_2x3_3x2() {
        let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let b = Tensor::from_vec(vec![7.0f64, 8.0, 9.0, 10.0, 11.0, 12.0], &[3, 2]).unwrap();
        let mut c = Tensor::new();
        matmul_into(&a, &b, &mut c, &NaiveGemm).unwrap();
        assert_eq!(c.extents(), &[2, 2]);
        assert_eq!(c.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_identity() {
        let a = Tensor::from_vec(vec![1i32, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let id: Tensor<i32> = Tensor::eye(3, 3).unwrap();
        let mut c: Tensor<i32> = Tensor::zeros(&[2, 3]).unwrap();
        c.fill(99);
        matmul_into(&a, &id, &mut c, &NaiveGemm).unwrap();
        assert_eq!(c.as_slice(), a.as_slice());
    }

    #[test]
    fn test_matmul_integer_saturates() {
        let a = Tensor::from_vec(vec![200u8, 200], &[1, 2]).unwrap();
        let b = Tensor::from_vec(vec![2u8, 2], &[2, 1]).unwrap();
        let mut c = Tensor::new();
        matmul_into(&a, &b, &mut c, &NaiveGemm).unwrap();
        assert_eq!(c.extents(), &[1, 1]);
        assert_eq!(c.as_slice(), &[u8::MAX]);

        let a = Tensor::from_vec(vec![-100i8, 100], &[1, 2]).unwrap();
        let b = Tensor::from_vec(vec![2i8, 1], &[2, 1]).unwrap();
        let mut c = Tensor::new();
        matmul_into(&a, &b, &mut c, &NaiveGemm).unwrap();
        assert_eq!(c.as_slice(), &[i8::MIN + 100]);
    }

    #[test]
    fn test_matmul_inner_mismatch() {
        let a: Tensor<f32> = Tensor::zeros(&[2, 3]).unwrap();
        let b: Tensor<f32> = Tensor::zeros(&[2, 3]).unwrap();
        let mut c = Tensor::new();
        assert!(matches!(
            matmul_into(&a, &b, &mut c, &NaiveGemm),
            Err(MatrtError::ShapeMismatch { .. })
        ));
        assert!(!c.is_bound());
    }

    #[test]
    fn test_matmul_rank() {
        let a: Tensor<f32> = Tensor::zeros(&[2, 2, 2]).unwrap();
        let b: Tensor<f32> = Tensor::zeros(&[2, 2]).unwrap();
        let mut c = Tensor::new();
        assert!(matches!(
            matmul_into(&a, &b, &mut c, &NaiveGemm),
            Err(MatrtError::InvalidRank { op: "matmul", rank: 3 })
        ));
    }
}
